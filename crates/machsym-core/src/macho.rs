//! Thin Mach-O images.
//!
//! Only what the symbol pipeline needs is read from the image: the word size
//! and byte order from the header, the `LC_SYMTAB` ranges and the
//! `LC_DYSYMTAB` index partition. Load commands are walked with the `object`
//! crate; the tables themselves are decoded by [`crate::symbols`].
//!
//! Fat files are not unpacked here. Pass the offset of the slice to use.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use object::macho::{MachHeader32, MachHeader64, LC_DYSYMTAB, LC_SYMTAB, MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64};
use object::read::macho::MachHeader;
use object::Endianness;
use once_cell::sync::OnceCell;

use crate::error::{MachsymError, MachsymResult};
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::symbols::record::{Nlist, Nlist32, Nlist64, RecordBuffer};
use crate::symbols::resolver::{DySymtabPartition, SymbolResolver};
use crate::symbols::table::{SymbolTable, Symbols};

/// `LC_SYMTAB`, with offsets made absolute within the image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymtabLocation
{
    pub symbol_offset: u64,
    pub symbol_count: u32,
    pub string_offset: u64,
    pub string_size: u32,
}

/// A Mach-O image held in memory.
pub struct MachImage
{
    data: Arc<[u8]>,
    header_offset: u64,
    is_64_bit: bool,
    endian: Endianness,
    symtab: Option<SymtabLocation>,
    partition: Option<DySymtabPartition>,
    resolver: OnceCell<SymbolResolver>,
}

impl MachImage
{
    /// Parse the header at `header_offset` and collect the symbol table
    /// locations.
    ///
    /// # Errors
    ///
    /// [`MachsymError::Malformed`] for an unknown magic or load commands the
    /// `object` reader rejects.
    pub fn parse(data: Arc<[u8]>, header_offset: u64) -> MachsymResult<Self>
    {
        let magic = data.read_range(header_offset, 4)?;
        let magic = u32::from_be_bytes([magic[0], magic[1], magic[2], magic[3]]);

        let (is_64_bit, scan) = match magic {
            MH_MAGIC_64 | MH_CIGAM_64 => (true, scan_load_commands::<MachHeader64<Endianness>>(&data, header_offset)?),
            MH_MAGIC | MH_CIGAM => (false, scan_load_commands::<MachHeader32<Endianness>>(&data, header_offset)?),
            other => return Err(MachsymError::Malformed(format!("unknown Mach-O magic 0x{other:08x}"))),
        };
        let (endian, symtab, partition) = scan;

        tracing::debug!(
            header_offset,
            is_64_bit,
            ?endian,
            has_symtab = symtab.is_some(),
            has_dysymtab = partition.is_some(),
            "parsed Mach-O header"
        );
        Ok(Self {
            data,
            header_offset,
            is_64_bit,
            endian,
            symtab,
            partition,
            resolver: OnceCell::new(),
        })
    }

    /// Read a whole file and parse the image at `header_offset`.
    ///
    /// # Errors
    ///
    /// I/O errors and those of [`MachImage::parse`].
    pub fn open(path: impl AsRef<Path>, header_offset: u64) -> MachsymResult<Self>
    {
        let bytes = fs::read(path.as_ref())?;
        Self::parse(Arc::from(bytes), header_offset)
    }

    pub fn header_offset(&self) -> u64
    {
        self.header_offset
    }

    pub fn is_64_bit(&self) -> bool
    {
        self.is_64_bit
    }

    pub fn endian(&self) -> Endianness
    {
        self.endian
    }

    pub fn symtab(&self) -> Option<SymtabLocation>
    {
        self.symtab
    }

    /// Local and external index ranges from `LC_DYSYMTAB`.
    pub fn partition(&self) -> Option<DySymtabPartition>
    {
        self.partition
    }

    /// The string table named by `LC_SYMTAB`.
    ///
    /// # Errors
    ///
    /// [`MachsymError::OutOfBounds`] when the range lies outside the data.
    pub fn symbol_strings(&self) -> MachsymResult<Option<StringTable>>
    {
        self.symtab
            .map(|symtab| StringTable::from_source(&self.data, symtab.string_offset, u64::from(symtab.string_size)))
            .transpose()
    }

    /// The symbol table at the image's word size.
    ///
    /// An image without `LC_SYMTAB` yields an empty table.
    ///
    /// # Errors
    ///
    /// Out of range offsets, or a record range that cannot hold `nsyms`
    /// records.
    pub fn symbols(&self) -> MachsymResult<Symbols>
    {
        if self.is_64_bit {
            self.load::<Nlist64>().map(Symbols::from)
        } else {
            self.load::<Nlist32>().map(Symbols::from)
        }
    }

    fn load<N: Nlist>(&self) -> MachsymResult<SymbolTable<N>>
    {
        let Some(symtab) = self.symtab else {
            return Ok(SymbolTable::new(StringTable::new(Vec::new(), 0), RecordBuffer::empty()));
        };
        let count = symtab.symbol_count as usize;
        let strings = StringTable::from_source(&self.data, symtab.string_offset, u64::from(symtab.string_size))?;
        let record_bytes = self.data.read_range(symtab.symbol_offset, (count * N::SIZE) as u64)?;
        let records = RecordBuffer::<N>::new(record_bytes, count, self.endian)?;
        Ok(SymbolTable::new(strings, records))
    }

    /// Resolver over every symbol of the image, built on first use.
    ///
    /// # Errors
    ///
    /// Whatever [`MachImage::symbols`] fails with; a later call retries.
    pub fn resolver(&self) -> MachsymResult<&SymbolResolver>
    {
        self.resolver
            .get_or_try_init(|| Ok(SymbolResolver::from_symbols(&self.symbols()?, self.partition)))
    }
}

impl std::fmt::Debug for MachImage
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("MachImage")
            .field("size", &self.data.len())
            .field("header_offset", &self.header_offset)
            .field("is_64_bit", &self.is_64_bit)
            .field("endian", &self.endian)
            .field("symtab", &self.symtab)
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

type LoadCommandScan = (Endianness, Option<SymtabLocation>, Option<DySymtabPartition>);

fn scan_load_commands<Mach>(data: &[u8], header_offset: u64) -> MachsymResult<LoadCommandScan>
where
    Mach: MachHeader<Endian = Endianness>,
{
    let header = Mach::parse(data, header_offset)?;
    let endian = header.endian()?;
    let mut commands = header.load_commands(endian, data, header_offset)?;

    let mut symtab = None;
    let mut partition = None;
    while let Some(command) = commands.next()? {
        match command.cmd() {
            LC_SYMTAB => {
                if let Some(cmd) = command.symtab()? {
                    symtab = Some(SymtabLocation {
                        symbol_offset: header_offset.saturating_add(u64::from(cmd.symoff.get(endian))),
                        symbol_count: cmd.nsyms.get(endian),
                        string_offset: header_offset.saturating_add(u64::from(cmd.stroff.get(endian))),
                        string_size: cmd.strsize.get(endian),
                    });
                }
            }
            LC_DYSYMTAB => {
                if let Some(cmd) = command.dysymtab()? {
                    partition = Some(DySymtabPartition::new(
                        cmd.ilocalsym.get(endian) as usize,
                        cmd.nlocalsym.get(endian) as usize,
                        cmd.iextdefsym.get(endian) as usize,
                        cmd.nextdefsym.get(endian) as usize,
                    ));
                }
            }
            _ => {}
        }
    }
    Ok((endian, symtab, partition))
}
