//! Local symbols of a dyld shared cache.
//!
//! When images are linked into the shared cache their private symbols are
//! stripped from each image's own `LC_SYMTAB` and collected in one region of
//! the cache file (or of the `.symbols` sub-cache on newer systems). The
//! region starts with a `dyld_cache_local_symbols_info`:
//!
//! ```text
//! offset  field
//! 0x00    nlistOffset    u32   relative to the region start
//! 0x04    nlistCount     u32
//! 0x08    stringsOffset  u32   relative to the region start
//! 0x0c    stringsSize    u32
//! 0x10    entriesOffset  u32
//! 0x14    entriesCount   u32
//! ```
//!
//! The records are `nlist_64` in a 64-bit cache and `nlist` otherwise; only
//! the cache header tells which, so both readers take the header.

use object::{Endian, Endianness};

use crate::error::{MachsymError, MachsymResult};
use crate::source::ByteSource;
use crate::strings::StringTable;
use crate::symbols::record::{Nlist, Nlist32, Nlist64, RecordBuffer};
use crate::symbols::table::{SymbolTable, SymbolTable32, SymbolTable64, Symbols};

/// Every cache magic starts with this.
pub const CACHE_MAGIC_PREFIX: &[u8] = b"dyld_v1";

const MAGIC_SIZE: usize = 16;
const MAPPING_OFFSET_FIELD: usize = 0x10;
const LOCAL_SYMBOLS_OFFSET_FIELD: usize = 0x48;
const LOCAL_SYMBOLS_SIZE_FIELD: usize = 0x50;

/// Bytes of header needed to reach the end of `localSymbolsSize`.
pub const CACHE_HEADER_SIZE: usize = 0x58;

/// Size of `dyld_cache_local_symbols_info`.
pub const LOCAL_SYMBOLS_INFO_SIZE: usize = 24;

fn u32_at(bytes: &[u8], at: usize, endian: Endianness) -> u32
{
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    if endian.is_big_endian() {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    }
}

fn u64_at(bytes: &[u8], at: usize, endian: Endianness) -> u64
{
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    if endian.is_big_endian() {
        u64::from_be_bytes(raw)
    } else {
        u64::from_le_bytes(raw)
    }
}

/// The parts of `dyld_cache_header` needed to find local symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeader
{
    architecture: String,
    endian: Endianness,
    is_64_bit: bool,
    mapping_offset: u32,
    local_symbols_offset: u64,
    local_symbols_size: u64,
}

impl CacheHeader
{
    /// Parse the start of a cache file.
    ///
    /// Headers older than the local symbols fields (detected by
    /// `mappingOffset`, which doubles as the header size) parse with an empty
    /// local symbols region.
    ///
    /// # Errors
    ///
    /// [`MachsymError::Malformed`] when `bytes` is shorter than
    /// [`CACHE_HEADER_SIZE`] or the magic is not `dyld_v1`.
    pub fn parse(bytes: &[u8]) -> MachsymResult<Self>
    {
        if bytes.len() < CACHE_HEADER_SIZE {
            return Err(MachsymError::Malformed(format!(
                "shared cache header needs {CACHE_HEADER_SIZE} bytes, found {}",
                bytes.len()
            )));
        }
        if !bytes.starts_with(CACHE_MAGIC_PREFIX) {
            return Err(MachsymError::Malformed("not a shared cache: missing dyld_v1 magic".to_string()));
        }

        let architecture = String::from_utf8_lossy(&bytes[CACHE_MAGIC_PREFIX.len()..MAGIC_SIZE])
            .trim_matches(|c: char| c == ' ' || c == '\0')
            .to_string();
        let endian = if architecture.starts_with("ppc") {
            Endianness::Big
        } else {
            Endianness::Little
        };
        let is_64_bit = word_size_is_64(&architecture);

        let mapping_offset = u32_at(bytes, MAPPING_OFFSET_FIELD, endian);
        let (local_symbols_offset, local_symbols_size) = if mapping_offset as usize >= CACHE_HEADER_SIZE {
            (
                u64_at(bytes, LOCAL_SYMBOLS_OFFSET_FIELD, endian),
                u64_at(bytes, LOCAL_SYMBOLS_SIZE_FIELD, endian),
            )
        } else {
            tracing::debug!(mapping_offset, "cache header predates local symbols");
            (0, 0)
        };

        tracing::debug!(
            %architecture,
            is_64_bit,
            local_symbols_offset,
            local_symbols_size,
            "parsed shared cache header"
        );
        Ok(Self {
            architecture,
            endian,
            is_64_bit,
            mapping_offset,
            local_symbols_offset,
            local_symbols_size,
        })
    }

    /// Read and parse the header at the start of `source`.
    ///
    /// # Errors
    ///
    /// Propagates read errors and those of [`CacheHeader::parse`].
    pub fn read<S>(source: &S) -> MachsymResult<Self>
    where
        S: ByteSource + ?Sized,
    {
        let length = source.size()?.min(CACHE_HEADER_SIZE as u64);
        Self::parse(&source.read_range(0, length)?)
    }

    /// Architecture name from the magic, e.g. `arm64e`.
    pub fn architecture(&self) -> &str
    {
        &self.architecture
    }

    pub fn endian(&self) -> Endianness
    {
        self.endian
    }

    /// Whether the cache's processor word size is 64 bits.
    pub fn is_64_bit(&self) -> bool
    {
        self.is_64_bit
    }

    pub fn mapping_offset(&self) -> u32
    {
        self.mapping_offset
    }

    /// File offset of the local symbols region; 0 if there is none.
    pub fn local_symbols_offset(&self) -> u64
    {
        self.local_symbols_offset
    }

    pub fn local_symbols_size(&self) -> u64
    {
        self.local_symbols_size
    }

    pub fn has_local_symbols(&self) -> bool
    {
        self.local_symbols_offset != 0 && self.local_symbols_size >= LOCAL_SYMBOLS_INFO_SIZE as u64
    }

    /// Read the local symbols descriptor, if this cache has one.
    ///
    /// # Errors
    ///
    /// Propagates read errors from `source`.
    pub fn local_symbols_info<S>(&self, source: &S) -> MachsymResult<Option<LocalSymbolsInfo>>
    where
        S: ByteSource + ?Sized,
    {
        if !self.has_local_symbols() {
            return Ok(None);
        }
        let bytes = source.read_range(self.local_symbols_offset, LOCAL_SYMBOLS_INFO_SIZE as u64)?;
        LocalSymbolsInfo::parse(&bytes, self.endian).map(Some)
    }
}

/// `i386`, `ppc`, `armv6`, `armv7*` and `arm64_32` are 32-bit; everything else
/// is treated as 64-bit.
fn word_size_is_64(architecture: &str) -> bool
{
    !(architecture == "i386"
        || architecture == "ppc"
        || architecture == "arm64_32"
        || architecture.starts_with("armv"))
}

/// `dyld_cache_local_symbols_info`.
///
/// Offsets are relative to the start of the local symbols region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalSymbolsInfo
{
    pub nlist_offset: u32,
    pub nlist_count: u32,
    pub strings_offset: u32,
    pub strings_size: u32,
    pub entries_offset: u32,
    pub entries_count: u32,
}

impl LocalSymbolsInfo
{
    /// Decode the descriptor from its first 24 bytes.
    ///
    /// # Errors
    ///
    /// [`MachsymError::Malformed`] when fewer than 24 bytes are given.
    pub fn parse(bytes: &[u8], endian: Endianness) -> MachsymResult<Self>
    {
        if bytes.len() < LOCAL_SYMBOLS_INFO_SIZE {
            return Err(MachsymError::Malformed(format!(
                "local symbols info needs {LOCAL_SYMBOLS_INFO_SIZE} bytes, found {}",
                bytes.len()
            )));
        }
        Ok(Self {
            nlist_offset: u32_at(bytes, 0x00, endian),
            nlist_count: u32_at(bytes, 0x04, endian),
            strings_offset: u32_at(bytes, 0x08, endian),
            strings_size: u32_at(bytes, 0x0c, endian),
            entries_offset: u32_at(bytes, 0x10, endian),
            entries_count: u32_at(bytes, 0x14, endian),
        })
    }

    /// The region as a 64-bit table; `None` in a 32-bit cache.
    ///
    /// # Errors
    ///
    /// Read errors, or a record buffer that does not hold `nlist_count`
    /// records.
    pub fn symbols64<S>(&self, source: &S, cache: &CacheHeader) -> MachsymResult<Option<SymbolTable64>>
    where
        S: ByteSource + ?Sized,
    {
        if !cache.is_64_bit() {
            return Ok(None);
        }
        self.load(source, cache).map(Some)
    }

    /// The region as a 32-bit table; `None` in a 64-bit cache.
    ///
    /// # Errors
    ///
    /// Same as [`LocalSymbolsInfo::symbols64`].
    pub fn symbols32<S>(&self, source: &S, cache: &CacheHeader) -> MachsymResult<Option<SymbolTable32>>
    where
        S: ByteSource + ?Sized,
    {
        if cache.is_64_bit() {
            return Ok(None);
        }
        self.load(source, cache).map(Some)
    }

    /// The region at whichever width the cache uses.
    ///
    /// # Errors
    ///
    /// Same as [`LocalSymbolsInfo::symbols64`].
    pub fn symbols<S>(&self, source: &S, cache: &CacheHeader) -> MachsymResult<Symbols>
    where
        S: ByteSource + ?Sized,
    {
        if cache.is_64_bit() {
            self.load::<Nlist64, S>(source, cache).map(Symbols::from)
        } else {
            self.load::<Nlist32, S>(source, cache).map(Symbols::from)
        }
    }

    fn load<N, S>(&self, source: &S, cache: &CacheHeader) -> MachsymResult<SymbolTable<N>>
    where
        N: Nlist,
        S: ByteSource + ?Sized,
    {
        let base = cache.local_symbols_offset();
        let strings_at = region_offset(base, self.strings_offset)?;
        let records_at = region_offset(base, self.nlist_offset)?;
        let count = self.nlist_count as usize;

        let strings = StringTable::from_source(source, strings_at, u64::from(self.strings_size))?;
        let record_bytes = source.read_range(records_at, (count * N::SIZE) as u64)?;
        let records = RecordBuffer::<N>::new(record_bytes, count, cache.endian())?;

        tracing::debug!(layout = N::NAME, count, "loaded shared cache local symbols");
        Ok(SymbolTable::new(strings, records))
    }
}

fn region_offset(base: u64, offset: u32) -> MachsymResult<u64>
{
    base.checked_add(u64::from(offset)).ok_or(MachsymError::OutOfBounds {
        offset: base,
        length: u64::from(offset),
        size: u64::MAX,
    })
}
