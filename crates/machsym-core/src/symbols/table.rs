//! Symbol tables: string table + record array.

use std::fmt;

use object::Endianness;

use super::record::{Nlist, Nlist32, Nlist64, RecordBuffer, SymbolRecord};
use crate::error::MachsymResult;
use crate::strings::StringTable;

/// A resolved symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol
{
    /// Name decoded from the string table.
    pub name: String,
    /// Address of the symbol; always the record's `n_value`.
    pub offset: u64,
    /// The record the symbol was built from.
    pub record: SymbolRecord,
}

impl Symbol
{
    /// Section number of the underlying record.
    pub fn section_number(&self) -> u8
    {
        self.record.section_number
    }

    pub fn is_external(&self) -> bool
    {
        self.record.kind.is_external()
    }
}

impl fmt::Display for Symbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x} {} {}", self.offset, self.record.kind, self.name)
    }
}

/// `count` records of layout `N` paired with their string table.
#[derive(Debug, Clone)]
pub struct SymbolTable<N: Nlist>
{
    strings: StringTable,
    records: RecordBuffer<N>,
}

/// 32-bit symbol table.
pub type SymbolTable32 = SymbolTable<Nlist32>;
/// 64-bit symbol table.
pub type SymbolTable64 = SymbolTable<Nlist64>;

impl<N: Nlist> SymbolTable<N>
{
    pub fn new(strings: StringTable, records: RecordBuffer<N>) -> Self
    {
        tracing::debug!(
            layout = N::NAME,
            count = records.len(),
            string_bytes = strings.size(),
            "built symbol table"
        );
        Self { strings, records }
    }

    /// Build from raw byte ranges as supplied by a load-command reader.
    ///
    /// `string_offset` only records where the strings came from.
    ///
    /// # Errors
    ///
    /// Fails with `RecordBufferSizeMismatch` when `record_bytes` does not hold
    /// exactly `count` records.
    pub fn from_parts(
        string_bytes: Vec<u8>,
        string_offset: u64,
        record_bytes: Vec<u8>,
        count: usize,
        endian: Endianness,
    ) -> MachsymResult<Self>
    {
        let records = RecordBuffer::new(record_bytes, count, endian)?;
        Ok(Self::new(StringTable::new(string_bytes, string_offset), records))
    }

    /// Number of records.
    pub fn count(&self) -> usize
    {
        self.records.len()
    }

    pub fn strings(&self) -> &StringTable
    {
        &self.strings
    }

    pub fn records(&self) -> &RecordBuffer<N>
    {
        &self.records
    }

    /// Whether iteration yields nothing: no records, or no strings to name
    /// them with.
    pub fn is_empty(&self) -> bool
    {
        self.records.is_empty() || self.strings.is_empty()
    }

    /// Materialize record `index`.
    ///
    /// Returns `None` past the end (or when the table is empty) and
    /// `Some(Err(InvalidStringIndex))` when the record's name lies outside
    /// the string table.
    pub fn symbol(&self, index: usize) -> Option<MachsymResult<Symbol>>
    {
        if self.is_empty() {
            return None;
        }
        let record = self.records.get(index)?;
        Some(self.strings.string_at(record.string_index).map(|name| Symbol {
            name,
            offset: record.value,
            record,
        }))
    }

    /// Iterate over every record in table order.
    ///
    /// A record whose name cannot be decoded yields an `Err` and iteration
    /// moves on to the next record.
    pub fn iter(&self) -> SymbolIter<'_, N>
    {
        SymbolIter {
            table: self,
            next_index: 0,
        }
    }
}

impl<'a, N: Nlist> IntoIterator for &'a SymbolTable<N>
{
    type Item = MachsymResult<Symbol>;
    type IntoIter = SymbolIter<'a, N>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.iter()
    }
}

/// Iterator over a [`SymbolTable`].
#[derive(Debug, Clone)]
pub struct SymbolIter<'a, N: Nlist>
{
    table: &'a SymbolTable<N>,
    next_index: usize,
}

impl<N: Nlist> Iterator for SymbolIter<'_, N>
{
    type Item = MachsymResult<Symbol>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let item = self.table.symbol(self.next_index)?;
        self.next_index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>)
    {
        let remaining = if self.table.is_empty() {
            0
        } else {
            self.table.count().saturating_sub(self.next_index)
        };
        (remaining, Some(remaining))
    }
}

impl<N: Nlist> ExactSizeIterator for SymbolIter<'_, N> {}

/// A symbol table of either width.
#[derive(Debug, Clone)]
pub enum Symbols
{
    ThirtyTwo(SymbolTable32),
    SixtyFour(SymbolTable64),
}

impl Symbols
{
    pub fn is_64_bit(&self) -> bool
    {
        matches!(self, Symbols::SixtyFour(_))
    }

    pub fn count(&self) -> usize
    {
        match self {
            Symbols::ThirtyTwo(table) => table.count(),
            Symbols::SixtyFour(table) => table.count(),
        }
    }

    pub fn is_empty(&self) -> bool
    {
        match self {
            Symbols::ThirtyTwo(table) => table.is_empty(),
            Symbols::SixtyFour(table) => table.is_empty(),
        }
    }

    pub fn strings(&self) -> &StringTable
    {
        match self {
            Symbols::ThirtyTwo(table) => table.strings(),
            Symbols::SixtyFour(table) => table.strings(),
        }
    }

    pub fn symbol(&self, index: usize) -> Option<MachsymResult<Symbol>>
    {
        match self {
            Symbols::ThirtyTwo(table) => table.symbol(index),
            Symbols::SixtyFour(table) => table.symbol(index),
        }
    }

    pub fn iter(&self) -> SymbolsIter<'_>
    {
        match self {
            Symbols::ThirtyTwo(table) => SymbolsIter::ThirtyTwo(table.iter()),
            Symbols::SixtyFour(table) => SymbolsIter::SixtyFour(table.iter()),
        }
    }
}

impl From<SymbolTable32> for Symbols
{
    fn from(table: SymbolTable32) -> Self
    {
        Symbols::ThirtyTwo(table)
    }
}

impl From<SymbolTable64> for Symbols
{
    fn from(table: SymbolTable64) -> Self
    {
        Symbols::SixtyFour(table)
    }
}

impl<'a> IntoIterator for &'a Symbols
{
    type Item = MachsymResult<Symbol>;
    type IntoIter = SymbolsIter<'a>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.iter()
    }
}

/// Iterator over [`Symbols`] of either width.
#[derive(Debug, Clone)]
pub enum SymbolsIter<'a>
{
    ThirtyTwo(SymbolIter<'a, Nlist32>),
    SixtyFour(SymbolIter<'a, Nlist64>),
}

impl Iterator for SymbolsIter<'_>
{
    type Item = MachsymResult<Symbol>;

    fn next(&mut self) -> Option<Self::Item>
    {
        match self {
            SymbolsIter::ThirtyTwo(iter) => iter.next(),
            SymbolsIter::SixtyFour(iter) => iter.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>)
    {
        match self {
            SymbolsIter::ThirtyTwo(iter) => iter.size_hint(),
            SymbolsIter::SixtyFour(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for SymbolsIter<'_> {}
