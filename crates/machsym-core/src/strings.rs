//! # String Tables
//!
//! Decoding of NUL-delimited string blobs such as the `LC_SYMTAB` string
//! table or the shared cache's local-symbols strings.
//!
//! A [`StringTable`] owns its bytes and can be walked any number of times:
//! every call to [`StringTable::iter`] starts a new cursor at offset 0.
//! Symbol records do not walk the table, they index into it at arbitrary
//! offsets through [`StringTable::string_at`].
//!
//! ## Usage
//!
//! ```rust
//! use machsym_core::strings::StringTable;
//!
//! let table = StringTable::new(b"foo\0bar\0".to_vec(), 0);
//! let entries: Vec<_> = table.iter().collect::<Result<_, _>>().unwrap();
//! assert_eq!(entries[0].string, "foo");
//! assert_eq!(entries[1].offset, 4);
//! ```

use std::sync::Arc;

use crate::error::{MachsymError, MachsymResult};
use crate::source::ByteSource;

/// A string decoded from a table, together with where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry
{
    /// Decoded text, without the terminator.
    pub string: String,
    /// Offset of the first character within the table.
    pub offset: usize,
}

/// An immutable string table.
///
/// `offset` and `size` record where the bytes were read from in the
/// underlying file; they do not constrain decoding.
#[derive(Debug, Clone)]
pub struct StringTable
{
    data: Arc<[u8]>,
    offset: u64,
    size: u64,
}

impl StringTable
{
    /// Wrap bytes that were already read from `offset`.
    pub fn new(data: impl Into<Arc<[u8]>>, offset: u64) -> Self
    {
        let data = data.into();
        let size = data.len() as u64;
        Self { data, offset, size }
    }

    /// Read `size` bytes at `offset` from `source`.
    ///
    /// # Errors
    ///
    /// Propagates the source's read error.
    pub fn from_source<S>(source: &S, offset: u64, size: u64) -> MachsymResult<Self>
    where
        S: ByteSource + ?Sized,
    {
        let data = source.read_range(offset, size)?;
        tracing::debug!(offset, size, "loaded string table");
        Ok(Self::new(data, offset))
    }

    /// Raw bytes of the table.
    pub fn data(&self) -> &[u8]
    {
        &self.data
    }

    /// File offset the table was read from.
    pub fn offset(&self) -> u64
    {
        self.offset
    }

    /// Size of the table in bytes.
    pub fn size(&self) -> u64
    {
        self.size
    }

    pub fn is_empty(&self) -> bool
    {
        self.data.is_empty()
    }

    /// Start a fresh walk over every string in the table.
    pub fn iter(&self) -> StringIter<'_>
    {
        StringIter {
            data: &self.data,
            cursor: 0,
        }
    }

    /// Decode the NUL-terminated string that starts at byte `index`.
    ///
    /// # Errors
    ///
    /// - [`MachsymError::InvalidStringIndex`] if `index` is not inside the table
    /// - [`MachsymError::TruncatedString`] if no terminator follows it
    pub fn string_at(&self, index: u32) -> MachsymResult<String>
    {
        let start = index as usize;
        if start >= self.data.len() {
            return Err(MachsymError::InvalidStringIndex {
                index,
                size: self.data.len(),
            });
        }
        let (string, _) = read_cstr(&self.data, start)?;
        Ok(string)
    }
}

impl<'a> IntoIterator for &'a StringTable
{
    type Item = MachsymResult<StringEntry>;
    type IntoIter = StringIter<'a>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.iter()
    }
}

/// Read the string at `start`, returning it and the terminator position.
fn read_cstr(data: &[u8], start: usize) -> MachsymResult<(String, usize)>
{
    let rest = &data[start..];
    let len = rest
        .iter()
        .position(|&byte| byte == 0)
        .ok_or(MachsymError::TruncatedString { offset: start })?;
    let string = String::from_utf8_lossy(&rest[..len]).into_owned();
    Ok((string, start + len))
}

/// Cursor over a [`StringTable`].
///
/// Owns its position, so it must not be shared between consumers; ask the
/// table for another one instead.
#[derive(Debug, Clone)]
pub struct StringIter<'a>
{
    data: &'a [u8],
    cursor: usize,
}

impl Iterator for StringIter<'_>
{
    type Item = MachsymResult<StringEntry>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.cursor >= self.data.len() {
            return None;
        }

        let start = self.cursor;
        match read_cstr(self.data, start) {
            Ok((string, terminator)) => {
                self.cursor = terminator + 1;
                Some(Ok(StringEntry { string, offset: start }))
            }
            Err(err) => {
                // Nothing after an unterminated run can be decoded.
                self.cursor = self.data.len();
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for StringIter<'_> {}
