//! Random-access byte sources.
//!
//! String and symbol tables are read once, at construction, from whatever
//! holds the image: an in-memory buffer, a memory map handed in as a slice, or
//! an open file. Nothing in the decoding pipeline keeps a handle afterwards.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::error::{MachsymError, MachsymResult};

/// Anything that can hand out a copy of `length` bytes starting at `offset`.
pub trait ByteSource
{
    /// Total size of the source in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be queried (for files, a metadata
    /// failure).
    fn size(&self) -> MachsymResult<u64>;

    /// Read exactly `length` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MachsymError::OutOfBounds`] when the range does not fit in
    /// the source, or [`MachsymError::Io`] when the underlying read fails.
    fn read_range(&self, offset: u64, length: u64) -> MachsymResult<Vec<u8>>;
}

fn check_range(offset: u64, length: u64, size: u64) -> MachsymResult<()>
{
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(MachsymError::OutOfBounds { offset, length, size }),
    }
}

impl ByteSource for [u8]
{
    fn size(&self) -> MachsymResult<u64>
    {
        Ok(self.len() as u64)
    }

    fn read_range(&self, offset: u64, length: u64) -> MachsymResult<Vec<u8>>
    {
        check_range(offset, length, self.len() as u64)?;
        // Both fit in the slice, so they fit in usize.
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX));
        Ok(self[start..end].to_vec())
    }
}

impl ByteSource for Vec<u8>
{
    fn size(&self) -> MachsymResult<u64>
    {
        self.as_slice().size()
    }

    fn read_range(&self, offset: u64, length: u64) -> MachsymResult<Vec<u8>>
    {
        self.as_slice().read_range(offset, length)
    }
}

impl ByteSource for Arc<[u8]>
{
    fn size(&self) -> MachsymResult<u64>
    {
        (**self).size()
    }

    fn read_range(&self, offset: u64, length: u64) -> MachsymResult<Vec<u8>>
    {
        (**self).read_range(offset, length)
    }
}

impl ByteSource for File
{
    fn size(&self) -> MachsymResult<u64>
    {
        Ok(self.metadata()?.len())
    }

    fn read_range(&self, offset: u64, length: u64) -> MachsymResult<Vec<u8>>
    {
        check_range(offset, length, self.size()?)?;
        let length = usize::try_from(length).map_err(|_| MachsymError::OutOfBounds {
            offset,
            length,
            size: usize::MAX as u64,
        })?;

        // `Read` and `Seek` are implemented for `&File`, so no exclusive
        // borrow is needed.
        let mut handle = self;
        handle.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; length];
        handle.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
