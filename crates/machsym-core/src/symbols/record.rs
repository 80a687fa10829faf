//! Fixed-width symbol records (`nlist` / `nlist_64`).
//!
//! The two layouts only differ in the width of `n_value`:
//!
//! ```text
//! offset  nlist        nlist_64
//! 0       n_strx  u32  n_strx  u32
//! 4       n_type  u8   n_type  u8
//! 5       n_sect  u8   n_sect  u8
//! 6       n_desc  i16  n_desc  u16
//! 8       n_value u32  n_value u64
//! size    12           16
//! ```
//!
//! A [`RecordBuffer`] takes ownership of freshly read bytes, byte-swaps them
//! once if they were written in the other byte order, and from then on is a
//! read-only, fixed-stride view.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use object::Endianness;

use crate::error::{MachsymError, MachsymResult};
use crate::types::{SymbolDescriptor, SymbolKind};

/// Byte order of the machine we're running on.
pub fn host_endian() -> Endianness
{
    if cfg!(target_endian = "big") {
        Endianness::Big
    } else {
        Endianness::Little
    }
}

/// One decoded symbol record. `value` is widened to 64 bits for both layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolRecord
{
    /// Offset of the name in the paired string table (`n_strx`).
    pub string_index: u32,
    /// `n_type`
    pub kind: SymbolKind,
    /// `n_sect`; 0 is `NO_SECT`.
    pub section_number: u8,
    /// `n_desc`
    pub descriptor: SymbolDescriptor,
    /// `n_value`
    pub value: u64,
}

/// A record layout.
///
/// Implemented by [`Nlist32`] and [`Nlist64`]; generic code uses it to pick
/// the stride, the swap pattern and the width of `n_value`.
pub trait Nlist: fmt::Debug + Clone + Copy + Send + Sync + 'static
{
    /// Size of one record in bytes.
    const SIZE: usize;
    /// Size of `n_value` in bytes.
    const VALUE_SIZE: usize;
    /// Short name used in logs.
    const NAME: &'static str;

    /// Reverse every multi-byte field of one record.
    fn swap_in_place(record: &mut [u8])
    {
        record[0..4].reverse();
        record[6..8].reverse();
        record[8..8 + Self::VALUE_SIZE].reverse();
    }

    /// Decode one host-order record.
    fn read(record: &[u8]) -> SymbolRecord
    {
        let value = if Self::VALUE_SIZE == 8 {
            u64::from_ne_bytes(array_at(record, 8))
        } else {
            u64::from(u32::from_ne_bytes(array_at(record, 8)))
        };
        SymbolRecord {
            string_index: u32::from_ne_bytes(array_at(record, 0)),
            kind: SymbolKind::new(record[4]),
            section_number: record[5],
            descriptor: SymbolDescriptor::new(u16::from_ne_bytes(array_at(record, 6))),
            value,
        }
    }
}

fn array_at<const N: usize>(bytes: &[u8], at: usize) -> [u8; N]
{
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

/// 32-bit `struct nlist`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nlist32;

impl Nlist for Nlist32
{
    const SIZE: usize = 12;
    const VALUE_SIZE: usize = 4;
    const NAME: &'static str = "nlist";
}

/// 64-bit `struct nlist_64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nlist64;

impl Nlist for Nlist64
{
    const SIZE: usize = 16;
    const VALUE_SIZE: usize = 8;
    const NAME: &'static str = "nlist_64";
}

/// Decoded array of records of layout `N`.
#[derive(Clone)]
pub struct RecordBuffer<N: Nlist>
{
    data: Arc<[u8]>,
    count: usize,
    _layout: PhantomData<N>,
}

impl<N: Nlist> RecordBuffer<N>
{
    /// Take ownership of `bytes` holding `count` records written in `endian`.
    ///
    /// If `endian` is not the host's, every record is swapped in place here,
    /// before the buffer becomes visible to anyone.
    ///
    /// # Errors
    ///
    /// [`MachsymError::RecordBufferSizeMismatch`] if `bytes.len()` is not
    /// exactly `count * N::SIZE`.
    pub fn new(mut bytes: Vec<u8>, count: usize, endian: Endianness) -> MachsymResult<Self>
    {
        let expected = count.checked_mul(N::SIZE).ok_or(MachsymError::RecordBufferSizeMismatch {
            expected: usize::MAX,
            actual: bytes.len(),
        })?;
        if bytes.len() != expected {
            return Err(MachsymError::RecordBufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        if endian != host_endian() {
            tracing::debug!(count, layout = N::NAME, "byte-swapping foreign-endian symbol records");
            for record in bytes.chunks_exact_mut(N::SIZE) {
                N::swap_in_place(record);
            }
        }

        Ok(Self {
            data: bytes.into(),
            count,
            _layout: PhantomData,
        })
    }

    /// An empty buffer.
    pub fn empty() -> Self
    {
        Self {
            data: Arc::from(Vec::new()),
            count: 0,
            _layout: PhantomData,
        }
    }

    pub fn len(&self) -> usize
    {
        self.count
    }

    pub fn is_empty(&self) -> bool
    {
        self.count == 0
    }

    /// Record `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<SymbolRecord>
    {
        if index >= self.count {
            return None;
        }
        let start = index * N::SIZE;
        Some(N::read(&self.data[start..start + N::SIZE]))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = SymbolRecord> + '_
    {
        self.data.chunks_exact(N::SIZE).map(N::read)
    }

    /// Host-order bytes backing the view.
    pub fn as_bytes(&self) -> &[u8]
    {
        &self.data
    }
}

impl<N: Nlist> fmt::Debug for RecordBuffer<N>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("RecordBuffer")
            .field("layout", &N::NAME)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn encode64_le(strx: u32, n_type: u8, n_sect: u8, desc: u16, value: u64) -> Vec<u8>
    {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&strx.to_le_bytes());
        out.push(n_type);
        out.push(n_sect);
        out.extend_from_slice(&desc.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
        out
    }

    fn encode32_be(strx: u32, n_type: u8, n_sect: u8, desc: u16, value: u32) -> Vec<u8>
    {
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&strx.to_be_bytes());
        out.push(n_type);
        out.push(n_sect);
        out.extend_from_slice(&desc.to_be_bytes());
        out.extend_from_slice(&value.to_be_bytes());
        out
    }

    #[test]
    fn test_decode_nlist64()
    {
        let bytes = encode64_le(1, 0x0f, 1, 0x0080, 0x1_0000_3f00);
        let buffer = RecordBuffer::<Nlist64>::new(bytes, 1, Endianness::Little).unwrap();
        let record = buffer.get(0).unwrap();
        assert_eq!(record.string_index, 1);
        assert_eq!(record.kind.raw(), 0x0f);
        assert_eq!(record.section_number, 1);
        assert_eq!(record.descriptor.raw(), 0x0080);
        assert_eq!(record.value, 0x1_0000_3f00);
        assert!(buffer.get(1).is_none());
    }

    #[test]
    fn test_decode_big_endian_nlist32()
    {
        let mut bytes = encode32_be(4, 0x0e, 2, 0x0100, 0x2000);
        bytes.extend(encode32_be(9, 0x01, 0, 0xfe00, 0));
        let buffer = RecordBuffer::<Nlist32>::new(bytes, 2, Endianness::Big).unwrap();
        let records: Vec<_> = buffer.iter().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].string_index, 4);
        assert_eq!(records[0].value, 0x2000);
        assert_eq!(records[0].descriptor.raw(), 0x0100);
        assert_eq!(records[1].descriptor.raw(), 0xfe00);
    }

    #[test]
    fn test_size_mismatch()
    {
        let bytes = vec![0u8; 17];
        match RecordBuffer::<Nlist64>::new(bytes, 1, Endianness::Little) {
            Err(MachsymError::RecordBufferSizeMismatch { expected, actual }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 17);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
        assert!(RecordBuffer::<Nlist32>::new(vec![0u8; 12], 2, Endianness::Little).is_err());
    }

    #[test]
    fn test_empty_buffer()
    {
        let buffer = RecordBuffer::<Nlist32>::new(Vec::new(), 0, Endianness::Big).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
        assert!(RecordBuffer::<Nlist64>::empty().get(0).is_none());
    }
}
