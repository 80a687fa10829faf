//! # Error Types
//!
//! Error handling for symbol and string table decoding.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for decoding operations
///
/// Each variant corresponds to a specific fault found while turning raw
/// `LC_SYMTAB` / shared cache bytes into symbols.
///
/// ## Error Categories
///
/// 1. **String errors**: TruncatedString, InvalidStringIndex
/// 2. **Structural errors**: RecordBufferSizeMismatch, OutOfBounds, Malformed
/// 3. **I/O errors**: Io (reading byte ranges from a file)
///
/// A cache that does not provide the requested word size is not an error;
/// those lookups return `None`.
#[derive(Error, Debug)]
pub enum MachsymError
{
    /// A string starting at `offset` runs to the end of the buffer without a
    /// NUL terminator.
    ///
    /// Entries yielded before this one are still valid.
    #[error("Truncated string at offset 0x{offset:x}: no terminator before end of table")]
    TruncatedString
    {
        /// Byte offset of the first character of the unterminated string
        offset: usize,
    },

    /// The symbol record buffer length is not `count * record size`
    ///
    /// This is fatal for the table being constructed. Decoding a prefix would
    /// pair the wrong names with the wrong records, so the whole table must be
    /// treated as unusable.
    #[error("Symbol record buffer size mismatch: expected {expected} bytes, found {actual}")]
    RecordBufferSizeMismatch
    {
        /// `count * record size`
        expected: usize,
        /// Length of the buffer actually supplied
        actual: usize,
    },

    /// A record's `n_strx` points outside the paired string table
    ///
    /// Reported for the single symbol being materialized; iteration over the
    /// remaining records continues.
    #[error("Invalid string index 0x{index:x} (string table is {size} bytes)")]
    InvalidStringIndex
    {
        /// The offending `n_strx`
        index: u32,
        /// Size of the string table in bytes
        size: usize,
    },

    /// A byte range requested from a source lies outside it
    #[error("Range 0x{offset:x}+0x{length:x} is out of bounds (source is {size} bytes)")]
    OutOfBounds
    {
        /// Start of the requested range
        offset: u64,
        /// Length of the requested range
        length: u64,
        /// Total size of the source
        size: u64,
    },

    /// Header or load command data could not be understood
    ///
    /// Examples:
    /// - Bad Mach-O magic
    /// - Load commands that run past `sizeofcmds`
    /// - A shared cache magic without the `dyld_v1` prefix
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// I/O error while reading a byte range
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, MachsymError>`
///
/// ```rust
/// use machsym_core::error::MachsymResult;
/// fn foo() -> MachsymResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type MachsymResult<T> = std::result::Result<T, MachsymError>;

impl From<object::Error> for MachsymError
{
    fn from(err: object::Error) -> Self
    {
        MachsymError::Malformed(err.to_string())
    }
}
