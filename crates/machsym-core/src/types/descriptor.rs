//! Decoding of the `n_desc` halfword of a symbol record.
//!
//! The same sixteen bits carry three different things depending on the
//! symbol: a reference type in the low three bits, flag bits, and (for
//! undefined symbols in two-level namespace images) a library ordinal in the
//! high byte. All three views are offered; which one is meaningful is up to
//! the caller.

use std::fmt;
use std::num::NonZeroU8;

use bitflags::bitflags;

/// Mask for the reference type bits.
pub const REFERENCE_TYPE: u16 = 0x7;

pub const SELF_LIBRARY_ORDINAL: u8 = 0x0;
pub const MAX_LIBRARY_ORDINAL: u8 = 0xfd;
pub const DYNAMIC_LOOKUP_ORDINAL: u8 = 0xfe;
pub const EXECUTABLE_ORDINAL: u8 = 0xff;

bitflags! {
    /// Flag bits of `n_desc`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DescriptorFlags: u16 {
        /// Referenced by a dynamically bound object; must not be stripped.
        const REFERENCED_DYNAMICALLY = 0x0010;
        /// Never dead strip (only in `MH_OBJECT` files).
        const NO_DEAD_STRIP = 0x0020;
        /// Discarded by the dynamic linker; shares its bit with `NO_DEAD_STRIP`.
        const DISCARDED = 0x0020;
        /// Undefined symbol allowed to be missing.
        const WEAK_REF = 0x0040;
        /// Weak definition in a coalesced section.
        const WEAK_DEF = 0x0080;
        /// Reference to a weak symbol; shares its bit with `WEAK_DEF`.
        const REF_TO_WEAK = 0x0080;
        /// Thumb function definition (ARM).
        const ARM_THUMB_DEF = 0x0008;
        /// Resolver function (only in `MH_OBJECT` files).
        const SYMBOL_RESOLVER = 0x0100;
        /// Pinned to the previous content.
        const ALT_ENTRY = 0x0200;
        /// Rarely executed.
        const COLD_FUNC = 0x0400;
    }
}

impl fmt::Display for DescriptorFlags
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{name}")?;
            first = false;
        }
        Ok(())
    }
}

/// Reference type of an undefined or defined symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType
{
    UndefinedNonLazy,
    UndefinedLazy,
    Defined,
    PrivateDefined,
    PrivateUndefinedNonLazy,
    PrivateUndefinedLazy,
    Unknown(u8),
}

impl From<u16> for ReferenceType
{
    fn from(desc: u16) -> Self
    {
        match desc & REFERENCE_TYPE {
            0 => ReferenceType::UndefinedNonLazy,
            1 => ReferenceType::UndefinedLazy,
            2 => ReferenceType::Defined,
            3 => ReferenceType::PrivateDefined,
            4 => ReferenceType::PrivateUndefinedNonLazy,
            5 => ReferenceType::PrivateUndefinedLazy,
            #[allow(clippy::cast_possible_truncation)]
            other => ReferenceType::Unknown(other as u8),
        }
    }
}

/// Which image an undefined symbol is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryOrdinal
{
    /// The image itself (`SELF_LIBRARY_ORDINAL`).
    SelfImage,
    /// `MAX_LIBRARY_ORDINAL`.
    Max,
    /// Looked up with flat namespace semantics.
    DynamicLookup,
    /// The main executable, for plugins.
    Executable,
    /// 1-based index into the image's dylib load commands.
    Ordinal(NonZeroU8),
}

impl From<u8> for LibraryOrdinal
{
    fn from(raw: u8) -> Self
    {
        match raw {
            SELF_LIBRARY_ORDINAL => LibraryOrdinal::SelfImage,
            MAX_LIBRARY_ORDINAL => LibraryOrdinal::Max,
            DYNAMIC_LOOKUP_ORDINAL => LibraryOrdinal::DynamicLookup,
            EXECUTABLE_ORDINAL => LibraryOrdinal::Executable,
            n => NonZeroU8::new(n).map_or(LibraryOrdinal::SelfImage, LibraryOrdinal::Ordinal),
        }
    }
}

impl LibraryOrdinal
{
    pub fn raw(self) -> u8
    {
        match self {
            LibraryOrdinal::SelfImage => SELF_LIBRARY_ORDINAL,
            LibraryOrdinal::Max => MAX_LIBRARY_ORDINAL,
            LibraryOrdinal::DynamicLookup => DYNAMIC_LOOKUP_ORDINAL,
            LibraryOrdinal::Executable => EXECUTABLE_ORDINAL,
            LibraryOrdinal::Ordinal(n) => n.get(),
        }
    }
}

impl fmt::Display for LibraryOrdinal
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            LibraryOrdinal::SelfImage => write!(f, "SELF_LIBRARY_ORDINAL"),
            LibraryOrdinal::Max => write!(f, "MAX_LIBRARY_ORDINAL"),
            LibraryOrdinal::DynamicLookup => write!(f, "DYNAMIC_LOOKUP_ORDINAL"),
            LibraryOrdinal::Executable => write!(f, "EXECUTABLE_ORDINAL"),
            LibraryOrdinal::Ordinal(n) => write!(f, "#{n}"),
        }
    }
}

/// The raw `n_desc` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolDescriptor(u16);

impl SymbolDescriptor
{
    pub const fn new(raw: u16) -> Self
    {
        SymbolDescriptor(raw)
    }

    pub const fn raw(self) -> u16
    {
        self.0
    }

    /// The value as the signed `short` of the 32-bit `nlist` layout.
    pub const fn as_i16(self) -> i16
    {
        i16::from_ne_bytes(self.0.to_ne_bytes())
    }

    pub fn flags(self) -> DescriptorFlags
    {
        DescriptorFlags::from_bits_truncate(self.0)
    }

    pub fn contains(self, flags: DescriptorFlags) -> bool
    {
        self.flags().contains(flags)
    }

    pub fn reference_type(self) -> ReferenceType
    {
        ReferenceType::from(self.0)
    }

    /// `GET_LIBRARY_ORDINAL`: the high byte.
    #[allow(clippy::cast_possible_truncation)]
    pub fn library_ordinal(self) -> LibraryOrdinal
    {
        LibraryOrdinal::from((self.0 >> 8) as u8)
    }
}

impl From<u16> for SymbolDescriptor
{
    fn from(raw: u16) -> Self
    {
        SymbolDescriptor(raw)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_library_ordinals()
    {
        assert_eq!(SymbolDescriptor::new(0x0000).library_ordinal(), LibraryOrdinal::SelfImage);
        assert_eq!(SymbolDescriptor::new(0xfd00).library_ordinal(), LibraryOrdinal::Max);
        assert_eq!(SymbolDescriptor::new(0xfe00).library_ordinal(), LibraryOrdinal::DynamicLookup);
        assert_eq!(SymbolDescriptor::new(0xff00).library_ordinal(), LibraryOrdinal::Executable);
        assert_eq!(
            SymbolDescriptor::new(0x0301).library_ordinal(),
            LibraryOrdinal::Ordinal(NonZeroU8::new(3).unwrap())
        );
        assert_eq!(LibraryOrdinal::from(7).raw(), 7);
        assert_eq!(LibraryOrdinal::Executable.to_string(), "EXECUTABLE_ORDINAL");
    }

    #[test]
    fn test_reference_types()
    {
        assert_eq!(SymbolDescriptor::new(0).reference_type(), ReferenceType::UndefinedNonLazy);
        assert_eq!(SymbolDescriptor::new(1).reference_type(), ReferenceType::UndefinedLazy);
        assert_eq!(SymbolDescriptor::new(0x0102).reference_type(), ReferenceType::Defined);
        assert_eq!(SymbolDescriptor::new(5).reference_type(), ReferenceType::PrivateUndefinedLazy);
        assert_eq!(SymbolDescriptor::new(7).reference_type(), ReferenceType::Unknown(7));
    }

    #[test]
    fn test_flags()
    {
        let desc = SymbolDescriptor::new(0x0080 | 0x0010 | 0x0400);
        assert!(desc.contains(DescriptorFlags::WEAK_DEF));
        assert!(desc.contains(DescriptorFlags::REF_TO_WEAK));
        assert!(desc.contains(DescriptorFlags::REFERENCED_DYNAMICALLY));
        assert!(desc.contains(DescriptorFlags::COLD_FUNC));
        assert!(!desc.contains(DescriptorFlags::ALT_ENTRY));
        assert_eq!(SymbolDescriptor::new(0xffff).as_i16(), -1);
    }
}
