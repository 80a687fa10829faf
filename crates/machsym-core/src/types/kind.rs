//! Decoding of the `n_type` byte of a symbol record.

use std::fmt;

/// Mask for the symbolic-debugging (stab) bits.
pub const N_STAB: u8 = 0xe0;
/// Private external symbol bit.
pub const N_PEXT: u8 = 0x10;
/// Mask for the type bits.
pub const N_TYPE: u8 = 0x0e;
/// External symbol bit.
pub const N_EXT: u8 = 0x01;

/// Undefined, `n_sect == NO_SECT`.
pub const N_UNDF: u8 = 0x0;
/// Absolute, `n_sect == NO_SECT`.
pub const N_ABS: u8 = 0x2;
/// Defined in section number `n_sect`.
pub const N_SECT: u8 = 0xe;
/// Prebound undefined (defined in a dylib).
pub const N_PBUD: u8 = 0xc;
/// Indirect.
pub const N_INDR: u8 = 0xa;

/// The `N_TYPE` field of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType
{
    Undefined,
    Absolute,
    /// Defined within a section; the only kind with a usable address.
    Section,
    Prebound,
    Indirect,
    /// A bit pattern with no assigned meaning.
    Unknown(u8),
}

impl From<u8> for SymbolType
{
    fn from(bits: u8) -> Self
    {
        match bits & N_TYPE {
            N_UNDF => SymbolType::Undefined,
            N_ABS => SymbolType::Absolute,
            N_SECT => SymbolType::Section,
            N_PBUD => SymbolType::Prebound,
            N_INDR => SymbolType::Indirect,
            other => SymbolType::Unknown(other),
        }
    }
}

impl fmt::Display for SymbolType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SymbolType::Undefined => write!(f, "N_UNDF"),
            SymbolType::Absolute => write!(f, "N_ABS"),
            SymbolType::Section => write!(f, "N_SECT"),
            SymbolType::Prebound => write!(f, "N_PBUD"),
            SymbolType::Indirect => write!(f, "N_INDR"),
            SymbolType::Unknown(bits) => write!(f, "0x{bits:x}"),
        }
    }
}

/// The raw `n_type` byte with accessors for each of its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolKind(u8);

impl SymbolKind
{
    pub const fn new(raw: u8) -> Self
    {
        SymbolKind(raw)
    }

    pub const fn raw(self) -> u8
    {
        self.0
    }

    /// Symbolic debugging entry (any `N_STAB` bit set).
    pub const fn is_stab(self) -> bool
    {
        self.0 & N_STAB != 0
    }

    /// The stab type, for debugging entries.
    pub const fn stab(self) -> Option<u8>
    {
        if self.is_stab() {
            Some(self.0)
        } else {
            None
        }
    }

    pub const fn is_private_external(self) -> bool
    {
        self.0 & N_PEXT != 0
    }

    /// Externally visible (`N_EXT`).
    pub const fn is_external(self) -> bool
    {
        self.0 & N_EXT != 0
    }

    /// Type field. Meaningless for stab entries, whose whole byte is the
    /// stab type.
    pub fn symbol_type(self) -> SymbolType
    {
        SymbolType::from(self.0)
    }

    /// Defined in a section and not a debugging entry.
    pub fn is_section_defined(self) -> bool
    {
        !self.is_stab() && self.symbol_type() == SymbolType::Section
    }
}

impl From<u8> for SymbolKind
{
    fn from(raw: u8) -> Self
    {
        SymbolKind(raw)
    }
}

impl fmt::Display for SymbolKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if let Some(stab) = self.stab() {
            return write!(f, "N_STAB(0x{stab:02x})");
        }
        write!(f, "{}", self.symbol_type())?;
        if self.is_private_external() {
            write!(f, "|N_PEXT")?;
        }
        if self.is_external() {
            write!(f, "|N_EXT")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_section_external()
    {
        let kind = SymbolKind::new(N_SECT | N_EXT);
        assert_eq!(kind.symbol_type(), SymbolType::Section);
        assert!(kind.is_external());
        assert!(!kind.is_stab());
        assert!(kind.is_section_defined());
        assert_eq!(kind.to_string(), "N_SECT|N_EXT");
    }

    #[test]
    fn test_stab_is_not_section_defined()
    {
        // N_BNSYM stab; its low bits happen to look like N_SECT.
        let kind = SymbolKind::new(0x2e);
        assert!(kind.is_stab());
        assert_eq!(kind.stab(), Some(0x2e));
        assert!(!kind.is_section_defined());
    }

    #[test]
    fn test_other_types()
    {
        assert_eq!(SymbolKind::new(N_UNDF | N_EXT).symbol_type(), SymbolType::Undefined);
        assert_eq!(SymbolKind::new(N_ABS).symbol_type(), SymbolType::Absolute);
        assert_eq!(SymbolKind::new(N_INDR).symbol_type(), SymbolType::Indirect);
        assert_eq!(SymbolKind::new(N_PBUD).symbol_type(), SymbolType::Prebound);
        assert_eq!(SymbolKind::new(0x04).symbol_type(), SymbolType::Unknown(0x04));
        assert!(SymbolKind::new(N_SECT | N_PEXT).is_private_external());
    }
}
