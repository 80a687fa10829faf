//! Symbol naming types.

use std::fmt;

/// Programming language associated with a symbol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    /// Rust symbol (legacy `_ZN...17h<hash>E` or v0 `_R...` mangling).
    Rust,
    /// C++ symbol (Itanium mangling without Rust extensions).
    Cpp,
    /// Swift symbol (`$s`/`_$s` prefixes). Recognized but not demangled.
    Swift,
    /// C symbol or unmangled global.
    C,
    /// Unknown or mixed language.
    Unknown,
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::Swift => "swift",
            SymbolLanguage::C => "c",
            SymbolLanguage::Unknown => "unknown",
        };
        f.pad(label)
    }
}
