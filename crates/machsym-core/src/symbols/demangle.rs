//! Symbol demangling utilities.
//!
//! Best-effort only: used to let a caller look a symbol up by its readable
//! name and to pretty-print listings.
//!
//! ## Symbol Mangling
//!
//! - **Rust**: legacy (`_ZN...17h<hash>E`) and v0 (`_R...`) schemes, both
//!   demangled with `rustc-demangle`
//! - **C++**: Itanium ABI mangling (`_Z...`), detected but not demangled
//! - **Swift**: `$s` / `_$s` prefixes, detected but not demangled
//! - **C**: unmangled; Mach-O prefixes C names with a single underscore
//!
//! On Mach-O every mangled name carries that extra leading underscore
//! (`__ZN...`, `__R...`); `rustc-demangle` accepts it.

use rustc_demangle::try_demangle;

use crate::types::SymbolLanguage;

/// Demangle a raw symbol name, dropping the Rust hash suffix.
///
/// Returns `None` if the name is not a recognized mangling.
///
/// ## Example
///
/// ```rust
/// use machsym_core::symbols::demangle::demangle;
///
/// assert_eq!(demangle("__ZN4core3fmt5write17h0123456789abcdefE").as_deref(), Some("core::fmt::write"));
/// assert_eq!(demangle("_main"), None);
/// ```
pub fn demangle(raw: &str) -> Option<String>
{
    try_demangle(raw).ok().map(|d| format!("{d:#}"))
}

/// Demangle a raw symbol name, keeping the hash suffix if there is one.
pub fn demangle_full(raw: &str) -> Option<String>
{
    try_demangle(raw).ok().map(|d| d.to_string())
}

/// Classify the language of a raw symbol name by its mangling prefix.
pub fn detect_language(raw: &str) -> SymbolLanguage
{
    let name = raw.strip_prefix('_').unwrap_or(raw);
    // Legacy Rust names are Itanium-shaped; the hash suffix tells them apart.
    let legacy_rust = name.starts_with("_ZN") && raw.contains("17h") && try_demangle(raw).is_ok();
    if name.starts_with("_R") || legacy_rust {
        SymbolLanguage::Rust
    } else if name.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else if name.starts_with("$s") || name.starts_with("$S") {
        SymbolLanguage::Swift
    } else if raw.starts_with('_') {
        SymbolLanguage::C
    } else {
        SymbolLanguage::Unknown
    }
}

/// Readable form for listings: demangled if possible, raw otherwise.
pub fn display_name(raw: &str) -> String
{
    demangle(raw).unwrap_or_else(|| raw.to_string())
}

/// Whether `query` names the symbol `raw` after demangling.
///
/// Both the hash-free and full demangled forms are accepted.
pub(crate) fn matches_demangled(raw: &str, query: &str) -> bool
{
    match try_demangle(raw) {
        Ok(demangled) => format!("{demangled:#}") == query || demangled.to_string() == query,
        Err(_) => false,
    }
}
