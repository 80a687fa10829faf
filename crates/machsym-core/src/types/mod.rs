//! # Types
//!
//! Small value types decoded from the fields of a symbol record.
//!
//! These are interpreted on demand from the raw bytes of a record instead of
//! being looked up in global tables, so they are all `Copy` and cheap to pass
//! around.

pub mod descriptor;
pub mod kind;
pub mod symbols;

// Re-export all public types
pub use descriptor::{DescriptorFlags, LibraryOrdinal, ReferenceType, SymbolDescriptor};
pub use kind::{SymbolKind, SymbolType};
pub use symbols::SymbolLanguage;
