//! Common module for library exports

pub use crate::dyld_cache::{CacheHeader, LocalSymbolsInfo};
pub use crate::error::{MachsymError, MachsymResult};
pub use crate::macho::MachImage;
pub use crate::source::ByteSource;
pub use crate::strings::{StringEntry, StringTable};
pub use crate::symbols::{DySymtabPartition, LookupOptions, Symbol, SymbolResolver, SymbolTable, Symbols};
pub use crate::types::{SymbolDescriptor, SymbolKind, SymbolType};
