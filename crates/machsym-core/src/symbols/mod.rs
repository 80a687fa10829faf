//! Symbol tables and lookups.
//!
//! - [`record`]: `nlist` / `nlist_64` records, byte-swapped once on load
//! - [`table`]: records paired with their string table, yielding [`Symbol`]s
//! - [`resolver`]: nearest-address and name lookups
//! - [`demangle`]: best-effort readable names

pub mod demangle;
pub mod record;
pub mod resolver;
pub mod table;

pub use record::{host_endian, Nlist, Nlist32, Nlist64, RecordBuffer, SymbolRecord};
pub use resolver::{DySymtabPartition, LookupOptions, SymbolResolver};
pub use table::{Symbol, SymbolIter, SymbolTable, SymbolTable32, SymbolTable64, Symbols, SymbolsIter};
