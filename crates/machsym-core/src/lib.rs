//! # machsym-core
//!
//! Decoding of Mach-O symbol and string tables, and address/name lookups on
//! top of them.
//!
//! This crate provides:
//! - NUL-delimited string table walking and random access ([`strings`])
//! - `nlist` / `nlist_64` decoding, including foreign byte order ([`symbols::record`])
//! - Symbol tables of either width ([`symbols::table`])
//! - `dladdr`-style nearest symbol lookups ([`symbols::resolver`])
//! - Shared cache local symbols ([`dyld_cache`])
//! - `LC_SYMTAB` / `LC_DYSYMTAB` discovery in thin images ([`macho`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use machsym_core::prelude::*;
//!
//! # fn main() -> MachsymResult<()> {
//! let image = MachImage::open("/usr/lib/dyld", 0)?;
//! let resolver = image.resolver()?;
//! if let Some(symbol) = resolver.closest_symbol(0x1000, LookupOptions::default()) {
//!     println!("{symbol}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod dyld_cache;
pub mod error;
pub mod macho;
pub mod prelude;
pub mod source;
pub mod strings;
pub mod symbols;
pub mod types;

pub use error::{MachsymError, MachsymResult};
pub use symbols::{Symbol, SymbolResolver, Symbols};
