//! Address and name lookups over a materialized symbol list.
//!
//! The resolver behaves like `dladdr`: for an address it finds the defined
//! symbol with the greatest address that does not exceed it.
//!
//! ## Scan order
//!
//! With an `LC_DYSYMTAB` partition, only the externally defined range is
//! scanned first and then (unless only globals were asked for) the local
//! range. Undefined and indirect entries live outside both ranges and are
//! never looked at. Without a partition the whole table is scanned once and
//! "global only" is decided by the `N_EXT` bit.
//!
//! ## Eligibility
//!
//! A candidate must be defined in a section (`N_SECT`), must not be a stab,
//! and must match the section filter when one is given. Address queries
//! additionally require `candidate.offset <= query`.
//!
//! ## Usage
//!
//! ```rust
//! use machsym_core::symbols::{LookupOptions, Symbol, SymbolRecord, SymbolResolver};
//! use machsym_core::types::{SymbolDescriptor, SymbolKind};
//!
//! let record = SymbolRecord {
//!     string_index: 1,
//!     kind: SymbolKind::new(0x0f),
//!     section_number: 1,
//!     descriptor: SymbolDescriptor::default(),
//!     value: 0x1000,
//! };
//! let start = Symbol { name: "_start".into(), offset: 0x1000, record };
//! let resolver = SymbolResolver::new(vec![start], None);
//!
//! let options = LookupOptions::default();
//! assert_eq!(resolver.closest_symbol(0x1010, options).map(|s| s.name.as_str()), Some("_start"));
//! assert!(resolver.symbol_for(0x1010, options).is_none());
//! ```

use std::ops::Range;

use tracing::{trace, warn};

use super::demangle::matches_demangled;
use super::table::{Symbol, Symbols};

/// Index ranges from `LC_DYSYMTAB` into the table's natural record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DySymtabPartition
{
    /// `ilocalsym`
    pub local_start: usize,
    /// `nlocalsym`
    pub local_count: usize,
    /// `iextdefsym`
    pub global_start: usize,
    /// `nextdefsym`
    pub global_count: usize,
}

impl DySymtabPartition
{
    pub fn new(local_start: usize, local_count: usize, global_start: usize, global_count: usize) -> Self
    {
        Self {
            local_start,
            local_count,
            global_start,
            global_count,
        }
    }

    pub fn locals(&self) -> Range<usize>
    {
        self.local_start..self.local_start.saturating_add(self.local_count)
    }

    pub fn globals(&self) -> Range<usize>
    {
        self.global_start..self.global_start.saturating_add(self.global_count)
    }
}

/// Filters shared by every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LookupOptions
{
    /// 1-based section number to restrict to; 0 searches every section.
    pub section_number: u8,
    /// Only consider externally visible symbols.
    pub global_only: bool,
}

impl LookupOptions
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Restrict to section `section_number` (0 for any).
    #[must_use]
    pub fn in_section(mut self, section_number: u8) -> Self
    {
        self.section_number = section_number;
        self
    }

    #[must_use]
    pub fn global_only(mut self, global_only: bool) -> Self
    {
        self.global_only = global_only;
        self
    }
}

/// Lookups over the full symbol list of one image.
///
/// Slots keep the table's record order so that partition indices stay
/// valid; a record that failed to materialize leaves an empty slot.
#[derive(Debug, Clone, Default)]
pub struct SymbolResolver
{
    symbols: Vec<Option<Symbol>>,
    partition: Option<DySymtabPartition>,
}

impl SymbolResolver
{
    /// Wrap an already materialized list, in table order.
    pub fn new(symbols: Vec<Symbol>, partition: Option<DySymtabPartition>) -> Self
    {
        Self {
            symbols: symbols.into_iter().map(Some).collect(),
            partition,
        }
    }

    /// Materialize every record of `table` once.
    ///
    /// Records whose names cannot be decoded are logged and skipped; their
    /// positions stay occupied so the partition still lines up.
    pub fn from_symbols(table: &Symbols, partition: Option<DySymtabPartition>) -> Self
    {
        let mut skipped = 0usize;
        let symbols: Vec<Option<Symbol>> = table
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Ok(symbol) => Some(symbol),
                Err(err) => {
                    warn!(index, %err, "skipping symbol that could not be decoded");
                    skipped += 1;
                    None
                }
            })
            .collect();

        tracing::debug!(count = symbols.len(), skipped, has_partition = partition.is_some(), "materialized symbols");
        Self { symbols, partition }
    }

    pub fn partition(&self) -> Option<DySymtabPartition>
    {
        self.partition
    }

    /// Number of slots, including ones whose record failed to decode.
    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }

    /// Every decoded symbol in table order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_
    {
        self.symbols.iter().flatten()
    }

    /// Symbol at table position `index`.
    pub fn get(&self, index: usize) -> Option<&Symbol>
    {
        self.symbols.get(index).and_then(Option::as_ref)
    }

    /// Clamp `range` to the table.
    fn slots(&self, range: Range<usize>) -> &[Option<Symbol>]
    {
        let end = range.end.min(self.symbols.len());
        let start = range.start.min(end);
        &self.symbols[start..end]
    }

    /// Eligible candidates in scan order, ignoring the address.
    fn candidates(&self, options: LookupOptions) -> impl Iterator<Item = &Symbol> + '_
    {
        let (first, second, require_external) = match self.partition {
            Some(partition) => {
                let locals = if options.global_only {
                    &[][..]
                } else {
                    self.slots(partition.locals())
                };
                (self.slots(partition.globals()), locals, false)
            }
            None => (&self.symbols[..], &[][..], options.global_only),
        };
        trace!(
            first = first.len(),
            second = second.len(),
            require_external,
            section = options.section_number,
            "scanning symbols"
        );

        first
            .iter()
            .chain(second)
            .flatten()
            .filter(move |symbol| is_eligible(symbol, options, require_external))
    }

    /// The symbol with the greatest address `<= offset`.
    ///
    /// On ties the first one in scan order wins.
    pub fn closest_symbol(&self, offset: u64, options: LookupOptions) -> Option<&Symbol>
    {
        let mut best: Option<&Symbol> = None;
        for symbol in self.candidates(options).filter(|symbol| symbol.offset <= offset) {
            if best.is_some_and(|current| current.offset >= symbol.offset) {
                continue;
            }
            best = Some(symbol);
        }
        best
    }

    /// Every symbol sharing the greatest address `<= offset`, in scan order.
    pub fn closest_symbols(&self, offset: u64, options: LookupOptions) -> Vec<&Symbol>
    {
        let mut best_offset: Option<u64> = None;
        let mut best: Vec<&Symbol> = Vec::new();
        for symbol in self.candidates(options).filter(|symbol| symbol.offset <= offset) {
            match best_offset {
                Some(current) if current > symbol.offset => {}
                Some(current) if current == symbol.offset => best.push(symbol),
                _ => {
                    best_offset = Some(symbol.offset);
                    best.clear();
                    best.push(symbol);
                }
            }
        }
        best
    }

    /// The symbol starting exactly at `offset`.
    pub fn symbol_for(&self, offset: u64, options: LookupOptions) -> Option<&Symbol>
    {
        self.closest_symbol(offset, options)
            .filter(|symbol| symbol.offset == offset)
    }

    /// Every symbol starting exactly at `offset`.
    pub fn symbols_for(&self, offset: u64, options: LookupOptions) -> Vec<&Symbol>
    {
        let best = self.closest_symbols(offset, options);
        if best.first().is_some_and(|symbol| symbol.offset == offset) {
            best
        } else {
            Vec::new()
        }
    }

    /// First eligible symbol called `name`.
    ///
    /// A leading underscore on either side is ignored once, so `name` finds
    /// `_name` and `_name` finds `name` (C symbols carry the underscore).
    /// When `mangled` is false, `name` is also compared with each
    /// candidate's demangled name.
    pub fn symbol_named(&self, name: &str, mangled: bool, options: LookupOptions) -> Option<&Symbol>
    {
        self.candidates(options)
            .find(|symbol| name_matches(&symbol.name, name, mangled))
    }

    /// Every symbol in the table whose decoded name is exactly `name`,
    /// regardless of type, section or visibility.
    ///
    /// When `mangled` is false, the demangled name is compared as well.
    pub fn symbols_named(&self, name: &str, mangled: bool) -> Vec<&Symbol>
    {
        self.symbols()
            .filter(|symbol| symbol.name == name || (!mangled && matches_demangled(&symbol.name, name)))
            .collect()
    }
}

fn is_eligible(symbol: &Symbol, options: LookupOptions, require_external: bool) -> bool
{
    let kind = symbol.record.kind;
    kind.is_section_defined()
        && (options.section_number == 0 || symbol.record.section_number == options.section_number)
        && (!require_external || kind.is_external())
}

fn name_matches(candidate: &str, query: &str, mangled: bool) -> bool
{
    if candidate == query
        || candidate.strip_prefix('_') == Some(query)
        || query.strip_prefix('_') == Some(candidate)
    {
        return true;
    }
    !mangled && matches_demangled(candidate, query)
}
