//! Property-based tests for string tables, record decoding and lookups.

mod common;

use proptest::prelude::*;

use common::{encode_table, nlist32, nlist64, Order};
use machsym_core::strings::StringTable;
use machsym_core::symbols::{
    LookupOptions, Nlist32, Nlist64, RecordBuffer, SymbolResolver, SymbolTable64, Symbols,
};

// =============================================================================
// String Table Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Joining strings with terminators and walking the table gives them back
    /// with their start offsets.
    #[test]
    fn strings_round_trip(parts in prop::collection::vec("[a-zA-Z0-9_$.]{0,12}", 0..20)) {
        let mut data = Vec::new();
        let mut expected = Vec::new();
        for part in &parts {
            expected.push((part.clone(), data.len()));
            data.extend_from_slice(part.as_bytes());
            data.push(0);
        }

        let table = StringTable::new(data, 0);
        let walked: Vec<(String, usize)> = table
            .iter()
            .map(|entry| entry.map(|e| (e.string, e.offset)))
            .collect::<Result<_, _>>()
            .unwrap();
        prop_assert_eq!(walked, expected);
    }

    /// Walking arbitrary bytes never panics and yields at most one error, last.
    #[test]
    fn strings_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let table = StringTable::new(data, 0);
        let items: Vec<_> = table.iter().collect();
        if let Some(position) = items.iter().position(Result::is_err) {
            prop_assert_eq!(position, items.len() - 1);
        }
    }
}

// =============================================================================
// Record Decoding Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Records read the same whichever byte order they were written in.
    #[test]
    fn swap_is_transparent_64(strx: u32, n_type: u8, n_sect: u8, n_desc: u16, n_value: u64) {
        let little = RecordBuffer::<Nlist64>::new(
            nlist64(Order::Little, strx, n_type, n_sect, n_desc, n_value), 1, Order::Little.endianness()
        ).unwrap();
        let big = RecordBuffer::<Nlist64>::new(
            nlist64(Order::Big, strx, n_type, n_sect, n_desc, n_value), 1, Order::Big.endianness()
        ).unwrap();

        let record = little.get(0).unwrap();
        prop_assert_eq!(record, big.get(0).unwrap());
        prop_assert_eq!(record.string_index, strx);
        prop_assert_eq!(record.kind.raw(), n_type);
        prop_assert_eq!(record.section_number, n_sect);
        prop_assert_eq!(record.descriptor.raw(), n_desc);
        prop_assert_eq!(record.value, n_value);
    }

    #[test]
    fn swap_is_transparent_32(strx: u32, n_type: u8, n_sect: u8, n_desc: u16, n_value: u32) {
        let little = RecordBuffer::<Nlist32>::new(
            nlist32(Order::Little, strx, n_type, n_sect, n_desc, n_value), 1, Order::Little.endianness()
        ).unwrap();
        let big = RecordBuffer::<Nlist32>::new(
            nlist32(Order::Big, strx, n_type, n_sect, n_desc, n_value), 1, Order::Big.endianness()
        ).unwrap();

        prop_assert_eq!(little.get(0).unwrap(), big.get(0).unwrap());
        prop_assert_eq!(little.get(0).unwrap().value, u64::from(n_value));
    }

    /// Any length other than `count * 16` is rejected.
    #[test]
    fn size_mismatch_rejected(count in 0usize..8, extra in 1usize..16) {
        let bytes = vec![0u8; count * 16 + extra];
        prop_assert!(RecordBuffer::<Nlist64>::new(bytes, count, Order::Little.endianness()).is_err());
    }
}

// =============================================================================
// Resolver Properties
// =============================================================================

fn symbol_entry() -> impl Strategy<Value = (u8, u8, u64)>
{
    (
        prop::sample::select(vec![0x0e_u8, 0x0f, 0x01, 0x03, 0x24, 0x1e]),
        0u8..4,
        0u64..0x1000,
    )
}

fn build(entries: &[(u8, u8, u64)]) -> SymbolResolver
{
    let names: Vec<String> = (0..entries.len()).map(|i| format!("_sym{i}")).collect();
    let encoded: Vec<_> = entries
        .iter()
        .zip(&names)
        .map(|(&(n_type, n_sect, value), name)| (name.as_str(), n_type, n_sect, 0u16, value))
        .collect();
    let (strings, records) = encode_table(Order::Little, true, &encoded);
    let table = SymbolTable64::from_parts(strings, 0, records, entries.len(), Order::Little.endianness()).unwrap();
    SymbolResolver::from_symbols(&Symbols::from(table), None)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The closest symbol is eligible, not past the query, and no eligible
    /// symbol lies between it and the query.
    #[test]
    fn closest_is_greatest_eligible(
        entries in prop::collection::vec(symbol_entry(), 0..24),
        query in 0u64..0x1200,
        section in 0u8..3,
    ) {
        let resolver = build(&entries);
        let options = LookupOptions::default().in_section(section);

        let eligible: Vec<u64> = resolver
            .symbols()
            .filter(|s| s.record.kind.is_section_defined())
            .filter(|s| section == 0 || s.section_number() == section)
            .map(|s| s.offset)
            .filter(|&offset| offset <= query)
            .collect();

        match resolver.closest_symbol(query, options) {
            Some(found) => {
                prop_assert!(found.record.kind.is_section_defined());
                prop_assert!(found.offset <= query);
                prop_assert_eq!(Some(found.offset), eligible.iter().copied().max());
            }
            None => prop_assert!(eligible.is_empty()),
        }
    }

    /// Every tie is reported, and the single lookup returns the first of them.
    #[test]
    fn closest_symbols_agree_with_closest(
        entries in prop::collection::vec(symbol_entry(), 0..24),
        query in 0u64..0x1200,
    ) {
        let resolver = build(&entries);
        let options = LookupOptions::default();

        let all = resolver.closest_symbols(query, options);
        match resolver.closest_symbol(query, options) {
            Some(first) => {
                prop_assert_eq!(all.first().copied(), Some(first));
                prop_assert!(all.iter().all(|s| s.offset == first.offset));
            }
            None => prop_assert!(all.is_empty()),
        }
    }

    /// Exact lookups only ever return symbols at the queried offset.
    #[test]
    fn exact_lookups_match_offset(
        entries in prop::collection::vec(symbol_entry(), 0..24),
        query in 0u64..0x1000,
    ) {
        let resolver = build(&entries);
        let options = LookupOptions::default();

        if let Some(found) = resolver.symbol_for(query, options) {
            prop_assert_eq!(found.offset, query);
        }
        prop_assert!(resolver.symbols_for(query, options).iter().all(|s| s.offset == query));
        prop_assert_eq!(
            resolver.symbol_for(query, options).is_some(),
            !resolver.symbols_for(query, options).is_empty()
        );
    }
}
