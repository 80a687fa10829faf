//! Builders for synthetic symbol tables, Mach-O images and shared caches.

#![allow(dead_code)]

/// `(name, n_type, n_sect, n_desc, n_value)`
pub type Entry<'a> = (&'a str, u8, u8, u16, u64);

/// Defined external symbol in section 1.
pub const EXT_SECT: u8 = 0x0f;
/// Defined local symbol in section 1.
pub const LOCAL_SECT: u8 = 0x0e;
/// Undefined external.
pub const UNDEF_EXT: u8 = 0x01;
/// `N_FUN` stab.
pub const STAB_FUN: u8 = 0x24;
/// `N_BNSYM` stab; its `N_TYPE` bits read as `N_SECT`.
pub const STAB_BNSYM: u8 = 0x2e;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order
{
    Little,
    Big,
}

impl Order
{
    pub fn u16(self, value: u16) -> [u8; 2]
    {
        match self {
            Order::Little => value.to_le_bytes(),
            Order::Big => value.to_be_bytes(),
        }
    }

    pub fn u32(self, value: u32) -> [u8; 4]
    {
        match self {
            Order::Little => value.to_le_bytes(),
            Order::Big => value.to_be_bytes(),
        }
    }

    pub fn u64(self, value: u64) -> [u8; 8]
    {
        match self {
            Order::Little => value.to_le_bytes(),
            Order::Big => value.to_be_bytes(),
        }
    }

    pub fn endianness(self) -> object::Endianness
    {
        match self {
            Order::Little => object::Endianness::Little,
            Order::Big => object::Endianness::Big,
        }
    }
}

pub fn nlist64(order: Order, strx: u32, n_type: u8, n_sect: u8, n_desc: u16, n_value: u64) -> Vec<u8>
{
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&order.u32(strx));
    out.push(n_type);
    out.push(n_sect);
    out.extend_from_slice(&order.u16(n_desc));
    out.extend_from_slice(&order.u64(n_value));
    out
}

pub fn nlist32(order: Order, strx: u32, n_type: u8, n_sect: u8, n_desc: u16, n_value: u32) -> Vec<u8>
{
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&order.u32(strx));
    out.push(n_type);
    out.push(n_sect);
    out.extend_from_slice(&order.u16(n_desc));
    out.extend_from_slice(&order.u32(n_value));
    out
}

/// Encoded string table plus records for `entries`.
///
/// The string table starts with a single NUL so that index 0 names the empty
/// string, as the linker lays it out.
pub fn encode_table(order: Order, wide: bool, entries: &[Entry<'_>]) -> (Vec<u8>, Vec<u8>)
{
    let mut strings = vec![0u8];
    let mut records = Vec::new();
    for &(name, n_type, n_sect, n_desc, n_value) in entries {
        let strx = u32::try_from(strings.len()).unwrap();
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
        if wide {
            records.extend(nlist64(order, strx, n_type, n_sect, n_desc, n_value));
        } else {
            // 32-bit tables keep the low word of the address.
            records.extend(nlist32(order, strx, n_type, n_sect, n_desc, n_value as u32));
        }
    }
    (strings, records)
}

/// `(ilocalsym, nlocalsym, iextdefsym, nextdefsym)`
pub type Partition = (u32, u32, u32, u32);

/// A thin Mach-O image with `LC_SYMTAB` and, optionally, `LC_DYSYMTAB`.
pub fn macho_image(order: Order, wide: bool, entries: &[Entry<'_>], partition: Option<Partition>) -> Vec<u8>
{
    let header_size: u32 = if wide { 32 } else { 28 };
    let symtab_size: u32 = 24;
    let dysymtab_size: u32 = 80;
    let ncmds: u32 = if partition.is_some() { 2 } else { 1 };
    let sizeofcmds = symtab_size + if partition.is_some() { dysymtab_size } else { 0 };

    let (strings, records) = encode_table(order, wide, entries);
    let symoff = header_size + sizeofcmds;
    let stroff = symoff + u32::try_from(records.len()).unwrap();

    let mut out = Vec::new();
    let (magic, cputype) = if wide { (0xfeed_facf_u32, 0x0100_000c) } else { (0xfeed_face_u32, 12) };
    for field in [magic, cputype, 0, 2, ncmds, sizeofcmds, 0] {
        out.extend_from_slice(&order.u32(field));
    }
    if wide {
        out.extend_from_slice(&order.u32(0));
    }

    for field in [
        0x2,
        symtab_size,
        symoff,
        u32::try_from(entries.len()).unwrap(),
        stroff,
        u32::try_from(strings.len()).unwrap(),
    ] {
        out.extend_from_slice(&order.u32(field));
    }

    if let Some((ilocal, nlocal, iextdef, nextdef)) = partition {
        let mut fields = vec![0xb, dysymtab_size, ilocal, nlocal, iextdef, nextdef];
        fields.resize(20, 0);
        for field in fields {
            out.extend_from_slice(&order.u32(field));
        }
    }

    assert_eq!(out.len(), symoff as usize);
    out.extend(records);
    out.extend(strings);
    out
}

pub const CACHE_LOCALS_AT: u64 = 0x100;

/// A shared cache with a header and a local symbols region, nothing else.
pub fn shared_cache(magic: &[u8; 16], order: Order, wide: bool, entries: &[Entry<'_>]) -> Vec<u8>
{
    let (strings, records) = encode_table(order, wide, entries);
    let nlist_offset: u32 = 24;
    let strings_offset = nlist_offset + u32::try_from(records.len()).unwrap();
    let strings_size = u32::try_from(strings.len()).unwrap();
    let entries_offset = strings_offset + strings_size;
    let region_size = u64::from(entries_offset);

    let mut out = vec![0u8; CACHE_LOCALS_AT as usize];
    out[..16].copy_from_slice(magic);
    out[0x10..0x14].copy_from_slice(&order.u32(CACHE_LOCALS_AT as u32));
    out[0x48..0x50].copy_from_slice(&order.u64(CACHE_LOCALS_AT));
    out[0x50..0x58].copy_from_slice(&order.u64(region_size));

    for field in [
        nlist_offset,
        u32::try_from(entries.len()).unwrap(),
        strings_offset,
        strings_size,
        entries_offset,
        0,
    ] {
        out.extend_from_slice(&order.u32(field));
    }
    out.extend(records);
    out.extend(strings);
    out
}
