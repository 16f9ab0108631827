//! Fixed, versioned, little-endian wire types for ghosting exchanges.
//!
//! Two payloads travel between ranks: mortar interface pairs (a list of
//! [`WireAdj`]) and migrated per-element data (a list of [`WireEntry`]
//! headers, each followed by its values as [`WireF64`]). Every payload starts
//! with a [`WireHdr`] and a [`WireCount`].

use crate::mesh_error::GhostingError;
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Payload kinds carried in [`WireHdr::kind`].
pub const KIND_INTERFACE_PAIRS: u16 = 1;
pub const KIND_ELEMENT_DATA: u16 = 2;

/// All multi-byte integers in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub reserved_le: u32, // keep zero
}

impl WireHdr {
    pub fn new(kind: u16) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            reserved_le: 0,
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}
impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// An adjacency pair `(src, dst)` of element ids.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireAdj {
    pub src_le: u64,
    pub dst_le: u64,
}
impl WireAdj {
    pub fn new(src: u64, dst: u64) -> Self {
        Self {
            src_le: src.to_le(),
            dst_le: dst.to_le(),
        }
    }
    pub fn src(&self) -> u64 {
        u64::from_le(self.src_le)
    }
    pub fn dst(&self) -> u64 {
        u64::from_le(self.dst_le)
    }
}

/// Header of one migrated element record; `n` values follow.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireEntry {
    pub unique_id_le: u64,
    pub n_le: u32,
    pub reserved_le: u32,
}
impl WireEntry {
    pub fn new(unique_id: u64, n: usize) -> Self {
        Self {
            unique_id_le: unique_id.to_le(),
            n_le: (n as u32).to_le(),
            reserved_le: 0,
        }
    }
    pub fn unique_id(&self) -> u64 {
        u64::from_le(self.unique_id_le)
    }
    pub fn len(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// An `f64` carried as its little-endian bit pattern.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireF64 {
    pub bits_le: u64,
}
impl WireF64 {
    pub fn of(v: f64) -> Self {
        Self {
            bits_le: v.to_bits().to_le(),
        }
    }
    pub fn get(&self) -> f64 {
        f64::from_bits(u64::from_le(self.bits_le))
    }
}

const _: () = {
    assert!(size_of::<WireHdr>() == 8);
    assert!(size_of::<WireCount>() == 4);
    assert!(size_of::<WireAdj>() == 16);
    assert!(size_of::<WireEntry>() == 16);
    assert!(size_of::<WireF64>() == 8);
};

/// Incremental little-endian payload writer.
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Start a payload of `kind` holding `n` top-level records.
    pub fn new(kind: u16, n: usize) -> Self {
        let mut w = Self::default();
        w.put(&WireHdr::new(kind));
        w.put(&WireCount::new(n));
        w
    }

    pub fn put<T: Pod>(&mut self, rec: &T) {
        self.buf.extend_from_slice(bytemuck::bytes_of(rec));
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a received payload.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Validate the header and return the reader with the record count.
    pub fn open(buf: &'a [u8], kind: u16) -> Result<(Self, usize), GhostingError> {
        let mut r = Self { buf, pos: 0 };
        let hdr: WireHdr = r.take()?;
        if hdr.version() != WIRE_VERSION {
            return Err(GhostingError::Wire(format!(
                "wire version {} (expected {WIRE_VERSION})",
                hdr.version()
            )));
        }
        if hdr.kind() != kind {
            return Err(GhostingError::Wire(format!(
                "payload kind {} (expected {kind})",
                hdr.kind()
            )));
        }
        let n: WireCount = r.take()?;
        Ok((r, n.get()))
    }

    /// Read the next record.
    pub fn take<T: Pod>(&mut self) -> Result<T, GhostingError> {
        let end = self.pos + size_of::<T>();
        let bytes = self.buf.get(self.pos..end).ok_or_else(|| {
            GhostingError::Wire(format!(
                "expected {} more bytes at offset {}, got {}",
                size_of::<T>(),
                self.pos,
                self.buf.len().saturating_sub(self.pos)
            ))
        })?;
        self.pos = end;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// True when every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }
}

/// Encode element pairs.
pub fn encode_pairs(pairs: &[(u64, u64)]) -> Vec<u8> {
    let mut w = WireWriter::new(KIND_INTERFACE_PAIRS, pairs.len());
    for &(s, d) in pairs {
        w.put(&WireAdj::new(s, d));
    }
    w.finish()
}

/// Decode element pairs.
pub fn decode_pairs(buf: &[u8]) -> Result<Vec<(u64, u64)>, GhostingError> {
    let (mut r, n) = WireReader::open(buf, KIND_INTERFACE_PAIRS)?;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let a: WireAdj = r.take()?;
        out.push((a.src(), a.dst()));
    }
    if !r.is_exhausted() {
        return Err(GhostingError::Wire("trailing bytes after pair list".into()));
    }
    Ok(out)
}

/// Encode `(unique id, values)` records.
pub fn encode_entries(entries: &[(u64, &[f64])]) -> Vec<u8> {
    let mut w = WireWriter::new(KIND_ELEMENT_DATA, entries.len());
    for (uid, values) in entries {
        w.put(&WireEntry::new(*uid, values.len()));
        for v in values.iter() {
            w.put(&WireF64::of(*v));
        }
    }
    w.finish()
}

/// Decode `(unique id, values)` records.
pub fn decode_entries(buf: &[u8]) -> Result<Vec<(u64, Vec<f64>)>, GhostingError> {
    let (mut r, n) = WireReader::open(buf, KIND_ELEMENT_DATA)?;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let e: WireEntry = r.take()?;
        let mut values = Vec::with_capacity(e.len());
        for _ in 0..e.len() {
            values.push(r.take::<WireF64>()?.get());
        }
        out.push((e.unique_id(), values));
    }
    if !r.is_exhausted() {
        return Err(GhostingError::Wire("trailing bytes after element data".into()));
    }
    Ok(out)
}
