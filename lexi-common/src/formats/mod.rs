//! Binary format definitions for LEXI engine assets
//!
//! All sections are little-endian POD records - no magic bytes.
//! Variable-length strings are stored as `u16` byte length + UTF-8 bytes.

mod mesh;
mod skeleton;

pub use mesh::*;
pub use skeleton::*;

/// Mesh file extension
pub const LEXI_MESH_EXT: &str = "mesh";
/// Skeleton file extension
pub const LEXI_SKELETON_EXT: &str = "skeleton";
/// Material script extension
pub const LEXI_MATERIAL_EXT: &str = "material";

/// Encode a length-prefixed string
///
/// Strings longer than `u16::MAX` bytes are truncated at a char boundary.
pub fn encode_string(s: &str) -> Vec<u8> {
    let mut end = s.len().min(u16::MAX as usize);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let bytes = &s.as_bytes()[..end];
    let mut out = Vec::with_capacity(2 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(bytes);
    out
}

/// Decode a length-prefixed string at `offset`
///
/// Returns the string and the offset just past it.
pub fn decode_string(bytes: &[u8], offset: usize) -> Option<(String, usize)> {
    let len_bytes = bytes.get(offset..offset + 2)?;
    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let start = offset + 2;
    let data = bytes.get(start..start + len)?;
    let s = std::str::from_utf8(data).ok()?;
    Some((s.to_string(), start + len))
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
pub(crate) fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
