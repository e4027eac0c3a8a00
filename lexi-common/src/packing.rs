//! Vertex data packing utilities
//!
//! Provides the conversions used when laying out engine vertex/index buffers:
//! - f32 RGBA → packed 32-bit ARGB colour
//! - vertex count → 16/32-bit index width

/// Largest vertex count addressable with 16-bit indices
pub const MAX_U16_INDEXED_VERTICES: usize = 65536;

/// Index buffer element width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IndexType {
    U16 = 0,
    U32 = 1,
}

impl IndexType {
    /// Pick the narrowest index width able to address `vertex_count` vertices.
    ///
    /// 16-bit indices are used until the vertex count exceeds 65536.
    #[inline]
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > MAX_U16_INDEXED_VERTICES {
            IndexType::U32
        } else {
            IndexType::U16
        }
    }

    /// Size of one index in bytes
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(IndexType::U16),
            1 => Some(IndexType::U32),
            _ => None,
        }
    }
}

/// Quantize one colour channel (0.0-1.0) to a byte
#[inline]
fn channel_to_u8(value: f32) -> u32 {
    (value.clamp(0.0, 1.0) * 255.0) as u32
}

/// Pack an RGBA colour (each channel 0.0-1.0) into 32-bit ARGB.
///
/// Layout: `alpha << 24 | red << 16 | green << 8 | blue`
#[inline]
pub fn pack_color_argb(rgba: [f32; 4]) -> u32 {
    (channel_to_u8(rgba[3]) << 24)
        | (channel_to_u8(rgba[0]) << 16)
        | (channel_to_u8(rgba[1]) << 8)
        | channel_to_u8(rgba[2])
}

/// Unpack a 32-bit ARGB colour into RGBA floats
#[inline]
pub fn unpack_color_argb(argb: u32) -> [f32; 4] {
    let a = ((argb >> 24) & 0xFF) as f32 / 255.0;
    let r = ((argb >> 16) & 0xFF) as f32 / 255.0;
    let g = ((argb >> 8) & 0xFF) as f32 / 255.0;
    let b = (argb & 0xFF) as f32 / 255.0;
    [r, g, b, a]
}
