//! LexiSkeleton binary format (.skeleton)
//!
//! Bone hierarchy with bind-pose local transforms and per-bone keyframe tracks.
//! POD format - no magic bytes.
//!
//! # Layout
//! ```text
//! 0x00: bone_count u16
//! 0x02: animation_count u16
//! 0x04: reserved u32
//! 0x08: bones × bone_count:
//!       handle u16, parent u16 (NO_PARENT for roots), name (string),
//!       position f32×3, rotation f32×4 (x, y, z, w), scale f32×3
//!       animations × animation_count:
//!       name (string), length f32, track_count u16, tracks:
//!         bone u16, keyframe_count u32, keyframes (KEYFRAME_SIZE each):
//!           time f32, translate f32×3, rotate f32×4, scale f32×3
//! ```
//!
//! Bones are stored in handle order; a parent always precedes its children.

use super::read_u16;

/// Parent handle written for root bones
pub const NO_PARENT: u16 = u16::MAX;

/// Size of one bone transform block (position + rotation + scale)
pub const BONE_TRANSFORM_SIZE: usize = 40;

/// Size of one transform keyframe (time + bone transform)
pub const KEYFRAME_SIZE: usize = 44;

/// LexiSkeleton header (8 bytes)
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct LexiSkeletonHeader {
    /// Number of bones in the skeleton
    pub bone_count: u16,
    /// Number of named animations
    pub animation_count: u16,
    /// Reserved for future use
    pub reserved: u32,
}

impl LexiSkeletonHeader {
    pub const SIZE: usize = 8;

    pub fn new(bone_count: u16, animation_count: u16) -> Self {
        Self {
            bone_count,
            animation_count,
            reserved: 0,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.bone_count.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.animation_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.reserved.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            bone_count: read_u16(bytes, 0),
            animation_count: read_u16(bytes, 2),
            reserved: super::read_u32(bytes, 4),
        })
    }
}

/// Encode a bone transform block
pub fn encode_bone_transform(
    position: [f32; 3],
    rotation: [f32; 4],
    scale: [f32; 3],
) -> [u8; BONE_TRANSFORM_SIZE] {
    let mut bytes = [0u8; BONE_TRANSFORM_SIZE];
    let values = position.iter().chain(rotation.iter()).chain(scale.iter());
    for (i, v) in values.enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a bone transform block into (position, rotation, scale)
pub fn decode_bone_transform(bytes: &[u8]) -> Option<([f32; 3], [f32; 4], [f32; 3])> {
    if bytes.len() < BONE_TRANSFORM_SIZE {
        return None;
    }
    let f = |i: usize| super::read_f32(bytes, i * 4);
    Some((
        [f(0), f(1), f(2)],
        [f(3), f(4), f(5), f(6)],
        [f(7), f(8), f(9)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_header_roundtrip() {
        let header = LexiSkeletonHeader::new(42, 3);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), LexiSkeletonHeader::SIZE);

        let parsed = LexiSkeletonHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.bone_count, 42);
        assert_eq!(parsed.animation_count, 3);
        assert_eq!(parsed.reserved, 0);
    }

    #[test]
    fn test_skeleton_header_from_short_bytes() {
        assert!(LexiSkeletonHeader::from_bytes(&[0u8; 4]).is_none());
    }

    #[test]
    fn test_bone_transform_block() {
        let bytes = encode_bone_transform([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 2.0]);
        assert_eq!(KEYFRAME_SIZE, 4 + BONE_TRANSFORM_SIZE);

        let (p, r, s) = decode_bone_transform(&bytes).unwrap();
        assert_eq!(p, [1.0, 2.0, 3.0]);
        assert_eq!(r, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(s, [1.0, 1.0, 2.0]);
    }
}
