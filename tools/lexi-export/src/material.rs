//! Intermediate materials and the per-pass material cache

use glam::{Vec2, Vec3};
use hashbrown::HashMap;

/// Standard material map slots, in bitmask order
pub const MAP_CHANNELS: [&str; 12] = [
    "ambient_color",
    "diffuse",
    "specular_color",
    "specular_level",
    "glossiness",
    "self_illumination",
    "opacity",
    "filter_color",
    "bump",
    "reflection",
    "refraction",
    "displacement",
];

/// Bitmask bit of the diffuse map slot
pub const DIFFUSE_MAP_BIT: u32 = 1 << 1;

/// Bit index of a map slot identifier
pub fn map_channel_bit(slot: &str) -> Option<u32> {
    MAP_CHANNELS
        .iter()
        .position(|&c| c == slot)
        .map(|i| 1 << i)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Wrap,
    Mirror,
    Clamp,
}

impl AddressingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressingMode::Wrap => "wrap",
            AddressingMode::Mirror => "mirror",
            AddressingMode::Clamp => "clamp",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureMapInfo {
    pub filename: String,
    /// Slot identifier this map is bound to
    pub map_type: String,
    /// Texture coordinate set (1-based map channel)
    pub coord_set: u32,
    pub addressing: AddressingMode,
    pub offset: Vec2,
    pub scale: Vec2,
    /// Degrees
    pub angle: f32,
    pub amount: f32,
    pub alpha_from_file: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateMaterial {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub emissive: Vec3,
    pub glossiness: f32,
    pub specular_level: f32,
    pub opacity: f32,
    pub two_sided: bool,
    pub wire: bool,
    pub faceted: bool,
    maps: HashMap<String, TextureMapInfo>,
    map_mask: u32,
}

impl IntermediateMaterial {
    /// Plain white material
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            glossiness: 0.0,
            specular_level: 0.0,
            opacity: 1.0,
            two_sided: false,
            wire: false,
            faceted: false,
            maps: HashMap::new(),
            map_mask: 0,
        }
    }

    /// Bind a texture map to a slot; unknown slots are rejected
    pub fn set_map(&mut self, info: TextureMapInfo) -> bool {
        let Some(bit) = map_channel_bit(&info.map_type) else {
            return false;
        };
        self.map_mask |= bit;
        self.maps.insert(info.map_type.clone(), info);
        true
    }

    pub fn map(&self, slot: &str) -> Option<&TextureMapInfo> {
        self.maps.get(slot)
    }

    /// Populated maps in slot order
    pub fn maps(&self) -> impl Iterator<Item = &TextureMapInfo> {
        MAP_CHANNELS.iter().filter_map(|slot| self.maps.get(*slot))
    }

    pub fn map_mask(&self) -> u32 {
        self.map_mask
    }

    pub fn has_map(&self, bit: u32) -> bool {
        self.map_mask & bit != 0
    }
}

/// Stable handle of a cached material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One material per unique name for the duration of an export pass
#[derive(Debug, Default)]
pub struct MaterialCache {
    materials: Vec<IntermediateMaterial>,
    by_name: HashMap<String, MaterialId>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    /// Return the cached material called `name`, creating it with `create` if needed
    pub fn get_or_insert_with(
        &mut self,
        name: &str,
        create: impl FnOnce() -> IntermediateMaterial,
    ) -> MaterialId {
        if let Some(id) = self.find(name) {
            return id;
        }
        let id = MaterialId(self.materials.len() as u32);
        let mut material = create();
        material.name = name.to_string();
        self.materials.push(material);
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&IntermediateMaterial> {
        self.materials.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Forget every material; ids handed out before are invalid afterwards
    pub fn clear(&mut self) {
        self.materials.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diffuse_map(filename: &str) -> TextureMapInfo {
        TextureMapInfo {
            filename: filename.to_string(),
            map_type: "diffuse".to_string(),
            coord_set: 1,
            addressing: AddressingMode::Wrap,
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
            angle: 0.0,
            amount: 1.0,
            alpha_from_file: false,
        }
    }

    #[test]
    fn test_map_bits() {
        assert_eq!(map_channel_bit("ambient_color"), Some(1));
        assert_eq!(map_channel_bit("diffuse"), Some(DIFFUSE_MAP_BIT));
        assert_eq!(map_channel_bit("displacement"), Some(1 << 11));
        assert_eq!(map_channel_bit("sheen"), None);
    }

    #[test]
    fn test_set_map_updates_mask() {
        let mut material = IntermediateMaterial::new("Brick");
        assert!(material.set_map(diffuse_map("brick.png")));
        assert!(material.has_map(DIFFUSE_MAP_BIT));
        assert_eq!(material.map("diffuse").unwrap().filename, "brick.png");

        let mut bogus = diffuse_map("x.png");
        bogus.map_type = "unknown".to_string();
        assert!(!material.set_map(bogus));
        assert_eq!(material.map_mask(), DIFFUSE_MAP_BIT);
    }

    #[test]
    fn test_cache_one_instance_per_name() {
        let mut cache = MaterialCache::new();
        let a = cache.get_or_insert_with("Red", || IntermediateMaterial::new(""));
        let b = cache.get_or_insert_with("Red", || panic!("should be cached"));
        let c = cache.get_or_insert_with("Blue", || IntermediateMaterial::new(""));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(c).unwrap().name, "Blue");
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = MaterialCache::new();
        cache.get_or_insert_with("Red", || IntermediateMaterial::new(""));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.find("Red").is_none());
    }
}
