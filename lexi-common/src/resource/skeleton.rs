//! Engine skeleton resource

use anyhow::{Result, bail};

/// Skeleton joint with its bind-pose local transform
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub handle: u16,
    pub name: String,
    pub parent: Option<u16>,
    pub position: [f32; 3],
    /// Quaternion [x, y, z, w]
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformKeyFrame {
    pub time: f32,
    pub translate: [f32; 3],
    pub rotate: [f32; 4],
    pub scale: [f32; 3],
}

/// Keyframes for one bone
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTrack {
    pub bone: u16,
    pub keyframes: Vec<TransformKeyFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonAnimation {
    pub name: String,
    pub length: f32,
    pub tracks: Vec<NodeTrack>,
}

impl SkeletonAnimation {
    pub fn create_node_track(&mut self, bone: u16) -> &mut NodeTrack {
        self.tracks.push(NodeTrack {
            bone,
            keyframes: Vec::new(),
        });
        let last = self.tracks.len() - 1;
        &mut self.tracks[last]
    }
}

/// Engine skeleton resource
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub animations: Vec<SkeletonAnimation>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bone at the next handle
    ///
    /// The parent must already exist, so handles are always parent-before-child.
    pub fn create_bone(&mut self, name: impl Into<String>, parent: Option<u16>) -> Result<u16> {
        let name = name.into();
        if self.bones.len() >= u16::MAX as usize {
            bail!("Too many bones");
        }
        if self.bones.iter().any(|b| b.name == name) {
            bail!("Duplicate bone name '{}'", name);
        }
        let handle = self.bones.len() as u16;
        if let Some(p) = parent
            && p >= handle
        {
            bail!("Bone '{}' parent {} is not created yet", name, p);
        }
        self.bones.push(Bone {
            handle,
            name,
            parent,
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        });
        Ok(handle)
    }

    pub fn bone_mut(&mut self, handle: u16) -> Option<&mut Bone> {
        self.bones.get_mut(handle as usize)
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn create_animation(&mut self, name: impl Into<String>, length: f32) -> &mut SkeletonAnimation {
        self.animations.push(SkeletonAnimation {
            name: name.into(),
            length,
            tracks: Vec::new(),
        });
        let last = self.animations.len() - 1;
        &mut self.animations[last]
    }
}
