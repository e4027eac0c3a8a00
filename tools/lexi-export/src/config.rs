//! Per-object export configuration
//!
//! Serialized keys are the exporter's option IDs, so a config table in a
//! manifest reads like `reindexID = true`. Missing keys take the defaults below.

use serde::{Deserialize, Serialize};

/// Default frame rate used when a scene does not say otherwise
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Default maximum number of bone influences kept per vertex
pub const DEFAULT_MAX_BONE_INFLUENCES: usize = 4;

/// How sampled bone scale is expressed in animation keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Every keyframe carries unit scale
    #[default]
    Identity,
    /// `(sampled + bind) / 2`, the legacy blend
    Averaged,
    /// Component-wise `sampled / bind`
    Ratio,
}

/// A skeletal animation clip to sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    pub name: String,
    #[serde(default)]
    pub start: f32,
    pub end: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,
    #[serde(default = "default_true")]
    pub optimize: bool,
}

/// A named pose (morph target) captured at `frame`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSpec {
    pub name: String,
    pub frame: f32,
    #[serde(default = "default_true")]
    pub optimize: bool,
}

/// A pose animation: one pose per sample over a frame range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseAnimationSpec {
    pub name: String,
    #[serde(default)]
    pub start: f32,
    pub end: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,
    #[serde(default = "default_true")]
    pub optimize: bool,
}

fn default_true() -> bool {
    true
}

fn default_sample_rate() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    #[serde(rename = "useSharedGeometryID")]
    pub use_shared_geometry: bool,
    #[serde(rename = "reindexID")]
    pub reindex: bool,
    #[serde(rename = "normalsID")]
    pub normals: bool,
    #[serde(rename = "vertexColorsID")]
    pub vertex_colors: bool,
    #[serde(rename = "uvID")]
    pub uv: bool,

    #[serde(rename = "SkeletonID")]
    pub skeleton: bool,
    #[serde(rename = "SkeletonBindingPoseFrameID")]
    pub binding_pose_frame: f32,
    #[serde(rename = "maxBoneInfluences")]
    pub max_bone_influences: usize,

    #[serde(rename = "AnimationStartID")]
    pub animation_start: f32,
    #[serde(rename = "AnimationEndID")]
    pub animation_end: f32,
    #[serde(rename = "AnimationSampleRateID")]
    pub animation_sample_rate: f32,
    #[serde(rename = "AnimationNameID")]
    pub animation_name: String,
    #[serde(rename = "AnimationOptimizeID")]
    pub animation_optimize: bool,
    #[serde(rename = "animationScaleMode")]
    pub scale_mode: ScaleMode,

    #[serde(rename = "exportMaterialsID")]
    pub export_materials: bool,
    #[serde(rename = "copyTextureMaps")]
    pub copy_texture_maps: bool,
    #[serde(rename = "copyShaders")]
    pub copy_shaders: bool,
    #[serde(rename = "collapseHierarchy")]
    pub collapse_hierarchy: bool,

    /// Additional skeletal clips; when empty the `Animation*ID` clip is used
    pub animations: Vec<AnimationSpec>,
    pub poses: Vec<PoseSpec>,
    #[serde(rename = "poseAnimations")]
    pub pose_animations: Vec<PoseAnimationSpec>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            use_shared_geometry: true,
            reindex: true,
            normals: true,
            vertex_colors: false,
            uv: true,
            skeleton: false,
            binding_pose_frame: 0.0,
            max_bone_influences: DEFAULT_MAX_BONE_INFLUENCES,
            animation_start: 0.0,
            animation_end: 0.0,
            animation_sample_rate: 1.0,
            animation_name: "Anim1".to_string(),
            animation_optimize: true,
            scale_mode: ScaleMode::default(),
            export_materials: true,
            copy_texture_maps: false,
            copy_shaders: false,
            collapse_hierarchy: false,
            animations: Vec::new(),
            poses: Vec::new(),
            pose_animations: Vec::new(),
        }
    }
}

impl ExportConfig {
    /// Skeletal clips to sample for this object
    ///
    /// The explicit `animations` list wins. Otherwise the single clip described
    /// by the `Animation*ID` keys is used, provided it spans at least one frame.
    pub fn animation_specs(&self) -> Vec<AnimationSpec> {
        if !self.animations.is_empty() {
            return self.animations.clone();
        }
        if self.animation_end > self.animation_start {
            vec![AnimationSpec {
                name: self.animation_name.clone(),
                start: self.animation_start,
                end: self.animation_end,
                sample_rate: self.animation_sample_rate,
                optimize: self.animation_optimize,
            }]
        } else {
            Vec::new()
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
