//! Intermediate mesh
//!
//! Owns the triangle list, the named attribute arrays (each tagged with the
//! time it was sampled at), the optional skeleton and the pose definitions.
//! Once [`IntermediateMesh::reindex`] has run, every array and the skeleton's
//! assignment map live in the compacted index space.

use std::collections::BTreeMap;

use crate::builder::geometry;
use crate::intermediate::{IntermediateSkeleton, Triangle};
use crate::material::MaterialId;
use crate::mesh_array::MeshArray;
use crate::reindex::{self, ReindexTable};
use crate::scene::{NodeHandle, SceneSource, TimeValue};

#[derive(Debug, Clone, PartialEq)]
pub struct SampledArray {
    pub time: TimeValue,
    pub data: MeshArray,
}

/// Named pose: frame to capture and whether zero offsets are dropped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseData {
    pub frame: f32,
    pub optimize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseAnimData {
    pub start: f32,
    pub end: f32,
    pub sample_rate: f32,
    pub optimize: bool,
}

#[derive(Debug, Clone)]
pub struct IntermediateMesh {
    name: String,
    node: NodeHandle,
    triangles: Vec<Triangle>,
    arrays: BTreeMap<String, SampledArray>,
    materials: Vec<MaterialId>,
    skeleton: Option<IntermediateSkeleton>,
    poses: BTreeMap<String, PoseData>,
    pose_animations: BTreeMap<String, PoseAnimData>,
    reindex_table: Option<ReindexTable>,
    collapsed: bool,
}

impl IntermediateMesh {
    pub fn new(name: impl Into<String>, node: NodeHandle, triangles: Vec<Triangle>) -> Self {
        let mut materials: Vec<MaterialId> = Vec::new();
        for material in triangles.iter().filter_map(|t| t.material) {
            if !materials.contains(&material) {
                materials.push(material);
            }
        }
        Self {
            name: name.into(),
            node,
            triangles,
            arrays: BTreeMap::new(),
            materials,
            skeleton: None,
            poses: BTreeMap::new(),
            pose_animations: BTreeMap::new(),
            reindex_table: None,
            collapsed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeHandle {
        self.node
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Materials in order of first use
    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    /// True if some triangle has no material
    pub fn has_unassigned_triangles(&self) -> bool {
        self.triangles.iter().any(|t| t.material.is_none())
    }

    /// Triangles drawn with `material`
    pub fn triangles_with_material(
        &self,
        material: Option<MaterialId>,
    ) -> impl Iterator<Item = &Triangle> {
        self.triangles
            .iter()
            .filter(move |t| t.material == material)
    }

    /// Current vertex count (compacted once reindexed)
    pub fn vertex_count(&self) -> usize {
        self.arrays
            .get(geometry::POSITION)
            .map(|a| a.data.len())
            .unwrap_or(self.triangles.len() * 3)
    }

    /// Vertex count in the per-corner space the host data is sampled in
    pub fn corner_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub(crate) fn mark_collapsed(&mut self) {
        self.collapsed = true;
    }

    // ========================================================================
    // Attribute arrays
    // ========================================================================

    pub fn set_array(&mut self, name: &str, time: TimeValue, data: MeshArray) {
        self.arrays
            .insert(name.to_string(), SampledArray { time, data });
    }

    /// Already sampled array, whatever its time
    pub fn cached_array(&self, name: &str) -> Option<&MeshArray> {
        self.arrays.get(name).map(|a| &a.data)
    }

    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(|k| k.as_str())
    }

    /// Attribute array sampled at `time`, building it from the host on a miss
    ///
    /// A freshly sampled array is moved into the current index space. Collapsed
    /// meshes cannot be resampled and only return what they hold.
    pub fn array(
        &mut self,
        scene: &dyn SceneSource,
        name: &str,
        time: TimeValue,
    ) -> Option<&MeshArray> {
        let hit = self
            .arrays
            .get(name)
            .is_some_and(|a| a.time == time || self.collapsed);
        if !hit {
            if self.collapsed {
                return None;
            }
            let mut data = geometry::build_attribute_array(scene, self.node, name, time)?;
            if !self.post_reindex(&mut data) {
                tracing::warn!(
                    "Attribute '{}' of '{}' at time {} does not match the mesh topology",
                    name,
                    self.name,
                    time
                );
                return None;
            }
            self.set_array(name, time, data);
        }
        self.arrays.get(name).map(|a| &a.data)
    }

    // ========================================================================
    // Reindexing
    // ========================================================================

    /// Deduplicate vertices across the named arrays
    ///
    /// Names without an array are ignored. Every other array in the same index
    /// space, and the skeleton's assignment map, are migrated through the same
    /// table. Returns `None` when there was nothing to compare.
    pub fn reindex(&mut self, names: &[&str]) -> Option<&ReindexTable> {
        let keys: Vec<String> = names
            .iter()
            .filter(|n| self.arrays.contains_key(**n))
            .map(|n| n.to_string())
            .collect();
        let mut taken: Vec<SampledArray> = keys
            .iter()
            .filter_map(|k| self.arrays.remove(k))
            .collect();
        let mut data: Vec<MeshArray> = taken
            .iter_mut()
            .map(|a| std::mem::replace(&mut a.data, MeshArray::Vec2(Vec::new())))
            .collect();

        let table = reindex::reindex(&mut data, &mut self.triangles);

        for ((key, mut sampled), array) in keys.into_iter().zip(taken).zip(data) {
            sampled.data = array;
            self.arrays.insert(key, sampled);
        }
        let table = table?;

        // Arrays outside the comparison set follow the same table
        if table.new_vertex_count() != table.old_vertex_count() {
            for sampled in self.arrays.values_mut() {
                if sampled.data.len() == table.old_vertex_count() {
                    table.apply(&mut sampled.data);
                }
            }
        }

        if let Some(skeleton) = &mut self.skeleton {
            for (old, &new) in table.remap.iter().enumerate() {
                skeleton.prepare_reindex_change(old as u32, new);
            }
            skeleton.apply_reindex_changes();
        }

        let combined = match self.reindex_table.take() {
            Some(previous) => compose(&previous, &table),
            None => table,
        };
        self.reindex_table = Some(combined);
        self.reindex_table.as_ref()
    }

    pub fn reindex_table(&self) -> Option<&ReindexTable> {
        self.reindex_table.as_ref()
    }

    /// Move an array sampled in the per-corner space into the current index space
    ///
    /// Returns false if its length matches neither.
    pub fn post_reindex(&self, array: &mut MeshArray) -> bool {
        match &self.reindex_table {
            Some(table) if array.len() == table.old_vertex_count() => {
                table.apply(array);
                true
            }
            Some(_) => false,
            None => array.len() == self.corner_count(),
        }
    }

    // ========================================================================
    // Skeleton and poses
    // ========================================================================

    pub fn skeleton(&self) -> Option<&IntermediateSkeleton> {
        self.skeleton.as_ref()
    }

    pub fn skeleton_mut(&mut self) -> Option<&mut IntermediateSkeleton> {
        self.skeleton.as_mut()
    }

    pub fn set_skeleton(&mut self, skeleton: IntermediateSkeleton) {
        self.skeleton = Some(skeleton);
    }

    pub fn add_pose(&mut self, name: &str, frame: f32, optimize: bool) {
        self.poses
            .insert(name.to_string(), PoseData { frame, optimize });
    }

    pub fn poses(&self) -> impl Iterator<Item = (&str, &PoseData)> {
        self.poses.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn add_pose_animation(&mut self, name: &str, anim: PoseAnimData) {
        self.pose_animations.insert(name.to_string(), anim);
    }

    pub fn pose_animations(&self) -> impl Iterator<Item = (&str, &PoseAnimData)> {
        self.pose_animations.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_pose_data(&self) -> bool {
        !self.poses.is_empty() || !self.pose_animations.is_empty()
    }
}

/// Table equivalent to applying `first` and then `second`
fn compose(first: &ReindexTable, second: &ReindexTable) -> ReindexTable {
    ReindexTable {
        remap: first
            .remap
            .iter()
            .map(|&mid| second.remap[mid as usize])
            .collect(),
        picks: second
            .picks
            .iter()
            .map(|&mid| first.picks[mid as usize])
            .collect(),
    }
}
