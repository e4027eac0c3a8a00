//! Intermediate skeleton
//!
//! Bones live in an arena and refer to each other by [`BoneId`]. A bone's
//! parent is only known by host handle until [`IntermediateSkeleton::assemble`]
//! resolves the links; indices are then handed out depth-first so a parent
//! always has a lower index than its children.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::mesh_array::VertexBoneData;
use crate::scene::NodeHandle;

/// Influences below this weight are dropped
pub const MIN_BONE_WEIGHT: f32 = 0.001;

/// Bone transform (TRS), engine axes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTRS {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTRS {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTRS {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Keyframe relative to the bind pose
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneKeyframe {
    /// Seconds from the start of the clip
    pub time: f32,
    pub transform: BoneTRS,
}

/// Frame range a named clip was sampled over
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledAnimation {
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(u32);

impl BoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct IntermediateBone {
    pub name: String,
    pub handle: NodeHandle,
    /// Host parent, resolved to `parent` by `assemble`
    pub parent_handle: Option<NodeHandle>,
    pub bind_pose: BoneTRS,
    parent: Option<BoneId>,
    children: Vec<BoneId>,
    index: u16,
    connector: bool,
    animations: BTreeMap<String, Vec<BoneKeyframe>>,
}

impl IntermediateBone {
    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    /// Depth-first index; valid after `assign_indices`
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Synthesized bone bridging a non-bone node in the host hierarchy
    pub fn is_connector(&self) -> bool {
        self.connector
    }

    pub fn add_keyframe(&mut self, animation: &str, keyframe: BoneKeyframe) {
        self.animations
            .entry(animation.to_string())
            .or_default()
            .push(keyframe);
    }

    /// Drop a clip's keyframes so it can be sampled again
    pub fn clear_keyframes(&mut self, animation: &str) {
        self.animations.remove(animation);
    }

    pub fn keyframes(&self, animation: &str) -> Option<&[BoneKeyframe]> {
        self.animations.get(animation).map(|k| k.as_slice())
    }

    pub fn keyframes_mut(&mut self, animation: &str) -> Option<&mut Vec<BoneKeyframe>> {
        self.animations.get_mut(animation)
    }

    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(|k| k.as_str())
    }
}

type Influences = SmallVec<[VertexBoneData; 4]>;

#[derive(Debug, Clone, Default)]
pub struct IntermediateSkeleton {
    bones: Vec<IntermediateBone>,
    by_name: HashMap<String, BoneId>,
    by_handle: HashMap<NodeHandle, BoneId>,
    roots: Vec<BoneId>,
    index_order: Vec<BoneId>,
    connector_count: usize,
    vertex_data: BTreeMap<u32, Influences>,
    pending: Option<BTreeMap<u32, Influences>>,
    frame_rate: f32,
    animations: BTreeMap<String, SampledAnimation>,
}

impl IntermediateSkeleton {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Bone pool and hierarchy
    // ========================================================================

    /// Add a bone for a host node; adding the same handle twice returns the first bone
    pub fn add_bone(
        &mut self,
        name: &str,
        handle: NodeHandle,
        parent_handle: Option<NodeHandle>,
    ) -> BoneId {
        self.insert_bone(name, handle, parent_handle, false)
    }

    /// Add a placeholder bone standing in for a non-bone host node
    pub fn add_connecting_bone(
        &mut self,
        handle: NodeHandle,
        parent_handle: Option<NodeHandle>,
    ) -> BoneId {
        if let Some(&id) = self.by_handle.get(&handle) {
            return id;
        }
        let name = format!("Connecting_Bone_{}", self.connector_count);
        self.connector_count += 1;
        self.insert_bone(&name, handle, parent_handle, true)
    }

    fn insert_bone(
        &mut self,
        name: &str,
        handle: NodeHandle,
        parent_handle: Option<NodeHandle>,
        connector: bool,
    ) -> BoneId {
        if let Some(&id) = self.by_handle.get(&handle) {
            return id;
        }
        // Host names need not be unique, engine bone names must be
        let name = self.unique_name(name, handle);
        let id = BoneId(self.bones.len() as u32);
        self.bones.push(IntermediateBone {
            name: name.clone(),
            handle,
            parent_handle,
            bind_pose: BoneTRS::default(),
            parent: None,
            children: Vec::new(),
            index: 0,
            connector,
            animations: BTreeMap::new(),
        });
        self.by_name.insert(name, id);
        self.by_handle.insert(handle, id);
        id
    }

    /// `name`, or `name_<handle>` with a counter appended until it is unused
    fn unique_name(&self, name: &str, handle: NodeHandle) -> String {
        if !self.by_name.contains_key(name) {
            return name.to_string();
        }
        let base = format!("{}_{}", name, handle.0);
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.by_name.contains_key(candidate.as_str()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        candidate
    }

    /// Resolve parent handles into links; unresolved bones become roots
    pub fn assemble(&mut self) {
        self.roots.clear();
        for bone in &mut self.bones {
            bone.parent = None;
            bone.children.clear();
        }
        for i in 0..self.bones.len() {
            let id = BoneId(i as u32);
            let parent = self.bones[i]
                .parent_handle
                .and_then(|h| self.by_handle.get(&h).copied())
                .filter(|&p| p != id);
            match parent {
                Some(p) => {
                    self.bones[i].parent = Some(p);
                    self.bones[p.index()].children.push(id);
                }
                None => self.roots.push(id),
            }
        }
    }

    /// Number bones depth-first from each root in turn
    pub fn assign_indices(&mut self) {
        self.index_order.clear();
        let mut stack: Vec<BoneId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            self.bones[id.index()].index = self.index_order.len() as u16;
            self.index_order.push(id);
            stack.extend(self.bones[id.index()].children.iter().rev().copied());
        }
    }

    pub fn bone(&self, id: BoneId) -> &IntermediateBone {
        &self.bones[id.index()]
    }

    pub fn bone_mut(&mut self, id: BoneId) -> &mut IntermediateBone {
        &mut self.bones[id.index()]
    }

    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn find_bone_by_handle(&self, handle: NodeHandle) -> Option<BoneId> {
        self.by_handle.get(&handle).copied()
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn roots(&self) -> &[BoneId] {
        &self.roots
    }

    /// Bones in depth-first index order
    pub fn index_order(&self) -> &[BoneId] {
        &self.index_order
    }

    pub fn bone_ids(&self) -> impl Iterator<Item = BoneId> {
        (0..self.bones.len() as u32).map(BoneId)
    }

    /// Engine-space bind transform of a bone relative to the mesh
    pub fn world_bind_matrix(&self, id: BoneId) -> Mat4 {
        let bone = self.bone(id);
        let local = bone.bind_pose.matrix();
        match bone.parent {
            Some(p) => self.world_bind_matrix(p) * local,
            None => local,
        }
    }

    /// Indented bone tree, one bone per line
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(BoneId, usize)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let bone = self.bone(id);
            let _ = writeln!(out, "{}{} [{}]", "  ".repeat(depth), bone.name, bone.index);
            stack.extend(bone.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }

    // ========================================================================
    // Vertex assignments
    // ========================================================================

    /// Record an influence; weights below `MIN_BONE_WEIGHT` are dropped
    pub fn add_vertex_data(&mut self, vertex: u32, bone_index: u32, weight: f32) -> bool {
        if weight < MIN_BONE_WEIGHT {
            return false;
        }
        self.vertex_data
            .entry(vertex)
            .or_default()
            .push(VertexBoneData { bone_index, weight });
        true
    }

    pub fn vertex_data(&self, vertex: u32) -> &[VertexBoneData] {
        self.vertex_data
            .get(&vertex)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All assigned vertices in ascending order
    pub fn vertex_assignments(&self) -> impl Iterator<Item = (u32, &[VertexBoneData])> {
        self.vertex_data.iter().map(|(&v, d)| (v, d.as_slice()))
    }

    /// Keep at most `max` influences per vertex, strongest first
    pub fn trim_vertex_assignments(&mut self, max: usize) {
        for influences in self.vertex_data.values_mut() {
            if influences.len() > max {
                influences.sort_by(|a, b| b.weight.total_cmp(&a.weight));
                influences.truncate(max);
            }
        }
    }

    /// Rescale each vertex's weights to sum to one
    pub fn normalize_vertex_assignments(&mut self) {
        for influences in self.vertex_data.values_mut() {
            let total: f32 = influences.iter().map(|d| d.weight).sum();
            if total == 0.0 {
                continue;
            }
            for d in influences.iter_mut() {
                d.weight /= total;
            }
        }
    }

    /// Stage the move of vertex `old`'s influences to index `new`
    ///
    /// The first old vertex staged for a new index wins; later duplicates are
    /// ignored so merged vertices are never weighted twice.
    pub fn prepare_reindex_change(&mut self, old: u32, new: u32) {
        let pending = self.pending.get_or_insert_with(BTreeMap::new);
        if pending.contains_key(&new) {
            return;
        }
        let influences = self.vertex_data.get(&old).cloned().unwrap_or_default();
        pending.insert(new, influences);
    }

    /// Replace the assignment map with the staged one
    pub fn apply_reindex_changes(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.vertex_data = pending.into_iter().filter(|(_, d)| !d.is_empty()).collect();
        }
    }

    // ========================================================================
    // Animation bookkeeping
    // ========================================================================

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn set_frame_rate(&mut self, fps: f32) {
        self.frame_rate = fps;
    }

    pub fn record_animation(&mut self, name: &str, start: f32, end: f32) {
        self.animations
            .insert(name.to_string(), SampledAnimation { start, end });
    }

    pub fn animations(&self) -> impl Iterator<Item = (&str, &SampledAnimation)> {
        self.animations.iter().map(|(k, v)| (k.as_str(), v))
    }
}
