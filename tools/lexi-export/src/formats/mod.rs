//! Binary writers for LEXI engine asset files
//!
//! Re-exports the section definitions from lexi-common.

pub use lexi_common::formats::*;

use anyhow::{Result, bail};
use std::io::Write;

use lexi_common::{Aabb, BoneAssignment, IndexBuffer, Mesh, Skeleton, VertexData};

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    w.write_all(&encode_string(s))?;
    Ok(())
}

fn count_u16(count: usize, what: &str) -> Result<u16> {
    if count > u16::MAX as usize {
        bail!("Too many {} ({})", what, count);
    }
    Ok(count as u16)
}

fn write_vertex_data<W: Write>(w: &mut W, data: &VertexData) -> Result<()> {
    w.write_all(&data.vertex_count.to_le_bytes())?;
    w.write_all(&count_u16(data.elements.len(), "vertex elements")?.to_le_bytes())?;
    for e in &data.elements {
        w.write_all(&encode_vertex_element(
            e.binding,
            e.semantic,
            e.element_type,
            e.index,
        ))?;
    }
    w.write_all(&count_u16(data.bindings.len(), "vertex bindings")?.to_le_bytes())?;
    for buffer in &data.bindings {
        if buffer.data.len() != buffer.vertex_size * data.vertex_count as usize {
            bail!(
                "Vertex buffer holds {} bytes, expected {} × {}",
                buffer.data.len(),
                data.vertex_count,
                buffer.vertex_size
            );
        }
        w.write_all(&count_u16(buffer.vertex_size, "bytes per vertex")?.to_le_bytes())?;
        w.write_all(&buffer.data)?;
    }
    Ok(())
}

fn write_bone_assignments<W: Write>(w: &mut W, assignments: &[BoneAssignment]) -> Result<()> {
    w.write_all(&(assignments.len() as u32).to_le_bytes())?;
    for a in assignments {
        w.write_all(&encode_bone_assignment(a.vertex, a.bone, a.weight))?;
    }
    Ok(())
}

fn write_indices<W: Write>(w: &mut W, indices: &IndexBuffer) -> Result<()> {
    w.write_all(&[indices.index_type() as u8])?;
    w.write_all(&(indices.len() as u32).to_le_bytes())?;
    w.write_all(indices.as_bytes())?;
    Ok(())
}

/// Write a complete LexiMesh file
pub fn write_lexi_mesh<W: Write>(w: &mut W, mesh: &Mesh) -> Result<()> {
    let mut flags = 0;
    if mesh.shared_vertex_data.is_some() {
        flags |= FLAG_SHARED_GEOMETRY;
    }
    if mesh.skeleton_name.is_some() {
        flags |= FLAG_SKELETON;
    }
    // An empty box is written as zeros
    let bounds = if mesh.bounds.is_empty() {
        Aabb {
            min: glam::Vec3::ZERO,
            max: glam::Vec3::ZERO,
        }
    } else {
        mesh.bounds
    };

    let header = LexiMeshHeader {
        submesh_count: count_u16(mesh.submeshes.len(), "submeshes")?,
        flags,
        pose_count: count_u16(mesh.poses.len(), "poses")?,
        animation_count: count_u16(mesh.animations.len(), "animations")?,
        bounds_min: bounds.min.to_array(),
        bounds_max: bounds.max.to_array(),
        bounding_radius: mesh.bounding_radius,
    };
    w.write_all(&header.to_bytes())?;
    write_string(w, mesh.skeleton_name.as_deref().unwrap_or(""))?;

    if let Some(shared) = &mesh.shared_vertex_data {
        write_vertex_data(w, shared)?;
    }
    write_bone_assignments(w, &mesh.shared_bone_assignments)?;

    for submesh in &mesh.submeshes {
        write_string(w, &submesh.material_name)?;
        w.write_all(&[submesh.use_shared_vertices as u8])?;
        write_indices(w, &submesh.indices)?;
        if !submesh.use_shared_vertices {
            match &submesh.vertex_data {
                Some(data) => write_vertex_data(w, data)?,
                None => bail!(
                    "Submesh '{}' has neither shared nor dedicated vertices",
                    submesh.material_name
                ),
            }
        }
        write_bone_assignments(w, &submesh.bone_assignments)?;
    }

    for pose in &mesh.poses {
        write_string(w, &pose.name)?;
        w.write_all(&pose.target.code().to_le_bytes())?;
        w.write_all(&(pose.offsets.len() as u32).to_le_bytes())?;
        for (vertex, offset) in &pose.offsets {
            w.write_all(&vertex.to_le_bytes())?;
            for f in offset {
                w.write_all(&f.to_le_bytes())?;
            }
        }
    }

    for animation in &mesh.animations {
        write_string(w, &animation.name)?;
        w.write_all(&animation.length.to_le_bytes())?;
        w.write_all(&count_u16(animation.tracks.len(), "tracks")?.to_le_bytes())?;
        for track in &animation.tracks {
            w.write_all(&track.target.code().to_le_bytes())?;
            w.write_all(&(track.keyframes.len() as u32).to_le_bytes())?;
            for key in &track.keyframes {
                w.write_all(&key.time.to_le_bytes())?;
                w.write_all(&count_u16(key.refs.len(), "pose references")?.to_le_bytes())?;
                for r in &key.refs {
                    w.write_all(&r.pose_index.to_le_bytes())?;
                    w.write_all(&r.influence.to_le_bytes())?;
                }
            }
        }
    }

    Ok(())
}

/// Write a complete LexiSkeleton file
pub fn write_lexi_skeleton<W: Write>(w: &mut W, skeleton: &Skeleton) -> Result<()> {
    let header = LexiSkeletonHeader::new(
        count_u16(skeleton.bones.len(), "bones")?,
        count_u16(skeleton.animations.len(), "animations")?,
    );
    w.write_all(&header.to_bytes())?;

    for bone in &skeleton.bones {
        w.write_all(&bone.handle.to_le_bytes())?;
        w.write_all(&bone.parent.unwrap_or(NO_PARENT).to_le_bytes())?;
        write_string(w, &bone.name)?;
        w.write_all(&encode_bone_transform(
            bone.position,
            bone.rotation,
            bone.scale,
        ))?;
    }

    for animation in &skeleton.animations {
        write_string(w, &animation.name)?;
        w.write_all(&animation.length.to_le_bytes())?;
        w.write_all(&count_u16(animation.tracks.len(), "tracks")?.to_le_bytes())?;
        for track in &animation.tracks {
            w.write_all(&track.bone.to_le_bytes())?;
            w.write_all(&(track.keyframes.len() as u32).to_le_bytes())?;
            for key in &track.keyframes {
                w.write_all(&key.time.to_le_bytes())?;
                w.write_all(&encode_bone_transform(key.translate, key.rotate, key.scale))?;
            }
        }
    }

    Ok(())
}
