//! Intermediate skeleton → engine skeleton resource

use anyhow::{Context, Result};

use lexi_common::Skeleton;

use crate::config::DEFAULT_FRAME_RATE;
use crate::intermediate::IntermediateSkeleton;

/// Build the engine skeleton
///
/// Bones are created in depth-first index order so every parent exists before
/// its children. One animation is created per sampled clip; its length is the
/// clip's frame span in seconds.
pub fn compile_skeleton(source: &IntermediateSkeleton) -> Result<Skeleton> {
    let mut skeleton = Skeleton::new();

    for &id in source.index_order() {
        let bone = source.bone(id);
        let parent = bone.parent().map(|p| source.bone(p).index());
        let handle = skeleton
            .create_bone(bone.name.as_str(), parent)
            .with_context(|| format!("Failed to create bone '{}'", bone.name))?;
        if let Some(created) = skeleton.bone_mut(handle) {
            created.position = bone.bind_pose.position.to_array();
            created.rotation = bone.bind_pose.rotation.to_array();
            created.scale = bone.bind_pose.scale.to_array();
        }
    }

    let fps = if source.frame_rate() > 0.0 {
        source.frame_rate()
    } else {
        DEFAULT_FRAME_RATE as f32
    };

    for (name, clip) in source.animations() {
        let animation = skeleton.create_animation(name, (clip.end - clip.start) / fps);
        for &id in source.index_order() {
            let bone = source.bone(id);
            let Some(keys) = bone.keyframes(name) else {
                continue;
            };
            let track = animation.create_node_track(bone.index());
            track
                .keyframes
                .extend(keys.iter().map(|k| lexi_common::TransformKeyFrame {
                    time: k.time,
                    translate: k.transform.position.to_array(),
                    rotate: k.transform.rotation.to_array(),
                    scale: k.transform.scale.to_array(),
                }));
        }
        tracing::debug!(
            "Compiled skeleton animation '{}' ({} tracks)",
            name,
            animation.tracks.len()
        );
    }

    Ok(skeleton)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intermediate::{BoneKeyframe, BoneTRS};
    use crate::scene::NodeHandle;
    use glam::{Quat, Vec3};

    fn skeleton() -> IntermediateSkeleton {
        let mut skeleton = IntermediateSkeleton::new();
        // Added child-first; indices still put the parent first
        let child = skeleton.add_bone("Hand", NodeHandle(2), Some(NodeHandle(1)));
        let root = skeleton.add_bone("Arm", NodeHandle(1), None);
        skeleton.assemble();
        skeleton.assign_indices();
        skeleton.bone_mut(child).bind_pose = BoneTRS {
            position: Vec3::new(0.0, 2.0, 0.0),
            ..Default::default()
        };
        skeleton.bone_mut(root).add_keyframe(
            "Wave",
            BoneKeyframe {
                time: 0.0,
                transform: BoneTRS::default(),
            },
        );
        skeleton.bone_mut(root).add_keyframe(
            "Wave",
            BoneKeyframe {
                time: 0.5,
                transform: BoneTRS {
                    rotation: Quat::from_rotation_y(1.0),
                    ..Default::default()
                },
            },
        );
        skeleton.set_frame_rate(30.0);
        skeleton.record_animation("Wave", 0.0, 15.0);
        skeleton
    }

    #[test]
    fn test_bones_parent_first() {
        let compiled = compile_skeleton(&skeleton()).unwrap();
        assert_eq!(compiled.bones.len(), 2);
        assert_eq!(compiled.bones[0].name, "Arm");
        assert_eq!(compiled.bones[0].parent, None);
        assert_eq!(compiled.bones[1].name, "Hand");
        assert_eq!(compiled.bones[1].parent, Some(0));
        assert_eq!(compiled.bones[1].position, [0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_animation_length_and_tracks() {
        let compiled = compile_skeleton(&skeleton()).unwrap();
        assert_eq!(compiled.animations.len(), 1);
        let anim = &compiled.animations[0];
        assert_eq!(anim.name, "Wave");
        assert!((anim.length - 0.5).abs() < 1e-6);
        // Only the animated bone carries a track
        assert_eq!(anim.tracks.len(), 1);
        assert_eq!(anim.tracks[0].bone, 0);
        assert_eq!(anim.tracks[0].keyframes.len(), 2);
    }
}
