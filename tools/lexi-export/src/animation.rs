//! Skeletal animation sampling
//!
//! Every bone is sampled at each frame of the clip. Keyframes are stored as
//! deltas from the bind pose: translation is a difference, rotation is
//! `bind⁻¹ × sampled`, scale follows the configured [`ScaleMode`].

use glam::{Quat, Vec3};

use crate::builder::skeleton::bone_local_transform;
use crate::config::{AnimationSpec, ScaleMode};
use crate::error::ExportError;
use crate::intermediate::{BoneId, BoneKeyframe, BoneTRS, IntermediateSkeleton};
use crate::scene::{NodeHandle, SceneSource};

const KEY_EPSILON: f32 = 1e-6;

/// Upper bound on the frames a single clip or pose animation may sample
pub const MAX_SAMPLED_FRAMES: usize = 100_000;

/// Frames sampled for `start..=end` stepping by `rate`; `end` is always included
///
/// Empty when the range is inverted, the rate is not a positive finite number,
/// or the range would need more than [`MAX_SAMPLED_FRAMES`] samples.
pub fn sample_frames(start: f32, end: f32, rate: f32) -> Vec<f32> {
    let Some(steps) = step_count(start, end, rate) else {
        return Vec::new();
    };
    let mut frames: Vec<f32> = (0..=steps).map(|i| start + i as f32 * rate).collect();
    if frames.last().is_some_and(|&last| end - last > KEY_EPSILON) {
        frames.push(end);
    }
    frames
}

fn step_count(start: f32, end: f32, rate: f32) -> Option<usize> {
    if !rate.is_finite() || rate <= 0.0 || end < start {
        return None;
    }
    let steps = ((end - start) / rate + KEY_EPSILON).floor();
    // One extra frame may be appended for `end`
    (steps.is_finite() && steps + 2.0 <= MAX_SAMPLED_FRAMES as f32).then_some(steps as usize)
}

/// Express a sampled local transform relative to the bind pose
pub fn relative_keyframe(bind: &BoneTRS, sampled: &BoneTRS, mode: ScaleMode) -> BoneTRS {
    let scale = match mode {
        ScaleMode::Identity => Vec3::ONE,
        ScaleMode::Averaged => (sampled.scale + bind.scale) * 0.5,
        ScaleMode::Ratio => sampled.scale / bind.scale,
    };
    BoneTRS {
        position: sampled.position - bind.position,
        rotation: (bind.rotation.inverse() * sampled.rotation).normalize(),
        scale,
    }
}

/// Sample one clip onto every bone of `skeleton`
///
/// Returns the number of keyframes written. A clip sampled again under the
/// same name replaces the previous keys.
pub fn sample_animation(
    scene: &dyn SceneSource,
    mesh_node: NodeHandle,
    skeleton: &mut IntermediateSkeleton,
    spec: &AnimationSpec,
    mode: ScaleMode,
) -> Result<usize, ExportError> {
    if !spec.sample_rate.is_finite() || spec.sample_rate <= 0.0 {
        return Err(ExportError::InvalidAnimation {
            name: spec.name.clone(),
            reason: format!("sample rate {} must be positive and finite", spec.sample_rate),
        });
    }
    if spec.end < spec.start {
        return Err(ExportError::InvalidAnimation {
            name: spec.name.clone(),
            reason: format!("end frame {} precedes start frame {}", spec.end, spec.start),
        });
    }

    let frames = sample_frames(spec.start, spec.end, spec.sample_rate);
    if frames.is_empty() {
        return Err(ExportError::InvalidAnimation {
            name: spec.name.clone(),
            reason: format!(
                "{}..{} at rate {} exceeds {} samples",
                spec.start, spec.end, spec.sample_rate, MAX_SAMPLED_FRAMES
            ),
        });
    }
    let fps = scene.frame_rate().max(1) as f32;
    let order: Vec<BoneId> = skeleton.index_order().to_vec();
    let mut written = 0;

    for id in order {
        let bind = skeleton.bone(id).bind_pose;
        let mut keys: Vec<BoneKeyframe> = frames
            .iter()
            .map(|&frame| {
                let sampled = bone_local_transform(
                    scene,
                    skeleton,
                    mesh_node,
                    id,
                    scene.frame_to_time(frame),
                );
                BoneKeyframe {
                    time: (frame - spec.start) / fps,
                    transform: relative_keyframe(&bind, &sampled, mode),
                }
            })
            .collect();
        if spec.optimize {
            keys = optimize_keyframes(keys);
        }

        let bone = skeleton.bone_mut(id);
        bone.clear_keyframes(&spec.name);
        written += keys.len();
        for key in keys {
            bone.add_keyframe(&spec.name, key);
        }
    }

    skeleton.record_animation(&spec.name, spec.start, spec.end);
    tracing::debug!(
        "Sampled '{}' over frames {}..{} ({} keys)",
        spec.name,
        spec.start,
        spec.end,
        written
    );
    Ok(written)
}

fn same_transform(a: &BoneTRS, b: &BoneTRS) -> bool {
    a.position.abs_diff_eq(b.position, KEY_EPSILON)
        && a.scale.abs_diff_eq(b.scale, KEY_EPSILON)
        && (a.rotation.abs_diff_eq(b.rotation, KEY_EPSILON)
            || a.rotation.abs_diff_eq(-b.rotation, KEY_EPSILON))
}

/// Drop interior keys identical to both of their original neighbours
pub fn optimize_keyframes(keys: Vec<BoneKeyframe>) -> Vec<BoneKeyframe> {
    if keys.len() < 3 {
        return keys;
    }
    let last = keys.len() - 1;
    keys.iter()
        .enumerate()
        .filter(|&(i, key)| {
            i == 0
                || i == last
                || !(same_transform(&keys[i - 1].transform, &key.transform)
                    && same_transform(&key.transform, &keys[i + 1].transform))
        })
        .map(|(_, key)| *key)
        .collect()
}

/// Identity delta, what an unanimated bone samples to
pub fn is_rest_key(key: &BoneKeyframe) -> bool {
    same_transform(
        &key.transform,
        &BoneTRS {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        },
    )
}
