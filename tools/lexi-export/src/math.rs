//! Host ↔ engine axis conventions
//!
//! | engine | host |
//! |--------|------|
//! | x      | x    |
//! | y      | z    |
//! | z      | -y   |
//!
//! The host is Z-up, the engine Y-up. The mapping is a -90° rotation about X,
//! so it preserves handedness: positions, normals, quaternion axes and whole
//! transforms are converted by the same permutation.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::intermediate::BoneTRS;

/// Host → engine axis change as a matrix
pub const HOST_TO_ENGINE: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, -1.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
]);

/// Convert a host-space point or direction to engine axes
#[inline]
pub fn host_to_engine(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Inverse of [`host_to_engine`]
#[inline]
pub fn engine_to_host(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// Rotate a host quaternion's axis into engine space
#[inline]
pub fn host_to_engine_quat(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, q.z, -q.y, q.w)
}

/// Scale is a per-axis magnitude, so only the components are swapped
#[inline]
pub fn host_to_engine_scale(s: Vec3) -> Vec3 {
    Vec3::new(s.x, s.z, s.y)
}

/// Conjugate a whole host transform into engine space
pub fn host_to_engine_matrix(m: Mat4) -> Mat4 {
    HOST_TO_ENGINE * m * HOST_TO_ENGINE.inverse()
}

/// Transform of `node` relative to `parent`, both world-space host matrices
#[inline]
pub fn relative_transform(node: Mat4, parent: Mat4) -> Mat4 {
    parent.inverse() * node
}

/// Decompose a host-space local transform into engine-space TRS
pub fn decompose_to_engine(local: Mat4) -> BoneTRS {
    let (scale, rotation, position) = local.to_scale_rotation_translation();
    BoneTRS {
        position: host_to_engine(position),
        rotation: host_to_engine_quat(rotation.normalize()),
        scale: host_to_engine_scale(scale),
    }
}

/// Matrix that transforms normals alongside `m`
pub fn normal_matrix(m: Mat4) -> Mat3 {
    Mat3::from_mat4(m).inverse().transpose()
}

/// True when the transform mirrors geometry (negative determinant)
#[inline]
pub fn has_negative_parity(m: Mat4) -> bool {
    let r0 = m.x_axis.truncate();
    let r1 = m.y_axis.truncate();
    let r2 = m.z_axis.truncate();
    r0.cross(r1).dot(r2) < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_axis_table() {
        assert_eq!(host_to_engine(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 3.0, -2.0));
        assert_eq!(engine_to_host(host_to_engine(Vec3::new(1.0, 2.0, 3.0))), Vec3::new(1.0, 2.0, 3.0));
        // Host up (Z) becomes engine up (Y)
        assert_eq!(host_to_engine(Vec3::Z), Vec3::Y);
    }

    #[test]
    fn test_matrix_matches_component_mapping() {
        let p = Vec3::new(0.5, -4.0, 2.0);
        assert!(approx(HOST_TO_ENGINE.transform_point3(p), host_to_engine(p)));
    }

    #[test]
    fn test_quat_conversion_matches_matrix_conjugation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 0.5).normalize(), 0.8);
        let v = Vec3::new(0.3, -1.0, 2.0);
        let host_rotated = q * v;
        let engine_rotated = host_to_engine_quat(q) * host_to_engine(v);
        assert!(approx(engine_rotated, host_to_engine(host_rotated)));
    }

    #[test]
    fn test_decompose_to_engine() {
        let local = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.5),
            Vec3::new(0.0, 10.0, 0.0),
        );
        let trs = decompose_to_engine(local);
        assert!(approx(trs.position, Vec3::new(0.0, 0.0, -10.0)));
        assert!(approx(trs.scale, Vec3::new(1.0, 3.0, 2.0)));
        // Rotation about host Z is rotation about engine Y
        let expected = Quat::from_rotation_y(0.5);
        assert!(trs.rotation.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn test_negative_parity() {
        assert!(!has_negative_parity(Mat4::IDENTITY));
        assert!(has_negative_parity(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0))));
        assert!(!has_negative_parity(Mat4::from_scale(Vec3::new(-1.0, -1.0, 1.0))));
    }
}
