//! Linear algebra primitives using glam plus the few helpers calibration needs.

pub use glam::{EulerRot, Quat, Vec3};

/// Small epsilon value for floating-point comparisons
pub const EPSILON: f32 = 1e-6;

/// Euler order used for every per-bone angle decomposition
pub const EULER_ORDER: EulerRot = EulerRot::XYZ;

/// Principal rotation axis of a bone's local frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index into an `(x, y, z)` triple
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Build a local rotation from per-axis angles in radians.
#[inline]
pub fn quat_from_angles(angles: [f32; 3]) -> Quat {
    Quat::from_euler(EULER_ORDER, angles[0], angles[1], angles[2])
}

/// Split a rotation into per-axis angles in radians (inverse of [`quat_from_angles`]).
#[inline]
pub fn angles_from_quat(q: Quat) -> [f32; 3] {
    let (x, y, z) = q.to_euler(EULER_ORDER);
    [x, y, z]
}

/// Component-wise vector comparison with an absolute tolerance.
pub fn approx_eq_vec3(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    (a - b).abs().max_element() <= tolerance
}

/// Compare two rotations regardless of quaternion sign.
pub fn approx_eq_quat(a: Quat, b: Quat, tolerance: f32) -> bool {
    a.dot(b).abs() >= 1.0 - tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_roundtrip() {
        let angles = [0.3, -0.4, 0.2];
        let back = angles_from_quat(quat_from_angles(angles));
        for i in 0..3 {
            assert!(
                (angles[i] - back[i]).abs() < 1e-5,
                "axis {} drifted: {} -> {}",
                i,
                angles[i],
                back[i]
            );
        }
    }

    #[test]
    fn test_vec3_tolerance_is_per_component() {
        assert!(approx_eq_vec3(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0005, 2.0, 2.9995), 1e-3));
        assert!(!approx_eq_vec3(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.01), 1e-3));
    }

    #[test]
    fn test_quat_sign_insensitive() {
        let q = Quat::from_rotation_y(0.7);
        assert!(approx_eq_quat(q, -q, 1e-6));
        assert!(!approx_eq_quat(q, Quat::IDENTITY, 1e-3));
    }
}
