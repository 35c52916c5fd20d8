//! Measurements taken on an evaluated calibration pose.
//!
//! Everything here reads a [`WorldPose`] and returns values; nothing mutates the
//! skeleton. Degenerate geometry produces zeros rather than errors or NaN.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationResult;
use crate::math::EPSILON;
use crate::rig::{BoneReferences, BoneRole, Side, WorldPose};

/// Foot distance as a fraction of the measured foot separation
pub const FOOT_DISTANCE_RATIO: f32 = 0.5;
/// Step threshold as a fraction of foot separation, before scaling
pub const STEP_THRESHOLD_RATIO: f32 = 1.0;
/// Step height as a fraction of the foot-to-calf distance, before scaling
pub const STEP_HEIGHT_RATIO: f32 = 0.2;
/// Scale factors below this are raised to it
pub const MIN_SCALE_FACTOR: f32 = 1.0;

/// Normal of the plane through `points`.
///
/// Sums the cross products of consecutive centroid-relative points. Returns
/// `Vec3::ZERO` for fewer than three points or for collinear or coincident input.
pub fn plane_normal(points: &[Vec3]) -> Vec3 {
    if points.len() < 3 {
        return Vec3::ZERO;
    }

    let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    let normal: Vec3 = points
        .windows(2)
        .map(|pair| (pair[0] - centroid).cross(pair[1] - centroid))
        .sum();

    // Relative cutoff so float noise on collinear input does not become a direction
    let spread: f32 = points
        .iter()
        .map(|p| (*p - centroid).length_squared())
        .sum();
    if normal.length() <= EPSILON * spread {
        return Vec3::ZERO;
    }
    normal.normalize_or_zero()
}

/// Knee plane normals in the root's rotation frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KneeBendNormals {
    pub left: Vec3,
    pub right: Vec3,
}

impl KneeBendNormals {
    pub fn get(&self, side: Side) -> Vec3 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Estimate each leg's bend normal from thigh, calf and foot positions.
///
/// An unset joint is read as the world origin, so a leg with missing joints
/// yields a degenerate (possibly zero) normal instead of an error.
pub fn knee_bend_normals(pose: &WorldPose<'_>, references: &BoneReferences) -> KneeBendNormals {
    let root_inverse = references
        .root
        .map(|root| pose.rotation(root).inverse())
        .unwrap_or(Quat::IDENTITY);

    let leg_normal = |side: Side| {
        let limb = references.limb(side);
        let points = [
            pose.position_or_origin(limb.thigh),
            pose.position_or_origin(limb.calf),
            pose.position_or_origin(limb.foot),
        ];
        root_inverse * plane_normal(&points)
    };

    KneeBendNormals {
        left: leg_normal(Side::Left),
        right: leg_normal(Side::Right),
    }
}

/// Bend normals re-expressed relative to the pelvis local rotation, as the solver stores them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KneeBendHint {
    pub left: Vec3,
    pub right: Vec3,
}

impl KneeBendHint {
    pub fn relative_to_pelvis(normals: &KneeBendNormals, pelvis_local_rotation: Quat) -> Self {
        let inverse = pelvis_local_rotation.inverse();
        Self {
            left: inverse * normals.left,
            right: inverse * normals.right,
        }
    }

    pub fn get(&self, side: Side) -> Vec3 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Avatar-relative stepping parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocomotionScale {
    pub foot_distance: f32,
    pub step_threshold: f32,
    pub step_height: f32,
}

impl LocomotionScale {
    /// Every parameter multiplied by a runtime avatar-scale modifier
    pub fn scaled(&self, modifier: f32) -> Self {
        Self {
            foot_distance: self.foot_distance * modifier,
            step_threshold: self.step_threshold * modifier,
            step_height: self.step_height * modifier,
        }
    }
}

/// Derive locomotion parameters from foot and calf positions and the pelvis scale
pub fn measure_locomotion(
    pose: &WorldPose<'_>,
    references: &BoneReferences,
) -> CalibrationResult<LocomotionScale> {
    let pelvis = references.require(BoneRole::Pelvis)?;
    let left_foot = pose.position(references.require(BoneRole::Foot(Side::Left))?);
    let right_foot = pose.position(references.require(BoneRole::Foot(Side::Right))?);
    let left_calf = pose.position(references.require(BoneRole::Calf(Side::Left))?);

    let scale = pose.lossy_scale(pelvis).x.max(MIN_SCALE_FACTOR);
    let foot_separation = left_foot.distance(right_foot);

    Ok(LocomotionScale {
        foot_distance: foot_separation * FOOT_DISTANCE_RATIO,
        step_threshold: foot_separation * STEP_THRESHOLD_RATIO * scale,
        step_height: left_foot.distance(left_calf) * STEP_HEIGHT_RATIO * scale,
    })
}
