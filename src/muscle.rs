//! Humanoid muscle channels.
//!
//! A muscle is one normalized rotation channel of one humanoid bone. A value of
//! 0 is the bone's neutral orientation, +1 reaches `max_deg` and -1 reaches
//! `min_deg` about the muscle's axis. Values outside [-1, 1] extrapolate.
//!
//! The neutral pose is derived per rig so that [`IK_POSE_MUSCLES`] lands exactly
//! on the rest pose. All-zero muscles are the crouched neutral stance.

use static_assertions::const_assert_eq;

use crate::math::Axis;
use crate::rig::{HumanBone, Side};

/// Number of muscle channels in a humanoid pose
pub const MUSCLE_COUNT: usize = 95;

/// Static description of one muscle channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuscleDef {
    pub name: &'static str,
    pub bone: HumanBone,
    pub axis: Axis,
    /// Angle reached at -1, in degrees
    pub min_deg: f32,
    /// Angle reached at +1, in degrees
    pub max_deg: f32,
}

impl MuscleDef {
    /// Right-side channels about Y and Z turn the opposite way so both sides mirror
    pub fn mirror_sign(&self) -> f32 {
        match (self.bone.side(), self.axis) {
            (Some(Side::Right), Axis::Y | Axis::Z) => -1.0,
            _ => 1.0,
        }
    }
}

const fn m(name: &'static str, bone: HumanBone, axis: Axis, min_deg: f32, max_deg: f32) -> MuscleDef {
    MuscleDef {
        name,
        bone,
        axis,
        min_deg,
        max_deg,
    }
}

use Axis::{X, Y, Z};
use HumanBone as B;

/// Muscle table in humanoid muscle order.
///
/// Torso and leg channels use X for front-back, Z for left-right and Y for twist.
/// Arm channels follow the arm's own frame, where the bone points along X.
/// Stretch and arm raise channels have their `max_deg` on the negative side of
/// the axis, which is where extension lies for a Y-up, Z-forward rig.
pub const MUSCLES: [MuscleDef; MUSCLE_COUNT] = [
    // Spine, chest, upper chest
    m("Spine Front-Back", B::Spine, X, -40.0, 40.0),
    m("Spine Left-Right", B::Spine, Z, -40.0, 40.0),
    m("Spine Twist Left-Right", B::Spine, Y, -40.0, 40.0),
    m("Chest Front-Back", B::Chest, X, -40.0, 40.0),
    m("Chest Left-Right", B::Chest, Z, -40.0, 40.0),
    m("Chest Twist Left-Right", B::Chest, Y, -40.0, 40.0),
    m("UpperChest Front-Back", B::UpperChest, X, -20.0, 20.0),
    m("UpperChest Left-Right", B::UpperChest, Z, -20.0, 20.0),
    m("UpperChest Twist Left-Right", B::UpperChest, Y, -20.0, 20.0),
    // Neck, head
    m("Neck Nod Down-Up", B::Neck, X, -40.0, 40.0),
    m("Neck Tilt Left-Right", B::Neck, Z, -40.0, 40.0),
    m("Neck Turn Left-Right", B::Neck, Y, -40.0, 40.0),
    m("Head Nod Down-Up", B::Head, X, -40.0, 40.0),
    m("Head Tilt Left-Right", B::Head, Z, -40.0, 40.0),
    m("Head Turn Left-Right", B::Head, Y, -40.0, 40.0),
    // Eyes, jaw
    m("Left Eye Down-Up", B::LeftEye, X, -10.0, 15.0),
    m("Left Eye In-Out", B::LeftEye, Y, -20.0, 20.0),
    m("Right Eye Down-Up", B::RightEye, X, -10.0, 15.0),
    m("Right Eye In-Out", B::RightEye, Y, -20.0, 20.0),
    m("Jaw Close", B::Jaw, X, -10.0, 10.0),
    m("Jaw Left-Right", B::Jaw, Y, -10.0, 10.0),
    // Left leg
    m("Left Upper Leg Front-Back", B::LeftUpperLeg, X, -90.0, 50.0),
    m("Left Upper Leg In-Out", B::LeftUpperLeg, Z, -60.0, 60.0),
    m("Left Upper Leg Twist In-Out", B::LeftUpperLeg, Y, -60.0, 60.0),
    m("Left Lower Leg Stretch", B::LeftLowerLeg, X, 80.0, -80.0),
    m("Left Lower Leg Twist In-Out", B::LeftLowerLeg, Y, -90.0, 90.0),
    m("Left Foot Up-Down", B::LeftFoot, X, -50.0, 50.0),
    m("Left Foot Twist In-Out", B::LeftFoot, Y, -30.0, 30.0),
    m("Left Toes Up-Down", B::LeftToes, X, -50.0, 50.0),
    // Right leg
    m("Right Upper Leg Front-Back", B::RightUpperLeg, X, -90.0, 50.0),
    m("Right Upper Leg In-Out", B::RightUpperLeg, Z, -60.0, 60.0),
    m("Right Upper Leg Twist In-Out", B::RightUpperLeg, Y, -60.0, 60.0),
    m("Right Lower Leg Stretch", B::RightLowerLeg, X, 80.0, -80.0),
    m("Right Lower Leg Twist In-Out", B::RightLowerLeg, Y, -90.0, 90.0),
    m("Right Foot Up-Down", B::RightFoot, X, -50.0, 50.0),
    m("Right Foot Twist In-Out", B::RightFoot, Y, -30.0, 30.0),
    m("Right Toes Up-Down", B::RightToes, X, -50.0, 50.0),
    // Left arm
    m("Left Shoulder Down-Up", B::LeftShoulder, Z, 15.0, -30.0),
    m("Left Shoulder Front-Back", B::LeftShoulder, Y, -15.0, 15.0),
    m("Left Arm Down-Up", B::LeftUpperArm, Z, 60.0, -100.0),
    m("Left Arm Front-Back", B::LeftUpperArm, Y, -100.0, 100.0),
    m("Left Arm Twist In-Out", B::LeftUpperArm, X, -90.0, 90.0),
    m("Left Forearm Stretch", B::LeftLowerArm, Y, 80.0, -80.0),
    m("Left Forearm Twist In-Out", B::LeftLowerArm, X, -90.0, 90.0),
    m("Left Hand Down-Up", B::LeftHand, Z, -80.0, 80.0),
    m("Left Hand In-Out", B::LeftHand, Y, -40.0, 40.0),
    // Right arm
    m("Right Shoulder Down-Up", B::RightShoulder, Z, 15.0, -30.0),
    m("Right Shoulder Front-Back", B::RightShoulder, Y, -15.0, 15.0),
    m("Right Arm Down-Up", B::RightUpperArm, Z, 60.0, -100.0),
    m("Right Arm Front-Back", B::RightUpperArm, Y, -100.0, 100.0),
    m("Right Arm Twist In-Out", B::RightUpperArm, X, -90.0, 90.0),
    m("Right Forearm Stretch", B::RightLowerArm, Y, 80.0, -80.0),
    m("Right Forearm Twist In-Out", B::RightLowerArm, X, -90.0, 90.0),
    m("Right Hand Down-Up", B::RightHand, Z, -80.0, 80.0),
    m("Right Hand In-Out", B::RightHand, Y, -40.0, 40.0),
    // Left fingers
    m("LeftHand.Thumb.1 Stretched", B::LeftThumbProximal, Z, -20.0, 20.0),
    m("LeftHand.Thumb.Spread", B::LeftThumbProximal, Y, -25.0, 25.0),
    m("LeftHand.Thumb.2 Stretched", B::LeftThumbIntermediate, Z, -40.0, 35.0),
    m("LeftHand.Thumb.3 Stretched", B::LeftThumbDistal, Z, -40.0, 35.0),
    m("LeftHand.Index.1 Stretched", B::LeftIndexProximal, Z, -50.0, 50.0),
    m("LeftHand.Index.Spread", B::LeftIndexProximal, Y, -20.0, 20.0),
    m("LeftHand.Index.2 Stretched", B::LeftIndexIntermediate, Z, -45.0, 45.0),
    m("LeftHand.Index.3 Stretched", B::LeftIndexDistal, Z, -45.0, 45.0),
    m("LeftHand.Middle.1 Stretched", B::LeftMiddleProximal, Z, -50.0, 50.0),
    m("LeftHand.Middle.Spread", B::LeftMiddleProximal, Y, -7.5, 7.5),
    m("LeftHand.Middle.2 Stretched", B::LeftMiddleIntermediate, Z, -45.0, 45.0),
    m("LeftHand.Middle.3 Stretched", B::LeftMiddleDistal, Z, -45.0, 45.0),
    m("LeftHand.Ring.1 Stretched", B::LeftRingProximal, Z, -50.0, 50.0),
    m("LeftHand.Ring.Spread", B::LeftRingProximal, Y, -7.5, 7.5),
    m("LeftHand.Ring.2 Stretched", B::LeftRingIntermediate, Z, -45.0, 45.0),
    m("LeftHand.Ring.3 Stretched", B::LeftRingDistal, Z, -45.0, 45.0),
    m("LeftHand.Little.1 Stretched", B::LeftLittleProximal, Z, -50.0, 50.0),
    m("LeftHand.Little.Spread", B::LeftLittleProximal, Y, -20.0, 20.0),
    m("LeftHand.Little.2 Stretched", B::LeftLittleIntermediate, Z, -45.0, 45.0),
    m("LeftHand.Little.3 Stretched", B::LeftLittleDistal, Z, -45.0, 45.0),
    // Right fingers
    m("RightHand.Thumb.1 Stretched", B::RightThumbProximal, Z, -20.0, 20.0),
    m("RightHand.Thumb.Spread", B::RightThumbProximal, Y, -25.0, 25.0),
    m("RightHand.Thumb.2 Stretched", B::RightThumbIntermediate, Z, -40.0, 35.0),
    m("RightHand.Thumb.3 Stretched", B::RightThumbDistal, Z, -40.0, 35.0),
    m("RightHand.Index.1 Stretched", B::RightIndexProximal, Z, -50.0, 50.0),
    m("RightHand.Index.Spread", B::RightIndexProximal, Y, -20.0, 20.0),
    m("RightHand.Index.2 Stretched", B::RightIndexIntermediate, Z, -45.0, 45.0),
    m("RightHand.Index.3 Stretched", B::RightIndexDistal, Z, -45.0, 45.0),
    m("RightHand.Middle.1 Stretched", B::RightMiddleProximal, Z, -50.0, 50.0),
    m("RightHand.Middle.Spread", B::RightMiddleProximal, Y, -7.5, 7.5),
    m("RightHand.Middle.2 Stretched", B::RightMiddleIntermediate, Z, -45.0, 45.0),
    m("RightHand.Middle.3 Stretched", B::RightMiddleDistal, Z, -45.0, 45.0),
    m("RightHand.Ring.1 Stretched", B::RightRingProximal, Z, -50.0, 50.0),
    m("RightHand.Ring.Spread", B::RightRingProximal, Y, -7.5, 7.5),
    m("RightHand.Ring.2 Stretched", B::RightRingIntermediate, Z, -45.0, 45.0),
    m("RightHand.Ring.3 Stretched", B::RightRingDistal, Z, -45.0, 45.0),
    m("RightHand.Little.1 Stretched", B::RightLittleProximal, Z, -50.0, 50.0),
    m("RightHand.Little.Spread", B::RightLittleProximal, Y, -20.0, 20.0),
    m("RightHand.Little.2 Stretched", B::RightLittleIntermediate, Z, -45.0, 45.0),
    m("RightHand.Little.3 Stretched", B::RightLittleDistal, Z, -45.0, 45.0),
];

const_assert_eq!(MUSCLES.len(), MUSCLE_COUNT);

/// Reference stance forced during calibration, one value per muscle channel.
#[rustfmt::skip]
pub const IK_POSE_MUSCLES: [f32; MUSCLE_COUNT] = [
    0.00133321, 8.195831E-06, 8.537738E-07, -0.002669832, -7.651234E-06, -0.001659694, 0.0, 0.0, 0.0,
    0.04213953, 0.0003007996, -0.008032114, -0.03059979, -0.0003182998, 0.009640567,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.5768794, 0.01061097, -0.1127839, 0.9705755, 0.07972051, -0.0268422, 0.007237188, 0.0,
    0.5768792, 0.01056608, -0.1127519, 0.9705756, 0.07971933, -0.02682396, 0.007229362, 0.0,
    -5.651802E-06, -3.034899E-07, 0.4100508, 0.3610304, -0.0838329, 0.9262537, 0.1353517, -0.03578902, 0.06005657,
    -4.95989E-06, -1.43007E-06, 0.4096187, 0.363263, -0.08205152, 0.9250782, 0.1345718, -0.03572125, 0.06055461,
    -1.079177, 0.2095419, 0.6140652, 0.6365265, 0.6683931, -0.4764312, 0.8099416, 0.8099371, 0.6658203, -0.7327053,
    0.8113618, 0.8114051, 0.6643661, -0.40341, 0.8111364, 0.8111367, 0.6170399, -0.2524227, 0.8138723, 0.8110135,
    -1.079171, 0.2095456, 0.6140658, 0.6365255, 0.6683878, -0.4764301, 0.8099402, 0.8099376, 0.6658241, -0.7327023,
    0.8113653, 0.8113793, 0.664364, -0.4034042, 0.811136, 0.8111364, 0.6170469, -0.2524345, 0.8138595, 0.8110138,
];

/// Joint angle in degrees for a normalized muscle value
#[inline]
pub fn muscle_to_angle(def: &MuscleDef, value: f32) -> f32 {
    if value >= 0.0 {
        value * def.max_deg
    } else {
        -value * def.min_deg
    }
}

/// Normalized muscle value for a joint angle in degrees (inverse of [`muscle_to_angle`])
#[inline]
pub fn angle_to_muscle(def: &MuscleDef, angle_deg: f32) -> f32 {
    if angle_deg >= 0.0 {
        if def.max_deg.abs() < f32::EPSILON {
            0.0
        } else {
            angle_deg / def.max_deg
        }
    } else if def.min_deg.abs() < f32::EPSILON {
        0.0
    } else {
        -angle_deg / def.min_deg
    }
}

/// Muscle channels driving `bone`, as `(channel index, definition)`
pub fn muscles_for(bone: HumanBone) -> impl Iterator<Item = (usize, &'static MuscleDef)> {
    MUSCLES
        .iter()
        .enumerate()
        .filter(move |(_, def)| def.bone == bone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_bone_axis_is_driven_twice() {
        for bone in HumanBone::ALL {
            let mut seen = [false; 3];
            for (i, def) in muscles_for(bone) {
                assert!(
                    !seen[def.axis.index()],
                    "muscle {} ({}) reuses axis {:?} of {:?}",
                    i,
                    def.name,
                    def.axis,
                    bone
                );
                seen[def.axis.index()] = true;
            }
        }
    }

    #[test]
    fn test_hips_have_no_muscles() {
        assert_eq!(muscles_for(HumanBone::Hips).count(), 0);
        assert_eq!(muscles_for(HumanBone::LeftUpperLeg).count(), 3);
    }

    #[test]
    fn test_muscle_angle_inverse() {
        let def = MUSCLES[21];
        for value in [-1.2, -0.5, 0.0, 0.25, 1.0] {
            let back = angle_to_muscle(&def, muscle_to_angle(&def, value));
            assert!((back - value).abs() < 1e-5, "{} -> {}", value, back);
        }
        // Asymmetric limits
        assert_eq!(muscle_to_angle(&def, 1.0), 50.0);
        assert_eq!(muscle_to_angle(&def, -1.0), -90.0);
    }

    #[test]
    fn test_stretch_extends_toward_negative_angles() {
        let knee = MUSCLES[24];
        assert_eq!(knee.name, "Left Lower Leg Stretch");
        assert_eq!(muscle_to_angle(&knee, 1.0), -80.0);
        assert_eq!(muscle_to_angle(&knee, -0.5), 40.0);
        for angle in [40.0, -40.0, 0.0] {
            let back = muscle_to_angle(&knee, angle_to_muscle(&knee, angle));
            assert!((back - angle).abs() < 1e-4, "{} -> {}", angle, back);
        }
        // The reference stance sits near full extension
        assert!(muscle_to_angle(&knee, IK_POSE_MUSCLES[24]) < -75.0);
    }

    #[test]
    fn test_right_side_mirrors() {
        assert_eq!(MUSCLES[21].mirror_sign(), 1.0);
        // Right upper leg in-out (Z) and front-back (X)
        assert_eq!(MUSCLES[30].mirror_sign(), -1.0);
        assert_eq!(MUSCLES[29].mirror_sign(), 1.0);
        assert_eq!(MUSCLES[0].mirror_sign(), 1.0);
    }

    #[test]
    fn test_zero_range_guard() {
        let def = m("Fixed", HumanBone::Jaw, Axis::X, 0.0, 0.0);
        assert_eq!(angle_to_muscle(&def, 12.0), 0.0);
        assert_eq!(angle_to_muscle(&def, -12.0), 0.0);
    }

    #[test]
    fn test_ik_pose_table_values() {
        assert_eq!(IK_POSE_MUSCLES[0], 0.00133321);
        assert_eq!(IK_POSE_MUSCLES[24], 0.9705755);
        assert_eq!(IK_POSE_MUSCLES[55], -1.079177);
        assert_eq!(IK_POSE_MUSCLES[94], 0.8110138);
    }
}
