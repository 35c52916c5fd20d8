//! Reference humanoid rig.
//!
//! A Y-up, +Z-forward mannequin whose left side lies along -X. Lengths are in
//! meters at scale 1. The rest pose is the IK reference stance, with a slight
//! knee bend by default; straight legs are available through [`MannequinOptions`].

use glam::{Quat, Vec3};

use super::humanoid::{Avatar, HumanoidMap};
use super::id::{HumanBone, Side};
use super::skeleton::{JointId, Skeleton};
use crate::error::CalibrationResult;

/// Hips height above the root (meters)
pub const DEFAULT_HIPS_Y: f32 = 1.0;
/// Default distance between the two ankle joints (meters)
pub const DEFAULT_FOOT_SEPARATION: f32 = 0.2;
/// Hip joint drop below the pelvis (meters)
pub const HIP_OFFSET_Y: f32 = 0.05;
pub const THIGH_LENGTH: f32 = 0.45;
pub const SHIN_LENGTH: f32 = 0.45;
/// Default forward offset of the knee in the rest pose
pub const KNEE_FORWARD: f32 = 0.03;

pub const SPINE_OFFSET: Vec3 = Vec3::new(0.0, 0.1, 0.0);
pub const CHEST_OFFSET: Vec3 = Vec3::new(0.0, 0.15, 0.0);
pub const UPPER_CHEST_OFFSET: Vec3 = Vec3::new(0.0, 0.15, 0.0);
pub const NECK_OFFSET: Vec3 = Vec3::new(0.0, 0.15, 0.0);
pub const HEAD_OFFSET: Vec3 = Vec3::new(0.0, 0.1, 0.0);
pub const TOE_OFFSET: Vec3 = Vec3::new(0.0, -0.04, 0.12);

/// Mannequin shape knobs for exercising calibration edge cases.
#[derive(Debug, Clone)]
pub struct MannequinOptions {
    /// Uniform scale applied at the root
    pub scale: f32,
    /// Horizontal distance between the ankles at scale 1
    pub foot_separation: f32,
    /// Forward offset of each knee in the rest pose; 0 gives straight legs
    pub knee_forward: f32,
    /// Names of the unmapped joints hanging off each foot; `None` leaves that foot bare
    pub toe_names: [Option<String>; 2],
    /// Map the toe joints in the humanoid description
    pub map_toes: bool,
    /// Give each hand a full set of finger joints
    pub fingers: bool,
    /// Leave the upper chest out of the humanoid map so detection lands one joint low
    pub chest_misdetected: bool,
}

impl Default for MannequinOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            foot_separation: DEFAULT_FOOT_SEPARATION,
            knee_forward: KNEE_FORWARD,
            toe_names: [
                Some("LeftToeBase".to_string()),
                Some("RightToeBase".to_string()),
            ],
            map_toes: true,
            fingers: true,
            chest_misdetected: false,
        }
    }
}

fn side_sign(side: Side) -> f32 {
    match side {
        Side::Left => -1.0,
        Side::Right => 1.0,
    }
}

fn side_name(side: Side) -> &'static str {
    match side {
        Side::Left => "Left",
        Side::Right => "Right",
    }
}

struct Builder {
    skeleton: Skeleton,
    map: HumanoidMap,
}

impl Builder {
    fn joint(
        &mut self,
        name: String,
        parent: JointId,
        offset: Vec3,
        bone: Option<HumanBone>,
    ) -> CalibrationResult<JointId> {
        let id = self.skeleton.add_joint(name, parent, offset, Quat::IDENTITY)?;
        if let Some(bone) = bone {
            self.map.set(bone, Some(id));
        }
        Ok(id)
    }

    fn leg(&mut self, hips: JointId, side: Side, options: &MannequinOptions) -> CalibrationResult<()> {
        let s = side_sign(side);
        let n = side_name(side);
        let (upper, lower, foot, toes) = match side {
            Side::Left => (
                HumanBone::LeftUpperLeg,
                HumanBone::LeftLowerLeg,
                HumanBone::LeftFoot,
                HumanBone::LeftToes,
            ),
            Side::Right => (
                HumanBone::RightUpperLeg,
                HumanBone::RightLowerLeg,
                HumanBone::RightFoot,
                HumanBone::RightToes,
            ),
        };

        let half = options.foot_separation * 0.5;
        let thigh = self.joint(
            format!("{n}UpperLeg"),
            hips,
            Vec3::new(s * half, -HIP_OFFSET_Y, 0.0),
            Some(upper),
        )?;
        let calf = self.joint(
            format!("{n}LowerLeg"),
            thigh,
            Vec3::new(0.0, -THIGH_LENGTH, options.knee_forward),
            Some(lower),
        )?;
        let ankle = self.joint(
            format!("{n}Foot"),
            calf,
            Vec3::new(0.0, -SHIN_LENGTH, -options.knee_forward),
            Some(foot),
        )?;

        let toe_name = match side {
            Side::Left => options.toe_names[0].clone(),
            Side::Right => options.toe_names[1].clone(),
        };
        if let Some(name) = toe_name {
            let mapped = options.map_toes.then_some(toes);
            self.joint(name, ankle, TOE_OFFSET, mapped)?;
        }
        Ok(())
    }

    fn arm(&mut self, chest: JointId, side: Side, options: &MannequinOptions) -> CalibrationResult<()> {
        let s = side_sign(side);
        let n = side_name(side);
        let (shoulder_bone, upper_bone, lower_bone, hand_bone) = match side {
            Side::Left => (
                HumanBone::LeftShoulder,
                HumanBone::LeftUpperArm,
                HumanBone::LeftLowerArm,
                HumanBone::LeftHand,
            ),
            Side::Right => (
                HumanBone::RightShoulder,
                HumanBone::RightUpperArm,
                HumanBone::RightLowerArm,
                HumanBone::RightHand,
            ),
        };

        let shoulder = self.joint(
            format!("{n}Shoulder"),
            chest,
            Vec3::new(s * 0.05, 0.1, 0.0),
            Some(shoulder_bone),
        )?;
        let upper = self.joint(
            format!("{n}UpperArm"),
            shoulder,
            Vec3::new(s * 0.12, 0.0, 0.0),
            Some(upper_bone),
        )?;
        let lower = self.joint(
            format!("{n}LowerArm"),
            upper,
            Vec3::new(s * 0.28, 0.0, 0.0),
            Some(lower_bone),
        )?;
        let hand = self.joint(
            format!("{n}Hand"),
            lower,
            Vec3::new(s * 0.25, 0.0, 0.0),
            Some(hand_bone),
        )?;

        if options.fingers {
            let phalanges = HumanBone::fingers(side);
            for (finger, bones) in phalanges.chunks(3).enumerate() {
                let spread = (finger as f32 - 2.0) * 0.02;
                let mut parent = hand;
                for (segment, bone) in bones.iter().enumerate() {
                    let offset = if segment == 0 {
                        Vec3::new(s * 0.08, 0.0, spread)
                    } else {
                        Vec3::new(s * 0.03, 0.0, 0.0)
                    };
                    parent = self.joint(format!("{:?}", bone), parent, offset, Some(*bone))?;
                }
            }
        }
        Ok(())
    }
}

/// Build the reference humanoid avatar.
pub fn build_mannequin(options: &MannequinOptions) -> CalibrationResult<Avatar> {
    let mut b = Builder {
        skeleton: Skeleton::new("Avatar"),
        map: HumanoidMap::new(),
    };
    let root = b.skeleton.root();
    b.skeleton.set_local_scale(root, Vec3::splat(options.scale));

    let hips = b.joint(
        "Hips".to_string(),
        root,
        Vec3::new(0.0, DEFAULT_HIPS_Y, 0.0),
        Some(HumanBone::Hips),
    )?;
    b.leg(hips, Side::Left, options)?;
    b.leg(hips, Side::Right, options)?;

    let spine = b.joint("Spine".to_string(), hips, SPINE_OFFSET, Some(HumanBone::Spine))?;
    let chest = b.joint("Chest".to_string(), spine, CHEST_OFFSET, Some(HumanBone::Chest))?;
    let upper_chest_bone = (!options.chest_misdetected).then_some(HumanBone::UpperChest);
    let upper_chest = b.joint(
        "UpperChest".to_string(),
        chest,
        UPPER_CHEST_OFFSET,
        upper_chest_bone,
    )?;
    let neck = b.joint("Neck".to_string(), upper_chest, NECK_OFFSET, Some(HumanBone::Neck))?;
    b.joint("Head".to_string(), neck, HEAD_OFFSET, Some(HumanBone::Head))?;

    b.arm(upper_chest, Side::Left, options)?;
    b.arm(upper_chest, Side::Right, options)?;

    Ok(Avatar::new(b.skeleton, b.map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mannequin_feet_near_ground() {
        let mut avatar = build_mannequin(&MannequinOptions::default()).unwrap();
        let map = avatar.humanoid.clone().unwrap();
        let pose = avatar.skeleton.evaluate();

        let left = pose.position(map.get(HumanBone::LeftFoot).unwrap());
        let right = pose.position(map.get(HumanBone::RightFoot).unwrap());
        assert!(left.y < 0.1 && right.y < 0.1);
        assert!(
            (left.distance(right) - DEFAULT_FOOT_SEPARATION).abs() < 1e-5,
            "feet should be {} apart, got {}",
            DEFAULT_FOOT_SEPARATION,
            left.distance(right)
        );

        let head = pose.position(map.get(HumanBone::Head).unwrap());
        assert!(head.y > pose.position(map.get(HumanBone::Hips).unwrap()).y);
    }

    #[test]
    fn test_mannequin_scale_applies_from_root() {
        let mut avatar = build_mannequin(&MannequinOptions {
            scale: 2.0,
            ..MannequinOptions::default()
        })
        .unwrap();
        let hips = avatar.humanoid.as_ref().unwrap().get(HumanBone::Hips).unwrap();
        let pose = avatar.skeleton.evaluate();
        assert_eq!(pose.lossy_scale(hips), Vec3::splat(2.0));
        assert!((pose.position(hips).y - 2.0 * DEFAULT_HIPS_Y).abs() < 1e-5);
    }

    #[test]
    fn test_mannequin_without_fingers_has_bare_hands() {
        let avatar = build_mannequin(&MannequinOptions {
            fingers: false,
            ..MannequinOptions::default()
        })
        .unwrap();
        let hand = avatar.skeleton.find("LeftHand").unwrap();
        assert!(avatar.skeleton.children(hand).is_empty());
    }
}
