//! Rig-independent pose snapshots.
//!
//! A [`HumanPose`] stores the body root transform plus one normalized value per
//! muscle channel, so the same snapshot can be written back regardless of how
//! the rig lays out its joints.

use glam::{Quat, Vec3};

use crate::error::{CalibrationError, CalibrationResult};
use crate::math::{angles_from_quat, quat_from_angles};
use crate::muscle::{
    angle_to_muscle, muscle_to_angle, muscles_for, IK_POSE_MUSCLES, MUSCLES, MUSCLE_COUNT,
};
use crate::rig::{Avatar, HumanBone, JointId, Skeleton};

/// Full-body pose expressed as muscle values relative to the neutral stance
#[derive(Debug, Clone, PartialEq)]
pub struct HumanPose {
    /// Hips local position
    pub body_position: Vec3,
    /// Hips local rotation relative to its rest rotation
    pub body_rotation: Quat,
    pub muscles: [f32; MUSCLE_COUNT],
}

impl Default for HumanPose {
    fn default() -> Self {
        Self {
            body_position: Vec3::ZERO,
            body_rotation: Quat::IDENTITY,
            muscles: [0.0; MUSCLE_COUNT],
        }
    }
}

impl HumanPose {
    /// Build a pose from an externally supplied channel list
    pub fn from_muscles(
        body_position: Vec3,
        body_rotation: Quat,
        values: &[f32],
    ) -> CalibrationResult<Self> {
        let muscles: [f32; MUSCLE_COUNT] =
            values
                .try_into()
                .map_err(|_| CalibrationError::MuscleCountMismatch {
                    expected: MUSCLE_COUNT,
                    found: values.len(),
                })?;
        Ok(Self {
            body_position,
            body_rotation,
            muscles,
        })
    }

    #[inline]
    pub fn muscle(&self, index: usize) -> f32 {
        self.muscles[index]
    }

    #[inline]
    pub fn set_muscle(&mut self, index: usize, value: f32) {
        self.muscles[index] = value;
    }
}

/// A mapped bone with at least one muscle channel
#[derive(Debug, Clone)]
struct DrivenBone {
    joint: JointId,
    /// Local rotation at all-zero muscles
    neutral: Quat,
    channels: Vec<usize>,
}

/// Per-axis angles in radians that `muscles` give one bone
fn channel_angles(channels: &[usize], muscles: &[f32; MUSCLE_COUNT]) -> [f32; 3] {
    let mut angles = [0.0f32; 3];
    for &i in channels {
        let def = &MUSCLES[i];
        angles[def.axis.index()] = def.mirror_sign() * muscle_to_angle(def, muscles[i]).to_radians();
    }
    angles
}

/// Reads and writes [`HumanPose`]s on one avatar's skeleton.
///
/// Neutral rotations are derived from the rest pose when the handler is created:
/// the rest pose is taken to be the IK reference stance, so forcing
/// [`IK_POSE_MUSCLES`] puts every driven bone back at rest. Joints added to the
/// humanoid map afterwards are not driven until a new handler is built.
#[derive(Debug, Clone)]
pub struct PoseHandler {
    hips: Option<(JointId, Quat)>,
    bones: Vec<DrivenBone>,
}

impl PoseHandler {
    pub fn new(avatar: &Avatar) -> CalibrationResult<Self> {
        let map = avatar
            .humanoid
            .as_ref()
            .ok_or(CalibrationError::MissingHumanoid)?;
        let skeleton = &avatar.skeleton;

        let hips = map
            .get(HumanBone::Hips)
            .map(|joint| (joint, skeleton.joint(joint).rest_rotation()));

        let bones: Vec<DrivenBone> = map
            .iter()
            .filter_map(|(bone, joint)| {
                let channels: Vec<usize> = muscles_for(bone).map(|(i, _)| i).collect();
                if channels.is_empty() {
                    return None;
                }
                let reference = quat_from_angles(channel_angles(&channels, &IK_POSE_MUSCLES));
                let neutral = (skeleton.joint(joint).rest_rotation() * reference.inverse()).normalize();
                Some(DrivenBone {
                    joint,
                    neutral,
                    channels,
                })
            })
            .collect();

        log::debug!("Pose handler drives {} bones", bones.len());
        Ok(Self { hips, bones })
    }

    /// Capture the current local pose
    pub fn sample(&self, skeleton: &Skeleton) -> HumanPose {
        let mut pose = HumanPose::default();

        if let Some((hips, rest)) = self.hips {
            let joint = skeleton.joint(hips);
            pose.body_position = joint.local_position();
            pose.body_rotation = (joint.local_rotation() * rest.inverse()).normalize();
        }

        for bone in &self.bones {
            let relative = bone.neutral.inverse() * skeleton.joint(bone.joint).local_rotation();
            let angles = angles_from_quat(relative.normalize());
            for &i in &bone.channels {
                let def = &MUSCLES[i];
                let degrees = def.mirror_sign() * angles[def.axis.index()].to_degrees();
                pose.muscles[i] = angle_to_muscle(def, degrees);
            }
        }
        pose
    }

    /// Write a pose onto the skeleton's local transforms
    pub fn apply(&self, skeleton: &mut Skeleton, pose: &HumanPose) {
        if let Some((hips, rest)) = self.hips {
            skeleton.set_local_position(hips, pose.body_position);
            skeleton.set_local_rotation(hips, (pose.body_rotation * rest).normalize());
        }

        for bone in &self.bones {
            let angles = channel_angles(&bone.channels, &pose.muscles);
            skeleton.set_local_rotation(bone.joint, (bone.neutral * quat_from_angles(angles)).normalize());
        }
    }

    /// Blend toward the IK reference stance: `muscle[i] = weight * IK_POSE_MUSCLES[i]`,
    /// body rotation reset to identity. Weight 1 is the rest pose and weight 0 the
    /// crouched neutral stance, not the current one.
    pub fn force_ik_pose(&self, skeleton: &mut Skeleton, weight: f32) {
        let mut pose = self.sample(skeleton);
        for (value, target) in pose.muscles.iter_mut().zip(IK_POSE_MUSCLES) {
            *value = weight * target;
        }
        pose.body_rotation = Quat::IDENTITY;
        self.apply(skeleton, &pose);
    }
}
