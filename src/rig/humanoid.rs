use serde::{Deserialize, Serialize};

use super::id::HumanBone;
use super::skeleton::{JointId, Skeleton};

/// Output of the upstream humanoid auto-detection: which joint plays which humanoid bone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanoidMap {
    bones: [Option<JointId>; HumanBone::COUNT],
}

impl Default for HumanoidMap {
    fn default() -> Self {
        Self {
            bones: [None; HumanBone::COUNT],
        }
    }
}

impl HumanoidMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, bone: HumanBone) -> Option<JointId> {
        self.bones[bone.index()]
    }

    pub fn set(&mut self, bone: HumanBone, joint: Option<JointId>) {
        self.bones[bone.index()] = joint;
    }

    /// Builder-style insert
    pub fn with(mut self, bone: HumanBone, joint: JointId) -> Self {
        self.set(bone, Some(joint));
        self
    }

    pub fn bone_exists(&self, bone: HumanBone) -> bool {
        self.get(bone).is_some()
    }

    /// Mapped bones in topological order
    pub fn iter(&self) -> impl Iterator<Item = (HumanBone, JointId)> + '_ {
        HumanBone::ALL
            .iter()
            .filter_map(|bone| self.get(*bone).map(|joint| (*bone, joint)))
    }

    /// A humanoid map is drivable once the hips are mapped
    pub fn is_drivable(&self) -> bool {
        self.bone_exists(HumanBone::Hips)
    }
}

/// Named animation layer on the avatar's animator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatorLayer {
    pub name: String,
    #[serde(default)]
    pub weight: f32,
}

/// Layer that holds an avatar-supplied calibration pose
pub const IK_POSE_LAYER: &str = "IKPose";
/// Layer that carries the avatar's locomotion and emotes
pub const LOCOMOTION_LAYER: &str = "Locomotion/Emotes";

/// Base animation component of the avatar. Pose blending itself is done by the host;
/// calibration only toggles evaluation and layer weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub layers: Vec<AnimatorLayer>,
}

fn default_enabled() -> bool {
    true
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            enabled: true,
            layers: Vec::new(),
        }
    }
}

impl Animator {
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    pub fn set_layer_weight(&mut self, index: usize, weight: f32) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.weight = weight;
        }
    }

    /// Both layers needed for an avatar-supplied calibration pose, if present
    pub fn ik_pose_layers(&self) -> Option<(usize, usize)> {
        Some((
            self.layer_index(IK_POSE_LAYER)?,
            self.layer_index(LOCOMOTION_LAYER)?,
        ))
    }
}

/// A rigged avatar: the joint hierarchy plus its humanoid description and animator.
#[derive(Debug, Clone)]
pub struct Avatar {
    pub skeleton: Skeleton,
    pub humanoid: Option<HumanoidMap>,
    pub animator: Option<Animator>,
}

impl Avatar {
    pub fn new(skeleton: Skeleton, humanoid: HumanoidMap) -> Self {
        Self {
            skeleton,
            humanoid: Some(humanoid),
            animator: Some(Animator::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_map_iterates_in_topological_order() {
        let mut skeleton = Skeleton::new("Root");
        let hips = skeleton
            .add_joint("Hips", JointId::ROOT, Vec3::Y, Quat::IDENTITY)
            .unwrap();
        let head = skeleton
            .add_joint("Head", hips, Vec3::Y, Quat::IDENTITY)
            .unwrap();

        let map = HumanoidMap::new()
            .with(HumanBone::Head, head)
            .with(HumanBone::Hips, hips);

        let order: Vec<HumanBone> = map.iter().map(|(b, _)| b).collect();
        assert_eq!(order, vec![HumanBone::Hips, HumanBone::Head]);
        assert!(map.is_drivable());
        assert!(!map.bone_exists(HumanBone::Jaw));
    }

    #[test]
    fn test_ik_pose_layers_need_both() {
        let mut animator = Animator::default();
        animator.layers.push(AnimatorLayer {
            name: IK_POSE_LAYER.to_string(),
            weight: 0.0,
        });
        assert_eq!(animator.ik_pose_layers(), None);

        animator.layers.push(AnimatorLayer {
            name: LOCOMOTION_LAYER.to_string(),
            weight: 1.0,
        });
        assert_eq!(animator.ik_pose_layers(), Some((0, 1)));
    }
}
