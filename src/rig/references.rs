use serde::{Deserialize, Serialize};

use super::humanoid::Avatar;
use super::id::{BoneRole, HumanBone, Side};
use super::skeleton::JointId;
use crate::error::{CalibrationError, CalibrationResult};

/// Per-side limb references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbReferences {
    pub shoulder: Option<JointId>,
    pub upper_arm: Option<JointId>,
    pub forearm: Option<JointId>,
    pub hand: Option<JointId>,
    pub thigh: Option<JointId>,
    pub calf: Option<JointId>,
    pub foot: Option<JointId>,
    pub toes: Option<JointId>,
}

/// Joints the IK solver drives, keyed by canonical role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneReferences {
    pub root: Option<JointId>,
    pub pelvis: Option<JointId>,
    pub spine: Option<JointId>,
    pub chest: Option<JointId>,
    pub neck: Option<JointId>,
    pub head: Option<JointId>,
    pub left: LimbReferences,
    pub right: LimbReferences,
}

impl BoneReferences {
    /// Fill references from the avatar's humanoid map. The chest prefers the upper chest.
    pub fn auto_detect(avatar: &Avatar) -> Self {
        let mut refs = Self {
            root: Some(avatar.skeleton.root()),
            ..Self::default()
        };
        let Some(map) = &avatar.humanoid else {
            return refs;
        };

        refs.pelvis = map.get(HumanBone::Hips);
        refs.spine = map.get(HumanBone::Spine);
        refs.chest = map
            .get(HumanBone::UpperChest)
            .or_else(|| map.get(HumanBone::Chest));
        refs.neck = map.get(HumanBone::Neck);
        refs.head = map.get(HumanBone::Head);

        refs.left = LimbReferences {
            shoulder: map.get(HumanBone::LeftShoulder),
            upper_arm: map.get(HumanBone::LeftUpperArm),
            forearm: map.get(HumanBone::LeftLowerArm),
            hand: map.get(HumanBone::LeftHand),
            thigh: map.get(HumanBone::LeftUpperLeg),
            calf: map.get(HumanBone::LeftLowerLeg),
            foot: map.get(HumanBone::LeftFoot),
            toes: map.get(HumanBone::LeftToes),
        };
        refs.right = LimbReferences {
            shoulder: map.get(HumanBone::RightShoulder),
            upper_arm: map.get(HumanBone::RightUpperArm),
            forearm: map.get(HumanBone::RightLowerArm),
            hand: map.get(HumanBone::RightHand),
            thigh: map.get(HumanBone::RightUpperLeg),
            calf: map.get(HumanBone::RightLowerLeg),
            foot: map.get(HumanBone::RightFoot),
            toes: map.get(HumanBone::RightToes),
        };
        refs
    }

    pub fn limb(&self, side: Side) -> &LimbReferences {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn limb_mut(&mut self, side: Side) -> &mut LimbReferences {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn get(&self, role: BoneRole) -> Option<JointId> {
        match role {
            BoneRole::Root => self.root,
            BoneRole::Pelvis => self.pelvis,
            BoneRole::Spine => self.spine,
            BoneRole::Chest => self.chest,
            BoneRole::Neck => self.neck,
            BoneRole::Head => self.head,
            BoneRole::Shoulder(side) => self.limb(side).shoulder,
            BoneRole::UpperArm(side) => self.limb(side).upper_arm,
            BoneRole::Forearm(side) => self.limb(side).forearm,
            BoneRole::Hand(side) => self.limb(side).hand,
            BoneRole::Thigh(side) => self.limb(side).thigh,
            BoneRole::Calf(side) => self.limb(side).calf,
            BoneRole::Foot(side) => self.limb(side).foot,
            BoneRole::Toes(side) => self.limb(side).toes,
        }
    }

    pub fn set(&mut self, role: BoneRole, joint: Option<JointId>) {
        let slot = match role {
            BoneRole::Root => &mut self.root,
            BoneRole::Pelvis => &mut self.pelvis,
            BoneRole::Spine => &mut self.spine,
            BoneRole::Chest => &mut self.chest,
            BoneRole::Neck => &mut self.neck,
            BoneRole::Head => &mut self.head,
            BoneRole::Shoulder(side) => &mut self.limb_mut(side).shoulder,
            BoneRole::UpperArm(side) => &mut self.limb_mut(side).upper_arm,
            BoneRole::Forearm(side) => &mut self.limb_mut(side).forearm,
            BoneRole::Hand(side) => &mut self.limb_mut(side).hand,
            BoneRole::Thigh(side) => &mut self.limb_mut(side).thigh,
            BoneRole::Calf(side) => &mut self.limb_mut(side).calf,
            BoneRole::Foot(side) => &mut self.limb_mut(side).foot,
            BoneRole::Toes(side) => &mut self.limb_mut(side).toes,
        };
        *slot = joint;
    }

    /// The joint for `role`, or a configuration error when it is unset
    pub fn require(&self, role: BoneRole) -> CalibrationResult<JointId> {
        self.get(role)
            .ok_or(CalibrationError::MissingReference { role })
    }

    pub fn missing_mandatory(&self) -> Vec<BoneRole> {
        BoneRole::MANDATORY
            .iter()
            .copied()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::mannequin::{build_mannequin, MannequinOptions};

    #[test]
    fn test_auto_detect_prefers_upper_chest() {
        let avatar = build_mannequin(&MannequinOptions::default()).unwrap();
        let map = avatar.humanoid.as_ref().unwrap();
        let refs = BoneReferences::auto_detect(&avatar);

        assert_eq!(refs.root, Some(avatar.skeleton.root()));
        assert_eq!(refs.pelvis, map.get(HumanBone::Hips));
        assert_eq!(refs.chest, map.get(HumanBone::UpperChest));
        assert_eq!(refs.left.calf, map.get(HumanBone::LeftLowerLeg));
        assert!(refs.missing_mandatory().is_empty());
    }

    #[test]
    fn test_get_set_roundtrip_every_role() {
        let mut refs = BoneReferences::default();
        for (i, role) in BoneRole::ALL.iter().enumerate() {
            refs.set(*role, Some(JointId::from_index(i + 1)));
        }
        for (i, role) in BoneRole::ALL.iter().enumerate() {
            assert_eq!(refs.get(*role), Some(JointId::from_index(i + 1)), "{:?}", role);
        }
    }

    #[test]
    fn test_require_reports_role() {
        let refs = BoneReferences::default();
        match refs.require(BoneRole::Calf(Side::Left)) {
            Err(CalibrationError::MissingReference { role }) => {
                assert_eq!(role, BoneRole::Calf(Side::Left))
            }
            other => panic!("expected MissingReference, got {:?}", other),
        }
        assert_eq!(refs.missing_mandatory().len(), BoneRole::MANDATORY.len());
    }
}
