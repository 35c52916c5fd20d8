use serde::{Deserialize, Serialize};

/// Body side of a paired limb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// Humanoid bone slot as produced by the rig's humanoid mapping.
/// Ordered for topological traversal (parents before children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HumanBone {
    // Torso
    Hips = 0,
    Spine = 1,
    Chest = 2,
    UpperChest = 3,
    Neck = 4,
    Head = 5,
    LeftEye = 6,
    RightEye = 7,
    Jaw = 8,

    // Left leg chain
    LeftUpperLeg = 9,
    LeftLowerLeg = 10,
    LeftFoot = 11,
    LeftToes = 12,

    // Right leg chain
    RightUpperLeg = 13,
    RightLowerLeg = 14,
    RightFoot = 15,
    RightToes = 16,

    // Left arm chain
    LeftShoulder = 17,
    LeftUpperArm = 18,
    LeftLowerArm = 19,
    LeftHand = 20,

    // Right arm chain
    RightShoulder = 21,
    RightUpperArm = 22,
    RightLowerArm = 23,
    RightHand = 24,

    // Left fingers
    LeftThumbProximal = 25,
    LeftThumbIntermediate = 26,
    LeftThumbDistal = 27,
    LeftIndexProximal = 28,
    LeftIndexIntermediate = 29,
    LeftIndexDistal = 30,
    LeftMiddleProximal = 31,
    LeftMiddleIntermediate = 32,
    LeftMiddleDistal = 33,
    LeftRingProximal = 34,
    LeftRingIntermediate = 35,
    LeftRingDistal = 36,
    LeftLittleProximal = 37,
    LeftLittleIntermediate = 38,
    LeftLittleDistal = 39,

    // Right fingers
    RightThumbProximal = 40,
    RightThumbIntermediate = 41,
    RightThumbDistal = 42,
    RightIndexProximal = 43,
    RightIndexIntermediate = 44,
    RightIndexDistal = 45,
    RightMiddleProximal = 46,
    RightMiddleIntermediate = 47,
    RightMiddleDistal = 48,
    RightRingProximal = 49,
    RightRingIntermediate = 50,
    RightRingDistal = 51,
    RightLittleProximal = 52,
    RightLittleIntermediate = 53,
    RightLittleDistal = 54,
}

impl HumanBone {
    /// Total number of humanoid bone slots
    pub const COUNT: usize = 55;

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// All humanoid bones in topological order (parents before children)
    pub const ALL: [HumanBone; Self::COUNT] = [
        HumanBone::Hips,
        HumanBone::Spine,
        HumanBone::Chest,
        HumanBone::UpperChest,
        HumanBone::Neck,
        HumanBone::Head,
        HumanBone::LeftEye,
        HumanBone::RightEye,
        HumanBone::Jaw,
        HumanBone::LeftUpperLeg,
        HumanBone::LeftLowerLeg,
        HumanBone::LeftFoot,
        HumanBone::LeftToes,
        HumanBone::RightUpperLeg,
        HumanBone::RightLowerLeg,
        HumanBone::RightFoot,
        HumanBone::RightToes,
        HumanBone::LeftShoulder,
        HumanBone::LeftUpperArm,
        HumanBone::LeftLowerArm,
        HumanBone::LeftHand,
        HumanBone::RightShoulder,
        HumanBone::RightUpperArm,
        HumanBone::RightLowerArm,
        HumanBone::RightHand,
        HumanBone::LeftThumbProximal,
        HumanBone::LeftThumbIntermediate,
        HumanBone::LeftThumbDistal,
        HumanBone::LeftIndexProximal,
        HumanBone::LeftIndexIntermediate,
        HumanBone::LeftIndexDistal,
        HumanBone::LeftMiddleProximal,
        HumanBone::LeftMiddleIntermediate,
        HumanBone::LeftMiddleDistal,
        HumanBone::LeftRingProximal,
        HumanBone::LeftRingIntermediate,
        HumanBone::LeftRingDistal,
        HumanBone::LeftLittleProximal,
        HumanBone::LeftLittleIntermediate,
        HumanBone::LeftLittleDistal,
        HumanBone::RightThumbProximal,
        HumanBone::RightThumbIntermediate,
        HumanBone::RightThumbDistal,
        HumanBone::RightIndexProximal,
        HumanBone::RightIndexIntermediate,
        HumanBone::RightIndexDistal,
        HumanBone::RightMiddleProximal,
        HumanBone::RightMiddleIntermediate,
        HumanBone::RightMiddleDistal,
        HumanBone::RightRingProximal,
        HumanBone::RightRingIntermediate,
        HumanBone::RightRingDistal,
        HumanBone::RightLittleProximal,
        HumanBone::RightLittleIntermediate,
        HumanBone::RightLittleDistal,
    ];

    /// Body side, `None` for bones on the midline
    pub const fn side(self) -> Option<Side> {
        match self as u8 {
            6 | 9..=12 | 17..=20 | 25..=39 => Some(Side::Left),
            7 | 13..=16 | 21..=24 | 40..=54 => Some(Side::Right),
            _ => None,
        }
    }

    /// Finger phalanges of one hand, thumb to little finger, proximal first
    pub const fn fingers(side: Side) -> [HumanBone; 15] {
        match side {
            Side::Left => [
                HumanBone::LeftThumbProximal,
                HumanBone::LeftThumbIntermediate,
                HumanBone::LeftThumbDistal,
                HumanBone::LeftIndexProximal,
                HumanBone::LeftIndexIntermediate,
                HumanBone::LeftIndexDistal,
                HumanBone::LeftMiddleProximal,
                HumanBone::LeftMiddleIntermediate,
                HumanBone::LeftMiddleDistal,
                HumanBone::LeftRingProximal,
                HumanBone::LeftRingIntermediate,
                HumanBone::LeftRingDistal,
                HumanBone::LeftLittleProximal,
                HumanBone::LeftLittleIntermediate,
                HumanBone::LeftLittleDistal,
            ],
            Side::Right => [
                HumanBone::RightThumbProximal,
                HumanBone::RightThumbIntermediate,
                HumanBone::RightThumbDistal,
                HumanBone::RightIndexProximal,
                HumanBone::RightIndexIntermediate,
                HumanBone::RightIndexDistal,
                HumanBone::RightMiddleProximal,
                HumanBone::RightMiddleIntermediate,
                HumanBone::RightMiddleDistal,
                HumanBone::RightRingProximal,
                HumanBone::RightRingIntermediate,
                HumanBone::RightRingDistal,
                HumanBone::RightLittleProximal,
                HumanBone::RightLittleIntermediate,
                HumanBone::RightLittleDistal,
            ],
        }
    }
}

/// Canonical joint role in the IK solver's bone reference set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoneRole {
    Root,
    Pelvis,
    Spine,
    Chest,
    Neck,
    Head,
    Shoulder(Side),
    UpperArm(Side),
    Forearm(Side),
    Hand(Side),
    Thigh(Side),
    Calf(Side),
    Foot(Side),
    Toes(Side),
}

impl BoneRole {
    /// Roles leg and spine solving cannot run without
    pub const MANDATORY: [BoneRole; 8] = [
        BoneRole::Pelvis,
        BoneRole::Head,
        BoneRole::Thigh(Side::Left),
        BoneRole::Calf(Side::Left),
        BoneRole::Foot(Side::Left),
        BoneRole::Thigh(Side::Right),
        BoneRole::Calf(Side::Right),
        BoneRole::Foot(Side::Right),
    ];

    /// Every role, torso first, then left and right limbs
    pub const ALL: [BoneRole; 22] = [
        BoneRole::Root,
        BoneRole::Pelvis,
        BoneRole::Spine,
        BoneRole::Chest,
        BoneRole::Neck,
        BoneRole::Head,
        BoneRole::Shoulder(Side::Left),
        BoneRole::UpperArm(Side::Left),
        BoneRole::Forearm(Side::Left),
        BoneRole::Hand(Side::Left),
        BoneRole::Thigh(Side::Left),
        BoneRole::Calf(Side::Left),
        BoneRole::Foot(Side::Left),
        BoneRole::Toes(Side::Left),
        BoneRole::Shoulder(Side::Right),
        BoneRole::UpperArm(Side::Right),
        BoneRole::Forearm(Side::Right),
        BoneRole::Hand(Side::Right),
        BoneRole::Thigh(Side::Right),
        BoneRole::Calf(Side::Right),
        BoneRole::Foot(Side::Right),
        BoneRole::Toes(Side::Right),
    ];

    pub fn is_mandatory(self) -> bool {
        Self::MANDATORY.contains(&self)
    }
}
