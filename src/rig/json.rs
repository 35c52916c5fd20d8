use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::humanoid::{Animator, Avatar, HumanoidMap};
use super::id::HumanBone;
use super::skeleton::{JointId, Skeleton};
use crate::error::{CalibrationError, CalibrationResult};

/// Euler angles in degrees for JSON authoring (more intuitive than quaternions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct EulerAngles {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl EulerAngles {
    /// Convert to quaternion (XYZ order)
    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            glam::EulerRot::XYZ,
            self.x.to_radians(),
            self.y.to_radians(),
            self.z.to_radians(),
        )
    }

    /// Convert from quaternion (XYZ order)
    pub fn from_quat(q: Quat) -> Self {
        let (x, y, z) = q.to_euler(glam::EulerRot::XYZ);
        Self {
            x: x.to_degrees(),
            y: y.to_degrees(),
            z: z.to_degrees(),
        }
    }
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// One joint of a rig description
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JointJson {
    pub name: String,
    /// Parent joint name; `None` only for the root, which must come first
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: Option<EulerAngles>,
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

/// Rig description file: hierarchy, humanoid mapping and animator
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvatarJson {
    pub joints: Vec<JointJson>,
    /// Humanoid bone -> joint name. Omitted entirely for non-humanoid rigs.
    #[serde(default)]
    pub humanoid: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub animator: Option<Animator>,
}

fn human_bone_from_key(key: &str) -> CalibrationResult<HumanBone> {
    Ok(serde_json::from_value(serde_json::Value::String(
        key.to_string(),
    ))?)
}

fn human_bone_key(bone: HumanBone) -> CalibrationResult<String> {
    match serde_json::to_value(bone)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

impl AvatarJson {
    /// Build the avatar, resolving parent and humanoid names against the joint list
    pub fn to_avatar(&self) -> CalibrationResult<Avatar> {
        let mut joints = self.joints.iter();
        let Some(root) = joints.next() else {
            return Err(CalibrationError::InvalidHierarchy {
                joint: String::new(),
                reason: "rig has no joints".to_string(),
            });
        };
        if let Some(parent) = &root.parent {
            return Err(CalibrationError::InvalidHierarchy {
                joint: root.name.clone(),
                reason: format!("first joint must be the root, found parent '{}'", parent),
            });
        }

        let mut skeleton = Skeleton::new(root.name.clone());
        let root_id = skeleton.root();
        skeleton.set_local_position(root_id, Vec3::from_array(root.position));
        skeleton.set_local_rotation(root_id, root.rotation.unwrap_or_default().to_quat());
        skeleton.set_local_scale(root_id, Vec3::from_array(root.scale));

        let mut ids: BTreeMap<&str, JointId> = BTreeMap::new();
        ids.insert(root.name.as_str(), root_id);

        for joint in joints {
            let Some(parent_name) = &joint.parent else {
                return Err(CalibrationError::InvalidHierarchy {
                    joint: joint.name.clone(),
                    reason: "only the first joint may omit its parent".to_string(),
                });
            };
            let parent = *ids
                .get(parent_name.as_str())
                .ok_or_else(|| CalibrationError::UnknownJoint {
                    name: parent_name.clone(),
                })?;
            let id = skeleton.add_joint(
                joint.name.clone(),
                parent,
                Vec3::from_array(joint.position),
                joint.rotation.unwrap_or_default().to_quat(),
            )?;
            skeleton.set_local_scale(id, Vec3::from_array(joint.scale));
            ids.entry(joint.name.as_str()).or_insert(id);
        }

        let humanoid = match &self.humanoid {
            Some(entries) => {
                let mut map = HumanoidMap::new();
                for (bone_key, joint_name) in entries {
                    let bone = human_bone_from_key(bone_key)?;
                    let joint = *ids.get(joint_name.as_str()).ok_or_else(|| {
                        CalibrationError::UnknownJoint {
                            name: joint_name.clone(),
                        }
                    })?;
                    map.set(bone, Some(joint));
                }
                Some(map)
            }
            None => None,
        };

        Ok(Avatar {
            skeleton,
            humanoid,
            animator: self.animator.clone(),
        })
    }

    /// Describe an avatar's current local pose
    pub fn from_avatar(avatar: &Avatar) -> CalibrationResult<Self> {
        let skeleton = &avatar.skeleton;
        let joints = skeleton
            .joint_ids()
            .map(|id| {
                let joint = skeleton.joint(id);
                let rotation = joint.local_rotation();
                JointJson {
                    name: joint.name().to_string(),
                    parent: joint.parent().map(|p| skeleton.name(p).to_string()),
                    position: joint.local_position().to_array(),
                    rotation: (rotation.angle_between(Quat::IDENTITY) > 1e-4)
                        .then(|| EulerAngles::from_quat(rotation)),
                    scale: joint.local_scale().to_array(),
                }
            })
            .collect();

        let humanoid = match &avatar.humanoid {
            Some(map) => {
                let mut entries = BTreeMap::new();
                for (bone, joint) in map.iter() {
                    entries.insert(human_bone_key(bone)?, skeleton.name(joint).to_string());
                }
                Some(entries)
            }
            None => None,
        };

        Ok(Self {
            joints,
            humanoid,
            animator: avatar.animator.clone(),
        })
    }
}

impl Avatar {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> CalibrationResult<Self> {
        let description: AvatarJson = serde_json::from_str(json)?;
        description.to_avatar()
    }

    /// Convert to JSON string
    pub fn to_json_string(&self) -> CalibrationResult<String> {
        Ok(serde_json::to_string_pretty(&AvatarJson::from_avatar(self)?)?)
    }
}
