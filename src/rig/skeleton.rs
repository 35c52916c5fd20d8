use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::cache::PoseCache;
use crate::error::{CalibrationError, CalibrationResult};

/// Handle to a joint inside a [`Skeleton`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointId(u32);

impl JointId {
    /// The skeleton root is always the first joint
    pub const ROOT: JointId = JointId(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// A single transform node of the rig.
#[derive(Debug, Clone)]
pub struct Joint {
    name: String,
    parent: Option<JointId>,
    children: Vec<JointId>,
    local_position: Vec3,
    local_rotation: Quat,
    local_scale: Vec3,
    /// Bind-pose local rotation, used as the zero point for joint angles
    rest_rotation: Quat,
    rest_position: Vec3,
}

impl Joint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<JointId> {
        self.parent
    }

    pub fn children(&self) -> &[JointId] {
        &self.children
    }

    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    pub fn local_rotation(&self) -> Quat {
        self.local_rotation
    }

    pub fn local_scale(&self) -> Vec3 {
        self.local_scale
    }

    pub fn rest_rotation(&self) -> Quat {
        self.rest_rotation
    }
}

/// Externally owned joint hierarchy with a single root.
///
/// Local transforms are edited freely; world transforms are only reachable
/// through [`Skeleton::evaluate`], which brings every dirty joint up to date
/// and hands back a read-only [`WorldPose`] view. While that view is alive the
/// skeleton cannot be mutated, so a world-space read can never observe a pose
/// that was changed after the last evaluation.
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
    cache: PoseCache,
}

impl Skeleton {
    /// Create a skeleton holding only a root joint at the origin
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut skeleton = Self {
            joints: Vec::new(),
            cache: PoseCache::default(),
        };
        skeleton.push_joint(Joint {
            name: root_name.into(),
            parent: None,
            children: Vec::new(),
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            local_scale: Vec3::ONE,
            rest_rotation: Quat::IDENTITY,
            rest_position: Vec3::ZERO,
        });
        skeleton
    }

    fn push_joint(&mut self, joint: Joint) -> JointId {
        let id = JointId::from_index(self.joints.len());
        self.joints.push(joint);
        self.cache.push();
        id
    }

    /// Append a joint under `parent`. The given local transform becomes its rest pose.
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: JointId,
        local_position: Vec3,
        local_rotation: Quat,
    ) -> CalibrationResult<JointId> {
        let name = name.into();
        if parent.index() >= self.joints.len() {
            return Err(CalibrationError::InvalidHierarchy {
                joint: name,
                reason: format!("parent index {} does not exist", parent.index()),
            });
        }

        let id = self.push_joint(Joint {
            name,
            parent: Some(parent),
            children: Vec::new(),
            local_position,
            local_rotation,
            local_scale: Vec3::ONE,
            rest_rotation: local_rotation,
            rest_position: local_position,
        });
        self.joints[parent.index()].children.push(id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn root(&self) -> JointId {
        JointId::ROOT
    }

    pub fn contains(&self, id: JointId) -> bool {
        id.index() < self.joints.len()
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.index()]
    }

    pub fn name(&self, id: JointId) -> &str {
        &self.joints[id.index()].name
    }

    pub fn parent(&self, id: JointId) -> Option<JointId> {
        self.joints[id.index()].parent
    }

    pub fn children(&self, id: JointId) -> &[JointId] {
        &self.joints[id.index()].children
    }

    /// First joint with exactly this name
    pub fn find(&self, name: &str) -> Option<JointId> {
        self.joints
            .iter()
            .position(|j| j.name == name)
            .map(JointId::from_index)
    }

    pub fn joint_ids(&self) -> impl Iterator<Item = JointId> {
        (0..self.joints.len()).map(JointId::from_index)
    }

    /// True when `id` is `ancestor` or lies somewhere below it
    pub fn is_descendant_of(&self, id: JointId, ancestor: JointId) -> bool {
        let mut current = Some(id);
        while let Some(joint) = current {
            if joint == ancestor {
                return true;
            }
            current = self.parent(joint);
        }
        false
    }

    /// Move a joint (and its subtree) under a new parent, keeping its local transform.
    pub fn set_parent(&mut self, id: JointId, new_parent: JointId) -> CalibrationResult<()> {
        let Some(old_parent) = self.parent(id) else {
            return Err(CalibrationError::InvalidHierarchy {
                joint: self.name(id).to_string(),
                reason: "the root joint cannot be reparented".to_string(),
            });
        };
        if old_parent == new_parent {
            return Ok(());
        }
        if self.is_descendant_of(new_parent, id) {
            return Err(CalibrationError::InvalidHierarchy {
                joint: self.name(id).to_string(),
                reason: format!("'{}' lies inside its own subtree", self.name(new_parent)),
            });
        }

        self.joints[old_parent.index()].children.retain(|c| *c != id);
        self.joints[new_parent.index()].children.push(id);
        self.joints[id.index()].parent = Some(new_parent);
        self.cache.order_stale = true;
        self.mark_dirty(id);
        Ok(())
    }

    pub fn set_local_position(&mut self, id: JointId, position: Vec3) {
        if self.joints[id.index()].local_position != position {
            self.joints[id.index()].local_position = position;
            self.mark_dirty(id);
        }
    }

    pub fn set_local_rotation(&mut self, id: JointId, rotation: Quat) {
        if self.joints[id.index()].local_rotation != rotation {
            self.joints[id.index()].local_rotation = rotation;
            self.mark_dirty(id);
        }
    }

    pub fn set_local_scale(&mut self, id: JointId, scale: Vec3) {
        if self.joints[id.index()].local_scale != scale {
            self.joints[id.index()].local_scale = scale;
            self.mark_dirty(id);
        }
    }

    /// Return every joint to its bind-pose local transform
    pub fn reset_to_rest(&mut self) {
        for joint in &mut self.joints {
            joint.local_rotation = joint.rest_rotation;
            joint.local_position = joint.rest_position;
        }
        self.cache.dirty.mark_all();
    }

    /// Mark a joint and all its descendants as dirty
    fn mark_dirty(&mut self, id: JointId) {
        let mut stack = vec![id];
        while let Some(joint) = stack.pop() {
            self.cache.dirty.mark(joint);
            stack.extend_from_slice(&self.joints[joint.index()].children);
        }
    }

    fn rebuild_order(&mut self) {
        let mut order = Vec::with_capacity(self.joints.len());
        let mut stack = vec![JointId::ROOT];
        while let Some(joint) = stack.pop() {
            order.push(joint);
            stack.extend(self.joints[joint.index()].children.iter().rev());
        }
        self.cache.order = order;
        self.cache.order_stale = false;
    }

    /// Compute the world transform for a single joint from its (already valid) parent
    fn compute_joint(&mut self, id: JointId) {
        let joint = &self.joints[id.index()];
        let (parent_pos, parent_rot, parent_scale) = match joint.parent {
            Some(parent) => (
                self.cache.world_positions[parent.index()],
                self.cache.world_rotations[parent.index()],
                self.cache.world_scales[parent.index()],
            ),
            None => (Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
        };

        let world_pos = parent_pos + parent_rot * (parent_scale * joint.local_position);
        let world_rot = (parent_rot * joint.local_rotation).normalize();
        let world_scale = parent_scale * joint.local_scale;

        self.cache.world_positions[id.index()] = world_pos;
        self.cache.world_rotations[id.index()] = world_rot;
        self.cache.world_scales[id.index()] = world_scale;
        self.cache.dirty.clear(id);
    }

    /// Bring all world transforms up to date and return a read-only view of them.
    pub fn evaluate(&mut self) -> WorldPose<'_> {
        if self.cache.order_stale {
            self.rebuild_order();
        }
        if self.cache.dirty.is_any_dirty() {
            let order = std::mem::take(&mut self.cache.order);
            for &id in &order {
                if self.cache.dirty.is_dirty(id) {
                    self.compute_joint(id);
                }
            }
            self.cache.order = order;
        }
        WorldPose { skeleton: self }
    }
}

/// World-space view of an evaluated skeleton.
#[derive(Debug, Clone, Copy)]
pub struct WorldPose<'a> {
    skeleton: &'a Skeleton,
}

impl<'a> WorldPose<'a> {
    pub fn skeleton(&self) -> &'a Skeleton {
        self.skeleton
    }

    pub fn position(&self, id: JointId) -> Vec3 {
        self.skeleton.cache.world_positions[id.index()]
    }

    pub fn rotation(&self, id: JointId) -> Quat {
        self.skeleton.cache.world_rotations[id.index()]
    }

    /// Accumulated scale, ignoring any skew introduced by rotated non-uniform parents
    pub fn lossy_scale(&self, id: JointId) -> Vec3 {
        self.skeleton.cache.world_scales[id.index()]
    }

    pub fn local_rotation(&self, id: JointId) -> Quat {
        self.skeleton.joint(id).local_rotation
    }

    /// World position, or the origin when the joint is absent
    pub fn position_or_origin(&self, id: Option<JointId>) -> Vec3 {
        id.map(|j| self.position(j)).unwrap_or(Vec3::ZERO)
    }
}
