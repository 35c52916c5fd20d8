use glam::{Quat, Vec3};

use super::skeleton::JointId;

/// Dirty flags for lazy forward kinematics evaluation.
/// Uses a growable bitset where bit i corresponds to the joint with index i.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlags {
    words: Vec<u64>,
    len: usize,
}

impl DirtyFlags {
    /// Make room for one more joint, which starts out dirty
    pub fn push_dirty(&mut self) {
        let bit = self.len;
        self.len += 1;
        if bit / 64 >= self.words.len() {
            self.words.push(0);
        }
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    /// Check if a joint is dirty (needs recomputation)
    #[inline]
    pub fn is_dirty(&self, joint: JointId) -> bool {
        let i = joint.index();
        (self.words[i / 64] & (1 << (i % 64))) != 0
    }

    /// Check if any joint is dirty
    #[inline]
    pub fn is_any_dirty(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }

    #[inline]
    pub fn mark(&mut self, joint: JointId) {
        let i = joint.index();
        self.words[i / 64] |= 1 << (i % 64);
    }

    /// Clear dirty flag for a joint
    #[inline]
    pub fn clear(&mut self, joint: JointId) {
        let i = joint.index();
        self.words[i / 64] &= !(1 << (i % 64));
    }

    pub fn mark_all(&mut self) {
        for i in 0..self.len {
            self.words[i / 64] |= 1 << (i % 64);
        }
    }

    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }
}

/// Cache for forward kinematics results
#[derive(Debug, Clone, Default)]
pub struct PoseCache {
    /// Cached world transforms, valid only where the dirty bit is clear
    pub world_positions: Vec<Vec3>,
    pub world_rotations: Vec<Quat>,
    pub world_scales: Vec<Vec3>,

    /// Dirty flags for lazy evaluation
    pub dirty: DirtyFlags,

    /// Parent-first traversal order, rebuilt after hierarchy edits
    pub order: Vec<JointId>,
    pub order_stale: bool,
}

impl PoseCache {
    /// Register a new joint slot
    pub fn push(&mut self) {
        self.world_positions.push(Vec3::ZERO);
        self.world_rotations.push(Quat::IDENTITY);
        self.world_scales.push(Vec3::ONE);
        self.dirty.push_dirty();
        self.order_stale = true;
    }
}
