//! Rig data model: joint hierarchy, humanoid mapping and the IK bone reference set.
//!
//! ## Key Concepts
//!
//! - **Skeleton**: arena of joints with lazily evaluated world transforms
//! - **WorldPose**: read-only world-space view, only obtainable by evaluating
//! - **HumanoidMap**: upstream humanoid detection (bone slot -> joint)
//! - **BoneReferences**: the joints the IK solver drives, keyed by role

pub mod cache;
pub mod humanoid;
pub mod id;
pub mod json;
#[cfg(test)]
pub(crate) mod mannequin;
pub mod references;
pub mod skeleton;

pub use humanoid::*;
pub use id::*;
pub use json::{AvatarJson, EulerAngles, JointJson};
pub use references::*;
pub use skeleton::*;
