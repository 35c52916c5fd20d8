//! Humanoid IK Calibration - Wasm Core
//!
//! Auto-calibrates a full-body IK solver for avatars driven by head and hand
//! tracking only: measures the rig in a reference pose, repairs bone detection
//! and writes avatar-relative solver settings.

pub mod apply;
pub mod bindings;
pub mod calibrator;
pub mod error;
pub mod geometry;
pub mod math;
pub mod muscle;
pub mod pose;
pub mod resolver;
pub mod rig;
pub mod solver;

#[cfg(target_arch = "wasm32")]
pub use bindings::{calibrate_rig, init_logging};

pub use bindings::{calibrate_rig_json, CalibrationResponse};
pub use calibrator::{
    BodyTracking, CalibrationOutcome, CalibrationReport, CalibrationSettings, CalibrationState,
    Calibrator, Limb, TrackingBlender,
};
pub use error::{CalibrationError, CalibrationResult};
pub use glam::{Quat, Vec3};
pub use pose::{HumanPose, PoseHandler};
pub use rig::{Avatar, BoneReferences, BoneRole, HumanBone, JointId, Side, Skeleton};
pub use solver::{IkSolver, SolverConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::mannequin::{build_mannequin, MannequinOptions};

    #[test]
    fn test_public_surface_calibrates_a_rig() {
        let mut avatar = build_mannequin(&MannequinOptions::default()).unwrap();
        let mut solver: Option<IkSolver> = None;
        let mut tracking = BodyTracking::default();

        let outcome = Calibrator::default()
            .calibrate(&mut avatar, &mut solver, &mut tracking)
            .unwrap();
        assert!(matches!(outcome, CalibrationOutcome::Complete(_)));
        assert!(solver.is_some_and(|s| s.is_initiated()));
    }
}
