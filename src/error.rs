//! Error types for rig calibration.

use thiserror::Error;

use crate::rig::BoneRole;

/// Result type for calibration operations.
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Errors that can abort a calibration run or rig load.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The avatar has no humanoid bone map to drive.
    #[error("avatar has no humanoid rig")]
    MissingHumanoid,

    /// The avatar has no animator to evaluate poses with.
    #[error("avatar has no animator component")]
    MissingAnimator,

    /// A bone reference the solver cannot work without is unset.
    #[error("missing mandatory bone reference: {role:?}")]
    MissingReference {
        /// The unset role.
        role: BoneRole,
    },

    /// A joint name in a rig description does not exist in the skeleton.
    #[error("unknown joint '{name}'")]
    UnknownJoint {
        /// The name that failed to resolve.
        name: String,
    },

    /// The joint hierarchy is malformed.
    #[error("invalid hierarchy at '{joint}': {reason}")]
    InvalidHierarchy {
        /// Joint being inserted or reparented.
        joint: String,
        /// What went wrong.
        reason: String,
    },

    /// A pose carries the wrong number of muscle channels.
    #[error("expected {expected} muscle values, found {found}")]
    MuscleCountMismatch {
        /// Required channel count.
        expected: usize,
        /// Channel count that was supplied.
        found: usize,
    },

    /// JSON parse or write failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
