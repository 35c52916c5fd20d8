//! Configuration and rest state of the full-body IK solver that calibration targets.
//!
//! The per-frame solve itself lives in the host runtime. This module only holds
//! what calibration writes: tuning values, bend hints, limb axes and the rest
//! state captured when the solver is initiated.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, CalibrationResult};
use crate::rig::{BoneReferences, BoneRole, JointId, Side, WorldPose};

/// Keyframe of a [`Curve`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

/// Piecewise linear curve over normalized time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub keys: Vec<CurveKey>,
}

/// Peak of the default step-height arc
pub const DEFAULT_STEP_HEIGHT: f32 = 0.1;

impl Default for Curve {
    fn default() -> Self {
        Self::step_arc(DEFAULT_STEP_HEIGHT)
    }
}

impl Curve {
    /// Foot lift over a step: ground, `peak` at mid-step, ground
    pub fn step_arc(peak: f32) -> Self {
        Self {
            keys: vec![
                CurveKey { time: 0.0, value: 0.0 },
                CurveKey { time: 0.5, value: peak },
                CurveKey { time: 1.0, value: 0.0 },
            ],
        }
    }

    /// Sample the curve, clamping outside the first and last keys
    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                return a.value + (b.value - a.value) * (t - a.time) / span;
            }
        }
        last.value
    }

    /// Set the magnitude sample (second key), leaving every other key untouched.
    pub fn set_peak(&mut self, magnitude: f32) {
        match self.keys.get_mut(1) {
            Some(key) => key.value = magnitude,
            None => *self = Self::step_arc(magnitude),
        }
    }

    pub fn peak(&self) -> Option<f32> {
        self.keys.get(1).map(|k| k.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpineSettings {
    pub min_head_height: f32,
    pub chest_clamp_weight: f32,
    pub maintain_pelvis_position: f32,
    /// Must stay above zero; the solver divides by it
    pub neck_stiffness: f32,
    pub body_pos_stiffness: f32,
    pub body_rot_stiffness: f32,
    pub rotate_chest_by_hands: f32,
    pub head_clamp_weight: f32,
    pub position_weight: f32,
    pub rotation_weight: f32,
    pub head_target: Option<JointId>,
}

impl Default for SpineSettings {
    fn default() -> Self {
        Self {
            min_head_height: 0.8,
            chest_clamp_weight: 0.5,
            maintain_pelvis_position: 0.2,
            neck_stiffness: 0.2,
            body_pos_stiffness: 0.55,
            body_rot_stiffness: 0.1,
            rotate_chest_by_hands: 1.0,
            head_clamp_weight: 0.6,
            position_weight: 1.0,
            rotation_weight: 1.0,
            head_target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocomotionSettings {
    pub weight: f32,
    /// Degrees
    pub angle_threshold: f32,
    pub max_leg_stretch: f32,
    pub velocity_factor: f32,
    pub max_velocity: f32,
    pub root_speed: f32,
    pub foot_distance: f32,
    pub step_threshold: f32,
    pub step_height: Curve,
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        Self {
            weight: 1.0,
            angle_threshold: 60.0,
            max_leg_stretch: 1.0,
            velocity_factor: 0.4,
            max_velocity: 0.4,
            root_speed: 20.0,
            foot_distance: 0.3,
            step_threshold: 0.4,
            step_height: Curve::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSettings {
    /// 0 bends toward the pelvis-relative normal, 1 toward the leg target
    pub bend_to_target_weight: f32,
    pub use_animated_bend_normal: bool,
    pub bend_normal_rel_to_pelvis: Vec3,
}

impl Default for LegSettings {
    fn default() -> Self {
        Self {
            bend_to_target_weight: 0.5,
            use_animated_bend_normal: false,
            bend_normal_rel_to_pelvis: Vec3::ZERO,
        }
    }
}

/// Hand frame axes in the hand's local space. Zero means derive from finger geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmSettings {
    pub wrist_to_palm_axis: Vec3,
    pub palm_to_thumb_axis: Vec3,
}

/// Long-lived solver configuration written by calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub ik_position_weight: f32,
    pub spine: SpineSettings,
    pub locomotion: LocomotionSettings,
    pub left_leg: LegSettings,
    pub right_leg: LegSettings,
    pub left_arm: ArmSettings,
    pub right_arm: ArmSettings,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            ik_position_weight: 1.0,
            spine: SpineSettings::default(),
            locomotion: LocomotionSettings::default(),
            left_leg: LegSettings::default(),
            right_leg: LegSettings::default(),
            left_arm: ArmSettings::default(),
            right_arm: ArmSettings::default(),
        }
    }
}

impl SolverConfig {
    pub fn leg(&self, side: Side) -> &LegSettings {
        match side {
            Side::Left => &self.left_leg,
            Side::Right => &self.right_leg,
        }
    }

    pub fn leg_mut(&mut self, side: Side) -> &mut LegSettings {
        match side {
            Side::Left => &mut self.left_leg,
            Side::Right => &mut self.right_leg,
        }
    }

    pub fn arm(&self, side: Side) -> &ArmSettings {
        match side {
            Side::Left => &self.left_arm,
            Side::Right => &self.right_arm,
        }
    }

    pub fn arm_mut(&mut self, side: Side) -> &mut ArmSettings {
        match side {
            Side::Left => &mut self.left_arm,
            Side::Right => &mut self.right_arm,
        }
    }
}

/// Transform of one referenced joint at initiation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RestJoint {
    pub role: BoneRole,
    pub joint: JointId,
    pub local_position: Vec3,
    pub local_rotation: Quat,
    pub world_position: Vec3,
}

/// What the solver remembers about the rig from the moment it was initiated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverRestState {
    pub joints: Vec<RestJoint>,
    pub left_leg_length: f32,
    pub right_leg_length: f32,
}

impl SolverRestState {
    pub fn joint(&self, role: BoneRole) -> Option<&RestJoint> {
        self.joints.iter().find(|j| j.role == role)
    }

    pub fn leg_length(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left_leg_length,
            Side::Right => self.right_leg_length,
        }
    }
}

/// Callback run before every solver update
pub type PreSolveHook = Box<dyn FnMut(&SolverConfig)>;

/// The solver component attached to an avatar
pub struct IkSolver {
    pub references: BoneReferences,
    pub config: SolverConfig,
    /// Re-apply the rest pose to every referenced joint before each solve
    pub fix_transforms: bool,
    rest_state: Option<SolverRestState>,
    pre_solve: Vec<(String, PreSolveHook)>,
}

impl fmt::Debug for IkSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IkSolver")
            .field("references", &self.references)
            .field("config", &self.config)
            .field("fix_transforms", &self.fix_transforms)
            .field("rest_state", &self.rest_state)
            .field(
                "pre_solve",
                &self.pre_solve.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for IkSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IkSolver {
    pub fn new() -> Self {
        Self {
            references: BoneReferences::default(),
            config: SolverConfig::default(),
            fix_transforms: true,
            rest_state: None,
            pre_solve: Vec::new(),
        }
    }

    pub fn is_initiated(&self) -> bool {
        self.rest_state.is_some()
    }

    pub fn rest_state(&self) -> Option<&SolverRestState> {
        self.rest_state.as_ref()
    }

    /// Bind the solver to its references and capture their current transforms as the rest state.
    ///
    /// Fails on the first unset mandatory role; the previous rest state is kept in that case.
    pub fn initiate(&mut self, pose: &WorldPose<'_>) -> CalibrationResult<()> {
        if let Some(role) = self.references.missing_mandatory().first() {
            return Err(CalibrationError::MissingReference { role: *role });
        }

        let skeleton = pose.skeleton();
        let joints: Vec<RestJoint> = BoneRole::ALL
            .iter()
            .filter_map(|role| {
                let joint = self.references.get(*role)?;
                let data = skeleton.joint(joint);
                Some(RestJoint {
                    role: *role,
                    joint,
                    local_position: data.local_position(),
                    local_rotation: data.local_rotation(),
                    world_position: pose.position(joint),
                })
            })
            .collect();

        let leg_length = |side: Side| -> CalibrationResult<f32> {
            let thigh = pose.position(self.references.require(BoneRole::Thigh(side))?);
            let calf = pose.position(self.references.require(BoneRole::Calf(side))?);
            let foot = pose.position(self.references.require(BoneRole::Foot(side))?);
            Ok(thigh.distance(calf) + calf.distance(foot))
        };

        let state = SolverRestState {
            left_leg_length: leg_length(Side::Left)?,
            right_leg_length: leg_length(Side::Right)?,
            joints,
        };
        log::debug!(
            "Solver initiated with {} joints, leg lengths {:.3}/{:.3}",
            state.joints.len(),
            state.left_leg_length,
            state.right_leg_length
        );
        self.rest_state = Some(state);
        Ok(())
    }

    /// Register a pre-solve callback. A second registration under the same key replaces the first.
    pub fn add_pre_solve_listener(&mut self, key: impl Into<String>, hook: PreSolveHook) {
        let key = key.into();
        match self.pre_solve.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = hook,
            None => self.pre_solve.push((key, hook)),
        }
    }

    pub fn remove_pre_solve_listener(&mut self, key: &str) -> bool {
        let before = self.pre_solve.len();
        self.pre_solve.retain(|(k, _)| k != key);
        self.pre_solve.len() != before
    }

    pub fn pre_solve_listener_count(&self) -> usize {
        self.pre_solve.len()
    }

    /// Run every pre-solve callback in registration order
    pub fn notify_pre_solve(&mut self) {
        let config = &self.config;
        for (_, hook) in self.pre_solve.iter_mut() {
            hook(config);
        }
    }
}
