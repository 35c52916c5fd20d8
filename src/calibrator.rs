//! Calibration orchestrator.
//!
//! Sequences one calibration run over an avatar:
//!
//! ```text
//! Idle -> Scanning -> Preparing -> PosedForMeasurement -> Measuring
//!      -> Configuring -> Restoring -> Complete
//! ```
//!
//! or, with the debug pose setting on, `Preparing -> DebugHold` on every other run.
//! The solver and tracking blender are passed in per call; the calibrator keeps
//! only its settings, its pose handler and the last calibrated values.

use std::fmt;
use std::rc::Rc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::apply::{apply_knee_bend, apply_locomotion, apply_locomotion_scaled, apply_static_defaults};
use crate::error::{CalibrationError, CalibrationResult};
use crate::geometry::{
    knee_bend_normals, measure_locomotion, KneeBendHint, KneeBendNormals, LocomotionScale,
};
use crate::pose::{HumanPose, PoseHandler};
use crate::resolver::{resolve_references, ResolveReport};
use crate::rig::{Animator, Avatar, BoneReferences, BoneRole, JointId, Skeleton};
use crate::solver::{IkSolver, SolverConfig};

/// Name of the joint created under the head as the head IK target
pub const HEAD_TARGET_NAME: &str = "Head IK Target";
/// Key under which calibration registers its pre-solve callback
pub const PRE_SOLVE_KEY: &str = "calibration";

fn default_true() -> bool {
    true
}

/// User-facing calibration switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Let the solver drive toe joints
    #[serde(default = "default_true")]
    pub use_toes: bool,
    /// Look for toe joints the humanoid map left out
    #[serde(default = "default_true")]
    pub find_unmapped_toes: bool,
    /// Bend knees toward the calibrated normals instead of the animated ones
    #[serde(default = "default_true")]
    pub experimental_knee_bend: bool,
    /// Alternate runs freeze the avatar in the neutral calibration pose
    #[serde(default)]
    pub debug_calibration_pose: bool,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            use_toes: true,
            find_unmapped_toes: true,
            experimental_knee_bend: true,
            debug_calibration_pose: false,
        }
    }
}

impl CalibrationSettings {
    pub fn from_json(json: &str) -> CalibrationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationState {
    Idle,
    Scanning,
    Preparing,
    PosedForMeasurement,
    Measuring,
    Configuring,
    Restoring,
    Complete,
    DebugHold,
}

/// Tracked limb of the body tracking blender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Limb {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl Limb {
    pub const ALL: [Limb; 4] = [Limb::LeftArm, Limb::RightArm, Limb::LeftLeg, Limb::RightLeg];
}

/// Blends live tracking data into the avatar pose.
///
/// Calibration switches tracking off so forced poses are not overridden; the
/// host turns it back on when live tracking resumes.
pub trait TrackingBlender {
    fn set_limb_tracking(&mut self, limb: Limb, enabled: bool);
    fn set_position_weight(&mut self, weight: f32);
}

/// Plain tracking switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTracking {
    pub left_arm: bool,
    pub right_arm: bool,
    pub left_leg: bool,
    pub right_leg: bool,
    pub position_weight: f32,
}

impl Default for BodyTracking {
    fn default() -> Self {
        Self {
            left_arm: true,
            right_arm: true,
            left_leg: true,
            right_leg: true,
            position_weight: 1.0,
        }
    }
}

impl BodyTracking {
    pub fn limb_enabled(&self, limb: Limb) -> bool {
        match limb {
            Limb::LeftArm => self.left_arm,
            Limb::RightArm => self.right_arm,
            Limb::LeftLeg => self.left_leg,
            Limb::RightLeg => self.right_leg,
        }
    }
}

impl TrackingBlender for BodyTracking {
    fn set_limb_tracking(&mut self, limb: Limb, enabled: bool) {
        match limb {
            Limb::LeftArm => self.left_arm = enabled,
            Limb::RightArm => self.right_arm = enabled,
            Limb::LeftLeg => self.left_leg = enabled,
            Limb::RightLeg => self.right_leg = enabled,
        }
    }

    fn set_position_weight(&mut self, weight: f32) {
        self.position_weight = weight;
    }
}

/// Everything a completed run measured and committed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub references: BoneReferences,
    pub resolve: ResolveReport,
    pub fix_transforms: bool,
    /// Knee normals in the root frame, measured in the neutral pose
    pub knee_normals: KneeBendNormals,
    pub knee_hint: KneeBendHint,
    pub locomotion: LocomotionScale,
    pub head_target: JointId,
    /// The avatar supplied its own IK pose through animator layers
    pub used_ik_pose_layers: bool,
    pub config: SolverConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    Complete(Box<CalibrationReport>),
    /// The avatar is frozen in the neutral calibration pose; calibrate again to leave it
    DebugHold,
}

/// Callback calibration registers on the solver's pre-solve notification
pub type SharedPreSolveHook = Rc<dyn Fn(&SolverConfig)>;

pub struct Calibrator {
    pub settings: CalibrationSettings,
    pose_handler: Option<PoseHandler>,
    debug_pose_active: bool,
    state: CalibrationState,
    /// States entered by the current or last run, in order
    trail: Vec<CalibrationState>,
    calibrated: Option<CalibrationReport>,
    pre_solve_hook: SharedPreSolveHook,
}

impl fmt::Debug for Calibrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calibrator")
            .field("settings", &self.settings)
            .field("pose_handler", &self.pose_handler.is_some())
            .field("debug_pose_active", &self.debug_pose_active)
            .field("state", &self.state)
            .field("trail", &self.trail)
            .field("calibrated", &self.calibrated)
            .finish()
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(CalibrationSettings::default())
    }
}

/// Per-run values the measuring steps hand to later steps
struct Measurements {
    knee_normals: KneeBendNormals,
    locomotion: LocomotionScale,
    head_target: JointId,
    used_ik_pose_layers: bool,
}

impl Calibrator {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            pose_handler: None,
            debug_pose_active: false,
            state: CalibrationState::Idle,
            trail: Vec::new(),
            calibrated: None,
            pre_solve_hook: Rc::new(|_: &SolverConfig| log::trace!("pre-solve")),
        }
    }

    /// Replace the callback registered on the solver by the next run
    pub fn with_pre_solve_hook(mut self, hook: SharedPreSolveHook) -> Self {
        self.pre_solve_hook = hook;
        self
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// States the last run went through, starting at `Scanning`
    pub fn last_run_states(&self) -> &[CalibrationState] {
        &self.trail
    }

    /// Values from the last completed run
    pub fn calibrated(&self) -> Option<&CalibrationReport> {
        self.calibrated.as_ref()
    }

    fn enter(&mut self, state: CalibrationState) {
        log::debug!("Calibration {:?} -> {:?}", self.state, state);
        self.state = state;
        self.trail.push(state);
    }

    /// Run one calibration of `avatar`.
    ///
    /// Fails before touching the avatar if it has no drivable humanoid rig or no
    /// animator. A missing mandatory bone surfaces as `MissingReference` when the
    /// solver is initiated, after the avatar has already been posed.
    pub fn calibrate(
        &mut self,
        avatar: &mut Avatar,
        solver_slot: &mut Option<IkSolver>,
        tracking: &mut dyn TrackingBlender,
    ) -> CalibrationResult<CalibrationOutcome> {
        let result = self.run(avatar, solver_slot, tracking);
        if let Err(err) = &result {
            log::error!("Calibration failed in {:?}: {}", self.state, err);
            self.enter(CalibrationState::Idle);
        }
        result
    }

    fn run(
        &mut self,
        avatar: &mut Avatar,
        solver_slot: &mut Option<IkSolver>,
        tracking: &mut dyn TrackingBlender,
    ) -> CalibrationResult<CalibrationOutcome> {
        let leaving_debug_hold = self.state == CalibrationState::DebugHold;
        self.trail.clear();
        self.enter(CalibrationState::Scanning);
        let (handler, snapshot, animator_disabled) = self.scan(avatar, leaving_debug_hold)?;

        self.enter(CalibrationState::Preparing);
        for limb in Limb::ALL {
            tracking.set_limb_tracking(limb, false);
        }
        tracking.set_position_weight(0.0);

        self.debug_pose_active = !self.debug_pose_active;
        if self.settings.debug_calibration_pose && self.debug_pose_active {
            handler.force_ik_pose(&mut avatar.skeleton, 0.0);
            if let Some(animator) = avatar.animator.as_mut() {
                animator.enabled = false;
            }
            self.pose_handler = Some(handler);
            self.enter(CalibrationState::DebugHold);
            return Ok(CalibrationOutcome::DebugHold);
        }

        let solver = solver_slot.get_or_insert_with(|| {
            log::info!("Attaching IK solver");
            IkSolver::new()
        });
        let resolve = self.prepare_solver(avatar, solver, animator_disabled);
        handler.force_ik_pose(&mut avatar.skeleton, 0.0);
        self.enter(CalibrationState::PosedForMeasurement);

        let measured = self.measure(avatar, solver, &handler);
        self.pose_handler = Some(handler);
        let measured = measured?;

        set_ik_pose_layers(avatar.animator.as_mut(), false);
        if let Some(handler) = &self.pose_handler {
            handler.apply(&mut avatar.skeleton, &snapshot);
        }
        self.enter(CalibrationState::Restoring);

        let pelvis = solver.references.require(BoneRole::Pelvis)?;
        let pelvis_local = avatar.skeleton.joint(pelvis).local_rotation();
        let knee_hint = KneeBendHint::relative_to_pelvis(&measured.knee_normals, pelvis_local);
        apply_knee_bend(&mut solver.config, &knee_hint, self.settings.experimental_knee_bend);
        apply_locomotion(&mut solver.config, &measured.locomotion);

        let hook = Rc::clone(&self.pre_solve_hook);
        solver.add_pre_solve_listener(PRE_SOLVE_KEY, Box::new(move |config: &SolverConfig| hook(config)));

        let report = CalibrationReport {
            references: solver.references,
            resolve,
            fix_transforms: solver.fix_transforms,
            knee_normals: measured.knee_normals,
            knee_hint,
            locomotion: measured.locomotion,
            head_target: measured.head_target,
            used_ik_pose_layers: measured.used_ik_pose_layers,
            config: solver.config.clone(),
        };
        self.calibrated = Some(report.clone());
        self.enter(CalibrationState::Complete);
        log::info!(
            "Calibrated: foot distance {:.3}, step threshold {:.3}, step height {:.3}",
            report.locomotion.foot_distance,
            report.locomotion.step_threshold,
            report.locomotion.step_height
        );
        Ok(CalibrationOutcome::Complete(Box::new(report)))
    }

    /// Check the avatar is drivable, normalize its root and snapshot its pose.
    fn scan(
        &mut self,
        avatar: &mut Avatar,
        leaving_debug_hold: bool,
    ) -> CalibrationResult<(PoseHandler, HumanPose, bool)> {
        if !avatar.humanoid.as_ref().is_some_and(|map| map.is_drivable()) {
            return Err(CalibrationError::MissingHumanoid);
        }
        let Some(animator) = avatar.animator.as_mut() else {
            return Err(CalibrationError::MissingAnimator);
        };

        if leaving_debug_hold {
            log::debug!("Leaving debug calibration pose");
            animator.enabled = true;
        }
        let animator_disabled = !animator.enabled;
        if animator_disabled {
            log::error!("Avatar has its animator disabled by default");
        }

        let root = avatar.skeleton.root();
        avatar.skeleton.set_local_position(root, Vec3::ZERO);

        if self.pose_handler.take().is_some() {
            log::debug!("Released previous pose handler");
        }
        let handler = PoseHandler::new(avatar)?;
        let snapshot = handler.sample(&avatar.skeleton);
        Ok((handler, snapshot, animator_disabled))
    }

    /// Bind references, repair them and write the fixed solver defaults.
    fn prepare_solver(
        &self,
        avatar: &Avatar,
        solver: &mut IkSolver,
        animator_disabled: bool,
    ) -> ResolveReport {
        solver.references = BoneReferences::auto_detect(avatar);
        let resolve = resolve_references(
            &avatar.skeleton,
            &mut solver.references,
            &mut solver.config,
            &self.settings,
        );
        solver.fix_transforms = animator_disabled || resolve.fix_transforms_required;
        apply_static_defaults(&mut solver.config);
        resolve
    }

    /// Knee normals in the neutral pose, then limb measurements and solver
    /// initiation in the IK pose. Leaves the avatar in the IK pose.
    fn measure(
        &mut self,
        avatar: &mut Avatar,
        solver: &mut IkSolver,
        handler: &PoseHandler,
    ) -> CalibrationResult<Measurements> {
        let knee_normals = knee_bend_normals(&avatar.skeleton.evaluate(), &solver.references);

        let used_ik_pose_layers = set_ik_pose_layers(avatar.animator.as_mut(), true);
        handler.force_ik_pose(&mut avatar.skeleton, 1.0);
        self.enter(CalibrationState::Measuring);

        let head_target = setup_head_target(&mut avatar.skeleton, solver)?;
        let pose = avatar.skeleton.evaluate();
        let locomotion = measure_locomotion(&pose, &solver.references)?;
        solver.initiate(&pose)?;
        self.enter(CalibrationState::Configuring);

        Ok(Measurements {
            knee_normals,
            locomotion,
            head_target,
            used_ik_pose_layers,
        })
    }

    /// Re-apply the last calibrated locomotion values scaled by a runtime avatar-scale modifier.
    ///
    /// Returns false when nothing has been calibrated yet.
    pub fn rescale(&self, solver: &mut IkSolver, modifier: f32) -> bool {
        match &self.calibrated {
            Some(report) => {
                apply_locomotion_scaled(&mut solver.config, &report.locomotion, modifier);
                true
            }
            None => false,
        }
    }
}

/// Switch to (or away from) an avatar-supplied IK pose layer. Returns whether the avatar has one.
fn set_ik_pose_layers(animator: Option<&mut Animator>, enforce: bool) -> bool {
    let Some(animator) = animator else {
        return false;
    };
    let Some((ik_pose, locomotion)) = animator.ik_pose_layers() else {
        return false;
    };
    animator.set_layer_weight(ik_pose, if enforce { 1.0 } else { 0.0 });
    animator.set_layer_weight(locomotion, if enforce { 0.0 } else { 1.0 });
    true
}

/// Place the head IK target at the head joint, creating it on first use.
///
/// A target id left on the solver by an earlier run is only reused if it still
/// names a head target joint in this skeleton.
fn setup_head_target(skeleton: &mut Skeleton, solver: &mut IkSolver) -> CalibrationResult<JointId> {
    let head = solver.references.require(BoneRole::Head)?;

    let existing = solver
        .config
        .spine
        .head_target
        .filter(|target| {
            skeleton.contains(*target)
                && skeleton.name(*target) == HEAD_TARGET_NAME
                && !skeleton.is_descendant_of(head, *target)
        })
        .or_else(|| {
            skeleton
                .children(head)
                .iter()
                .copied()
                .find(|child| skeleton.name(*child) == HEAD_TARGET_NAME)
        });

    let target = match existing {
        Some(target) => {
            skeleton.set_parent(target, head)?;
            target
        }
        None => {
            log::debug!("Creating head IK target");
            skeleton.add_joint(HEAD_TARGET_NAME, head, Vec3::ZERO, Quat::IDENTITY)?
        }
    };
    skeleton.set_local_position(target, Vec3::ZERO);
    skeleton.set_local_rotation(target, Quat::IDENTITY);
    solver.config.spine.head_target = Some(target);
    Ok(target)
}
