//! Writes calibration results into the solver configuration.
//!
//! Every function here assigns absolute values, so applying the same inputs
//! twice leaves the configuration exactly as applying them once.

use crate::geometry::{KneeBendHint, LocomotionScale};
use crate::math::EPSILON;
use crate::rig::Side;
use crate::solver::SolverConfig;

/// Neck stiffness floor; the solver divides by it
pub const MIN_NECK_STIFFNESS: f32 = 0.0001;

/// Fixed solver tuning for head-and-hands driven avatars
pub fn apply_static_defaults(config: &mut SolverConfig) {
    config.ik_position_weight = 1.0;

    let locomotion = &mut config.locomotion;
    locomotion.weight = 0.0;
    locomotion.angle_threshold = 30.0;
    locomotion.max_leg_stretch = 0.75;
    // Keep the avatar from walking away on its own
    locomotion.velocity_factor = 0.0;
    locomotion.max_velocity = 0.0;
    locomotion.root_speed = 1000.0;

    let spine = &mut config.spine;
    spine.min_head_height = 0.0;
    spine.chest_clamp_weight = 0.0;
    spine.maintain_pelvis_position = 0.0;
    // Body leaning
    spine.neck_stiffness = MIN_NECK_STIFFNESS;
    spine.body_pos_stiffness = 1.0;
    spine.body_rot_stiffness = 0.2;
    spine.rotate_chest_by_hands = 0.0;
    spine.head_clamp_weight = 0.2;
    // Zero so the solver never lifts the avatar onto its toes
    spine.position_weight = 0.0;
    spine.rotation_weight = 1.0;
}

/// Commit measured locomotion values. The step-height curve keeps its shape; only its peak moves.
pub fn apply_locomotion(config: &mut SolverConfig, scale: &LocomotionScale) {
    config.locomotion.foot_distance = scale.foot_distance;
    config.locomotion.step_threshold = scale.step_threshold;
    config.locomotion.step_height.set_peak(scale.step_height);
}

/// Commit locomotion values multiplied by a runtime avatar-scale modifier
pub fn apply_locomotion_scaled(config: &mut SolverConfig, scale: &LocomotionScale, modifier: f32) {
    apply_locomotion(config, &scale.scaled(modifier));
}

/// Commit knee bend hints.
///
/// Without `experimental`, both legs follow the animated bend normal. With it,
/// legs bend toward the pelvis-relative hint; a leg whose hint is zero falls back
/// to the animated bend normal.
pub fn apply_knee_bend(config: &mut SolverConfig, hint: &KneeBendHint, experimental: bool) {
    if !experimental {
        config.left_leg.use_animated_bend_normal = true;
        config.right_leg.use_animated_bend_normal = true;
        return;
    }

    for side in Side::BOTH {
        let normal = hint.get(side);
        let leg = config.leg_mut(side);
        leg.bend_to_target_weight = 0.0;
        leg.bend_normal_rel_to_pelvis = normal;
        leg.use_animated_bend_normal = normal.length_squared() < EPSILON * EPSILON;
        if leg.use_animated_bend_normal {
            log::warn!(
                "{:?} knee bend normal is degenerate, using the animated bend normal",
                side
            );
        }
    }
}
