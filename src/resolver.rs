//! Repairs the systematic misdetections of humanoid auto-detection before the
//! solver is initiated. None of these steps fail; absent optional joints are skipped.

use glam::Vec3;
use serde::Serialize;

use crate::calibrator::CalibrationSettings;
use crate::rig::{BoneReferences, JointId, Side, Skeleton};
use crate::solver::SolverConfig;

/// What the resolver changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// The shared shoulder parent became the chest
    pub chest_promoted: bool,
    /// Unmapped toe joints were found under both feet
    pub toes_discovered: bool,
    /// The solver has to re-apply rest transforms each frame because it drives joints
    /// the animation runtime does not know about
    pub fix_transforms_required: bool,
    /// Hands without finger joints that received default axes
    pub degenerate_hands: [bool; 2],
}

/// Run chest inference, toe handling and the degenerate-hand fix in that order
pub fn resolve_references(
    skeleton: &Skeleton,
    references: &mut BoneReferences,
    config: &mut SolverConfig,
    settings: &CalibrationSettings,
) -> ResolveReport {
    let mut report = ResolveReport {
        chest_promoted: fix_chest_and_spine(skeleton, references),
        ..ResolveReport::default()
    };

    if !settings.use_toes {
        references.left.toes = None;
        references.right.toes = None;
    } else if settings.find_unmapped_toes {
        report.toes_discovered = find_and_set_unmapped_toes(skeleton, references);
        report.fix_transforms_required = report.toes_discovered;
    }

    for (i, side) in Side::BOTH.iter().enumerate() {
        report.degenerate_hands[i] = fix_finger_bones(skeleton, references, config, *side);
    }
    report
}

/// Promote the parent shared by both shoulders to chest, and its parent to spine.
fn fix_chest_and_spine(skeleton: &Skeleton, references: &mut BoneReferences) -> bool {
    let (Some(left), Some(right)) = (references.left.shoulder, references.right.shoulder) else {
        return false;
    };
    let Some(assumed_chest) = skeleton.parent(left) else {
        return false;
    };
    if skeleton.parent(right) != Some(assumed_chest) || references.chest == Some(assumed_chest) {
        return false;
    }

    references.chest = Some(assumed_chest);
    references.spine = skeleton.parent(assumed_chest);
    log::info!(
        "Chest reference moved to '{}' (shared shoulder parent)",
        skeleton.name(assumed_chest)
    );
    true
}

/// Fill both toe references from foot children, or neither.
fn find_and_set_unmapped_toes(skeleton: &Skeleton, references: &mut BoneReferences) -> bool {
    if references.left.toes.is_some() || references.right.toes.is_some() {
        return false;
    }

    let left = references
        .left
        .foot
        .and_then(|foot| find_unmapped_toe(skeleton, foot));
    let right = references
        .right
        .foot
        .and_then(|foot| find_unmapped_toe(skeleton, foot));

    match (left, right) {
        (Some(left), Some(right)) => {
            references.left.toes = Some(left);
            references.right.toes = Some(right);
            log::info!(
                "Using unmapped toes '{}' and '{}'",
                skeleton.name(left),
                skeleton.name(right)
            );
            true
        }
        (None, None) => false,
        _ => {
            log::debug!("Toe joint found under one foot only, leaving toes unset");
            false
        }
    }
}

/// First direct child of `foot` named like a toe joint
pub fn find_unmapped_toe(skeleton: &Skeleton, foot: JointId) -> Option<JointId> {
    skeleton.children(foot).iter().copied().find(|child| {
        let name = skeleton.name(*child).to_lowercase();
        name.contains("toe") || name.ends_with("_end")
    })
}

/// Give a finger-less hand fixed palm axes instead of ones derived from missing geometry.
fn fix_finger_bones(
    skeleton: &Skeleton,
    references: &BoneReferences,
    config: &mut SolverConfig,
    side: Side,
) -> bool {
    let Some(hand) = references.limb(side).hand else {
        return false;
    };
    if !skeleton.children(hand).is_empty() {
        return false;
    }

    let arm = config.arm_mut(side);
    arm.wrist_to_palm_axis = Vec3::Y;
    arm.palm_to_thumb_axis = match side {
        Side::Left => Vec3::NEG_Z,
        Side::Right => Vec3::Z,
    };
    log::warn!(
        "Hand '{}' has no finger joints, using default palm axes",
        skeleton.name(hand)
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::mannequin::{build_mannequin, MannequinOptions};
    use crate::rig::{Avatar, HumanBone};

    fn resolve(avatar: &Avatar, settings: &CalibrationSettings) -> (BoneReferences, SolverConfig, ResolveReport) {
        let mut refs = BoneReferences::auto_detect(avatar);
        let mut config = SolverConfig::default();
        let report = resolve_references(&avatar.skeleton, &mut refs, &mut config, settings);
        (refs, config, report)
    }

    #[test]
    fn test_chest_inference_and_idempotence() {
        let avatar = build_mannequin(&MannequinOptions {
            chest_misdetected: true,
            ..MannequinOptions::default()
        })
        .unwrap();
        let skeleton = &avatar.skeleton;
        let upper_chest = skeleton.find("UpperChest").unwrap();
        let chest = skeleton.find("Chest").unwrap();

        let mut refs = BoneReferences::auto_detect(&avatar);
        assert_eq!(refs.chest, Some(chest));

        let mut config = SolverConfig::default();
        let settings = CalibrationSettings::default();
        let report = resolve_references(skeleton, &mut refs, &mut config, &settings);
        assert!(report.chest_promoted);
        assert_eq!(refs.chest, Some(upper_chest));
        assert_eq!(refs.spine, Some(chest));

        let again = refs;
        let report = resolve_references(skeleton, &mut refs, &mut config, &settings);
        assert!(!report.chest_promoted);
        assert_eq!(refs, again);
    }

    #[test]
    fn test_chest_untouched_when_shoulders_disagree() {
        let avatar = build_mannequin(&MannequinOptions {
            chest_misdetected: true,
            ..MannequinOptions::default()
        })
        .unwrap();
        let mut refs = BoneReferences::auto_detect(&avatar);
        refs.right.shoulder = avatar.skeleton.find("Head");
        let before = (refs.chest, refs.spine);

        let mut config = SolverConfig::default();
        resolve_references(&avatar.skeleton, &mut refs, &mut config, &CalibrationSettings::default());
        assert_eq!((refs.chest, refs.spine), before);

        refs.left.shoulder = None;
        resolve_references(&avatar.skeleton, &mut refs, &mut config, &CalibrationSettings::default());
        assert_eq!((refs.chest, refs.spine), before);
    }

    #[test]
    fn test_toes_found_on_both_feet() {
        let avatar = build_mannequin(&MannequinOptions {
            toe_names: [Some("Toe.L".to_string()), Some("foot_r_END".to_string())],
            map_toes: false,
            ..MannequinOptions::default()
        })
        .unwrap();
        let (refs, _, report) = resolve(&avatar, &CalibrationSettings::default());

        assert!(report.toes_discovered);
        assert!(report.fix_transforms_required);
        assert_eq!(refs.left.toes, avatar.skeleton.find("Toe.L"));
        assert_eq!(refs.right.toes, avatar.skeleton.find("foot_r_END"));
    }

    #[test]
    fn test_toes_all_or_nothing() {
        let avatar = build_mannequin(&MannequinOptions {
            toe_names: [Some("LeftToeBase".to_string()), None],
            map_toes: false,
            ..MannequinOptions::default()
        })
        .unwrap();
        let (refs, _, report) = resolve(&avatar, &CalibrationSettings::default());

        assert!(!report.toes_discovered);
        assert!(!report.fix_transforms_required);
        assert_eq!(refs.left.toes, None);
        assert_eq!(refs.right.toes, None);
    }

    #[test]
    fn test_toe_name_must_match() {
        let avatar = build_mannequin(&MannequinOptions {
            toe_names: [Some("Heel_L".to_string()), Some("Heel_R".to_string())],
            map_toes: false,
            ..MannequinOptions::default()
        })
        .unwrap();
        let (refs, _, _) = resolve(&avatar, &CalibrationSettings::default());
        assert_eq!(refs.left.toes, None);
    }

    #[test]
    fn test_mapped_toes_are_kept_and_not_searched() {
        let avatar = build_mannequin(&MannequinOptions::default()).unwrap();
        let map = avatar.humanoid.as_ref().unwrap();
        let (refs, _, report) = resolve(&avatar, &CalibrationSettings::default());

        assert!(!report.toes_discovered);
        assert_eq!(refs.left.toes, map.get(HumanBone::LeftToes));
    }

    #[test]
    fn test_toes_disabled_clears_both() {
        let avatar = build_mannequin(&MannequinOptions::default()).unwrap();
        let settings = CalibrationSettings {
            use_toes: false,
            ..CalibrationSettings::default()
        };
        let (refs, _, report) = resolve(&avatar, &settings);
        assert_eq!(refs.left.toes, None);
        assert_eq!(refs.right.toes, None);
        assert!(!report.toes_discovered);
    }

    #[test]
    fn test_degenerate_hands_get_default_axes() {
        let avatar = build_mannequin(&MannequinOptions {
            fingers: false,
            scale: 3.0,
            ..MannequinOptions::default()
        })
        .unwrap();
        let (_, config, report) = resolve(&avatar, &CalibrationSettings::default());

        assert_eq!(report.degenerate_hands, [true, true]);
        assert_eq!(config.left_arm.wrist_to_palm_axis, Vec3::Y);
        assert_eq!(config.left_arm.palm_to_thumb_axis, Vec3::NEG_Z);
        assert_eq!(config.right_arm.wrist_to_palm_axis, Vec3::Y);
        assert_eq!(config.right_arm.palm_to_thumb_axis, Vec3::Z);
    }

    #[test]
    fn test_hands_with_fingers_untouched() {
        let avatar = build_mannequin(&MannequinOptions::default()).unwrap();
        let (_, config, report) = resolve(&avatar, &CalibrationSettings::default());
        assert_eq!(report.degenerate_hands, [false, false]);
        assert_eq!(config.left_arm, SolverConfig::default().left_arm);
    }
}
