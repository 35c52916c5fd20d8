//! Entry points for hosts that exchange rigs as JSON, including the browser build.

use serde::Serialize;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::calibrator::{
    BodyTracking, CalibrationOutcome, CalibrationReport, CalibrationSettings, CalibrationState,
    Calibrator,
};
use crate::error::CalibrationResult;
use crate::rig::{Avatar, AvatarJson};

/// Result document of a one-shot calibration
#[derive(Debug, Serialize)]
pub struct CalibrationResponse {
    pub state: CalibrationState,
    pub report: Option<CalibrationReport>,
    /// The rig as calibration left it, head target included
    pub rig: AvatarJson,
}

/// Calibrate a rig description with a fresh solver.
///
/// `settings_json` may be omitted or partial; missing fields take their defaults.
pub fn calibrate_rig_json(
    rig_json: &str,
    settings_json: Option<&str>,
) -> CalibrationResult<CalibrationResponse> {
    let settings = match settings_json {
        Some(json) => CalibrationSettings::from_json(json)?,
        None => CalibrationSettings::default(),
    };
    let mut avatar = Avatar::from_json(rig_json)?;
    let mut calibrator = Calibrator::new(settings);
    let mut solver = None;
    let mut tracking = BodyTracking::default();

    let report = match calibrator.calibrate(&mut avatar, &mut solver, &mut tracking)? {
        CalibrationOutcome::Complete(report) => Some(*report),
        CalibrationOutcome::DebugHold => None,
    };

    Ok(CalibrationResponse {
        state: calibrator.state(),
        report,
        rig: AvatarJson::from_avatar(&avatar)?,
    })
}

/// Route `log` output to the browser console. Native hosts install their own logger.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn init_logging() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).ok();
        } else {
            log::debug!("Logging is configured by the host");
        }
    }
}

/// Calibrate a rig description and return the response as a JS object
#[wasm_bindgen]
#[cfg(target_arch = "wasm32")]
pub fn calibrate_rig(rig_json: &str, settings_json: Option<String>) -> Result<JsValue, JsValue> {
    let response = calibrate_rig_json(rig_json, settings_json.as_deref())
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    serde_wasm_bindgen::to_value(&response).map_err(|err| JsValue::from_str(&err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::mannequin::{build_mannequin, MannequinOptions};
    use wasm_bindgen_test::*;

    fn mannequin_json() -> String {
        build_mannequin(&MannequinOptions::default())
            .unwrap()
            .to_json_string()
            .unwrap()
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_calibrate_from_json() {
        let response = calibrate_rig_json(&mannequin_json(), None).unwrap();
        assert_eq!(response.state, CalibrationState::Complete);

        let report = response.report.unwrap();
        assert!(report.locomotion.foot_distance > 0.0);
        assert!(response
            .rig
            .joints
            .iter()
            .any(|j| j.name == crate::calibrator::HEAD_TARGET_NAME && j.parent.as_deref() == Some("Head")));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"step_threshold\""));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_straight_legged_rig_from_json() {
        let rig = build_mannequin(&MannequinOptions {
            knee_forward: 0.0,
            foot_separation: 0.4,
            ..MannequinOptions::default()
        })
        .unwrap()
        .to_json_string()
        .unwrap();
        let report = calibrate_rig_json(&rig, None).unwrap().report.unwrap();

        assert!((report.locomotion.foot_distance - 0.2).abs() < 1e-4);
        assert!((report.locomotion.step_threshold - 0.4).abs() < 1e-4);
        for leg in [&report.config.left_leg, &report.config.right_leg] {
            assert!(!leg.use_animated_bend_normal);
            assert!((leg.bend_normal_rel_to_pelvis.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_partial_settings() {
        let response =
            calibrate_rig_json(&mannequin_json(), Some(r#"{ "debug_calibration_pose": true }"#)).unwrap();
        assert_eq!(response.state, CalibrationState::DebugHold);
        assert!(response.report.is_none());
        assert_eq!(response.rig.animator.map(|a| a.enabled), Some(false));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_bad_input_is_an_error() {
        assert!(calibrate_rig_json("{", None).is_err());
        assert!(calibrate_rig_json(&mannequin_json(), Some("{ \"use_toes\": 3 }")).is_err());

        let no_humanoid = r#"{ "joints": [ { "name": "Root" } ], "animator": {} }"#;
        assert!(matches!(
            calibrate_rig_json(no_humanoid, None),
            Err(crate::error::CalibrationError::MissingHumanoid)
        ));
    }
}
