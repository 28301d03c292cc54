// src/config.rs
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::technique::Gesture;

/// Entry, hold and smoothing parameters for one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureThresholds {
    /// Confidence needed to become active.
    pub enter: f64,
    /// Confidence below which an active gesture drops. Kept below `enter`.
    pub hold: f64,
    /// Fraction of the remaining distance to 1.0 gained per matching frame.
    pub rise: f64,
    /// Linear decay per non-matching frame.
    pub fall: f64,
    pub cooldown_ms: f64,
}

impl GestureThresholds {
    pub const fn new(enter: f64, hold: f64, rise: f64, fall: f64, cooldown_ms: f64) -> Self {
        Self {
            enter,
            hold,
            rise,
            fall,
            cooldown_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureTable {
    pub red: GestureThresholds,
    pub blue: GestureThresholds,
    pub purple: GestureThresholds,
    pub void: GestureThresholds,
    pub shrine: GestureThresholds,
}

impl Default for GestureTable {
    fn default() -> Self {
        Self {
            red: GestureThresholds::new(0.68, 0.36, 0.26, 0.14, 260.0),
            blue: GestureThresholds::new(0.68, 0.36, 0.26, 0.14, 260.0),
            purple: GestureThresholds::new(0.66, 0.34, 0.24, 0.12, 280.0),
            void: GestureThresholds::new(0.62, 0.33, 0.28, 0.16, 380.0),
            shrine: GestureThresholds::new(0.55, 0.28, 0.42, 0.10, 320.0),
        }
    }
}

impl GestureTable {
    pub fn get(&self, gesture: Gesture) -> &GestureThresholds {
        match gesture {
            Gesture::Red => &self.red,
            Gesture::Blue => &self.blue,
            Gesture::Purple => &self.purple,
            Gesture::Void => &self.void,
            Gesture::Shrine => &self.shrine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub gestures: GestureTable,
    /// A challenger must exceed its own enter threshold by this much to switch.
    pub switch_enter_margin: f64,
    /// ...and the active gesture's confidence by this much.
    pub switch_confidence_margin: f64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            gestures: GestureTable::default(),
            switch_enter_margin: 0.08,
            switch_confidence_margin: 0.06,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    /// Lock into two-hand-only classification once two hands are seen.
    pub two_hand_latch: bool,
    pub mudra_unlock_no_hand_frames: u32,
    pub shrine_sticky_frames: u32,
    pub void_sticky_frames: u32,
    pub two_hand_track_grace_frames: u32,
    /// Two-hand frames that never report the joined pose after hands appear.
    pub mudra_arm_frames: u32,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            two_hand_latch: true,
            mudra_unlock_no_hand_frames: 12,
            shrine_sticky_frames: 14,
            void_sticky_frames: 8,
            two_hand_track_grace_frames: 12,
            mudra_arm_frames: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub charge_rise: f64,
    pub charge_fall: f64,
    pub charge_fall_no_hands: f64,
    pub charge_threshold: f64,
    /// Palm displacement per frame, in normalized image units.
    pub min_palm_speed: f64,
    pub refractory_ms: f64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            charge_rise: 0.22,
            charge_fall: 0.08,
            charge_fall_no_hands: 0.12,
            charge_threshold: 0.48,
            min_palm_speed: 0.009,
            refractory_ms: 420.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub arbiter: ArbiterConfig,
    pub mode: ModeConfig,
    pub release: ReleaseConfig,
}

fn ensure(ok: bool, message: impl FnOnce() -> String) -> Result<(), EngineError> {
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(message()))
    }
}

impl GestureThresholds {
    fn validate(&self, gesture: Gesture) -> Result<(), EngineError> {
        ensure(
            self.enter > 0.0 && self.enter <= 1.0,
            || format!("{gesture}: enter {} must be in (0, 1]", self.enter),
        )?;
        ensure(
            self.hold >= 0.0 && self.hold < self.enter,
            || format!("{gesture}: hold {} must be in [0, enter {})", self.hold, self.enter),
        )?;
        ensure(
            self.rise > 0.0 && self.rise <= 1.0,
            || format!("{gesture}: rise {} must be in (0, 1]", self.rise),
        )?;
        ensure(
            self.fall > 0.0 && self.fall <= 1.0,
            || format!("{gesture}: fall {} must be in (0, 1]", self.fall),
        )?;
        ensure(
            self.cooldown_ms >= 0.0 && self.cooldown_ms.is_finite(),
            || format!("{gesture}: cooldown_ms {} must be finite and non-negative", self.cooldown_ms),
        )
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would defeat hysteresis or the two-hand latch.
    ///
    /// Zero sticky, arming and grace counts are allowed and switch those windows off.
    pub fn validate(&self) -> Result<(), EngineError> {
        for gesture in Gesture::ALL {
            self.arbiter.gestures.get(gesture).validate(gesture)?;
        }
        ensure(
            self.arbiter.switch_enter_margin >= 0.0 && self.arbiter.switch_confidence_margin >= 0.0,
            || "switch margins must be non-negative".to_string(),
        )?;
        ensure(self.mode.mudra_unlock_no_hand_frames > 0, || {
            "mode.mudra_unlock_no_hand_frames must be at least 1".to_string()
        })?;

        let r = &self.release;
        ensure(
            r.charge_threshold > 0.0 && r.charge_threshold < 1.0,
            || format!("release.charge_threshold {} must be in (0, 1)", r.charge_threshold),
        )?;
        ensure(
            [r.charge_rise, r.charge_fall, r.charge_fall_no_hands, r.min_palm_speed, r.refractory_ms]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0),
            || "release rates, speed and refractory_ms must be finite and non-negative".to_string(),
        )
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_is_below_enter_for_every_gesture() {
        let table = GestureTable::default();
        for gesture in Gesture::ALL {
            let t = table.get(gesture);
            assert!(t.hold < t.enter, "{gesture}");
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "mode": { "shrine_sticky_frames": 20 }, "release": { "refractory_ms": 600 } }"#,
        )
        .unwrap();
        assert_eq!(config.mode.shrine_sticky_frames, 20);
        assert_eq!(config.mode.void_sticky_frames, 8);
        assert_eq!(config.release.refractory_ms, 600.0);
        assert_eq!(config.arbiter, ArbiterConfig::default());
    }

    #[test]
    fn gesture_rows_can_be_overridden() {
        let config = EngineConfig::from_json_str(
            r#"{ "arbiter": { "gestures": { "void": { "enter": 0.7, "hold": 0.4, "rise": 0.3, "fall": 0.2, "cooldown_ms": 500 } } } }"#,
        )
        .unwrap();
        assert_eq!(config.arbiter.gestures.void.enter, 0.7);
        assert_eq!(config.arbiter.gestures.red, GestureTable::default().red);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn hold_at_or_above_enter_is_rejected() {
        let err = EngineConfig::from_json_str(
            r#"{ "arbiter": { "gestures": { "red": { "enter": 0.5, "hold": 0.5, "rise": 0.26, "fall": 0.14, "cooldown_ms": 260 } } } }"#,
        )
        .unwrap_err();
        match err {
            EngineError::InvalidConfig(message) => assert!(message.contains("hold"), "{message}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn zero_unlock_frames_is_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "mode": { "mudra_unlock_no_hand_frames": 0 } }"#),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(EngineConfig::from_json_str(r#"{ "mode": { "shrine_sticky_frames": 0 } }"#).is_ok());
    }

    #[test]
    fn release_threshold_must_be_reachable() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "release": { "charge_threshold": 1.0 } }"#),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
