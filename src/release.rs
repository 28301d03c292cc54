// src/release.rs
use nalgebra::{Vector2, Vector3};
use serde::Serialize;
use tracing::info;

use crate::classifier::HandLabel;
use crate::config::ReleaseConfig;
use crate::technique::Technique;

/// Screen-space velocity gain for the throw direction.
const DIRECTION_GAIN_X: f64 = 2.2;
const DIRECTION_GAIN_Y: f64 = 2.1;
/// Constant push away from the viewer.
const DIRECTION_FORWARD: f64 = -0.55;
const DEGENERATE_DIRECTION_NORM2: f64 = 1e-4;

/// One-shot throw of the active technique.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReleaseEvent {
    pub technique: Technique,
    /// Unit vector; y points up, negative z points into the scene.
    pub direction: Vector3<f64>,
    pub at_ms: f64,
}

/// Map a palm velocity (normalized image units per frame) to a unit throw direction.
pub fn release_direction(velocity: Vector2<f64>) -> Vector3<f64> {
    let v = Vector3::new(
        velocity.x * DIRECTION_GAIN_X,
        -velocity.y * DIRECTION_GAIN_Y,
        DIRECTION_FORWARD,
    );
    if v.norm_squared() < DEGENERATE_DIRECTION_NORM2 {
        return Vector3::new(0.0, 0.0, -1.0);
    }
    v.normalize()
}

pub struct ReleaseTrigger {
    config: ReleaseConfig,
    charge: f64,
    last_palm: Option<Vector2<f64>>,
    last_release_at: f64,
}

impl ReleaseTrigger {
    pub fn new(config: ReleaseConfig) -> Self {
        Self {
            config,
            charge: 0.0,
            last_palm: None,
            last_release_at: f64::NEG_INFINITY,
        }
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Two-hand and carried frames: no charge, no palm history.
    pub fn reset(&mut self) {
        self.charge = 0.0;
        self.last_palm = None;
    }

    pub fn hands_lost(&mut self) {
        self.charge = (self.charge - self.config.charge_fall_no_hands).max(0.0);
        self.last_palm = None;
    }

    /// Feed one single-hand frame. `current` is the active technique going into this frame.
    pub fn update(
        &mut self,
        palm: Vector2<f64>,
        label: HandLabel,
        current: Technique,
        now_ms: f64,
    ) -> Option<ReleaseEvent> {
        let velocity = self
            .last_palm
            .map(|last| palm - last)
            .unwrap_or_else(Vector2::zeros);
        let speed = velocity.norm();
        let throwable = current.is_throwable();

        if throwable && label != HandLabel::Open {
            self.charge = (self.charge + self.config.charge_rise).min(1.0);
        } else {
            self.charge = (self.charge - self.config.charge_fall).max(0.0);
        }

        let fires = throwable
            && label == HandLabel::Open
            && self.charge > self.config.charge_threshold
            && speed > self.config.min_palm_speed
            && now_ms - self.last_release_at > self.config.refractory_ms;

        self.last_palm = Some(palm);

        if !fires {
            return None;
        }

        self.last_release_at = now_ms;
        self.charge = 0.0;
        let event = ReleaseEvent {
            technique: current,
            direction: release_direction(velocity),
            at_ms: now_ms,
        };
        info!(
            technique = %event.technique,
            dx = event.direction.x,
            dy = event.direction.y,
            dz = event.direction.z,
            "release fired"
        );
        Some(event)
    }
}

impl Default for ReleaseTrigger {
    fn default() -> Self {
        Self::new(ReleaseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palm(x: f64) -> Vector2<f64> {
        Vector2::new(x, 0.5)
    }

    fn charged(trigger: &mut ReleaseTrigger) {
        for i in 0..5 {
            trigger.update(palm(0.5), HandLabel::Red, Technique::Red, i as f64 * 33.0);
        }
    }

    #[test]
    fn charges_only_while_throwable() {
        let mut trigger = ReleaseTrigger::default();
        trigger.update(palm(0.5), HandLabel::Red, Technique::Neutral, 0.0);
        assert_eq!(trigger.charge(), 0.0);
        trigger.update(palm(0.5), HandLabel::Red, Technique::Red, 33.0);
        assert!((trigger.charge() - 0.22).abs() < 1e-12);
        charged(&mut trigger);
        assert_eq!(trigger.charge(), 1.0);
    }

    #[test]
    fn open_flick_fires_once() {
        let mut trigger = ReleaseTrigger::default();
        charged(&mut trigger);

        let event = trigger
            .update(palm(0.52), HandLabel::Open, Technique::Red, 200.0)
            .unwrap();
        assert_eq!(event.technique, Technique::Red);
        assert!(event.direction.x > 0.0);
        assert!(event.direction.z < 0.0);
        assert!((event.direction.norm() - 1.0).abs() < 1e-9);
        assert_eq!(trigger.charge(), 0.0);

        assert!(trigger
            .update(palm(0.54), HandLabel::Open, Technique::Red, 233.0)
            .is_none());
    }

    #[test]
    fn refractory_blocks_a_recharged_release() {
        let mut trigger = ReleaseTrigger::default();
        charged(&mut trigger);
        assert!(trigger.update(palm(0.52), HandLabel::Open, Technique::Blue, 200.0).is_some());

        for i in 0..5 {
            trigger.update(palm(0.52), HandLabel::Blue, Technique::Blue, 233.0 + i as f64);
        }
        assert!(trigger.update(palm(0.55), HandLabel::Open, Technique::Blue, 600.0).is_none());

        for i in 0..5 {
            trigger.update(palm(0.55), HandLabel::Blue, Technique::Blue, 610.0 + i as f64);
        }
        assert!(trigger.update(palm(0.58), HandLabel::Open, Technique::Blue, 621.0).is_some());
    }

    #[test]
    fn slow_palm_does_not_fire() {
        let mut trigger = ReleaseTrigger::default();
        charged(&mut trigger);
        assert!(trigger.update(palm(0.505), HandLabel::Open, Technique::Red, 200.0).is_none());
    }

    #[test]
    fn void_and_shrine_are_not_thrown() {
        let mut trigger = ReleaseTrigger::default();
        for i in 0..5 {
            trigger.update(palm(0.5), HandLabel::Red, Technique::Void, i as f64);
        }
        assert_eq!(trigger.charge(), 0.0);
        assert!(trigger.update(palm(0.6), HandLabel::Open, Technique::Void, 500.0).is_none());
    }

    #[test]
    fn first_frame_after_reset_has_no_velocity() {
        let mut trigger = ReleaseTrigger::default();
        charged(&mut trigger);
        trigger.reset();
        charged(&mut trigger);
        trigger.hands_lost();
        assert!((trigger.charge() - 0.88).abs() < 1e-12);
        assert!(trigger.update(palm(0.9), HandLabel::Open, Technique::Red, 1000.0).is_none());
    }

    #[test]
    fn degenerate_velocity_points_forward() {
        let still = release_direction(Vector2::zeros());
        assert!((still - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        let d = release_direction(Vector2::new(0.0, -0.1));
        assert!(d.y > 0.0);
    }
}
