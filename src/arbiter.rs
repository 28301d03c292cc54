// src/arbiter.rs
//! Confidence accumulation and hysteresis over gesture keys.
//!
//! Each frame every gesture's confidence either rises asymptotically toward 1.0 (when it is
//! the raw label) or decays linearly toward 0.0. Entry needs `enter`, staying needs only
//! `hold`, and every exit or switch puts the outgoing gesture into cooldown.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::config::ArbiterConfig;
use crate::technique::{Gesture, Technique};

/// A change of the active technique.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    pub from: Technique,
    pub to: Technique,
    pub at_ms: f64,
}

pub struct Arbiter {
    config: ArbiterConfig,
    confidence: HashMap<Gesture, f64>,
    cooldown_until: HashMap<Gesture, f64>,
    active: Technique,
}

impl Arbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            confidence: Gesture::ALL.iter().map(|&g| (g, 0.0)).collect(),
            cooldown_until: Gesture::ALL.iter().map(|&g| (g, f64::NEG_INFINITY)).collect(),
            active: Technique::Neutral,
        }
    }

    pub fn active(&self) -> Technique {
        self.active
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn confidence(&self, gesture: Gesture) -> f64 {
        self.confidence.get(&gesture).copied().unwrap_or(0.0)
    }

    pub fn cooldown_until(&self, gesture: Gesture) -> f64 {
        self.cooldown_until
            .get(&gesture)
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    pub fn in_cooldown(&self, gesture: Gesture, now_ms: f64) -> bool {
        now_ms < self.cooldown_until(gesture)
    }

    pub fn set_confidence(&mut self, gesture: Gesture, value: f64) {
        self.confidence.insert(gesture, value.clamp(0.0, 1.0));
    }

    /// Drop a single-hand technique without cooldown, used when two-hand mode takes over.
    pub fn suppress_single_hand(&mut self, now_ms: f64) -> Option<Transition> {
        for gesture in Gesture::SINGLE_HAND {
            self.set_confidence(gesture, 0.0);
        }
        if matches!(self.active, Technique::Neutral | Technique::Shrine) {
            return None;
        }

        let from = self.active;
        self.active = Technique::Neutral;
        debug!(%from, "two-hand mode suppressed active technique");
        Some(Transition {
            from,
            to: Technique::Neutral,
            at_ms: now_ms,
        })
    }

    /// Rise/fall update of every gesture's confidence for one raw label.
    pub fn accumulate(&mut self, raw: Technique) {
        let raw = raw.gesture();
        for gesture in Gesture::ALL {
            let t = *self.config.gestures.get(gesture);
            let current = self.confidence(gesture);
            let next = if raw == Some(gesture) {
                current + t.rise * (1.0 - current)
            } else {
                current - t.fall
            };
            self.set_confidence(gesture, next);
        }
    }

    /// Decide the active technique from the current confidences.
    pub fn arbitrate(&mut self, now_ms: f64) -> Option<Transition> {
        let from = self.active;
        let to = match from.gesture() {
            None => self.best_entry(now_ms),
            Some(held) => self.hold_or_switch(held, now_ms),
        };
        if to == from {
            return None;
        }

        self.active = to;
        debug!(
            %from,
            %to,
            confidence = to.gesture().map(|g| self.confidence(g)).unwrap_or(0.0),
            "technique transition"
        );
        Some(Transition { from, to, at_ms: now_ms })
    }

    pub fn step(&mut self, raw: Technique, now_ms: f64) -> Option<Transition> {
        self.accumulate(raw);
        self.arbitrate(now_ms)
    }

    fn best_entry(&self, now_ms: f64) -> Technique {
        let mut best = Technique::Neutral;
        let mut best_confidence = 0.0;
        for gesture in Gesture::ALL {
            if self.in_cooldown(gesture, now_ms) {
                continue;
            }
            let confidence = self.confidence(gesture);
            if confidence >= self.config.gestures.get(gesture).enter && confidence > best_confidence {
                best = gesture.into();
                best_confidence = confidence;
            }
        }
        best
    }

    fn hold_or_switch(&mut self, held: Gesture, now_ms: f64) -> Technique {
        let held_thresholds = *self.config.gestures.get(held);
        let held_confidence = self.confidence(held);

        let challenger = Gesture::ALL.into_iter().find(|&gesture| {
            gesture != held
                && !self.in_cooldown(gesture, now_ms)
                && self.confidence(gesture)
                    >= self.config.gestures.get(gesture).enter + self.config.switch_enter_margin
                && self.confidence(gesture) > held_confidence + self.config.switch_confidence_margin
        });

        if let Some(next) = challenger {
            self.cooldown_until.insert(held, now_ms + held_thresholds.cooldown_ms);
            return next.into();
        }
        if held_confidence < held_thresholds.hold {
            self.cooldown_until.insert(held, now_ms + held_thresholds.cooldown_ms);
            return Technique::Neutral;
        }
        held.into()
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new(ArbiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rise_is_asymptotic_and_fall_is_linear() {
        let mut arbiter = Arbiter::default();
        arbiter.accumulate(Technique::Red);
        assert!((arbiter.confidence(Gesture::Red) - 0.26).abs() < 1e-12);
        arbiter.accumulate(Technique::Red);
        assert!((arbiter.confidence(Gesture::Red) - (0.26 + 0.26 * 0.74)).abs() < 1e-12);
        for _ in 0..200 {
            arbiter.accumulate(Technique::Red);
        }
        assert!(arbiter.confidence(Gesture::Red) <= 1.0);

        arbiter.accumulate(Technique::Neutral);
        let after_one = arbiter.confidence(Gesture::Red);
        arbiter.accumulate(Technique::Neutral);
        assert!((after_one - arbiter.confidence(Gesture::Red) - 0.14).abs() < 1e-9);

        for _ in 0..20 {
            arbiter.accumulate(Technique::Neutral);
        }
        assert_eq!(arbiter.confidence(Gesture::Red), 0.0);
    }

    #[test]
    fn enters_at_exactly_enter_and_holds_until_below_hold() {
        for gesture in Gesture::ALL {
            let mut arbiter = Arbiter::default();
            let t = *arbiter.config().gestures.get(gesture);

            arbiter.set_confidence(gesture, t.enter);
            assert!(arbiter.arbitrate(0.0).is_some());
            assert_eq!(arbiter.active(), Technique::from(gesture));

            arbiter.set_confidence(gesture, t.hold + 0.005);
            assert!(arbiter.arbitrate(33.0).is_none());
            assert_eq!(arbiter.active(), Technique::from(gesture));

            arbiter.set_confidence(gesture, t.hold - 0.005);
            let transition = arbiter.arbitrate(66.0).unwrap();
            assert_eq!(transition.to, Technique::Neutral);
        }
    }

    #[test]
    fn below_enter_never_enters() {
        let mut arbiter = Arbiter::default();
        arbiter.set_confidence(Gesture::Blue, 0.67);
        assert!(arbiter.arbitrate(0.0).is_none());
        assert_eq!(arbiter.active(), Technique::Neutral);
    }

    #[test]
    fn exit_starts_cooldown() {
        let mut arbiter = Arbiter::default();
        arbiter.set_confidence(Gesture::Red, 0.9);
        arbiter.arbitrate(900.0);
        arbiter.set_confidence(Gesture::Red, 0.1);
        arbiter.arbitrate(1000.0);
        assert_eq!(arbiter.active(), Technique::Neutral);
        assert_eq!(arbiter.cooldown_until(Gesture::Red), 1260.0);

        arbiter.set_confidence(Gesture::Red, 0.95);
        assert!(arbiter.arbitrate(1100.0).is_none());
        assert!(arbiter.arbitrate(1259.0).is_none());
        assert_eq!(arbiter.arbitrate(1260.0).map(|t| t.to), Some(Technique::Red));
    }

    #[test]
    fn switch_needs_both_margins() {
        let mut arbiter = Arbiter::default();
        arbiter.set_confidence(Gesture::Red, 0.7);
        arbiter.arbitrate(0.0);

        // Above blue's enter but not by the switch margin
        arbiter.set_confidence(Gesture::Blue, 0.74);
        assert!(arbiter.arbitrate(33.0).is_none());

        // Past the enter margin but not clear of red by 0.06
        arbiter.set_confidence(Gesture::Red, 0.72);
        arbiter.set_confidence(Gesture::Blue, 0.77);
        assert!(arbiter.arbitrate(66.0).is_none());

        arbiter.set_confidence(Gesture::Blue, 0.79);
        let transition = arbiter.arbitrate(99.0).unwrap();
        assert_eq!((transition.from, transition.to), (Technique::Red, Technique::Blue));
        assert_eq!(arbiter.cooldown_until(Gesture::Red), 99.0 + 260.0);
    }

    #[test]
    fn highest_confidence_wins_entry() {
        let mut arbiter = Arbiter::default();
        arbiter.set_confidence(Gesture::Red, 0.7);
        arbiter.set_confidence(Gesture::Void, 0.8);
        arbiter.arbitrate(0.0);
        assert_eq!(arbiter.active(), Technique::Void);
    }

    #[test]
    fn suppression_clears_single_hand_state_only() {
        let mut arbiter = Arbiter::default();
        arbiter.set_confidence(Gesture::Purple, 0.9);
        arbiter.set_confidence(Gesture::Shrine, 0.4);
        arbiter.arbitrate(0.0);
        let transition = arbiter.suppress_single_hand(33.0).unwrap();

        assert_eq!(transition.from, Technique::Purple);
        assert_eq!(transition.to, Technique::Neutral);
        assert_eq!(arbiter.active(), Technique::Neutral);
        assert_eq!(arbiter.confidence(Gesture::Purple), 0.0);
        assert_eq!(arbiter.confidence(Gesture::Shrine), 0.4);
        assert!(!arbiter.in_cooldown(Gesture::Purple, 34.0));
        assert_eq!(arbiter.suppress_single_hand(66.0), None);
    }
}
