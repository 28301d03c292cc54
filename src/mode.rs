// src/mode.rs
//! Decides which classification path runs each frame and what raw label reaches the arbiter.
//!
//! Two hands engage a latch that keeps the engine in joined-pose mode until hands have been
//! absent for a while. Short sticky windows stretch shrine and void across single-frame misreads.

use serde::Serialize;
use tracing::debug;

use crate::classifier::HandLabel;
use crate::config::ModeConfig;
use crate::technique::Technique;

/// Which classification path a frame takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPath {
    /// Two or more hands: pair them and run the joined-pose matcher.
    TwoHand,
    /// One hand while latched or inside the two-hand grace window.
    Carried,
    /// One hand, classified on its own.
    SingleHand,
    Empty,
}

impl HandPath {
    pub fn as_str(self) -> &'static str {
        match self {
            HandPath::TwoHand => "two_hand",
            HandPath::Carried => "carried",
            HandPath::SingleHand => "single_hand",
            HandPath::Empty => "empty",
        }
    }
}

/// Counters and flags carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineMode {
    pub two_hand_latched: bool,
    pub two_hand_frames: u32,
    /// Frames since two hands were last seen. Saturated when there is no two-hand history.
    pub two_hand_lost_frames: u32,
    pub no_hand_frames: u32,
    pub shrine_sticky: u32,
    pub void_sticky: u32,
}

impl Default for EngineMode {
    fn default() -> Self {
        Self {
            two_hand_latched: false,
            two_hand_frames: 0,
            two_hand_lost_frames: u32::MAX,
            no_hand_frames: 0,
            shrine_sticky: 0,
            void_sticky: 0,
        }
    }
}

pub struct ModeController {
    config: ModeConfig,
    mode: EngineMode,
}

impl ModeController {
    pub fn new(config: ModeConfig) -> Self {
        Self {
            config,
            mode: EngineMode::default(),
        }
    }

    pub fn mode(&self) -> &EngineMode {
        &self.mode
    }

    pub fn is_latched(&self) -> bool {
        self.mode.two_hand_latched
    }

    /// Update the hand-count counters and the latch, then pick this frame's path.
    pub fn begin_frame(&mut self, hand_count: usize) -> HandPath {
        let was_latched = self.mode.two_hand_latched;

        if hand_count > 0 {
            self.mode.no_hand_frames = 0;
        } else {
            self.mode.no_hand_frames = self.mode.no_hand_frames.saturating_add(1);
        }
        if hand_count >= 2 {
            self.mode.two_hand_lost_frames = 0;
            self.mode.two_hand_latched = self.config.two_hand_latch;
        } else {
            self.mode.two_hand_lost_frames = self.mode.two_hand_lost_frames.saturating_add(1);
        }
        if self.mode.no_hand_frames >= self.config.mudra_unlock_no_hand_frames {
            self.mode.two_hand_latched = false;
        }

        if was_latched != self.mode.two_hand_latched {
            debug!(
                latched = self.mode.two_hand_latched,
                no_hand_frames = self.mode.no_hand_frames,
                "two-hand latch changed"
            );
        }

        match hand_count {
            0 => HandPath::Empty,
            1 if self.mode.two_hand_latched || self.in_two_hand_grace() => HandPath::Carried,
            1 => HandPath::SingleHand,
            _ => HandPath::TwoHand,
        }
    }

    /// Two hands recently seen and lost for no longer than the grace window.
    pub fn in_two_hand_grace(&self) -> bool {
        self.mode.two_hand_frames > 0
            && self.mode.two_hand_lost_frames <= self.config.two_hand_track_grace_frames
    }

    /// Raw label for a two-hand frame given this frame's matcher verdict.
    pub fn two_hand_raw(&mut self, mudra_matched: bool) -> Technique {
        self.mode.void_sticky = 0;
        self.mode.two_hand_frames = self.mode.two_hand_frames.saturating_add(1);

        if self.mode.two_hand_frames <= self.config.mudra_arm_frames {
            self.mode.shrine_sticky = 0;
            Technique::Neutral
        } else if mudra_matched {
            self.mode.shrine_sticky = self.config.shrine_sticky_frames;
            Technique::Shrine
        } else if self.mode.shrine_sticky > 0 {
            self.mode.shrine_sticky -= 1;
            Technique::Shrine
        } else {
            Technique::Neutral
        }
    }

    pub fn carried_raw(&mut self) -> Technique {
        self.mode.void_sticky = 0;
        Technique::Neutral
    }

    /// Raw label for a single classified hand. `current` is the active technique going into
    /// this frame.
    pub fn single_hand_raw(&mut self, label: HandLabel, current: Technique) -> Technique {
        self.mode.two_hand_frames = 0;
        self.mode.shrine_sticky = self.mode.shrine_sticky.saturating_sub(1);

        match label {
            HandLabel::Void => {
                self.mode.void_sticky = self.config.void_sticky_frames;
                Technique::Void
            }
            HandLabel::Red | HandLabel::Open
                if self.mode.void_sticky > 0 && current == Technique::Void =>
            {
                self.mode.void_sticky -= 1;
                Technique::Void
            }
            other => {
                self.mode.void_sticky = self.mode.void_sticky.saturating_sub(1);
                match other {
                    HandLabel::Red => Technique::Red,
                    HandLabel::Blue => Technique::Blue,
                    HandLabel::Purple => Technique::Purple,
                    HandLabel::Void | HandLabel::Open => Technique::Neutral,
                }
            }
        }
    }

    /// Raw label for a frame without hands. Returns whether two-hand history was dropped.
    pub fn empty_raw(&mut self) -> (Technique, bool) {
        let forget = !self.mode.two_hand_latched;
        if forget {
            self.mode.two_hand_lost_frames = u32::MAX;
            self.mode.two_hand_frames = 0;
        }
        self.mode.shrine_sticky = self.mode.shrine_sticky.saturating_sub(1);
        self.mode.void_sticky = self.mode.void_sticky.saturating_sub(1);
        (Technique::Neutral, forget)
    }

    /// While latched only shrine gets through.
    pub fn gate(&self, raw: Technique) -> Technique {
        if self.mode.two_hand_latched && raw != Technique::Shrine {
            Technique::Neutral
        } else {
            raw
        }
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new(ModeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_frames_never_report_shrine() {
        let mut mode = ModeController::default();
        for _ in 0..2 {
            assert_eq!(mode.begin_frame(2), HandPath::TwoHand);
            assert_eq!(mode.two_hand_raw(true), Technique::Neutral);
        }
        mode.begin_frame(2);
        assert_eq!(mode.two_hand_raw(true), Technique::Shrine);
    }

    #[test]
    fn shrine_sticks_for_fourteen_misses() {
        let mut mode = ModeController::default();
        for _ in 0..3 {
            mode.begin_frame(2);
            mode.two_hand_raw(true);
        }
        for _ in 0..14 {
            mode.begin_frame(2);
            assert_eq!(mode.two_hand_raw(false), Technique::Shrine);
        }
        mode.begin_frame(2);
        assert_eq!(mode.two_hand_raw(false), Technique::Neutral);

        // A single match refills the window
        mode.begin_frame(2);
        assert_eq!(mode.two_hand_raw(true), Technique::Shrine);
        assert_eq!(mode.mode().shrine_sticky, 14);
    }

    #[test]
    fn latch_holds_through_short_absence() {
        let mut mode = ModeController::default();
        mode.begin_frame(2);
        mode.two_hand_raw(false);
        assert!(mode.is_latched());

        for _ in 0..11 {
            assert_eq!(mode.begin_frame(0), HandPath::Empty);
        }
        assert!(mode.is_latched());
        assert_eq!(mode.begin_frame(1), HandPath::Carried);
        assert_eq!(mode.gate(Technique::Red), Technique::Neutral);
        assert_eq!(mode.gate(Technique::Shrine), Technique::Shrine);

        for _ in 0..12 {
            mode.begin_frame(0);
            mode.empty_raw();
        }
        assert!(!mode.is_latched());
        assert_eq!(mode.begin_frame(1), HandPath::SingleHand);
    }

    #[test]
    fn grace_window_without_latch() {
        let mut mode = ModeController::new(ModeConfig {
            two_hand_latch: false,
            ..ModeConfig::default()
        });
        mode.begin_frame(2);
        mode.two_hand_raw(false);
        assert!(!mode.is_latched());

        for _ in 0..12 {
            assert_eq!(mode.begin_frame(1), HandPath::Carried);
            mode.carried_raw();
        }
        assert_eq!(mode.begin_frame(1), HandPath::SingleHand);
    }

    #[test]
    fn empty_frame_drops_grace_when_unlatched() {
        let mut mode = ModeController::new(ModeConfig {
            two_hand_latch: false,
            ..ModeConfig::default()
        });
        mode.begin_frame(2);
        mode.two_hand_raw(false);
        mode.begin_frame(0);
        let (_, forgot) = mode.empty_raw();
        assert!(forgot);
        assert_eq!(mode.begin_frame(1), HandPath::SingleHand);
    }

    #[test]
    fn void_sticks_through_red_and_open_misreads() {
        let mut mode = ModeController::default();
        mode.begin_frame(1);
        assert_eq!(mode.single_hand_raw(HandLabel::Void, Technique::Neutral), Technique::Void);

        for _ in 0..8 {
            mode.begin_frame(1);
            assert_eq!(mode.single_hand_raw(HandLabel::Red, Technique::Void), Technique::Void);
        }
        mode.begin_frame(1);
        assert_eq!(mode.single_hand_raw(HandLabel::Red, Technique::Void), Technique::Red);
    }

    #[test]
    fn void_stickiness_needs_void_active() {
        let mut mode = ModeController::default();
        mode.begin_frame(1);
        mode.single_hand_raw(HandLabel::Void, Technique::Neutral);
        mode.begin_frame(1);
        assert_eq!(mode.single_hand_raw(HandLabel::Open, Technique::Neutral), Technique::Neutral);
        // Blue is never absorbed
        mode.begin_frame(1);
        assert_eq!(mode.single_hand_raw(HandLabel::Blue, Technique::Void), Technique::Blue);
    }
}
