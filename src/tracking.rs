// src/tracking.rs
//! Per-frame pipeline: hands in, one stabilized technique out.
//!
//! [`EngineState`] owns every piece of cross-frame memory and is advanced by exactly one call
//! per tracker frame. [`TechniqueTracker`] wraps it with configuration and timing metrics.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::trace;

use crate::arbiter::{Arbiter, Transition};
use crate::classifier::{self, HandLabel};
use crate::config::EngineConfig;
use crate::hand::{HandFrame, Handedness};
use crate::mode::{EngineMode, HandPath, ModeController};
use crate::mudra::{self, MudraMatch};
use crate::pairing::{resolve_pair, PairingMethod, TrackedHandState};
use crate::release::{ReleaseEvent, ReleaseTrigger};
use crate::technique::{Gesture, Technique};

/// Hands beyond this many are ignored.
pub const MAX_HANDS: usize = 2;

const METRICS_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GestureConfidences {
    pub red: f64,
    pub blue: f64,
    pub purple: f64,
    pub void: f64,
    pub shrine: f64,
}

impl GestureConfidences {
    fn snapshot(arbiter: &Arbiter) -> Self {
        Self {
            red: arbiter.confidence(Gesture::Red),
            blue: arbiter.confidence(Gesture::Blue),
            purple: arbiter.confidence(Gesture::Purple),
            void: arbiter.confidence(Gesture::Void),
            shrine: arbiter.confidence(Gesture::Shrine),
        }
    }

    pub fn get(&self, gesture: Gesture) -> f64 {
        match gesture {
            Gesture::Red => self.red,
            Gesture::Blue => self.blue,
            Gesture::Purple => self.purple,
            Gesture::Void => self.void,
            Gesture::Shrine => self.shrine,
        }
    }
}

/// Everything a tuning overlay needs to explain one frame's decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameDiagnostics {
    pub hand_count: usize,
    pub path: HandPath,
    pub left_label: Option<Handedness>,
    pub right_label: Option<Handedness>,
    pub pairing: Option<PairingMethod>,
    pub hand_label: Option<HandLabel>,
    pub raw: Technique,
    pub active: Technique,
    pub confidence: GestureConfidences,
    pub mode: EngineMode,
    pub mudra: Option<MudraMatch>,
    pub release_charge: f64,
}

fn label_str(label: Option<Handedness>) -> &'static str {
    label.map(Handedness::as_str).unwrap_or("unknown")
}

struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() {
            write!(f, "{:.3}", self.0)
        } else {
            f.write_str("-")
        }
    }
}

impl fmt::Display for FrameDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.confidence;
        writeln!(
            f,
            "hands: {} left:{} right:{}",
            self.hand_count,
            label_str(self.left_label),
            label_str(self.right_label)
        )?;
        writeln!(f, "mudraMode: {}", self.mode.two_hand_latched)?;
        writeln!(f, "raw: {} active: {}", self.raw, self.active)?;
        writeln!(
            f,
            "conf red:{:.2} blue:{:.2} purple:{:.2}",
            c.red, c.blue, c.purple
        )?;
        writeln!(f, "conf void:{:.2} shrine:{:.2}", c.void, c.shrine)?;

        let Some(m) = &self.mudra else {
            return write!(f, "mudra matched: -\nmudra score: -");
        };
        writeln!(f, "mudra matched: {}", m.matched)?;
        writeln!(f, "mudra score: {}/{}", m.score, m.target_score)?;
        writeln!(f, "joinedSignals: {}/{}", m.joined_signals, m.required_joined_signals)?;
        writeln!(f, "palmGap: {} wristGap: {}", Num(m.palm_gap), Num(m.wrist_gap))?;
        writeln!(f, "indexGap: {} thumbGap: {}", Num(m.index_gap), Num(m.thumb_gap))?;
        writeln!(f, "wristYGap: {} wristLink: {}", Num(m.wrist_y_gap), m.wrists_cross_linked)?;
        writeln!(
            f,
            "totalFolded: {} joined: {}/{}",
            m.total_folded_non_index, m.joined_signals, m.required_joined_signals
        )?;
        writeln!(f, "wideWristGap: {} handsJoined: {}", m.wide_wrist_gap, m.hands_joined)?;
        write!(
            f,
            "openReject: {} extraScore: +{}",
            m.both_hands_open, m.extra_score_requirement
        )
    }
}

/// What the presentation layer consumes after each frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub timestamp_ms: f64,
    pub technique: Technique,
    pub transition: Option<Transition>,
    /// The void pose is physically held this frame, independent of stickiness.
    pub void_pose_held: bool,
    pub shrine_pose_held: bool,
    pub release: Option<ReleaseEvent>,
    /// Horizontal aim in [-1, 1] while red or blue is steered by a single hand.
    pub aim_x: f64,
    pub diagnostics: FrameDiagnostics,
}

/// All mutable engine memory.
pub struct EngineState {
    pub arbiter: Arbiter,
    pub mode: ModeController,
    pub tracked_hands: TrackedHandState,
    pub release: ReleaseTrigger,
    pub last_mudra: Option<MudraMatch>,
    frame_index: u64,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            arbiter: Arbiter::new(config.arbiter.clone()),
            mode: ModeController::new(config.mode.clone()),
            tracked_hands: TrackedHandState::default(),
            release: ReleaseTrigger::new(config.release.clone()),
            last_mudra: None,
            frame_index: 0,
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    /// Advance one tracker frame. Only the first two hands are used.
    pub fn step(&mut self, hands: &[HandFrame], now_ms: f64) -> FrameOutput {
        let hands = &hands[..hands.len().min(MAX_HANDS)];
        let current = self.arbiter.active();
        let path = self.mode.begin_frame(hands.len());

        let mut void_pose_held = false;
        let mut shrine_pose_held = false;
        let mut release = None;
        let mut aim_x = 0.0;
        let mut hand_label = None;
        let mut left_label = None;
        let mut right_label = None;
        let mut pairing = None;
        let mut mudra_shown = None;

        let raw = match path {
            HandPath::TwoHand => {
                let pair = resolve_pair(&hands[0], &hands[1], &mut self.tracked_hands);
                let verdict = mudra::evaluate(pair.left, pair.right);
                left_label = pair.left_label;
                right_label = pair.right_label;
                pairing = Some(pair.method);
                self.last_mudra = Some(verdict);
                mudra_shown = self.last_mudra;
                self.release.reset();

                let raw = self.mode.two_hand_raw(verdict.matched);
                shrine_pose_held = raw == Technique::Shrine;
                raw
            }
            HandPath::Carried => {
                mudra_shown = self.last_mudra;
                self.release.reset();
                self.mode.carried_raw()
            }
            HandPath::SingleHand => {
                let hand = &hands[0];
                self.last_mudra = None;
                left_label = hand.handedness;

                let label = classifier::classify(hand);
                hand_label = Some(label);
                void_pose_held = label == HandLabel::Void;

                let palm = hand.palm();
                if current.tracks_aim() {
                    aim_x = ((0.5 - palm.x) * 2.0).clamp(-1.0, 1.0);
                }
                release = self.release.update(palm, label, current, now_ms);
                self.mode.single_hand_raw(label, current)
            }
            HandPath::Empty => {
                let (raw, forget) = self.mode.empty_raw();
                if forget {
                    self.last_mudra = None;
                    self.tracked_hands.clear();
                }
                self.release.hands_lost();
                raw
            }
        };

        let suppressed = if self.mode.is_latched() {
            self.arbiter.suppress_single_hand(now_ms)
        } else {
            None
        };
        let raw = self.mode.gate(raw);
        let stepped = self.arbiter.step(raw, now_ms);
        let technique = self.arbiter.active();

        // Report one change per frame, from the technique held when the frame began.
        let transition = suppressed
            .or(stepped)
            .map(|_| Transition {
                from: current,
                to: technique,
                at_ms: now_ms,
            })
            .filter(|t| t.from != t.to);

        trace!(
            frame = self.frame_index,
            ?path,
            %raw,
            %technique,
            "frame processed"
        );

        let output = FrameOutput {
            frame_index: self.frame_index,
            timestamp_ms: now_ms,
            technique,
            transition,
            void_pose_held,
            shrine_pose_held,
            release,
            aim_x,
            diagnostics: FrameDiagnostics {
                hand_count: hands.len(),
                path,
                left_label,
                right_label,
                pairing,
                hand_label,
                raw,
                active: technique,
                confidence: GestureConfidences::snapshot(&self.arbiter),
                mode: *self.mode.mode(),
                mudra: mudra_shown,
                release_charge: self.release.charge(),
            },
        };
        self.frame_index += 1;
        output
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    /// Mean tracker score of the hands in the last frame.
    pub tracking_confidence: f32,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            tracking_confidence: 0.0,
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
        }
    }

    fn record(&mut self, elapsed: f32, hands: &[HandFrame]) {
        self.frame_times.push_front(elapsed);
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };

        let used = &hands[..hands.len().min(MAX_HANDS)];
        self.tracking_confidence = if used.is_empty() {
            0.0
        } else {
            (used.iter().map(|h| h.score).sum::<f64>() / used.len() as f64) as f32
        };
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TechniqueTracker {
    config: EngineConfig,
    state: EngineState,
    metrics: PerformanceMetrics,
}

impl TechniqueTracker {
    pub fn new(config: EngineConfig) -> Self {
        let state = EngineState::new(&config);
        Self {
            config,
            state,
            metrics: PerformanceMetrics::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn active(&self) -> Technique {
        self.state.arbiter.active()
    }

    pub fn process_frame(&mut self, hands: &[HandFrame], now_ms: f64) -> FrameOutput {
        self.state.step(hands, now_ms)
    }

    pub fn process_frame_with_metrics(
        &mut self,
        hands: &[HandFrame],
        now_ms: f64,
    ) -> (FrameOutput, PerformanceMetrics) {
        let start = Instant::now();
        let output = self.process_frame(hands, now_ms);
        self.metrics.record(start.elapsed().as_secs_f32(), hands);
        (output, self.metrics.clone())
    }

    /// Forget all session memory, keeping the configuration.
    pub fn reset(&mut self) {
        self.state = EngineState::new(&self.config);
        self.metrics = PerformanceMetrics::new();
    }
}

impl Default for TechniqueTracker {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
