// src/classifier.rs
//! Single-hand pose classification.
//!
//! A hand is measured once into [`PoseSignals`], then [`POSE_RULES`] is evaluated top-down
//! and the first matching rule names the pose. Order matters: the crossed-fingers
//! signature of `Void` also passes the loose thumb and pinch thresholds used by `Red` and
//! `Purple`, so `Void` must be tested first.

use std::fmt;

use serde::Serialize;

use crate::geometry::{
    dist, extended_count_no_thumb, is_finger_curled, is_finger_extended, is_finger_up,
    palm_scale, project_onto_segment,
};
use crate::hand::{
    HandFrame, INDEX, INDEX_MCP, INDEX_PIP, INDEX_TIP, MIDDLE, MIDDLE_MCP, MIDDLE_TIP, PINKY,
    PINKY_MCP, PINKY_TIP, RING, RING_MCP, RING_TIP, THUMB_MCP, THUMB_TIP, WRIST,
};

// Fist / pinch
pub const FIST_TIP_TO_BASE: f64 = 0.78;
pub const PINCH_MAX: f64 = 0.28;
pub const FIST_PINCH_MIN: f64 = 0.24;

// Thumb splay sub-tests, at least THUMB_OUT_MIN_SCORE must pass
pub const THUMB_REACH_MARGIN: f64 = 1.10;
pub const THUMB_TIP_REACH: f64 = 0.6;
pub const THUMB_INDEX_GAP: f64 = 0.42;
pub const THUMB_SPAN: f64 = 0.33;
pub const THUMB_OUT_MIN_SCORE: u8 = 2;

// Ring/pinky tucked toward the palm
pub const TUCKED_TIP_TO_BASE: f64 = 0.84;

// Open palm rejection
pub const OPEN_PALM_MIN_EXTENDED: usize = 3;
pub const OPEN_PALM_SPREAD: f64 = 0.92;

// Crossed fingers
pub const TIPS_OVERLAP_DIST: f64 = 0.18;
pub const TIPS_OVERLAP_X: f64 = 0.10;
pub const MID_ON_LINE_DIST: f64 = 0.06;
pub const MID_ON_LINE_T_MIN: f64 = 0.25;
pub const MID_ON_LINE_T_MAX: f64 = 1.05;
pub const MID_BEHIND_DIST: f64 = 0.25;
pub const MID_BEHIND_X: f64 = 0.10;
pub const MIDDLE_FREESTANDING_DIST: f64 = 0.25;
pub const CROSSED_MAX_EXTENDED: usize = 2;

/// Raw single-frame label for one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandLabel {
    Void,
    Red,
    Purple,
    Blue,
    Open,
}

impl HandLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            HandLabel::Void => "void",
            HandLabel::Red => "red",
            HandLabel::Purple => "purple",
            HandLabel::Blue => "blue",
            HandLabel::Open => "open",
        }
    }
}

impl fmt::Display for HandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every measurement the pose rules read, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseSignals {
    pub index_up: bool,
    pub middle_up: bool,
    pub ring_up: bool,
    pub pinky_up: bool,
    pub index_extended: bool,
    pub ring_extended: bool,
    pub pinky_extended: bool,
    pub ring_curled: bool,
    pub pinky_curled: bool,
    pub extended_no_thumb: usize,

    pub pinch: f64,
    pub fist_shape: bool,
    pub any_extended: bool,
    pub thumb_out_score: u8,
    pub ring_tucked: bool,
    pub pinky_tucked: bool,
    pub ring_tip_to_base: f64,
    pub pinky_tip_to_base: f64,

    pub mid_tip_to_index_tip: f64,
    pub mid_index_x_gap: f64,
    pub mid_to_index_line: f64,
    pub proj_t: f64,
    pub tips_overlapping: bool,
    pub mid_on_index_line: bool,
    pub mid_behind_index: bool,
    pub fingers_crossed: bool,
    pub open_palm_like: bool,
}

impl PoseSignals {
    pub fn measure(hand: &HandFrame) -> Self {
        let palm = palm_scale(hand);
        let norm = |a: usize, b: usize| dist(hand, a, b) / palm;

        let index_up = is_finger_up(hand, INDEX);
        let middle_up = is_finger_up(hand, MIDDLE);
        let ring_up = is_finger_up(hand, RING);
        let pinky_up = is_finger_up(hand, PINKY);
        let index_extended = is_finger_extended(hand, INDEX);
        let middle_extended = is_finger_extended(hand, MIDDLE);
        let ring_extended = is_finger_extended(hand, RING);
        let pinky_extended = is_finger_extended(hand, PINKY);
        let ring_curled = is_finger_curled(hand, RING);
        let pinky_curled = is_finger_curled(hand, PINKY);
        let extended_no_thumb = extended_count_no_thumb(hand);

        let pinch = norm(INDEX_TIP, THUMB_TIP);
        let index_tip_to_base = norm(INDEX_TIP, INDEX_MCP);
        let middle_tip_to_base = norm(MIDDLE_TIP, MIDDLE_MCP);
        let ring_tip_to_base = norm(RING_TIP, RING_MCP);
        let pinky_tip_to_base = norm(PINKY_TIP, PINKY_MCP);
        let fist_shape = [index_tip_to_base, middle_tip_to_base, ring_tip_to_base, pinky_tip_to_base]
            .iter()
            .all(|&r| r < FIST_TIP_TO_BASE);

        let thumb_tip_to_wrist = norm(THUMB_TIP, WRIST);
        let thumb_base_to_wrist = norm(THUMB_MCP, WRIST);
        let thumb_out_score = [
            thumb_tip_to_wrist > thumb_base_to_wrist * THUMB_REACH_MARGIN,
            thumb_tip_to_wrist > THUMB_TIP_REACH,
            norm(THUMB_TIP, INDEX_TIP) > THUMB_INDEX_GAP,
            norm(THUMB_TIP, THUMB_MCP) > THUMB_SPAN,
        ]
        .iter()
        .filter(|&&passed| passed)
        .count() as u8;

        let mid_tip_to_index_tip = norm(MIDDLE_TIP, INDEX_TIP);
        let (proj_t, projected) = project_onto_segment(
            hand.point2(MIDDLE_TIP),
            hand.point2(INDEX_MCP),
            hand.point2(INDEX_TIP),
        );
        let mid_to_index_line = (hand.point2(MIDDLE_TIP) - projected).norm() / palm;
        let mid_index_x_gap = (hand.landmark(INDEX_TIP).x - hand.landmark(MIDDLE_TIP).x).abs() / palm;
        let mid_tip_below_index_tip = hand.landmark(MIDDLE_TIP).y > hand.landmark(INDEX_TIP).y;
        let middle_not_freestanding = !middle_up || mid_tip_to_index_tip < MIDDLE_FREESTANDING_DIST;

        let tips_overlapping = mid_tip_to_index_tip < TIPS_OVERLAP_DIST && mid_index_x_gap < TIPS_OVERLAP_X;
        let mid_on_index_line = mid_to_index_line < MID_ON_LINE_DIST
            && proj_t > MID_ON_LINE_T_MIN
            && proj_t < MID_ON_LINE_T_MAX;
        let mid_behind_index = mid_index_x_gap < MID_BEHIND_X
            && mid_tip_to_index_tip < MID_BEHIND_DIST
            && mid_tip_below_index_tip;

        let index_raised = index_up || index_extended;
        let fingers_crossed = index_raised
            && middle_not_freestanding
            && (tips_overlapping || mid_on_index_line || mid_behind_index)
            && extended_no_thumb <= CROSSED_MAX_EXTENDED;

        let open_palm_like = extended_no_thumb >= OPEN_PALM_MIN_EXTENDED
            && index_up
            && middle_up
            && (ring_up || ring_extended)
            && (pinky_up || pinky_extended)
            && ring_tip_to_base > OPEN_PALM_SPREAD
            && pinky_tip_to_base > OPEN_PALM_SPREAD;

        Self {
            index_up,
            middle_up,
            ring_up,
            pinky_up,
            index_extended,
            ring_extended,
            pinky_extended,
            ring_curled,
            pinky_curled,
            extended_no_thumb,
            pinch,
            fist_shape,
            any_extended: index_extended || middle_extended || ring_extended || pinky_extended,
            thumb_out_score,
            ring_tucked: ring_tip_to_base < TUCKED_TIP_TO_BASE,
            pinky_tucked: pinky_tip_to_base < TUCKED_TIP_TO_BASE,
            ring_tip_to_base,
            pinky_tip_to_base,
            mid_tip_to_index_tip,
            mid_index_x_gap,
            mid_to_index_line,
            proj_t,
            tips_overlapping,
            mid_on_index_line,
            mid_behind_index,
            fingers_crossed,
            open_palm_like,
        }
    }

    fn index_raised(&self) -> bool {
        self.index_up || self.index_extended
    }

    fn ring_pinky_extended(&self) -> bool {
        self.ring_extended || self.pinky_extended
    }
}

/// One entry of the precedence list.
pub struct PoseRule {
    pub label: HandLabel,
    pub matches: fn(&PoseSignals) -> bool,
}

fn void_rule(s: &PoseSignals) -> bool {
    !s.open_palm_like && s.fingers_crossed && s.index_raised() && !s.ring_pinky_extended()
}

fn red_rule(s: &PoseSignals) -> bool {
    !s.fingers_crossed
        && s.index_raised()
        && s.thumb_out_score >= THUMB_OUT_MIN_SCORE
        && !s.ring_pinky_extended()
        && (s.ring_curled || s.ring_tucked)
        && (s.pinky_curled || s.pinky_tucked)
}

fn purple_rule(s: &PoseSignals) -> bool {
    s.pinch < PINCH_MAX && !s.fist_shape
}

fn blue_rule(s: &PoseSignals) -> bool {
    s.fist_shape && !s.any_extended && s.pinch > FIST_PINCH_MIN
}

/// Evaluated top-down; the first match wins, `Open` when none do.
pub const POSE_RULES: [PoseRule; 4] = [
    PoseRule { label: HandLabel::Void, matches: void_rule },
    PoseRule { label: HandLabel::Red, matches: red_rule },
    PoseRule { label: HandLabel::Purple, matches: purple_rule },
    PoseRule { label: HandLabel::Blue, matches: blue_rule },
];

pub fn classify_signals(signals: &PoseSignals) -> HandLabel {
    POSE_RULES
        .iter()
        .find(|rule| (rule.matches)(signals))
        .map(|rule| rule.label)
        .unwrap_or(HandLabel::Open)
}

pub fn classify(hand: &HandFrame) -> HandLabel {
    classify_signals(&PoseSignals::measure(hand))
}
