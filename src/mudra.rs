// src/mudra.rs
//! Two-hand joined pose matcher.
//!
//! Gate then score: the hands must first look joined (enough proximity and alignment
//! signals, stricter when the wrists are far apart) and must not both be wide open.
//! Only then are the scoring criteria counted against a target that also depends on
//! how close the hands are.

use nalgebra::Vector3;
use serde::Serialize;

use crate::geometry::{
    dist3, extended_count_no_thumb, is_finger_curled, is_finger_extended, is_finger_up,
    pair_scale, EPSILON,
};
use crate::hand::{
    HandFrame, INDEX, INDEX_TIP, MIDDLE, MIDDLE_MCP, MIDDLE_TIP, PINKY, RING, THUMB_TIP, WRIST,
};

// Joined-ness gate, distances in pair-scale units except the raw wrist y gap
pub const GATE_PALM_GAP: f64 = 1.8;
pub const GATE_WRIST_GAP: f64 = 2.5;
pub const GATE_INDEX_GAP: f64 = 1.8;
pub const GATE_THUMB_GAP: f64 = 1.8;
pub const WRIST_Y_ALIGNED: f64 = 0.72;
pub const WRISTS_NEARBY_MIN: f64 = 0.15;
pub const WRISTS_NEARBY_MAX: f64 = 2.8;
pub const CROSS_WRIST_TO_PALM: f64 = 2.4;
pub const CROSS_WRIST_TO_INDEX: f64 = 2.5;
pub const WIDE_WRIST_GAP: f64 = 1.5;
pub const JOINED_SIGNALS_CLOSE: u8 = 2;
pub const JOINED_SIGNALS_WIDE: u8 = 4;
pub const OPEN_HAND_MIN_EXTENDED: usize = 4;

// Score criteria
pub const CLOSE_WRIST_GAP: f64 = 1.1;
pub const CLOSE_PALM_GAP: f64 = 1.15;
pub const SCORE_MIDDLE_CLOSE: f64 = 1.6;
pub const SCORE_INDEX_GAP: f64 = 1.7;
pub const SCORE_THUMB_GAP: f64 = 1.7;
pub const SCORE_MIDDLE_GAP: f64 = 2.0;
pub const SCORE_INDEX_TO_OPP_THUMB: f64 = 1.9;
pub const SCORE_SPAN_MIN: f64 = 0.08;
pub const SCORE_SPAN_MAX: f64 = 2.0;
pub const SCORE_WRIST_GAP_MIN: f64 = 0.2;
pub const SCORE_WRIST_GAP_MAX: f64 = 4.8;
pub const SCORE_PALM_GAP: f64 = 3.2;
pub const AXIS_T_MIN: f64 = -0.2;
pub const AXIS_T_MAX: f64 = 1.2;
pub const AXIS_LATERAL_MAX: f64 = 1.3;
pub const INDEX_Y_ALIGNED: f64 = 0.7;
pub const THUMB_Y_ALIGNED: f64 = 0.75;

pub const TARGET_SCORE_CLOSE: u8 = 6;
pub const TARGET_SCORE_FAR: u8 = 7;
pub const WIDE_GAP_EXTRA_SCORE: u8 = 1;

/// Outcome of one joined-pose evaluation, with every signal for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MudraMatch {
    pub matched: bool,
    pub score: u8,
    pub target_score: u8,
    pub joined_signals: u8,
    pub required_joined_signals: u8,
    pub palm_gap: f64,
    pub wrist_gap: f64,
    pub index_gap: f64,
    pub thumb_gap: f64,
    pub middle_gap: f64,
    pub wrist_y_gap: f64,
    pub idx_thumb_span: f64,
    pub close_hands: bool,
    pub wrist_aligned: bool,
    pub wrists_nearby: bool,
    pub wrists_cross_linked: bool,
    pub wide_wrist_gap: bool,
    pub extra_score_requirement: u8,
    pub hands_joined: bool,
    pub both_hands_open: bool,
    pub middle_on_axis: bool,
    pub total_folded_non_index: u8,
}

struct HandShape {
    index_ready: bool,
    middle_curled: bool,
    ring_curled: bool,
    pinky_curled: bool,
    extended: usize,
}

impl HandShape {
    fn measure(hand: &HandFrame) -> Self {
        Self {
            index_ready: is_finger_extended(hand, INDEX) || is_finger_up(hand, INDEX),
            middle_curled: is_finger_curled(hand, MIDDLE),
            ring_curled: is_finger_curled(hand, RING),
            pinky_curled: is_finger_curled(hand, PINKY),
            extended: extended_count_no_thumb(hand),
        }
    }

    fn folded_non_index(&self) -> u8 {
        self.middle_curled as u8 + self.ring_curled as u8 + self.pinky_curled as u8
    }
}

/// Axis parameter and lateral offset (in pair-scale units) of `point` against the
/// line through `origin` along `axis`.
fn project_on_axis(point: Vector3<f64>, origin: Vector3<f64>, axis: Vector3<f64>, scale: f64) -> (f64, f64) {
    let t = (point - origin).dot(&axis) / (axis.norm_squared() + EPSILON);
    let off = (point - (origin + axis * t)).norm() / scale;
    (t, off)
}

pub fn evaluate(left: &HandFrame, right: &HandFrame) -> MudraMatch {
    let scale = pair_scale(left, right);
    let gap = |a: usize, b: usize| dist3(left, a, right, b) / scale;

    let l = HandShape::measure(left);
    let r = HandShape::measure(right);

    let index_gap = gap(INDEX_TIP, INDEX_TIP);
    let thumb_gap = gap(THUMB_TIP, THUMB_TIP);
    let middle_gap = gap(MIDDLE_TIP, MIDDLE_TIP);
    let wrist_gap = gap(WRIST, WRIST);
    let palm_gap = gap(MIDDLE_MCP, MIDDLE_MCP);
    let wrist_y_gap = (left.landmark(WRIST).y - right.landmark(WRIST).y).abs();
    let wrist_to_opp_palm = (gap(WRIST, MIDDLE_MCP) + dist3(right, WRIST, left, MIDDLE_MCP) / scale) * 0.5;
    let wrist_to_opp_index = (gap(WRIST, INDEX_TIP) + dist3(right, WRIST, left, INDEX_TIP) / scale) * 0.5;
    let index_to_opp_thumb = (gap(INDEX_TIP, THUMB_TIP) + dist3(right, INDEX_TIP, left, THUMB_TIP) / scale) * 0.5;

    // Axis from the index-tip midpoint to the thumb-tip midpoint
    let index_mid = (left.landmark(INDEX_TIP) + right.landmark(INDEX_TIP)) * 0.5;
    let thumb_mid = (left.landmark(THUMB_TIP) + right.landmark(THUMB_TIP)) * 0.5;
    let axis = thumb_mid - index_mid;
    let idx_thumb_span = axis.norm() / scale;
    let (left_t, left_off) = project_on_axis(left.landmark(MIDDLE_TIP), index_mid, axis, scale);
    let (right_t, right_off) = project_on_axis(right.landmark(MIDDLE_TIP), index_mid, axis, scale);
    let on_axis = |t: f64, off: f64| t > AXIS_T_MIN && t < AXIS_T_MAX && off < AXIS_LATERAL_MAX;
    let middle_on_axis = on_axis(left_t, left_off) && on_axis(right_t, right_off);

    let index_aligned = (left.landmark(INDEX_TIP).y - right.landmark(INDEX_TIP).y).abs() < INDEX_Y_ALIGNED;
    let thumb_aligned = (left.landmark(THUMB_TIP).y - right.landmark(THUMB_TIP).y).abs() < THUMB_Y_ALIGNED;

    let close_hands = wrist_gap < CLOSE_WRIST_GAP || palm_gap < CLOSE_PALM_GAP;
    let wrist_aligned = wrist_y_gap < WRIST_Y_ALIGNED;
    let wrists_nearby = wrist_gap > WRISTS_NEARBY_MIN && wrist_gap < WRISTS_NEARBY_MAX;
    let wrists_cross_linked = wrist_to_opp_palm < CROSS_WRIST_TO_PALM || wrist_to_opp_index < CROSS_WRIST_TO_INDEX;
    let wide_wrist_gap = wrist_gap > WIDE_WRIST_GAP;
    let required_joined_signals = if wide_wrist_gap { JOINED_SIGNALS_WIDE } else { JOINED_SIGNALS_CLOSE };
    let extra_score_requirement = if wide_wrist_gap { WIDE_GAP_EXTRA_SCORE } else { 0 };
    let base_target = if close_hands { TARGET_SCORE_CLOSE } else { TARGET_SCORE_FAR };
    let target_score = base_target + extra_score_requirement;

    let joined_signals = [
        palm_gap < GATE_PALM_GAP,
        wrist_gap < GATE_WRIST_GAP,
        index_gap < GATE_INDEX_GAP,
        thumb_gap < GATE_THUMB_GAP,
        wrist_aligned,
        wrists_nearby,
        wrists_cross_linked,
    ]
    .iter()
    .filter(|&&s| s)
    .count() as u8;
    let hands_joined = joined_signals >= required_joined_signals;
    let total_folded_non_index = l.folded_non_index() + r.folded_non_index();
    let both_hands_open =
        l.extended >= OPEN_HAND_MIN_EXTENDED && r.extended >= OPEN_HAND_MIN_EXTENDED && total_folded_non_index == 0;

    let mut record = MudraMatch {
        matched: false,
        score: 0,
        target_score,
        joined_signals,
        required_joined_signals,
        palm_gap,
        wrist_gap,
        index_gap,
        thumb_gap,
        middle_gap,
        wrist_y_gap,
        idx_thumb_span,
        close_hands,
        wrist_aligned,
        wrists_nearby,
        wrists_cross_linked,
        wide_wrist_gap,
        extra_score_requirement,
        hands_joined,
        both_hands_open,
        middle_on_axis,
        total_folded_non_index,
    };

    if !hands_joined || both_hands_open || total_folded_non_index == 0 {
        return record;
    }

    let ring_pinky_curled =
        l.ring_curled as u8 + r.ring_curled as u8 + l.pinky_curled as u8 + r.pinky_curled as u8;
    let criteria = [
        l.index_ready && r.index_ready,
        l.middle_curled || r.middle_curled || middle_gap < SCORE_MIDDLE_CLOSE,
        ring_pinky_curled >= 1,
        index_gap < SCORE_INDEX_GAP,
        thumb_gap < SCORE_THUMB_GAP,
        middle_gap < SCORE_MIDDLE_GAP,
        index_to_opp_thumb < SCORE_INDEX_TO_OPP_THUMB,
        wrist_aligned,
        wrists_nearby,
        wrists_cross_linked,
        idx_thumb_span > SCORE_SPAN_MIN && idx_thumb_span < SCORE_SPAN_MAX,
        wrist_gap > SCORE_WRIST_GAP_MIN && wrist_gap < SCORE_WRIST_GAP_MAX,
        palm_gap < SCORE_PALM_GAP,
        middle_on_axis,
        index_aligned,
        thumb_aligned,
    ];
    record.score = criteria.iter().filter(|&&c| c).count() as u8;
    record.matched = record.score >= target_score;
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{self, HandPose};

    #[test]
    fn joined_pose_matches() {
        let (left, right) = synthetic::mudra_pair(0.5, 0.8);
        let m = evaluate(&left, &right);
        assert!(m.hands_joined);
        assert!(!m.wide_wrist_gap);
        assert_eq!(m.target_score, TARGET_SCORE_CLOSE);
        assert_eq!(m.total_folded_non_index, 6);
        assert!(m.matched, "score {}/{}", m.score, m.target_score);
    }

    #[test]
    fn both_palms_open_is_vetoed() {
        let (left, right) = synthetic::open_pair(0.5, 0.8);
        let m = evaluate(&left, &right);
        assert!(m.palm_gap < GATE_PALM_GAP);
        assert!(m.hands_joined);
        assert!(m.both_hands_open);
        assert!(!m.matched);
        assert_eq!(m.score, 0);
    }

    #[test]
    fn far_apart_hands_need_more_signals() {
        let (left, right) = synthetic::hand_pair(HandPose::MudraHalf, 0.5, 0.8, 0.7);
        let m = evaluate(&left, &right);
        assert!(m.wide_wrist_gap);
        assert_eq!(m.required_joined_signals, JOINED_SIGNALS_WIDE);
        assert_eq!(m.target_score, TARGET_SCORE_FAR + WIDE_GAP_EXTRA_SCORE);
        assert!(!m.hands_joined);
        assert!(!m.matched);
    }

    #[test]
    fn degenerate_pair_stays_finite() {
        let a = synthetic::collapsed_hand(0.5, 0.5);
        let b = synthetic::collapsed_hand(0.5, 0.5);
        let m = evaluate(&a, &b);
        assert!(m.palm_gap.is_finite() && m.wrist_gap.is_finite() && m.idx_thumb_span.is_finite());
        assert!(!m.matched);
    }
}
