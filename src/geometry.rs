// src/geometry.rs
//! Scale-normalized measurements over a 21-point hand skeleton.
//!
//! All ratios are divided by a palm scale (wrist to middle-finger base) so they do not
//! depend on image resolution or distance from the camera. Denominators carry
//! [`EPSILON`] so coincident landmarks yield large but finite ratios.

use nalgebra::Vector2;

use crate::hand::{Finger, HandFrame, MIDDLE_MCP, NON_THUMB_FINGERS, WRIST};

pub const EPSILON: f64 = 1e-6;

/// Tip reach must exceed pip reach by 7% and mcp reach by 14% for "extended".
pub const EXTENDED_PIP_MARGIN: f64 = 1.07;
pub const EXTENDED_MCP_MARGIN: f64 = 1.14;

/// 2D distance between two landmarks of the same hand.
#[inline]
pub fn dist(hand: &HandFrame, a: usize, b: usize) -> f64 {
    (hand.point2(a) - hand.point2(b)).norm()
}

/// 3D distance between a landmark of one hand and a landmark of another.
#[inline]
pub fn dist3(a: &HandFrame, ai: usize, b: &HandFrame, bi: usize) -> f64 {
    (a.landmark(ai) - b.landmark(bi)).norm()
}

/// Wrist to middle-finger base, in the image plane.
pub fn palm_scale(hand: &HandFrame) -> f64 {
    dist(hand, WRIST, MIDDLE_MCP) + EPSILON
}

/// Average 3D palm scale of two hands.
pub fn pair_scale(a: &HandFrame, b: &HandFrame) -> f64 {
    (dist3(a, WRIST, a, MIDDLE_MCP) + dist3(b, WRIST, b, MIDDLE_MCP)) * 0.5 + EPSILON
}

/// Screen-space "up": tip above pip above mcp (y grows downward).
pub fn is_finger_up(hand: &HandFrame, finger: Finger) -> bool {
    let tip = hand.landmark(finger.tip).y;
    let pip = hand.landmark(finger.pip).y;
    let mcp = hand.landmark(finger.mcp).y;
    tip < pip && pip < mcp
}

pub fn is_finger_curled(hand: &HandFrame, finger: Finger) -> bool {
    let tip = hand.landmark(finger.tip).y;
    let pip = hand.landmark(finger.pip).y;
    let mcp = hand.landmark(finger.mcp).y;
    tip > pip || pip > mcp
}

/// Orientation-independent extension test based on reach from the wrist.
pub fn is_finger_extended(hand: &HandFrame, finger: Finger) -> bool {
    let tip_reach = dist(hand, finger.tip, WRIST);
    let pip_reach = dist(hand, finger.pip, WRIST);
    let mcp_reach = dist(hand, finger.mcp, WRIST);
    tip_reach > pip_reach * EXTENDED_PIP_MARGIN && tip_reach > mcp_reach * EXTENDED_MCP_MARGIN
}

pub fn extended_count_no_thumb(hand: &HandFrame) -> usize {
    NON_THUMB_FINGERS
        .iter()
        .filter(|&&finger| is_finger_extended(hand, finger))
        .count()
}

/// Projection of `point` onto the segment `start -> end`.
///
/// Returns the clamped segment parameter and the projected point.
pub fn project_onto_segment(
    point: Vector2<f64>,
    start: Vector2<f64>,
    end: Vector2<f64>,
) -> (f64, Vector2<f64>) {
    let axis = end - start;
    let len2 = axis.norm_squared() + EPSILON;
    let t = ((point - start).dot(&axis) / len2).clamp(0.0, 1.0);
    (t, start + axis * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{INDEX, RING};
    use crate::synthetic::{self, HandPose};

    #[test]
    fn palm_scale_matches_wrist_to_middle_base() {
        let hand = synthetic::hand(HandPose::OpenPalm, 0.5, 0.8);
        assert!((palm_scale(&hand) - synthetic::PALM_SCALE).abs() < 1e-5);
    }

    #[test]
    fn raised_finger_is_up_and_extended() {
        let hand = synthetic::hand(HandPose::OpenPalm, 0.5, 0.8);
        assert!(is_finger_up(&hand, INDEX));
        assert!(is_finger_extended(&hand, INDEX));
        assert!(!is_finger_curled(&hand, INDEX));
        assert_eq!(extended_count_no_thumb(&hand), 4);
    }

    #[test]
    fn folded_finger_is_curled_not_extended() {
        let hand = synthetic::hand(HandPose::Fist, 0.5, 0.8);
        assert!(is_finger_curled(&hand, RING));
        assert!(!is_finger_extended(&hand, RING));
        assert_eq!(extended_count_no_thumb(&hand), 0);
    }

    #[test]
    fn coincident_landmarks_stay_finite() {
        let hand = synthetic::collapsed_hand(0.4, 0.4);
        assert!(palm_scale(&hand) > 0.0);
        let ratio = dist(&hand, 8, 4) / palm_scale(&hand);
        assert!(ratio.is_finite());
        assert!(!is_finger_extended(&hand, INDEX));
    }

    #[test]
    fn projection_clamps_to_segment() {
        let start = Vector2::new(0.0, 0.0);
        let end = Vector2::new(1.0, 0.0);
        let (t, p) = project_onto_segment(Vector2::new(2.0, 1.0), start, end);
        assert!((t - 1.0).abs() < 1e-9);
        assert!((p.x - 1.0).abs() < 1e-6);
        let (t, _) = project_onto_segment(Vector2::new(0.25, -3.0), start, end);
        assert!((t - 0.25).abs() < 1e-5);
    }
}
