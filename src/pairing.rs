// src/pairing.rs
//! Left/right role assignment for two simultaneously tracked hands.
//!
//! Tracker handedness labels flip often. Preference order:
//! 1. one distinct "left" and one distinct "right" label (highest score per label);
//! 2. continuity with last frame's wrists, choosing the cheaper of the two pairings;
//! 3. x-order, smaller x is left.

use nalgebra::Vector2;
use serde::Serialize;
use tracing::trace;

use crate::hand::{HandFrame, Handedness};

/// Last resolved wrist position per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrackedHandState {
    pub left: Option<[f64; 2]>,
    pub right: Option<[f64; 2]>,
}

impl TrackedHandState {
    pub fn clear(&mut self) {
        self.left = None;
        self.right = None;
    }

    fn both(&self) -> Option<(Vector2<f64>, Vector2<f64>)> {
        match (self.left, self.right) {
            (Some(l), Some(r)) => Some((Vector2::new(l[0], l[1]), Vector2::new(r[0], r[1]))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMethod {
    Handedness,
    Continuity,
    XOrder,
}

#[derive(Debug, Clone, Copy)]
pub struct HandPair<'a> {
    pub left: &'a HandFrame,
    pub right: &'a HandFrame,
    pub left_label: Option<Handedness>,
    pub right_label: Option<Handedness>,
    pub method: PairingMethod,
}

/// Highest-scored candidate carrying `label`, by position in `candidates`.
fn best_by_label(candidates: [&HandFrame; 2], label: Handedness) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, hand)| hand.handedness == Some(label))
        .fold(None, |best: Option<(usize, f64)>, (i, hand)| match best {
            Some((_, score)) if score >= hand.score => best,
            _ => Some((i, hand.score)),
        })
        .map(|(i, _)| i)
}

fn wrist_dist2(hand: &HandFrame, previous: Vector2<f64>) -> f64 {
    (hand.wrist() - previous).norm_squared()
}

/// Resolve roles for `a` and `b` and record their wrists into `tracked`.
pub fn resolve_pair<'a>(
    a: &'a HandFrame,
    b: &'a HandFrame,
    tracked: &mut TrackedHandState,
) -> HandPair<'a> {
    let candidates = [a, b];

    let by_label = match (
        best_by_label(candidates, Handedness::Left),
        best_by_label(candidates, Handedness::Right),
    ) {
        (Some(l), Some(r)) if l != r => Some((l, r)),
        _ => None,
    };

    let ((left, right), method) = if let Some((l, r)) = by_label {
        ((candidates[l], candidates[r]), PairingMethod::Handedness)
    } else if let Some((prev_left, prev_right)) = tracked.both() {
        let keep = wrist_dist2(a, prev_left) + wrist_dist2(b, prev_right);
        let swap = wrist_dist2(b, prev_left) + wrist_dist2(a, prev_right);
        if keep <= swap {
            ((a, b), PairingMethod::Continuity)
        } else {
            ((b, a), PairingMethod::Continuity)
        }
    } else if a.wrist().x <= b.wrist().x {
        ((a, b), PairingMethod::XOrder)
    } else {
        ((b, a), PairingMethod::XOrder)
    };

    let lw = left.wrist();
    let rw = right.wrist();
    tracked.left = Some([lw.x, lw.y]);
    tracked.right = Some([rw.x, rw.y]);
    trace!(?method, left = ?tracked.left, right = ?tracked.right, "resolved hand pair");

    HandPair {
        left,
        right,
        left_label: left.handedness,
        right_label: right.handedness,
        method,
    }
}
