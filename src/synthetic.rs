// src/synthetic.rs
//! Canonical hand poses for simulation runs and tests.
//!
//! Every pose is an upright hand with a palm scale of [`PALM_SCALE`], built from per-finger
//! offsets relative to the finger's base knuckle. Mirrored hands flip x around the wrist.

use nalgebra::Vector3;

use crate::hand::{HandFrame, Handedness, LANDMARK_COUNT};

pub const PALM_SCALE: f64 = 0.15;

type Offset = (f64, f64);

// Base knuckles relative to the wrist
const INDEX_BASE: Offset = (-0.04, -0.14);
const MIDDLE_BASE: Offset = (0.0, -0.15);
const RING_BASE: Offset = (0.035, -0.14);
const PINKY_BASE: Offset = (0.065, -0.12);

// pip, dip, tip relative to the base knuckle
const RAISED: [Offset; 3] = [(0.0, -0.06), (0.0, -0.10), (0.0, -0.14)];
const FOLDED: [Offset; 3] = [(0.0, -0.03), (0.0, -0.005), (0.0, 0.01)];
const CROSSED_MIDDLE: [Offset; 3] = [(-0.01, -0.04), (-0.03, -0.075), (-0.04, -0.105)];
const PINCHING_INDEX: [Offset; 3] = [(-0.01, -0.05), (-0.03, -0.07), (-0.05, -0.06)];

// cmc, mcp, ip, tip relative to the wrist
const THUMB_SPLAYED: [Offset; 4] = [(-0.03, -0.03), (-0.07, -0.06), (-0.10, -0.08), (-0.13, -0.10)];
const THUMB_TUCKED: [Offset; 4] = [(-0.03, -0.03), (-0.05, -0.06), (-0.03, -0.08), (-0.01, -0.07)];
const THUMB_PINCHING: [Offset; 4] = [(-0.03, -0.03), (-0.06, -0.07), (-0.08, -0.12), (-0.09, -0.19)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPose {
    /// All four fingers raised, thumb out.
    OpenPalm,
    /// Index raised, thumb splayed, the rest folded.
    RedSign,
    /// All fingers folded over a tucked thumb.
    Fist,
    /// Index tip meeting the thumb tip, the rest raised.
    Pinch,
    /// Middle finger crossed over a raised index.
    CrossedFingers,
    /// Index raised, thumb tucked, the rest folded; one half of the joined pose.
    MudraHalf,
}

struct PoseShape {
    thumb: [Offset; 4],
    index: [Offset; 3],
    middle: [Offset; 3],
    ring: [Offset; 3],
    pinky: [Offset; 3],
}

impl HandPose {
    fn shape(self) -> PoseShape {
        match self {
            HandPose::OpenPalm => PoseShape {
                thumb: THUMB_SPLAYED,
                index: RAISED,
                middle: RAISED,
                ring: RAISED,
                pinky: RAISED,
            },
            HandPose::RedSign => PoseShape {
                thumb: THUMB_SPLAYED,
                index: RAISED,
                middle: FOLDED,
                ring: FOLDED,
                pinky: FOLDED,
            },
            HandPose::Fist => PoseShape {
                thumb: THUMB_TUCKED,
                index: FOLDED,
                middle: FOLDED,
                ring: FOLDED,
                pinky: FOLDED,
            },
            HandPose::Pinch => PoseShape {
                thumb: THUMB_PINCHING,
                index: PINCHING_INDEX,
                middle: RAISED,
                ring: RAISED,
                pinky: RAISED,
            },
            HandPose::CrossedFingers => PoseShape {
                thumb: THUMB_SPLAYED,
                index: RAISED,
                middle: CROSSED_MIDDLE,
                ring: FOLDED,
                pinky: FOLDED,
            },
            HandPose::MudraHalf => PoseShape {
                thumb: THUMB_TUCKED,
                index: RAISED,
                middle: FOLDED,
                ring: FOLDED,
                pinky: FOLDED,
            },
        }
    }
}

fn build(pose: HandPose, wrist_x: f64, wrist_y: f64, mirrored: bool) -> HandFrame {
    let shape = pose.shape();
    let sign = if mirrored { -1.0 } else { 1.0 };

    let mut offsets: Vec<Offset> = Vec::with_capacity(LANDMARK_COUNT);
    offsets.push((0.0, 0.0));
    offsets.extend_from_slice(&shape.thumb);
    for (base, joints) in [
        (INDEX_BASE, shape.index),
        (MIDDLE_BASE, shape.middle),
        (RING_BASE, shape.ring),
        (PINKY_BASE, shape.pinky),
    ] {
        offsets.push(base);
        offsets.extend(joints.iter().map(|&(dx, dy)| (base.0 + dx, base.1 + dy)));
    }

    let points: Vec<Vector3<f64>> = offsets
        .into_iter()
        .map(|(dx, dy)| Vector3::new(wrist_x + sign * dx, wrist_y + dy, 0.0))
        .collect();

    match HandFrame::new(&points) {
        Ok(hand) => hand,
        Err(_) => unreachable!("pose tables always hold 21 finite points"),
    }
}

pub fn hand(pose: HandPose, wrist_x: f64, wrist_y: f64) -> HandFrame {
    build(pose, wrist_x, wrist_y, false)
}

pub fn mirrored_hand(pose: HandPose, wrist_x: f64, wrist_y: f64) -> HandFrame {
    build(pose, wrist_x, wrist_y, true)
}

/// Two hands side by side, wrists `gap` apart around `center_x`.
///
/// The left-role hand sits at the smaller x; the right-role hand is mirrored.
pub fn hand_pair(pose: HandPose, center_x: f64, wrist_y: f64, gap: f64) -> (HandFrame, HandFrame) {
    let left = hand(pose, center_x - gap * 0.5, wrist_y);
    let right = mirrored_hand(pose, center_x + gap * 0.5, wrist_y);
    (left, right)
}

/// Joined two-hand pose that the mudra matcher accepts.
pub fn mudra_pair(center_x: f64, wrist_y: f64) -> (HandFrame, HandFrame) {
    hand_pair(HandPose::MudraHalf, center_x, wrist_y, 0.10)
}

/// Both palms raised close together, the pose the matcher must veto.
pub fn open_pair(center_x: f64, wrist_y: f64) -> (HandFrame, HandFrame) {
    hand_pair(HandPose::OpenPalm, center_x, wrist_y, 0.10)
}

/// Every landmark at the same point.
pub fn collapsed_hand(x: f64, y: f64) -> HandFrame {
    let points = vec![Vector3::new(x, y, 0.0); LANDMARK_COUNT];
    match HandFrame::new(&points) {
        Ok(hand) => hand,
        Err(_) => unreachable!("collapsed hand holds 21 finite points"),
    }
}

/// One tracker callback in a scripted session.
#[derive(Debug, Clone)]
pub struct SimulatedFrame {
    pub timestamp_ms: f64,
    pub hands: Vec<HandFrame>,
}

/// Scripted demo: red then a throw, blue, purple, void, a pause, then the joined pose.
pub fn demo_session(frame_interval_ms: f64) -> Vec<SimulatedFrame> {
    let mut script: Vec<Vec<HandFrame>> = Vec::new();

    for i in 0..10 {
        script.push(vec![hand(HandPose::RedSign, 0.5 + i as f64 * 0.001, 0.8)]);
    }
    script.push(vec![hand(HandPose::OpenPalm, 0.53, 0.78)]);
    script.push(vec![hand(HandPose::OpenPalm, 0.56, 0.76)]);
    for _ in 0..4 {
        script.push(Vec::new());
    }
    for _ in 0..10 {
        script.push(vec![hand(HandPose::Fist, 0.5, 0.8)]);
    }
    for _ in 0..10 {
        script.push(vec![hand(HandPose::Pinch, 0.5, 0.8)]);
    }
    for _ in 0..12 {
        script.push(vec![hand(HandPose::CrossedFingers, 0.5, 0.8)]);
    }
    for _ in 0..6 {
        script.push(Vec::new());
    }
    for _ in 0..20 {
        let (left, right) = mudra_pair(0.5, 0.8);
        script.push(vec![
            left.with_handedness(Some(Handedness::Left), 0.9),
            right.with_handedness(Some(Handedness::Right), 0.9),
        ]);
    }
    for _ in 0..14 {
        script.push(Vec::new());
    }

    script
        .into_iter()
        .enumerate()
        .map(|(i, hands)| SimulatedFrame {
            timestamp_ms: i as f64 * frame_interval_ms,
            hands,
        })
        .collect()
}
