// src/hand.rs
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Number of keypoints in a tracked hand skeleton.
pub const LANDMARK_COUNT: usize = 21;

// MediaPipe hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Palm center used for release velocity and aim tracking.
pub const PALM: usize = MIDDLE_MCP;

/// (tip, pip, mcp) triples for the four non-thumb fingers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finger {
    pub tip: usize,
    pub pip: usize,
    pub mcp: usize,
}

pub const INDEX: Finger = Finger { tip: INDEX_TIP, pip: INDEX_PIP, mcp: INDEX_MCP };
pub const MIDDLE: Finger = Finger { tip: MIDDLE_TIP, pip: MIDDLE_PIP, mcp: MIDDLE_MCP };
pub const RING: Finger = Finger { tip: RING_TIP, pip: RING_PIP, mcp: RING_MCP };
pub const PINKY: Finger = Finger { tip: PINKY_TIP, pip: PINKY_PIP, mcp: PINKY_MCP };

pub const NON_THUMB_FINGERS: [Finger; 4] = [INDEX, MIDDLE, RING, PINKY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Accepts tracker labels case-insensitively ("Left", "left", "RIGHT").
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Handedness::Left),
            "right" => Some(Handedness::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

/// One tracked hand for one tracker callback.
///
/// Coordinates are normalized to the camera frame: `x`/`y` in `[0, 1]` with `y` growing
/// downward, `z` a relative depth. A `HandFrame` always holds exactly 21 finite points;
/// anything else is rejected at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    landmarks: [Vector3<f64>; LANDMARK_COUNT],
    pub handedness: Option<Handedness>,
    pub score: f64,
}

impl HandFrame {
    pub fn new(points: &[Vector3<f64>]) -> Result<Self, EngineError> {
        if points.len() != LANDMARK_COUNT {
            return Err(EngineError::LandmarkCount {
                expected: LANDMARK_COUNT,
                found: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(EngineError::NonFiniteLandmark { index });
        }

        let mut landmarks = [Vector3::zeros(); LANDMARK_COUNT];
        landmarks.copy_from_slice(points);

        Ok(Self {
            landmarks,
            handedness: None,
            score: 0.0,
        })
    }

    pub fn with_handedness(mut self, handedness: Option<Handedness>, score: f64) -> Self {
        self.handedness = handedness;
        self.score = if score.is_finite() { score } else { 0.0 };
        self
    }

    #[inline]
    pub fn landmark(&self, index: usize) -> Vector3<f64> {
        self.landmarks[index]
    }

    #[inline]
    pub fn point2(&self, index: usize) -> Vector2<f64> {
        self.landmarks[index].xy()
    }

    pub fn landmarks(&self) -> &[Vector3<f64>; LANDMARK_COUNT] {
        &self.landmarks
    }

    pub fn wrist(&self) -> Vector2<f64> {
        self.point2(WRIST)
    }

    pub fn palm(&self) -> Vector2<f64> {
        self.point2(PALM)
    }

    /// Same hand shifted in the image plane.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let mut moved = self.clone();
        for p in moved.landmarks.iter_mut() {
            p.x += dx;
            p.y += dy;
        }
        moved
    }
}
