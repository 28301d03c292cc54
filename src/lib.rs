// src/lib.rs
//! Hand-pose technique recognition over tracked hand keypoints.
//!
//! Per frame: hands are paired or classified, a mode controller turns that into a raw label,
//! and a hysteresis arbiter stabilizes it into the active [`Technique`]. A release detector
//! watches palm motion alongside.

pub mod arbiter;
pub mod classifier;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod hand;
pub mod mediapipe_bridge;
pub mod mode;
pub mod mudra;
pub mod pairing;
pub mod release;
pub mod synthetic;
pub mod technique;
pub mod tracking;

pub use config::EngineConfig;
pub use error::EngineError;
pub use hand::{HandFrame, Handedness};
pub use release::ReleaseEvent;
pub use technique::{Gesture, Technique};
pub use tracking::{EngineState, FrameDiagnostics, FrameOutput, TechniqueTracker};
