// src/bin/pose_probe.rs
//! Classifies a single recorded frame and prints every intermediate signal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use technique_tracker::classifier::{classify_signals, PoseSignals};
use technique_tracker::mediapipe_bridge::read_recording;
use technique_tracker::mudra;
use technique_tracker::pairing::{resolve_pair, TrackedHandState};
use technique_tracker::synthetic::{self, HandPose};
use technique_tracker::HandFrame;

#[derive(Parser, Debug)]
#[command(name = "pose_probe")]
#[command(about = "Print pose signals, labels and joined-pose scoring for one frame")]
struct Args {
    /// JSON Lines recording
    #[arg(required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// Zero-based frame index within the recording
    #[arg(long, default_value_t = 0)]
    frame: usize,

    /// Probe a built-in pose instead: red, blue, purple, void, open, mudra
    #[arg(long)]
    demo: Option<String>,
}

fn demo_hands(name: &str) -> Result<Vec<HandFrame>> {
    let pose = match name {
        "red" => HandPose::RedSign,
        "blue" => HandPose::Fist,
        "purple" => HandPose::Pinch,
        "void" => HandPose::CrossedFingers,
        "open" => HandPose::OpenPalm,
        "mudra" => {
            let (left, right) = synthetic::mudra_pair(0.5, 0.7);
            return Ok(vec![left, right]);
        }
        other => anyhow::bail!("unknown demo pose '{other}'"),
    };
    Ok(vec![synthetic::hand(pose, 0.5, 0.7)])
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let hands = match (&args.demo, &args.input) {
        (Some(name), _) => demo_hands(name)?,
        (None, Some(path)) => {
            let recording = read_recording(path)
                .with_context(|| format!("reading recording {}", path.display()))?;
            let frame = recording.get(args.frame).with_context(|| {
                format!("frame {} out of range ({} frames)", args.frame, recording.len())
            })?;
            println!("timestamp: {:.1} ms", frame.timestamp_ms);
            println!("reported hands: {}", frame.results.reported_hands());
            frame.results.into_hand_frames()
        }
        (None, None) => anyhow::bail!("pass a recording or --demo"),
    };

    println!("valid hands: {}", hands.len());
    for (i, hand) in hands.iter().enumerate() {
        let signals = PoseSignals::measure(hand);
        println!(
            "\nhand {} ({}, score {:.2}) -> {}",
            i,
            hand.handedness.map(|h| h.as_str()).unwrap_or("-"),
            hand.score,
            classify_signals(&signals)
        );
        println!("{}", serde_json::to_string_pretty(&signals)?);
    }

    if let [a, b, ..] = hands.as_slice() {
        let mut tracked = TrackedHandState::default();
        let pair = resolve_pair(a, b, &mut tracked);
        let verdict = mudra::evaluate(pair.left, pair.right);
        println!("\npairing: {:?}", pair.method);
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    }

    Ok(())
}
