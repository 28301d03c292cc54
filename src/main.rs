// src/main.rs
//! Replays a recorded hand-tracking session through the technique engine and exports the
//! per-frame results.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use technique_tracker::data::DataExporter;
use technique_tracker::mediapipe_bridge::read_recording;
use technique_tracker::synthetic;
use technique_tracker::{EngineConfig, HandFrame, TechniqueTracker};

/// Technique tracker - replay tracked hand keypoints through the recognition engine
#[derive(Parser, Debug)]
#[command(name = "technique_tracker")]
#[command(about = "Replay a recorded hand-tracking session and export technique data")]
struct Args {
    /// JSON Lines recording, one tracker result with `timestampMs` per line
    input: Option<PathBuf>,

    /// Engine configuration (JSON, partial files allowed)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (defaults to Documents/TechniqueTracker)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Session name (defaults to a timestamp)
    #[arg(long)]
    session: Option<String>,

    /// Run the built-in synthetic demo instead of a recording
    #[arg(long)]
    simulate: bool,

    /// Frame spacing for --simulate, in milliseconds
    #[arg(long, default_value_t = 33.0)]
    frame_ms: f64,

    /// Print the diagnostics readout on every technique change
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("TechniqueTracker")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

fn load_frames(args: &Args) -> Result<Vec<(f64, Vec<HandFrame>)>> {
    if args.simulate {
        return Ok(synthetic::demo_session(args.frame_ms)
            .into_iter()
            .map(|f| (f.timestamp_ms, f.hands))
            .collect());
    }

    let Some(input) = &args.input else {
        bail!("no recording given; pass a path or --simulate");
    };
    let recording = read_recording(input)
        .with_context(|| format!("reading recording {}", input.display()))?;
    Ok(recording
        .into_iter()
        .map(|f| (f.timestamp_ms, f.results.into_hand_frames()))
        .collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let frames = load_frames(&args)?;
    info!(frames = frames.len(), simulate = args.simulate, "session loaded");

    let mut tracker = TechniqueTracker::new(config);
    let output_dir = args.output.clone().unwrap_or_else(default_output_dir);
    let mut exporter = DataExporter::new(&output_dir, args.session.clone())?;

    let mut last_fps = 0.0;
    for (timestamp_ms, hands) in &frames {
        let (output, metrics) = tracker.process_frame_with_metrics(hands, *timestamp_ms);
        last_fps = metrics.avg_fps;

        if let Some(transition) = output.transition {
            println!(
                "[{:>9.1} ms] {} -> {}",
                timestamp_ms,
                transition.from.display_name(),
                transition.to.display_name()
            );
            if args.verbose {
                println!("{}\n", output.diagnostics);
            }
        }
        if let Some(release) = output.release {
            println!(
                "[{:>9.1} ms] release {} toward ({:.2}, {:.2}, {:.2})",
                timestamp_ms,
                release.technique,
                release.direction.x,
                release.direction.y,
                release.direction.z
            );
        }

        exporter.add_frame(output);
    }

    let summary = exporter.summary();
    let csv_path = exporter.export_csv()?;
    let report_path = exporter.generate_report()?;

    println!();
    println!("Session:      {}", exporter.session_name());
    println!("Frames:       {}", summary.total_frames);
    println!("Hands seen:   {:.1}%", summary.tracked_rate() * 100.0);
    println!("Transitions:  {}", summary.transitions);
    println!("Releases:     {}", summary.releases);
    println!("Engine rate:  {:.0} frames/s", last_fps);
    println!("CSV:          {}", csv_path.display());
    println!("Report:       {}", report_path.display());

    Ok(())
}
