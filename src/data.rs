// src/data.rs
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;

use crate::technique::Technique;
use crate::tracking::FrameOutput;

#[derive(Debug, Serialize)]
struct SessionRecord {
    timestamp_ms: f64,
    frame: u64,
    hand_count: usize,
    path: &'static str,
    left_label: Option<&'static str>,
    right_label: Option<&'static str>,
    hand_label: Option<&'static str>,
    raw: &'static str,
    active: &'static str,

    conf_red: f64,
    conf_blue: f64,
    conf_purple: f64,
    conf_void: f64,
    conf_shrine: f64,

    mudra_score: Option<u8>,
    mudra_target: Option<u8>,
    mudra_matched: Option<bool>,

    void_pose_held: bool,
    shrine_pose_held: bool,
    two_hand_latched: bool,
    aim_x: f64,

    release_fired: bool,
    release_dx: Option<f64>,
    release_dy: Option<f64>,
    release_dz: Option<f64>,
}

impl SessionRecord {
    fn from_output(out: &FrameOutput) -> Self {
        let d = &out.diagnostics;
        Self {
            timestamp_ms: out.timestamp_ms,
            frame: out.frame_index,
            hand_count: d.hand_count,
            path: d.path.as_str(),
            left_label: d.left_label.map(|h| h.as_str()),
            right_label: d.right_label.map(|h| h.as_str()),
            hand_label: d.hand_label.map(|l| l.as_str()),
            raw: d.raw.as_str(),
            active: out.technique.as_str(),
            conf_red: d.confidence.red,
            conf_blue: d.confidence.blue,
            conf_purple: d.confidence.purple,
            conf_void: d.confidence.void,
            conf_shrine: d.confidence.shrine,
            mudra_score: d.mudra.map(|m| m.score),
            mudra_target: d.mudra.map(|m| m.target_score),
            mudra_matched: d.mudra.map(|m| m.matched),
            void_pose_held: out.void_pose_held,
            shrine_pose_held: out.shrine_pose_held,
            two_hand_latched: d.mode.two_hand_latched,
            aim_x: out.aim_x,
            release_fired: out.release.is_some(),
            release_dx: out.release.map(|r| r.direction.x),
            release_dy: out.release.map(|r| r.direction.y),
            release_dz: out.release.map(|r| r.direction.z),
        }
    }
}

/// Frame counts and events for one recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_frames: usize,
    pub tracked_frames: usize,
    pub frames_per_technique: BTreeMap<&'static str, usize>,
    pub transitions: usize,
    pub releases: usize,
}

impl SessionSummary {
    pub fn tracked_rate(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.tracked_frames as f64 / self.total_frames as f64
    }

    pub fn frames_in(&self, technique: Technique) -> usize {
        self.frames_per_technique
            .get(technique.as_str())
            .copied()
            .unwrap_or(0)
    }
}

pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
    frames: Vec<FrameOutput>,
}

impl DataExporter {
    /// The session name becomes a directory under `output_dir`, so it must be a single
    /// path component.
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Result<Self> {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });
        if session_name.trim().is_empty()
            || session_name == "."
            || session_name == ".."
            || session_name.contains(['/', '\\'])
        {
            bail!("invalid session name '{session_name}': must be a single directory name");
        }

        Ok(Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            frames: Vec::new(),
        })
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn add_frame(&mut self, output: FrameOutput) {
        self.frames.push(output);
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            total_frames: self.frames.len(),
            ..SessionSummary::default()
        };
        for out in &self.frames {
            if out.diagnostics.hand_count > 0 {
                summary.tracked_frames += 1;
            }
            *summary
                .frames_per_technique
                .entry(out.technique.as_str())
                .or_insert(0) += 1;
            summary.transitions += out.transition.is_some() as usize;
            summary.releases += out.release.is_some() as usize;
        }
        summary
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("technique_data.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("creating {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);

        for out in &self.frames {
            writer.serialize(SessionRecord::from_output(out))?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn generate_report(&self) -> Result<PathBuf> {
        let report_path = self.session_dir().join("report.html");

        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        std::fs::write(&report_path, self.create_html_report())
            .with_context(|| format!("writing {}", report_path.display()))?;

        Ok(report_path)
    }

    fn create_html_report(&self) -> String {
        let summary = self.summary();
        let session_name = escape_html(&self.session_name);

        let technique_rows: String = [
            Technique::Neutral,
            Technique::Red,
            Technique::Blue,
            Technique::Purple,
            Technique::Void,
            Technique::Shrine,
        ]
        .into_iter()
        .map(|t| {
            format!(
                r#"
        <div class="stat-item">
            <span class="stat-label" style="color: {}">{}:</span>
            <span class="stat-value">{} frames</span>
        </div>"#,
                t.theme_color(),
                t.display_name(),
                summary.frames_in(t)
            )
        })
        .collect();

        format!(r#"
<!DOCTYPE html>
<html>
<head>
    <title>Technique Session Report - {}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #111; color: #eee; }}
        .stats {{ background: #1c1c1c; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.4); }}
        .stat-item {{ margin: 10px 0; }}
        .stat-label {{ font-weight: bold; }}
        .stat-value {{ color: #00ffff; font-size: 1.2em; }}
    </style>
</head>
<body>
    <h1>Technique Session Report</h1>
    <div class="stats">
        <h2>Session: {}</h2>
        <div class="stat-item">
            <span class="stat-label">Total Frames:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Hands Tracked:</span>
            <span class="stat-value">{:.1}%</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Transitions:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Releases:</span>
            <span class="stat-value">{}</span>
        </div>
    </div>
    <div class="stats">
        <h2>Frames per Technique</h2>{}
    </div>
</body>
</html>
"#,
            session_name,
            session_name,
            summary.total_frames,
            summary.tracked_rate() * 100.0,
            summary.transitions,
            summary.releases,
            technique_rows
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{self, HandPose};
    use crate::tracking::TechniqueTracker;

    fn recorded_exporter(dir: &Path) -> DataExporter {
        let mut tracker = TechniqueTracker::default();
        let mut exporter = DataExporter::new(dir, Some("unit".to_string())).unwrap();
        let hand = synthetic::hand(HandPose::RedSign, 0.5, 0.7);
        for i in 0..8 {
            exporter.add_frame(tracker.process_frame(&[hand.clone()], i as f64 * 33.0));
        }
        exporter.add_frame(tracker.process_frame(&[], 264.0));
        exporter
    }

    #[test]
    fn summary_counts_frames() {
        let dir = tempfile::tempdir().unwrap();
        let summary = recorded_exporter(dir.path()).summary();
        assert_eq!(summary.total_frames, 9);
        assert_eq!(summary.tracked_frames, 8);
        assert_eq!(summary.frames_in(Technique::Neutral), 3);
        assert_eq!(summary.frames_in(Technique::Red), 6);
        assert_eq!(summary.transitions, 1);
    }

    #[test]
    fn csv_has_one_row_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = recorded_exporter(dir.path()).export_csv().unwrap();
        assert!(path.ends_with("unit/technique_data.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "conf_shrine"));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 9);
        let active = headers.iter().position(|h| h == "active").unwrap();
        assert_eq!(&rows[3][active], "red");
    }

    #[test]
    fn report_lists_every_technique() {
        let dir = tempfile::tempdir().unwrap();
        let path = recorded_exporter(dir.path()).generate_report().unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("Session: unit"));
        assert!(html.contains("DOMAIN EXPANSION: MALEVOLENT SHRINE"));
        assert!(html.contains("88.9%"));
    }

    #[test]
    fn session_names_are_single_components() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../escape", "a/b", "a\\b", "..", ".", "  "] {
            assert!(DataExporter::new(dir.path(), Some(name.to_string())).is_err(), "{name}");
        }
        assert!(DataExporter::new(dir.path(), None).is_ok());
    }

    #[test]
    fn report_escapes_the_session_name() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DataExporter::new(dir.path(), Some("<b>run & gun</b>".to_string())).unwrap();
        let path = exporter.generate_report().unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("Session: &lt;b&gt;run &amp; gun&lt;/b&gt;"));
        assert!(!html.contains("<b>run"));
    }
}
