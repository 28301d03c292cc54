// src/mediapipe_bridge.rs
//! Normalizes MediaPipe Hands result payloads into [`HandFrame`]s.
//!
//! Handedness arrives in several shapes depending on the MediaPipe build:
//! `{label, score}`, `[{label, score}, ...]` or `{classification: [{label, score}]}`.
//! All of that branching stays in this module.
//!
//! Landmark lists are kept as raw JSON until conversion so that one malformed hand (a string
//! coordinate, a non-object landmark) drops only that hand, not the frame.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Vector3;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::EngineError;
use crate::hand::{HandFrame, Handedness};
use crate::tracking::MAX_HANDS;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Classification {
    #[serde(default, alias = "categoryName")]
    pub label: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandednessObject {
    #[serde(default, alias = "categoryName")]
    pub label: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub classification: Vec<Classification>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HandednessEntry {
    List(Vec<Classification>),
    Object(HandednessObject),
    Unrecognized(serde_json::Value),
}

impl HandednessEntry {
    pub fn label(&self) -> Option<Handedness> {
        let label = match self {
            HandednessEntry::List(list) => list.first().and_then(|c| c.label.as_deref()),
            HandednessEntry::Object(obj) => obj
                .label
                .as_deref()
                .or_else(|| obj.classification.first().and_then(|c| c.label.as_deref())),
            HandednessEntry::Unrecognized(_) => None,
        };
        label.and_then(Handedness::from_label)
    }

    pub fn score(&self) -> f64 {
        let score = match self {
            HandednessEntry::List(list) => list.first().and_then(|c| c.score),
            HandednessEntry::Object(obj) => obj
                .score
                .or_else(|| obj.classification.first().and_then(|c| c.score)),
            HandednessEntry::Unrecognized(_) => None,
        };
        score.unwrap_or(0.0)
    }
}

/// One tracker callback's results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerResults {
    #[serde(default, rename = "multiHandLandmarks", alias = "multi_hand_landmarks")]
    pub multi_hand_landmarks: Option<Vec<Value>>,
    #[serde(default, rename = "multiHandedness", alias = "multi_handedness")]
    pub multi_handedness: Option<Vec<Option<HandednessEntry>>>,
}

impl TrackerResults {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Hands reported by the tracker, before validation.
    pub fn reported_hands(&self) -> usize {
        self.multi_hand_landmarks.as_ref().map_or(0, Vec::len)
    }

    fn handedness(&self, index: usize) -> Option<&HandednessEntry> {
        self.multi_handedness
            .as_ref()
            .and_then(|entries| entries.get(index))
            .and_then(Option::as_ref)
    }

    /// Valid hands among the first two reported. Malformed hands are dropped.
    pub fn into_hand_frames(&self) -> Vec<HandFrame> {
        let Some(hands) = &self.multi_hand_landmarks else {
            return Vec::new();
        };

        hands
            .iter()
            .take(MAX_HANDS)
            .enumerate()
            .filter_map(|(i, raw)| {
                let hand = match hand_from_value(raw) {
                    Ok(hand) => hand,
                    Err(err) => {
                        warn!(hand = i, %err, "dropping malformed hand");
                        return None;
                    }
                };
                let entry = self.handedness(i);
                Some(hand.with_handedness(
                    entry.and_then(HandednessEntry::label),
                    entry.map_or(0.0, HandednessEntry::score),
                ))
            })
            .collect()
    }
}

fn coordinate(landmark: &Value, key: &str) -> Option<f64> {
    landmark.get(key).and_then(Value::as_f64)
}

/// Missing or non-numeric x/y become NaN and fail validation; a missing z reads as 0.
fn hand_from_value(raw: &Value) -> Result<HandFrame, EngineError> {
    let landmarks = match raw {
        Value::Array(landmarks) => landmarks.as_slice(),
        Value::Null => &[][..],
        _ => return Err(EngineError::MalformedHand),
    };
    let points: Vec<Vector3<f64>> = landmarks
        .iter()
        .map(|lm| match lm {
            Value::Object(_) => Vector3::new(
                coordinate(lm, "x").unwrap_or(f64::NAN),
                coordinate(lm, "y").unwrap_or(f64::NAN),
                match lm.get("z") {
                    None | Some(Value::Null) => 0.0,
                    Some(z) => z.as_f64().unwrap_or(f64::NAN),
                },
            ),
            _ => Vector3::repeat(f64::NAN),
        })
        .collect();
    HandFrame::new(&points)
}

/// One line of a recorded session.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedFrame {
    #[serde(rename = "timestampMs", alias = "timestamp_ms")]
    pub timestamp_ms: f64,
    #[serde(flatten)]
    pub results: TrackerResults,
}

/// Parse a JSON Lines recording. Blank lines are skipped.
pub fn parse_recording(reader: impl BufRead) -> Result<Vec<RecordedFrame>, EngineError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line)
            .map_err(|source| EngineError::Recording { line: i + 1, source })?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<RecordedFrame>, EngineError> {
    let file = File::open(path)?;
    parse_recording(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn landmarks_json(count: usize) -> serde_json::Value {
        let points: Vec<_> = (0..count)
            .map(|i| json!({ "x": 0.4 + i as f64 * 0.01, "y": 0.6 - i as f64 * 0.01, "z": 0.0 }))
            .collect();
        json!(points)
    }

    fn results(value: serde_json::Value) -> TrackerResults {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn handedness_shapes_normalize() {
        let flat: HandednessEntry = serde_json::from_value(json!({ "label": "Left", "score": 0.9 })).unwrap();
        let list: HandednessEntry = serde_json::from_value(json!([{ "label": "RIGHT", "score": 0.7 }])).unwrap();
        let nested: HandednessEntry =
            serde_json::from_value(json!({ "classification": [{ "label": "left", "score": 0.6 }] })).unwrap();
        let tasks: HandednessEntry =
            serde_json::from_value(json!([{ "categoryName": "Right", "score": 0.8 }])).unwrap();
        let junk: HandednessEntry = serde_json::from_value(json!("left")).unwrap();

        assert_eq!((flat.label(), flat.score()), (Some(Handedness::Left), 0.9));
        assert_eq!((list.label(), list.score()), (Some(Handedness::Right), 0.7));
        assert_eq!((nested.label(), nested.score()), (Some(Handedness::Left), 0.6));
        assert_eq!(tasks.label(), Some(Handedness::Right));
        assert_eq!((junk.label(), junk.score()), (None, 0.0));
    }

    #[test]
    fn camel_and_snake_case_payloads() {
        let camel = results(json!({
            "multiHandLandmarks": [landmarks_json(21)],
            "multiHandedness": [{ "label": "Right", "score": 0.95 }],
        }));
        let snake = results(json!({
            "multi_hand_landmarks": [landmarks_json(21)],
            "multi_handedness": [{ "label": "Right", "score": 0.95 }],
        }));
        for r in [camel, snake] {
            let hands = r.into_hand_frames();
            assert_eq!(hands.len(), 1);
            assert_eq!(hands[0].handedness, Some(Handedness::Right));
            assert_eq!(hands[0].score, 0.95);
        }
    }

    #[test]
    fn malformed_hands_are_dropped() {
        let mut missing_y = landmarks_json(21);
        missing_y[5] = json!({ "x": 0.5 });
        let r = results(json!({
            "multiHandLandmarks": [landmarks_json(20), missing_y, landmarks_json(21)],
        }));
        assert_eq!(r.reported_hands(), 3);
        // The third hand is beyond the first two and never considered
        assert!(r.into_hand_frames().is_empty());
    }

    #[test]
    fn bad_coordinates_drop_only_their_hand() {
        let mut string_x = landmarks_json(21);
        string_x[3] = json!({ "x": "0.4", "y": 0.5, "z": 0.0 });
        let r = results(json!({
            "multiHandLandmarks": [landmarks_json(21), string_x],
            "multiHandedness": [{ "label": "Left", "score": 0.9 }, { "label": "Right", "score": 0.8 }],
        }));
        assert_eq!(r.reported_hands(), 2);
        let hands = r.into_hand_frames();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, Some(Handedness::Left));

        let mut not_an_object = landmarks_json(21);
        not_an_object[0] = json!([0.4, 0.6, 0.0]);
        let r = results(json!({
            "multiHandLandmarks": ["junk", not_an_object, landmarks_json(21)],
        }));
        assert!(r.into_hand_frames().is_empty());
    }

    #[test]
    fn recording_survives_a_bad_hand() {
        let mut bad = landmarks_json(21);
        bad[7] = json!({ "x": 0.5, "y": true });
        let text = json!({ "timestampMs": 0.0, "multiHandLandmarks": [bad, landmarks_json(21)] }).to_string();
        let frames = parse_recording(text.as_bytes()).unwrap();
        assert_eq!(frames[0].results.into_hand_frames().len(), 1);
    }

    #[test]
    fn handedness_stays_aligned_with_its_hand() {
        let r = results(json!({
            "multiHandLandmarks": [landmarks_json(3), landmarks_json(21)],
            "multiHandedness": [{ "label": "Left", "score": 0.9 }, { "label": "Right", "score": 0.8 }],
        }));
        let hands = r.into_hand_frames();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, Some(Handedness::Right));
    }

    #[test]
    fn empty_and_null_results() {
        assert!(results(json!({})).into_hand_frames().is_empty());
        assert!(results(json!({ "multiHandLandmarks": null })).into_hand_frames().is_empty());
        let r = results(json!({ "multiHandLandmarks": [null, landmarks_json(21)], "multiHandedness": null }));
        let hands = r.into_hand_frames();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, None);
    }

    #[test]
    fn recording_lines_parse() {
        let text = format!(
            "{}\n\n{}\n",
            json!({ "timestampMs": 0.0, "multiHandLandmarks": [landmarks_json(21)] }),
            json!({ "timestamp_ms": 33.0 }),
        );
        let frames = parse_recording(text.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].timestamp_ms, 33.0);
        assert_eq!(frames[0].results.into_hand_frames().len(), 1);
    }

    #[test]
    fn recording_errors_name_the_line() {
        let text = format!("{}\nnot json\n", json!({ "timestampMs": 0.0 }));
        match parse_recording(text.as_bytes()) {
            Err(EngineError::Recording { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
