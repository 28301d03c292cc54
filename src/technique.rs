// src/technique.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Gesture keys tracked by the arbiter. Iteration order is the arbiter's tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Red,
    Blue,
    Purple,
    Void,
    Shrine,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::Red,
        Gesture::Blue,
        Gesture::Purple,
        Gesture::Void,
        Gesture::Shrine,
    ];

    /// Gestures that come from the single-hand classifier.
    pub const SINGLE_HAND: [Gesture; 4] = [Gesture::Red, Gesture::Blue, Gesture::Purple, Gesture::Void];

    pub fn as_str(self) -> &'static str {
        Technique::from(self).as_str()
    }
}

/// The externally visible, stabilized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technique {
    #[default]
    Neutral,
    Red,
    Blue,
    Purple,
    Void,
    Shrine,
}

impl Technique {
    pub fn gesture(self) -> Option<Gesture> {
        match self {
            Technique::Neutral => None,
            Technique::Red => Some(Gesture::Red),
            Technique::Blue => Some(Gesture::Blue),
            Technique::Purple => Some(Gesture::Purple),
            Technique::Void => Some(Gesture::Void),
            Technique::Shrine => Some(Gesture::Shrine),
        }
    }

    /// Techniques a release can throw.
    pub fn is_throwable(self) -> bool {
        matches!(self, Technique::Red | Technique::Blue | Technique::Purple)
    }

    /// Techniques that drive the horizontal aim signal.
    pub fn tracks_aim(self) -> bool {
        matches!(self, Technique::Red | Technique::Blue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Technique::Neutral => "neutral",
            Technique::Red => "red",
            Technique::Blue => "blue",
            Technique::Purple => "purple",
            Technique::Void => "void",
            Technique::Shrine => "shrine",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Technique::Neutral => "CURSED ENERGY",
            Technique::Red => "REVERSE CURSED TECHNIQUE: RED",
            Technique::Blue => "CURSED TECHNIQUE: BLUE",
            Technique::Purple => "SECRET TECHNIQUE: HOLLOW PURPLE",
            Technique::Void => "DOMAIN EXPANSION: INFINITE VOID",
            Technique::Shrine => "DOMAIN EXPANSION: MALEVOLENT SHRINE",
        }
    }

    /// Hex colour the presentation layer themes this technique with.
    pub fn theme_color(self) -> &'static str {
        match self {
            Technique::Neutral => "#00ffff",
            Technique::Red => "#ff0a00",
            Technique::Blue => "#2080ff",
            Technique::Purple => "#cc00ff",
            Technique::Void => "#ffffff",
            Technique::Shrine => "#ff3d1f",
        }
    }
}

impl From<Gesture> for Technique {
    fn from(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Red => Technique::Red,
            Gesture::Blue => Technique::Blue,
            Gesture::Purple => Technique::Purple,
            Gesture::Void => Technique::Void,
            Gesture::Shrine => Technique::Shrine,
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
