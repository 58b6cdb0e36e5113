use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::prelude::RecordError;

/// Road-defect severity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Severe,
    Moderate,
    Minor,
}

/// Colour tone of the severity badge in the detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    Red,
    Yellow,
}

/// Everything that varies by severity. Colour, heat weight, badge and triage
/// order are all read from here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityProfile {
    pub label: &'static str,
    pub heat_weight: f32,
    pub color: [u8; 3],
    pub badge: BadgeTone,
    pub rank: u8,
}

const PROFILES: [SeverityProfile; 3] = [
    SeverityProfile {
        label: "severe",
        heat_weight: 1.0,
        color: [0xd4, 0x35, 0x1c],
        badge: BadgeTone::Red,
        rank: 3,
    },
    SeverityProfile {
        label: "moderate",
        heat_weight: 0.6,
        color: [0xf4, 0x77, 0x38],
        badge: BadgeTone::Yellow,
        rank: 2,
    },
    SeverityProfile {
        label: "minor",
        heat_weight: 0.3,
        color: [0xff, 0xdd, 0x00],
        badge: BadgeTone::Yellow,
        rank: 1,
    },
];

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Severe, Severity::Moderate, Severity::Minor];

    pub fn index(self) -> usize {
        match self {
            Severity::Severe => 0,
            Severity::Moderate => 1,
            Severity::Minor => 2,
        }
    }

    pub fn profile(self) -> &'static SeverityProfile {
        &PROFILES[self.index()]
    }

    pub fn label(self) -> &'static str {
        self.profile().label
    }

    pub fn heat_weight(self) -> f32 {
        self.profile().heat_weight
    }

    pub fn color(self) -> [u8; 3] {
        self.profile().color
    }

    pub fn color_hex(self) -> String {
        let [r, g, b] = self.color();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn badge(self) -> BadgeTone {
        self.profile().badge
    }

    pub fn rank(self) -> u8 {
        self.profile().rank
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = RecordError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Severity::ALL
            .into_iter()
            .find(|severity| severity.label() == normalized)
            .ok_or_else(|| RecordError::UnknownSeverity(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_weights_follow_triage_order() {
        assert_eq!(Severity::Severe.heat_weight(), 1.0);
        assert_eq!(Severity::Moderate.heat_weight(), 0.6);
        assert_eq!(Severity::Minor.heat_weight(), 0.3);
        assert!(Severity::Severe.rank() > Severity::Moderate.rank());
        assert!(Severity::Moderate.rank() > Severity::Minor.rank());
    }

    #[test]
    fn parsing_accepts_known_labels_case_insensitively() {
        assert_eq!("SEVERE".parse::<Severity>().unwrap(), Severity::Severe);
        assert_eq!(" minor ".parse::<Severity>().unwrap(), Severity::Minor);
    }

    #[test]
    fn parsing_rejects_unknown_labels() {
        assert_eq!(
            "unknown".parse::<Severity>(),
            Err(RecordError::UnknownSeverity("unknown".into()))
        );
    }

    #[test]
    fn only_severe_gets_red_badge() {
        assert_eq!(Severity::Severe.badge(), BadgeTone::Red);
        assert_eq!(Severity::Moderate.badge(), BadgeTone::Yellow);
        assert_eq!(Severity::Minor.badge(), BadgeTone::Yellow);
        assert_eq!(Severity::Moderate.color_hex(), "#f47738");
    }
}
