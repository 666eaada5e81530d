//! Score to severity classification.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::questions::Subscale;

/// Ordered severity labels; `Ord` follows clinical severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Normal,
    Mild,
    Moderate,
    Severe,
    ExtremelySevere,
}

impl Severity {
    pub const ALL: [Self; 5] = [
        Self::Normal,
        Self::Mild,
        Self::Moderate,
        Self::Severe,
        Self::ExtremelySevere,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
            Self::ExtremelySevere => "Extremely Severe",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::ExtremelySevere => "extremely_severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive upper bounds for the first four labels; anything above `severe`
/// is extremely severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    pub normal: u16,
    pub mild: u16,
    pub moderate: u16,
    pub severe: u16,
}

impl Breakpoints {
    #[must_use]
    pub const fn new(normal: u16, mild: u16, moderate: u16, severe: u16) -> Self {
        Self {
            normal,
            mild,
            moderate,
            severe,
        }
    }

    #[must_use]
    pub const fn classify(self, score: u16) -> Severity {
        if score <= self.normal {
            Severity::Normal
        } else if score <= self.mild {
            Severity::Mild
        } else if score <= self.moderate {
            Severity::Moderate
        } else if score <= self.severe {
            Severity::Severe
        } else {
            Severity::ExtremelySevere
        }
    }

    #[must_use]
    pub const fn is_increasing(self) -> bool {
        self.normal < self.mild && self.mild < self.moderate && self.moderate < self.severe
    }
}

/// Per-subscale breakpoints applied to the reported (doubled) score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityTable {
    #[serde(default = "SeverityTable::default_stress")]
    pub stress: Breakpoints,
    #[serde(default = "SeverityTable::default_anxiety")]
    pub anxiety: Breakpoints,
    #[serde(default = "SeverityTable::default_depression")]
    pub depression: Breakpoints,
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self {
            stress: Self::default_stress(),
            anxiety: Self::default_anxiety(),
            depression: Self::default_depression(),
        }
    }
}

impl SeverityTable {
    const fn default_stress() -> Breakpoints {
        Breakpoints::new(14, 18, 25, 33)
    }

    const fn default_anxiety() -> Breakpoints {
        Breakpoints::new(7, 9, 14, 19)
    }

    const fn default_depression() -> Breakpoints {
        Breakpoints::new(9, 13, 20, 27)
    }

    #[must_use]
    pub const fn breakpoints(&self, subscale: Subscale) -> Breakpoints {
        match subscale {
            Subscale::Stress => self.stress,
            Subscale::Anxiety => self.anxiety,
            Subscale::Depression => self.depression,
        }
    }

    /// Classify a reported score, i.e. the raw subscale total already doubled.
    #[must_use]
    pub const fn classify(&self, subscale: Subscale, reported_score: u16) -> Severity {
        self.breakpoints(subscale).classify(reported_score)
    }
}

/// Classify with the standard breakpoints.
#[must_use]
pub fn classify(subscale: Subscale, reported_score: u16) -> Severity {
    SeverityTable::default().classify(subscale, reported_score)
}

/// Worst of the three subscale labels.
#[must_use]
pub fn overall_severity(labels: [Severity; 3]) -> Severity {
    labels.into_iter().max().unwrap_or_default()
}
