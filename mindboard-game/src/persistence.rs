//! Boundary contracts for saving completed assessments.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::questions::Subscale;
use crate::scoring::Tallies;

/// Opaque identifier supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted score row; each score is the doubled subscale total (0..=42).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: UserId,
    pub stress_score: u16,
    pub anxiety_score: u16,
    pub depression_score: u16,
}

impl ScoreRecord {
    #[must_use]
    pub fn from_tallies(user_id: UserId, tallies: &Tallies) -> Self {
        Self {
            user_id,
            stress_score: tallies.reported(Subscale::Stress),
            anxiety_score: tallies.reported(Subscale::Anxiety),
            depression_score: tallies.reported(Subscale::Depression),
        }
    }
}

/// Supplies the current user, if any. Only consulted at the save boundary.
pub trait Identity {
    fn current_user(&self) -> Option<UserId>;
}

impl Identity for Option<UserId> {
    fn current_user(&self) -> Option<UserId> {
        self.clone()
    }
}

/// Persistence collaborator for completed sessions.
pub trait ScoreStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save one completed assessment.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn save_scores(&self, record: &ScoreRecord) -> Result<(), Self::Error>;
}

/// Result of a save attempt. Failures never alter game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SaveStatus {
    Saved,
    AlreadySaved,
    NotFinished,
    NoUser,
    Failed(String),
}

impl SaveStatus {
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}
