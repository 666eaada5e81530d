//! Game configuration: board layout, question bank and severity breakpoints.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::board::{Board, is_on_board};
use crate::questions::{OPTIONS_PER_QUESTION, QuestionBank, Subscale};
use crate::severity::SeverityTable;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("question bank is empty")]
    EmptyBank,
    #[error("question id {id} appears more than once")]
    DuplicateQuestionId { id: u8 },
    #[error("question {id} has trigger position {position} outside 1..=100")]
    PositionOutOfRange { id: u8, position: u8 },
    #[error("trigger position {position} is used by more than one question")]
    DuplicatePosition { position: u8 },
    #[error("question {id} has {count} options (expected {expected})")]
    OptionCount {
        id: u8,
        count: usize,
        expected: usize,
    },
    #[error("piece placed on cell {cell} outside 1..=100")]
    PieceOffBoard { cell: u8 },
    #[error("{subscale} severity breakpoints must be strictly increasing")]
    Breakpoints { subscale: Subscale },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub board: Board,
    #[serde(default = "GameConfig::default_questions")]
    pub questions: QuestionBank,
    #[serde(default)]
    pub severity: SeverityTable,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board: Board::with_defaults(),
            questions: Self::default_questions(),
            severity: SeverityTable::default(),
        }
    }
}

impl GameConfig {
    fn default_questions() -> QuestionBank {
        QuestionBank::default_bank().clone()
    }

    /// Parse a (possibly partial) configuration; omitted sections keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_questions()?;
        if let Some(&cell) = self.board.pieces.keys().find(|&&cell| !is_on_board(cell)) {
            return Err(ConfigError::PieceOffBoard { cell });
        }
        for subscale in Subscale::ALL {
            if !self.severity.breakpoints(subscale).is_increasing() {
                return Err(ConfigError::Breakpoints { subscale });
            }
        }
        Ok(())
    }

    fn validate_questions(&self) -> Result<(), ConfigError> {
        if self.questions.is_empty() {
            return Err(ConfigError::EmptyBank);
        }
        let mut ids = BTreeSet::new();
        let mut positions = BTreeSet::new();
        for question in &self.questions.questions {
            if !ids.insert(question.id) {
                return Err(ConfigError::DuplicateQuestionId { id: question.id });
            }
            if !is_on_board(question.position) {
                return Err(ConfigError::PositionOutOfRange {
                    id: question.id,
                    position: question.position,
                });
            }
            if !positions.insert(question.position) {
                return Err(ConfigError::DuplicatePosition {
                    position: question.position,
                });
            }
            if question.options.len() != OPTIONS_PER_QUESTION {
                return Err(ConfigError::OptionCount {
                    id: question.id,
                    count: question.options.len(),
                    expected: OPTIONS_PER_QUESTION,
                });
            }
        }
        Ok(())
    }
}
