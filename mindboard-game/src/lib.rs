//! Mindboard Game Engine
//!
//! Platform-agnostic core for the Mindboard self-assessment game: a
//! chess-themed ladder board whose movement is interleaved with a 21-item
//! stress, anxiety and depression questionnaire.
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod board;
pub mod chat;
pub mod config;
pub mod persistence;
pub mod questions;
pub mod scoring;
pub mod session;
pub mod severity;
pub mod stream;
pub mod support;

// Re-export commonly used types
pub use board::{Board, FINAL_CELL, Piece, PieceKind, START_CELL, Tile};
pub use chat::{ChatMessage, ChatRequest, ChatRole, Conversation, TextGenerator};
pub use config::{ConfigError, GameConfig};
pub use persistence::{Identity, SaveStatus, ScoreRecord, ScoreStore, UserId};
pub use questions::{AnswerOption, Question, QuestionBank, ScanWindow, Subscale, TriggerSets};
pub use scoring::{AssessmentReport, Scorecard, SubscaleResult, Tallies};
pub use session::{
    GameError, GameSession, Phase, Progress, QueenMove, Resume, RollOutcome, SessionEvent,
    SessionState,
};
pub use severity::{Breakpoints, Severity, SeverityTable, classify, overall_severity};
pub use stream::{StreamDecoder, StreamError, StreamEvent};
pub use support::{SupportProfile, SystemContext};

/// Main game engine binding configuration to the save collaborators
pub struct GameEngine<S, I>
where
    S: ScoreStore,
    I: Identity,
{
    config: GameConfig,
    store: S,
    identity: I,
}

impl<S, I> GameEngine<S, I>
where
    S: ScoreStore,
    I: Identity,
{
    /// Create a new game engine with the provided configuration and collaborators
    pub const fn new(config: GameConfig, store: S, identity: I) -> Self {
        Self {
            config,
            store,
            identity,
        }
    }

    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Create a new session that is already awaiting its first roll
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn create_session(&self, seed: u64) -> Result<GameSession, GameError> {
        self.config.validate()?;
        let mut session = GameSession::new(self.config.clone(), seed);
        session.start()?;
        Ok(session)
    }

    /// Save a finished session's scores for the current user
    pub fn save_scores(&self, session: &mut GameSession) -> SaveStatus {
        session.persist_scores(&self.identity, &self.store)
    }

    /// Open the post-assessment conversation for a finished session
    pub fn conversation(&self, session: &GameSession) -> Option<Conversation> {
        session
            .is_finished()
            .then(|| Conversation::new(session.assessment()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;

    #[derive(Default)]
    struct MemoryStore {
        rows: RefCell<Vec<ScoreRecord>>,
    }

    impl ScoreStore for MemoryStore {
        type Error = Infallible;

        fn save_scores(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
            self.rows.borrow_mut().push(record.clone());
            Ok(())
        }
    }

    fn play_to_finish(session: &mut GameSession) {
        while !session.is_finished() {
            match session.progress() {
                Progress::AwaitingRoll => {
                    session.roll().unwrap();
                }
                Progress::Moving { .. } => {
                    session.advance_to_rest().unwrap();
                }
                Progress::Question { .. } => {
                    session.answer(1).unwrap();
                }
                Progress::Tile { tile: Tile::Queen } => {
                    session.choose_queen_move(QueenMove::Forward).unwrap();
                }
                Progress::Tile { .. } => {
                    session.resolve_tile().unwrap();
                }
                Progress::Idle | Progress::Finished => unreachable!(),
            }
        }
    }

    #[test]
    fn engine_runs_and_saves_a_session() {
        let engine = GameEngine::new(
            GameConfig::default(),
            MemoryStore::default(),
            Some(UserId::new("engine-test")),
        );
        let mut session = engine.create_session(2024).unwrap();
        assert_eq!(session.progress(), Progress::AwaitingRoll);
        assert!(engine.conversation(&session).is_none());

        play_to_finish(&mut session);
        assert_eq!(engine.save_scores(&mut session), SaveStatus::Saved);
        assert_eq!(engine.save_scores(&mut session), SaveStatus::AlreadySaved);

        let rows = engine.store().rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stress_score, 14);
        assert_eq!(rows[0].anxiety_score, 14);
        assert_eq!(rows[0].depression_score, 14);

        let conversation = engine.conversation(&session).unwrap();
        assert_eq!(
            conversation.context().overall_severity(),
            Severity::Moderate
        );
    }

    #[test]
    fn engine_rejects_invalid_config() {
        let config = GameConfig {
            questions: QuestionBank::default(),
            ..GameConfig::default()
        };
        let engine = GameEngine::new(config, MemoryStore::default(), None::<UserId>);
        assert_eq!(
            engine.create_session(1).err(),
            Some(GameError::Config(ConfigError::EmptyBank))
        );
    }
}
