//! Board movement engine.
//!
//! A [`GameSession`] owns all per-game state and exposes the state machine
//! as discrete operations. Nothing here waits on a clock: a presentation
//! layer drives [`GameSession::advance_one_step`] at its own pace, or calls
//! [`GameSession::advance_to_rest`] to collapse a roll into one call.
//! Question triggers are checked after every single-cell step, so a roll
//! that crosses a trigger without landing on it still surfaces it.
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{
    DIAGONAL_STEPS, FINAL_CELL, FORWARD_STEPS, START_CELL, Tile, diagonal_destination,
    forward_destination, knight_destinations,
};
use crate::config::{ConfigError, GameConfig};
use crate::persistence::{Identity, SaveStatus, ScoreRecord, ScoreStore, UserId};
use crate::questions::{Question, ScanWindow, Subscale};
use crate::scoring::{AssessmentReport, Scorecard};

pub const DIE_FACES: u8 = 6;

/// Caller-contract violations. None of these change session state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("{operation} is not valid while {phase}")]
    InvalidOperation {
        operation: &'static str,
        phase: &'static str,
    },
    #[error("dice value {value} is outside 1..={DIE_FACES}")]
    InvalidRoll { value: u8 },
    #[error("answer option {index} is outside 0..=3")]
    OptionOutOfRange { index: u8 },
    #[error("question {id} is not in the bank")]
    UnknownQuestion { id: u8 },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// What to do once the pending question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resume {
    /// Continue the interrupted roll.
    Roll { origin: u8, remaining: u8 },
    /// Re-scan the window of a tile effect; tiles never chain.
    Effect { window: ScanWindow },
    /// Keep clearing questions before the game can finish.
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    AwaitingRoll,
    Moving {
        origin: u8,
        remaining: u8,
    },
    TileResolution {
        tile: Tile,
    },
    AwaitingAnswer {
        question_id: u8,
        resume: Resume,
    },
    Finished,
}

impl Phase {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingRoll => "awaiting roll",
            Self::Moving { .. } => "moving",
            Self::TileResolution { .. } => "resolving a tile",
            Self::AwaitingAnswer { .. } => "awaiting an answer",
            Self::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueenMove {
    /// Resolve like a bishop.
    Diagonal,
    /// Resolve like a rook.
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RollOutcome {
    Moving { value: u8, target: u8 },
    /// Roll would pass the goal; the turn is spent in place.
    Overshoot { value: u8 },
}

impl RollOutcome {
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Moving { value, .. } | Self::Overshoot { value } => value,
        }
    }
}

/// What the caller must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "next", rename_all = "snake_case")]
pub enum Progress {
    Idle,
    AwaitingRoll,
    Moving { cell: u8, remaining: u8 },
    Question { question_id: u8 },
    Tile { tile: Tile },
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started,
    Rolled {
        value: u8,
        from: u8,
    },
    Overshot {
        value: u8,
        at: u8,
    },
    Stepped {
        cell: u8,
    },
    QuestionRaised {
        question_id: u8,
        cell: u8,
    },
    Answered {
        question_id: u8,
        option: u8,
        subscale: Subscale,
    },
    TileResolved {
        tile: Tile,
        from: u8,
        to: Option<u8>,
    },
    Finished,
}

/// Serializable per-session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub seed: u64,
    pub position: u8,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub last_roll: Option<u8>,
    #[serde(default)]
    pub rolls: u32,
    #[serde(default)]
    pub scorecard: Scorecard,
    #[serde(default)]
    pub scores_saved: bool,
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

impl SessionState {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            position: START_CELL,
            phase: Phase::Idle,
            last_roll: None,
            rolls: 0,
            scorecard: Scorecard::default(),
            scores_saved: false,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    state: SessionState,
    rng: ChaCha20Rng,
}

impl GameSession {
    #[must_use]
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            state: SessionState::new(seed),
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Session over the built-in board and question bank.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(GameConfig::default(), seed)
    }

    /// Rebuild a session from a snapshot. Dice restart from the recorded seed.
    #[must_use]
    pub fn from_state(config: GameConfig, state: SessionState) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(state.seed);
        Self { config, state, rng }
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Apply a closure to the mutable state. Intended for tooling and tests.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub const fn position(&self) -> u8 {
        self.state.position
    }

    #[must_use]
    pub const fn scorecard(&self) -> &Scorecard {
        &self.state.scorecard
    }

    #[must_use]
    pub fn events(&self) -> &[SessionEvent] {
        &self.state.events
    }

    #[must_use]
    pub const fn is_moving(&self) -> bool {
        matches!(self.state.phase, Phase::Moving { .. })
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state.phase, Phase::Finished)
    }

    #[must_use]
    pub fn pending_question(&self) -> Option<&Question> {
        match self.state.phase {
            Phase::AwaitingAnswer { question_id, .. } => self.config.questions.get(question_id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn progress(&self) -> Progress {
        match self.state.phase {
            Phase::Idle => Progress::Idle,
            Phase::AwaitingRoll => Progress::AwaitingRoll,
            Phase::Moving { remaining, .. } => Progress::Moving {
                cell: self.state.position,
                remaining,
            },
            Phase::TileResolution { tile } => Progress::Tile { tile },
            Phase::AwaitingAnswer { question_id, .. } => Progress::Question { question_id },
            Phase::Finished => Progress::Finished,
        }
    }

    /// # Errors
    ///
    /// Returns an error unless the session is idle.
    pub fn start(&mut self) -> Result<Progress, GameError> {
        self.require("start", matches!(self.state.phase, Phase::Idle))?;
        self.state.position = START_CELL;
        self.state.phase = Phase::AwaitingRoll;
        self.state.events.push(SessionEvent::Started);
        debug!("session {} started", self.state.seed);
        Ok(self.progress())
    }

    /// Discard all progress and return to idle. The dice stream continues.
    pub fn reset(&mut self) {
        debug!("session {} reset at cell {}", self.state.seed, self.state.position);
        self.state = SessionState::new(self.state.seed);
    }

    /// Roll the die.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session is awaiting a roll.
    pub fn roll(&mut self) -> Result<RollOutcome, GameError> {
        self.require("roll", matches!(self.state.phase, Phase::AwaitingRoll))?;
        let value = self.rng.gen_range(1..=DIE_FACES);
        self.roll_value(value)
    }

    /// Apply a known die value.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session is awaiting a roll and `value` is a die face.
    pub fn roll_value(&mut self, value: u8) -> Result<RollOutcome, GameError> {
        self.require("roll", matches!(self.state.phase, Phase::AwaitingRoll))?;
        if !(1..=DIE_FACES).contains(&value) {
            return Err(GameError::InvalidRoll { value });
        }
        let from = self.state.position;
        self.state.last_roll = Some(value);
        self.state.rolls = self.state.rolls.saturating_add(1);

        let target = from.saturating_add(value);
        if target > FINAL_CELL {
            debug!("roll {value} from {from} overshoots the goal");
            self.state.events.push(SessionEvent::Overshot { value, at: from });
            return Ok(RollOutcome::Overshoot { value });
        }

        self.state.events.push(SessionEvent::Rolled { value, from });
        self.state.phase = Phase::Moving {
            origin: from,
            remaining: value,
        };
        Ok(RollOutcome::Moving { value, target })
    }

    /// Move exactly one cell along the current roll.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session is moving.
    pub fn advance_one_step(&mut self) -> Result<Progress, GameError> {
        let Phase::Moving { origin, remaining } = self.state.phase else {
            return Err(self.invalid("advance"));
        };
        let cell = self.state.position.saturating_add(1).min(FINAL_CELL);
        let remaining = remaining.saturating_sub(1);
        self.state.position = cell;
        self.state.events.push(SessionEvent::Stepped { cell });

        let window = ScanWindow::Forward {
            from: origin,
            to: cell,
        };
        if let Some(question_id) = self.first_unanswered(window) {
            self.raise_question(question_id, Resume::Roll { origin, remaining });
        } else if remaining == 0 {
            self.land();
        } else {
            self.state.phase = Phase::Moving { origin, remaining };
        }
        Ok(self.progress())
    }

    /// Step until the roll completes or a question suspends it.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session is moving.
    pub fn advance_to_rest(&mut self) -> Result<Progress, GameError> {
        let mut progress = self.advance_one_step()?;
        while self.is_moving() {
            progress = self.advance_one_step()?;
        }
        Ok(progress)
    }

    /// Answer the pending question with an option index (its point value).
    ///
    /// # Errors
    ///
    /// Returns an error when no question is pending or the option is out of range.
    pub fn answer(&mut self, option_index: u8) -> Result<Progress, GameError> {
        let Phase::AwaitingAnswer {
            question_id,
            resume,
        } = self.state.phase
        else {
            return Err(self.invalid("answer"));
        };
        let subscale =
            self.state
                .scorecard
                .record_answer(&self.config.questions, question_id, option_index)?;
        self.state.events.push(SessionEvent::Answered {
            question_id,
            option: option_index,
            subscale,
        });
        debug!("question {question_id} answered with {option_index} ({subscale})");

        match resume {
            Resume::Roll { origin, remaining } => {
                let window = ScanWindow::Forward {
                    from: origin,
                    to: self.state.position,
                };
                if let Some(next) = self.first_unanswered(window) {
                    self.raise_question(next, resume);
                } else if remaining > 0 {
                    self.state.phase = Phase::Moving { origin, remaining };
                } else {
                    self.land();
                }
            }
            Resume::Effect { window } => {
                if let Some(next) = self.first_unanswered(window) {
                    self.raise_question(next, resume);
                } else {
                    self.settle_after_effect();
                }
            }
            Resume::Finish => self.finish_check(),
        }
        Ok(self.progress())
    }

    /// Apply the forced move of a rook, bishop or knight tile.
    ///
    /// # Errors
    ///
    /// Returns an error unless a non-queen tile is awaiting resolution.
    pub fn resolve_tile(&mut self) -> Result<Progress, GameError> {
        let tile = match self.state.phase {
            Phase::TileResolution { tile } if tile != Tile::Queen => tile,
            _ => return Err(self.invalid("resolve_tile")),
        };
        match tile {
            Tile::Rook => self.forward_effect(tile),
            Tile::Bishop => self.diagonal_effect(tile),
            Tile::Knight => self.knight_effect(),
            Tile::Queen => {}
        }
        Ok(self.progress())
    }

    /// Resolve a queen tile with the player's choice.
    ///
    /// # Errors
    ///
    /// Returns an error unless a queen tile is awaiting resolution.
    pub fn choose_queen_move(&mut self, choice: QueenMove) -> Result<Progress, GameError> {
        self.require(
            "choose_queen_move",
            matches!(
                self.state.phase,
                Phase::TileResolution { tile: Tile::Queen }
            ),
        )?;
        match choice {
            QueenMove::Diagonal => self.diagonal_effect(Tile::Queen),
            QueenMove::Forward => self.forward_effect(Tile::Queen),
        }
        Ok(self.progress())
    }

    #[must_use]
    pub fn assessment(&self) -> AssessmentReport {
        AssessmentReport::from_tallies(&self.state.scorecard.tallies, &self.config.severity)
    }

    /// Record for the persistence collaborator, available once finished.
    #[must_use]
    pub fn completion_record(&self, user_id: UserId) -> Option<ScoreRecord> {
        self.is_finished()
            .then(|| ScoreRecord::from_tallies(user_id, &self.state.scorecard.tallies))
    }

    /// Save the finished assessment at most once per session.
    ///
    /// A failed save is logged and reported; the session stays finished and a
    /// later call may retry.
    pub fn persist_scores<I, S>(&mut self, identity: &I, store: &S) -> SaveStatus
    where
        I: Identity + ?Sized,
        S: ScoreStore + ?Sized,
    {
        if !self.is_finished() {
            return SaveStatus::NotFinished;
        }
        if self.state.scores_saved {
            return SaveStatus::AlreadySaved;
        }
        let Some(user_id) = identity.current_user() else {
            return SaveStatus::NoUser;
        };
        let record = ScoreRecord::from_tallies(user_id, &self.state.scorecard.tallies);
        match store.save_scores(&record) {
            Ok(()) => {
                self.state.scores_saved = true;
                info!("saved scores for {}", record.user_id);
                SaveStatus::Saved
            }
            Err(err) => {
                warn!("failed to save scores for {}: {err}", record.user_id);
                SaveStatus::Failed(err.to_string())
            }
        }
    }

    fn require(&self, operation: &'static str, allowed: bool) -> Result<(), GameError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    const fn invalid(&self, operation: &'static str) -> GameError {
        GameError::InvalidOperation {
            operation,
            phase: self.state.phase.name(),
        }
    }

    fn first_unanswered(&self, window: ScanWindow) -> Option<u8> {
        self.config
            .questions
            .first_unanswered(window, &self.state.scorecard.answered)
            .map(|question| question.id)
    }

    fn raise_question(&mut self, question_id: u8, resume: Resume) {
        let cell = self.state.position;
        debug!("question {question_id} raised at cell {cell}");
        self.state
            .events
            .push(SessionEvent::QuestionRaised { question_id, cell });
        self.state.phase = Phase::AwaitingAnswer {
            question_id,
            resume,
        };
    }

    /// End of a roll with no pending question.
    fn land(&mut self) {
        let cell = self.state.position;
        if cell == FINAL_CELL {
            self.finish_check();
        } else if let Some(tile) = self.config.board.tile_at(cell) {
            debug!("landed on {tile} at cell {cell}");
            self.state.phase = Phase::TileResolution { tile };
        } else {
            self.state.phase = Phase::AwaitingRoll;
        }
    }

    fn settle_after_effect(&mut self) {
        if self.state.position == FINAL_CELL {
            self.finish_check();
        } else {
            self.state.phase = Phase::AwaitingRoll;
        }
    }

    fn finish_check(&mut self) {
        match self.first_unanswered(ScanWindow::UpTo { cell: FINAL_CELL }) {
            Some(question_id) => self.raise_question(question_id, Resume::Finish),
            None => self.enter_finished(),
        }
    }

    fn enter_finished(&mut self) {
        if self.is_finished() {
            return;
        }
        self.state.phase = Phase::Finished;
        self.state.events.push(SessionEvent::Finished);
        info!(
            "session {} finished after {} rolls",
            self.state.seed, self.state.rolls
        );
    }

    fn forward_effect(&mut self, tile: Tile) {
        let from = self.state.position;
        let to = forward_destination(from, FORWARD_STEPS);
        self.apply_effect(tile, from, Some(to), ScanWindow::Forward { from, to });
    }

    fn diagonal_effect(&mut self, tile: Tile) {
        let from = self.state.position;
        let to = diagonal_destination(from, DIAGONAL_STEPS);
        let window = ScanWindow::Forward {
            from,
            to: to.unwrap_or(from),
        };
        self.apply_effect(tile, from, to, window);
    }

    fn knight_effect(&mut self) {
        let from = self.state.position;
        let to = knight_destinations(from).first().copied();
        let window = ScanWindow::Span {
            low: to.unwrap_or(from),
            high: from,
        };
        self.apply_effect(Tile::Knight, from, to, window);
    }

    fn apply_effect(&mut self, tile: Tile, from: u8, to: Option<u8>, window: ScanWindow) {
        self.state
            .events
            .push(SessionEvent::TileResolved { tile, from, to });
        let Some(to) = to else {
            debug!("{tile} at cell {from} has no legal destination");
            self.state.phase = Phase::AwaitingRoll;
            return;
        };
        debug!("{tile} moves player {from} -> {to}");
        self.state.position = to;
        match self.first_unanswered(window) {
            Some(question_id) => self.raise_question(question_id, Resume::Effect { window }),
            None => self.settle_after_effect(),
        }
    }
}
