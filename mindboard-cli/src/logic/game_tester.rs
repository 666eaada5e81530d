use anyhow::{Result, bail, ensure};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::sync::Arc;

use mindboard_game::questions::OPTIONS_PER_QUESTION;
use mindboard_game::scoring::REPORT_MULTIPLIER;
use mindboard_game::{
    AssessmentReport, FINAL_CELL, GameConfig, GameEngine, GameError, GameSession, Progress,
    SaveStatus, ScoreRecord, ScoreStore, SessionEvent, SessionState, Severity, Subscale, Tile,
    UserId,
};

use super::policy::{AnswerStrategy, QueenAlternator};

/// Upper bound on engine calls per game before a run is declared stuck.
pub const MAX_ACTIONS: u32 = 20_000;

pub const SIMULATION_USER: &str = "simulation";

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: AnswerStrategy,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: AnswerStrategy) -> Self {
        Self {
            strategy,
            expectations: Vec::new(),
        }
    }

    /// Plan carrying the standard completion checks.
    #[must_use]
    pub fn standard(strategy: AnswerStrategy) -> Self {
        Self::new(strategy)
            .with_expectation(expect_finished_at_goal)
            .with_expectation(expect_each_question_once)
            .with_expectation(expect_scores_in_range)
            .with_expectation(expect_single_save)
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: AnswerStrategy,
    pub policy_name: &'static str,
    /// Every question id in the configured bank.
    pub question_ids: BTreeSet<u8>,
    /// Highest reportable score per subscale for the configured bank.
    pub score_ceilings: BTreeMap<Subscale, u16>,
    pub final_state: SessionState,
    pub report: AssessmentReport,
    pub raised_questions: Vec<u8>,
    pub tiles_seen: BTreeMap<String, usize>,
    pub save_status: SaveStatus,
    pub repeat_save_status: SaveStatus,
    pub save_calls: usize,
    pub halted: Option<String>,
}

impl SimulationSummary {
    #[must_use]
    pub const fn rolls(&self) -> u32 {
        self.final_state.rolls
    }

    #[must_use]
    pub fn overall_severity(&self) -> Severity {
        self.report.overall_severity()
    }
}

/// Score store that only counts calls.
#[derive(Debug, Default)]
struct CountingStore {
    calls: Cell<usize>,
}

impl ScoreStore for CountingStore {
    type Error = Infallible;

    fn save_scores(&self, _record: &ScoreRecord) -> Result<(), Self::Error> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

/// Headless deterministic runner for the core game logic.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    config: Arc<GameConfig>,
}

impl GameTester {
    pub const fn new(config: Arc<GameConfig>, verbose: bool) -> Self {
        Self { verbose, config }
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let engine = GameEngine::new(
            (*self.config).clone(),
            CountingStore::default(),
            Some(UserId::new(SIMULATION_USER)),
        );
        let mut policy = plan.strategy.create_policy(seed);
        let policy_name = policy.name();
        let mut queen = QueenAlternator::default();
        if self.verbose {
            println!("  🎲 seed {seed} answering with the {policy_name} policy");
        }

        let bank = &self.config.questions;
        let question_ids: BTreeSet<u8> = bank.questions.iter().map(|q| q.id).collect();
        let per_item_ceiling = (OPTIONS_PER_QUESTION as u16 - 1) * REPORT_MULTIPLIER;
        let score_ceilings: BTreeMap<Subscale, u16> = Subscale::ALL
            .into_iter()
            .map(|subscale| {
                let items = bank
                    .questions
                    .iter()
                    .filter(|q| q.subscale == subscale)
                    .count();
                let items = u16::try_from(items).unwrap_or(u16::MAX);
                (subscale, items.saturating_mul(per_item_ceiling))
            })
            .collect();

        let (final_state, report, save_status, repeat_save_status, halted) =
            match engine.create_session(seed) {
                Ok(mut session) => {
                    let answer = |question_id: u8, session: &GameSession| {
                        let option = session
                            .config()
                            .questions
                            .get(question_id)
                            .map_or(0, |question| policy.pick_option(question));
                        if self.verbose {
                            println!("  ❓ Q{question_id} -> option {option}");
                        }
                        option
                    };
                    let halted = drive(&mut session, answer, &mut queen)
                        .err()
                        .map(|err| err.to_string());
                    let save_status = engine.save_scores(&mut session);
                    let repeat_save_status = engine.save_scores(&mut session);
                    let report = session.assessment();
                    (
                        session.into_state(),
                        report,
                        save_status,
                        repeat_save_status,
                        halted,
                    )
                }
                Err(err) => (
                    SessionState::new(seed),
                    AssessmentReport::from_tallies(&Default::default(), &self.config.severity),
                    SaveStatus::NotFinished,
                    SaveStatus::NotFinished,
                    Some(err.to_string()),
                ),
            };

        let raised_questions = final_state
            .events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::QuestionRaised { question_id, .. } => Some(*question_id),
                _ => None,
            })
            .collect();

        let mut tiles_seen: BTreeMap<String, usize> = BTreeMap::new();
        for event in &final_state.events {
            if let SessionEvent::TileResolved { tile, .. } = event {
                *tiles_seen.entry(tile.to_string()).or_default() += 1;
            }
        }

        SimulationSummary {
            seed,
            strategy: plan.strategy,
            policy_name,
            question_ids,
            score_ceilings,
            report,
            raised_questions,
            tiles_seen,
            save_status,
            repeat_save_status,
            save_calls: engine.store().calls.get(),
            halted,
            final_state,
        }
    }
}

/// Play a session to completion, answering through `answer`.
fn drive<F>(
    session: &mut GameSession,
    mut answer: F,
    queen: &mut QueenAlternator,
) -> Result<()>
where
    F: FnMut(u8, &GameSession) -> u8,
{
    for _ in 0..MAX_ACTIONS {
        let step: Result<Progress, GameError> = match session.progress() {
            Progress::Finished => return Ok(()),
            Progress::Idle => session.start(),
            Progress::AwaitingRoll => session.roll().map(|_| session.progress()),
            Progress::Moving { .. } => session.advance_to_rest(),
            Progress::Question { question_id } => {
                let option = answer(question_id, session);
                session.answer(option)
            }
            Progress::Tile { tile: Tile::Queen } => session.choose_queen_move(queen.choose()),
            Progress::Tile { .. } => session.resolve_tile(),
        };
        step?;
    }
    bail!(
        "session did not finish within {MAX_ACTIONS} actions (cell {})",
        session.position()
    )
}

pub fn expect_finished_at_goal(summary: &SimulationSummary) -> Result<()> {
    if let Some(reason) = &summary.halted {
        bail!("run halted: {reason}");
    }
    ensure!(
        summary.final_state.position == FINAL_CELL,
        "finished at cell {} instead of {FINAL_CELL}",
        summary.final_state.position
    );
    Ok(())
}

pub fn expect_each_question_once(summary: &SimulationSummary) -> Result<()> {
    let expected = &summary.question_ids;
    let answered = &summary.final_state.scorecard.answered;
    ensure!(
        answered == expected,
        "{} of {} questions answered",
        answered.intersection(expected).count(),
        expected.len()
    );
    let unique: BTreeSet<u8> = summary.raised_questions.iter().copied().collect();
    ensure!(
        unique.len() == summary.raised_questions.len(),
        "questions raised more than once: {:?}",
        summary.raised_questions
    );
    ensure!(
        &unique == expected,
        "raised questions {unique:?} do not cover the bank {expected:?}"
    );
    Ok(())
}

pub fn expect_scores_in_range(summary: &SimulationSummary) -> Result<()> {
    for (&subscale, &ceiling) in &summary.score_ceilings {
        let reported = summary.report.get(subscale).reported;
        ensure!(
            reported <= ceiling,
            "{subscale} score {reported} exceeds {ceiling}"
        );
    }
    Ok(())
}

pub fn expect_single_save(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.save_status == SaveStatus::Saved,
        "save returned {:?}",
        summary.save_status
    );
    ensure!(
        summary.repeat_save_status == SaveStatus::AlreadySaved,
        "repeat save returned {:?}",
        summary.repeat_save_status
    );
    ensure!(
        summary.save_calls == 1,
        "store invoked {} times",
        summary.save_calls
    );
    Ok(())
}
