//! Interactive terminal session over the game engine.
use anyhow::{Result, bail};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::str::FromStr;

use mindboard_game::chat::APOLOGY;
use mindboard_game::{
    Board, GameEngine, GameSession, PieceKind, Progress, QueenMove, RollOutcome, SaveStatus,
    SessionEvent, SessionState, Subscale, TextGenerator, Tile, UserId,
};

use crate::store::JsonlScoreStore;

pub type PlayEngine = GameEngine<JsonlScoreStore, Option<UserId>>;

const HELP: &str = "\
Commands:
  start                  begin a new game
  roll                   roll the die and move
  answer <1-4>           answer the current question
  queen diagonal|forward choose the queen's move
  status                 show position and phase
  board                  print the board
  reset                  abandon progress and return to the start screen
  help                   show this list
  exit                   quit (asks for confirmation)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Roll,
    /// Zero-based option index.
    Answer(u8),
    Queen(QueenMove),
    Status,
    Board,
    Reset,
    Help,
    Exit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            bail!("empty command");
        };
        let arg = words.next();
        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("start", None) => Self::Start,
            ("roll" | "r", None) => Self::Roll,
            ("answer" | "a", Some(raw)) => match raw.parse::<u8>() {
                Ok(choice @ 1..=4) => Self::Answer(choice - 1),
                _ => bail!("answer takes an option number from 1 to 4"),
            },
            ("queen" | "q", Some(raw)) => match raw.to_ascii_lowercase().as_str() {
                "diagonal" | "d" => Self::Queen(QueenMove::Diagonal),
                "forward" | "f" => Self::Queen(QueenMove::Forward),
                _ => bail!("queen takes 'diagonal' or 'forward'"),
            },
            ("status", None) => Self::Status,
            ("board", None) => Self::Board,
            ("reset", None) => Self::Reset,
            ("help" | "?", None) => Self::Help,
            ("exit" | "quit", None) => Self::Exit,
            _ => bail!("unknown command '{}' (type 'help')", line.trim()),
        };
        if words.next().is_some() {
            bail!("too many arguments in '{}'", line.trim());
        }
        Ok(command)
    }
}

/// What happened by the time input ran out or the player left.
#[derive(Debug, Clone)]
pub struct PlaySummary {
    pub state: Option<SessionState>,
    pub save_status: Option<SaveStatus>,
    pub chat_turns: usize,
}

pub struct Repl<W, G> {
    engine: PlayEngine,
    seed: u64,
    session: Option<GameSession>,
    out: W,
    generator: Option<G>,
    save_status: Option<SaveStatus>,
    chat_turns: usize,
}

impl<W, G> Repl<W, G>
where
    W: Write,
    G: TextGenerator,
{
    pub const fn new(engine: PlayEngine, seed: u64, out: W, generator: Option<G>) -> Self {
        Self {
            engine,
            seed,
            session: None,
            out,
            generator,
            save_status: None,
            chat_turns: 0,
        }
    }

    /// Read commands until EOF or a confirmed exit.
    pub fn run<R: BufRead>(mut self, input: R) -> Result<PlaySummary> {
        writeln!(
            self.out,
            "{}",
            "♔ Mindboard: a chess-board check-in".bright_cyan().bold()
        )?;
        writeln!(self.out, "Type 'start' to begin or 'help' for commands.")?;

        let mut lines = input.lines();
        while let Some(line) = lines.next() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(err) => {
                    writeln!(self.out, "{} {err}", "⚠".yellow())?;
                    continue;
                }
            };
            if command == Command::Exit {
                if self.confirm_exit(&mut lines)? {
                    break;
                }
                continue;
            }
            self.dispatch(command)?;

            let finished_now = self.session.as_ref().is_some_and(GameSession::is_finished)
                && self.save_status.is_none();
            if finished_now {
                self.finish()?;
                if self.generator.is_some() {
                    self.chat(&mut lines)?;
                    break;
                }
            }
        }

        self.out.flush()?;
        Ok(PlaySummary {
            state: self.session.map(GameSession::into_state),
            save_status: self.save_status,
            chat_turns: self.chat_turns,
        })
    }

    fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Start => self.start()?,
            Command::Board => self.print_board()?,
            Command::Status => self.print_status()?,
            Command::Reset => {
                if let Some(session) = self.session.as_mut() {
                    session.reset();
                    self.save_status = None;
                    writeln!(self.out, "Progress cleared. Type 'start' to play again.")?;
                } else {
                    writeln!(self.out, "Nothing to reset.")?;
                }
            }
            Command::Roll | Command::Answer(_) | Command::Queen(_) => {
                let Some(session) = self.session.as_mut() else {
                    writeln!(self.out, "{} type 'start' first", "⚠".yellow())?;
                    return Ok(());
                };
                let result = match command {
                    Command::Roll => session.roll().map(|outcome| {
                        describe_roll(outcome, session.position())
                    }),
                    Command::Answer(option) => session.answer(option).map(|_| String::new()),
                    Command::Queen(choice) => {
                        session.choose_queen_move(choice).map(|_| String::new())
                    }
                    _ => Ok(String::new()),
                };
                match result {
                    Ok(message) => {
                        if !message.is_empty() {
                            writeln!(self.out, "{message}")?;
                        }
                        self.settle()?;
                    }
                    Err(err) => writeln!(self.out, "{} {err}", "⚠".yellow())?,
                }
            }
            Command::Exit => {}
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => {
                if let Err(err) = session.start() {
                    writeln!(self.out, "{} {err}", "⚠".yellow())?;
                    return Ok(());
                }
            }
            None => {
                self.session = Some(self.engine.create_session(self.seed)?);
            }
        }
        writeln!(
            self.out,
            "{} Your pawn is on cell 1. Reach 100 to finish.",
            "▶".green()
        )?;
        Ok(())
    }

    /// Step through movement and forced tiles until the player has to act.
    fn settle(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        loop {
            match session.progress() {
                Progress::Moving { .. } => {
                    session.advance_to_rest()?;
                }
                Progress::Tile { tile: Tile::Queen } => {
                    writeln!(
                        self.out,
                        "♕ Queen on cell {}: 'queen diagonal' or 'queen forward'?",
                        session.position()
                    )?;
                    return Ok(());
                }
                Progress::Tile { .. } => {
                    session.resolve_tile()?;
                    if let Some(SessionEvent::TileResolved { tile, from, to }) =
                        session.events().last()
                    {
                        let line = match to {
                            Some(to) => format!("{tile} on {from} sends you to {to}"),
                            None => format!("{tile} on {from} has nowhere to go"),
                        };
                        writeln!(self.out, "{}", line.magenta())?;
                    }
                }
                Progress::Question { .. } => {
                    if let Some(question) = session.pending_question() {
                        writeln!(self.out)?;
                        if !question.fun_fact.is_empty() {
                            writeln!(self.out, "💡 {}", question.fun_fact.italic())?;
                        }
                        writeln!(self.out, "{}", question.prompt.bold())?;
                        for (index, option) in question.options.iter().enumerate() {
                            writeln!(self.out, "  {}. {} {}", index + 1, option.emoji, option.text)?;
                        }
                    }
                    return Ok(());
                }
                Progress::AwaitingRoll => {
                    writeln!(self.out, "You are on cell {}.", session.position())?;
                    return Ok(());
                }
                Progress::Idle | Progress::Finished => return Ok(()),
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let report = session.assessment();
        writeln!(self.out)?;
        writeln!(self.out, "{}", "♔ Assessment complete".bright_green().bold())?;
        for subscale in Subscale::ALL {
            let result = report.get(subscale);
            writeln!(
                self.out,
                "  {:<11} {:>2}  {}",
                subscale_title(subscale),
                result.reported,
                result.severity.label()
            )?;
        }
        writeln!(
            self.out,
            "  Overall     {}",
            report.overall_severity().label().bold()
        )?;

        let status = self.engine.save_scores(session);
        let message = match &status {
            SaveStatus::Saved => format!(
                "Scores saved to {}",
                self.engine.store().path().display()
            )
            .green()
            .to_string(),
            SaveStatus::NoUser => "Not signed in; scores were not saved (use --user)"
                .yellow()
                .to_string(),
            SaveStatus::Failed(reason) => format!("Could not save scores: {reason}")
                .red()
                .to_string(),
            SaveStatus::AlreadySaved | SaveStatus::NotFinished => String::new(),
        };
        if !message.is_empty() {
            writeln!(self.out, "{message}")?;
        }
        self.save_status = Some(status);
        Ok(())
    }

    fn chat<I>(&mut self, lines: &mut I) -> Result<()>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let (Some(session), Some(generator)) = (self.session.as_ref(), self.generator.as_mut())
        else {
            return Ok(());
        };
        let Some(mut conversation) = self.engine.conversation(session) else {
            return Ok(());
        };
        writeln!(self.out)?;
        writeln!(self.out, "{}", conversation.greeting().cyan())?;
        writeln!(self.out, "(type 'bye' to leave)")?;

        for line in lines.by_ref() {
            let line = line?;
            if line.trim().eq_ignore_ascii_case("bye") {
                break;
            }
            let out = &mut self.out;
            let mut streamed = Ok(());
            let sent = conversation.send(&line, generator, &mut |delta| {
                if streamed.is_ok() {
                    streamed = write!(out, "{delta}");
                }
            });
            streamed?;
            match sent {
                Ok(Some(_)) => {
                    self.chat_turns += 1;
                    writeln!(self.out)?;
                }
                Ok(None) => {}
                Err(_) => writeln!(self.out, "\n{}", APOLOGY.red())?,
            }
        }
        writeln!(self.out, "Take care. 🙏")?;
        Ok(())
    }

    fn confirm_exit<I>(&mut self, lines: &mut I) -> Result<bool>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let in_progress = self
            .session
            .as_ref()
            .is_some_and(|session| !session.is_finished() && session.position() > 1);
        if !in_progress {
            return Ok(true);
        }
        writeln!(self.out, "Leave the game? Your progress will be lost. (y/n)")?;
        self.out.flush()?;
        match lines.next() {
            Some(answer) => Ok(matches!(
                answer?.trim().to_ascii_lowercase().as_str(),
                "y" | "yes"
            )),
            None => Ok(true),
        }
    }

    fn print_status(&mut self) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            writeln!(self.out, "No game in progress.")?;
            return Ok(());
        };
        let state = session.state();
        writeln!(
            self.out,
            "cell {} | phase {} | rolls {} | last roll {} | answered {}/{}",
            state.position,
            state.phase.name(),
            state.rolls,
            state
                .last_roll
                .map_or_else(|| "-".to_string(), |roll| roll.to_string()),
            state.scorecard.answered.len(),
            session.config().questions.len()
        )?;
        Ok(())
    }

    fn print_board(&mut self) -> Result<()> {
        let board = &self.engine.config().board;
        let position = self.session.as_ref().map(GameSession::position);
        for row in Board::render_rows() {
            let rendered: Vec<String> = row
                .iter()
                .map(|&cell| render_cell(board, cell, position))
                .collect();
            writeln!(self.out, "{}", rendered.join(" "))?;
        }
        Ok(())
    }
}

fn render_cell(board: &Board, cell: u8, position: Option<u8>) -> String {
    if position == Some(cell) {
        return format!("[{}]", PieceKind::Pawn.default_symbol());
    }
    match board.piece_at(cell) {
        Some(piece) if piece.kind != PieceKind::Pawn => format!(" {} ", piece.symbol()),
        _ => format!("{cell:>3}"),
    }
}

fn describe_roll(outcome: RollOutcome, position: u8) -> String {
    match outcome {
        RollOutcome::Moving { value, target } => format!("🎲 {value}: heading to {target}"),
        RollOutcome::Overshoot { value } => {
            format!("🎲 {value}: too far, you stay on {position}")
        }
    }
}

const fn subscale_title(subscale: Subscale) -> &'static str {
    match subscale {
        Subscale::Stress => "Stress",
        Subscale::Anxiety => "Anxiety",
        Subscale::Depression => "Depression",
    }
}
