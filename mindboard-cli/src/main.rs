mod common;
mod logic;
mod play;
mod replay;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdin, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use common::{load_config, split_csv};
use logic::{AnswerStrategy, GameTester, LogicTester, SimulationPlan, resolve_seed_inputs};
use mindboard_game::{GameEngine, UserId};
use play::Repl;
use replay::ReplayGenerator;
use store::JsonlScoreStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Interactive game on the terminal
    Play,
    /// Automated playthroughs with answering policies
    Simulate,
}

#[derive(Debug, Parser)]
#[command(name = "mindboard", version = "0.1.0")]
#[command(
    about = "Chess-board self-assessment game: play interactively or run automated simulations"
)]
struct Args {
    /// Run mode: play (interactive) or simulate (automated QA)
    #[arg(long, value_enum, default_value_t = RunMode::Play)]
    mode: RunMode,

    /// Seeds to simulate (comma-separated; decimal, negative or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Dice seed for play mode (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of games per seed (simulate mode only)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Answering policy for simulated games
    #[arg(long, value_enum, default_value_t = AnswerStrategy::Mixed)]
    policy: AnswerStrategy,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file overriding the board, question bank or severity table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Player identifier used when saving scores
    #[arg(long)]
    user: Option<String>,

    /// JSON-lines file that receives saved scores
    #[arg(long, default_value = "mindboard-scores.jsonl")]
    scores_file: PathBuf,

    /// Recorded `data:` stream replayed as the chat companion's replies
    #[arg(long)]
    chat_replay: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.mode {
        RunMode::Play => run_play(&args),
        RunMode::Simulate => {
            announce_banner();
            let start_time = Instant::now();
            let results = run_simulation(&args)?;
            write_reports(&args, &results, start_time)?;
            if results.iter().any(|r| !r.passed) {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn announce_banner() {
    println!("{}", "♞ Mindboard Simulator".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn run_play(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("starting interactive game with seed {seed}");

    let engine = GameEngine::new(
        config,
        JsonlScoreStore::new(&args.scores_file),
        args.user.as_deref().map(UserId::new),
    );
    let generator = args
        .chat_replay
        .as_deref()
        .map(ReplayGenerator::load)
        .transpose()?;
    if let Some(generator) = &generator {
        log::debug!("loaded {} recorded chat replies", generator.remaining());
    }

    let summary = Repl::new(engine, seed, stdout().lock(), generator).run(stdin().lock())?;
    log::debug!(
        "play ended at cell {} (save: {:?}, chat turns: {})",
        summary.state.as_ref().map_or(0, |state| state.position),
        summary.save_status,
        summary.chat_turns
    );
    Ok(())
}

fn run_simulation(args: &Args) -> Result<Vec<logic::ScenarioResult>> {
    let config = Arc::new(load_config(args.config.as_deref())?);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let game_tester = GameTester::new(config, args.verbose);

    println!("{}", "🧠 Running Simulations".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let plan = SimulationPlan::standard(args.policy);
    let logic_tester = LogicTester::new(game_tester);
    Ok(logic_tester.run_scenario(&plan, &seeds, args.iterations))
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Mindboard Simulation Results\n\n_No simulations executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No simulations executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            mode: RunMode::Simulate,
            seeds: "1337".to_string(),
            seed: None,
            iterations: 1,
            policy: AnswerStrategy::Mixed,
            report: "json".to_string(),
            verbose: false,
            output: None,
            config: None,
            user: None,
            scores_file: PathBuf::from("mindboard-scores.jsonl"),
            chat_replay: None,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "mindboard-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Mixed".to_string(),
            seed: 7,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            rolls: vec![30, 34, 41],
            tiles_seen: BTreeMap::from([("knight".to_string(), 4)]),
            severity_counts: BTreeMap::from([("moderate".to_string(), 3)]),
            average_duration: Duration::from_millis(10),
            performance_data: vec![Duration::from_millis(10)],
        }
    }

    #[test]
    fn args_parse_simulation_flags() {
        let args = Args::try_parse_from([
            "mindboard",
            "--mode",
            "simulate",
            "--seeds",
            "1,2",
            "--policy",
            "distressed",
            "--report",
            "markdown",
        ])
        .unwrap();
        assert_eq!(args.mode, RunMode::Simulate);
        assert_eq!(args.policy, AnswerStrategy::Distressed);
        assert_eq!(args.report, "markdown");
        assert_eq!(args.scores_file, PathBuf::from("mindboard-scores.jsonl"));
    }

    #[test]
    fn args_reject_unknown_report() {
        assert!(Args::try_parse_from(["mindboard", "--report", "csv"]).is_err());
    }

    #[test]
    fn run_simulation_covers_every_seed() {
        let args = Args {
            seeds: "1,2,0x10".to_string(),
            iterations: 2,
            ..base_args()
        };
        let results = run_simulation(&args).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert_eq!(results[2].seed, 16);
    }

    #[test]
    fn run_simulation_rejects_missing_config() {
        let args = Args {
            config: Some(temp_path("missing-config")),
            ..base_args()
        };
        assert!(run_simulation(&args).is_err());
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = temp_path("empty.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("[]"));
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_path("full.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("scenario_name"));
        assert!(content.contains("severity_counts"));
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_path("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No simulations executed"));
    }

    #[test]
    fn write_reports_emits_markdown_report() {
        let temp = temp_path("full.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("# Mindboard Simulation Results"));
        assert!(content.contains("Mixed"));
    }

    #[test]
    fn write_reports_emits_console_report() {
        let temp = temp_path("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Simulation Results Summary"));
        assert!(content.contains("knight"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
