use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub rolls: Vec<u32>,
    pub tiles_seen: BTreeMap<String, usize>,
    pub severity_counts: BTreeMap<String, usize>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

impl ScenarioResult {
    #[must_use]
    pub fn mean_rolls(&self) -> f64 {
        if self.rolls.is_empty() {
            return 0.0;
        }
        let total: u64 = self.rolls.iter().map(|&r| u64::from(r)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total as f64 / self.rolls.len() as f64;
        mean
    }
}

pub struct LogicTester {
    tester: GameTester,
}

impl LogicTester {
    pub const fn new(tester: GameTester) -> Self {
        Self { tester }
    }

    pub fn run_scenario(
        &self,
        plan: &SimulationPlan,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.tester.verbose() {
                println!(
                    "🧪 Testing policy: {} (seed: {})",
                    plan.strategy.label().bright_white(),
                    seed
                );
            }

            results.push(self.run_single_scenario(plan, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut rolls = Vec::with_capacity(iterations);
        let mut tiles_seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut severity_counts: BTreeMap<String, usize> = BTreeMap::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = self.tester.run_plan(plan, iteration_seed);
            rolls.push(summary.rolls());
            for (tile, count) in &summary.tiles_seen {
                *tiles_seen.entry(tile.clone()).or_default() += count;
            }
            *severity_counts
                .entry(summary.overall_severity().key().to_string())
                .or_default() += 1;

            if let Some(err) = evaluate_expectations(plan, &summary) {
                failures.push(format!(
                    "Iteration {} (policy {}, seed {}, rolls {}, cell {}): {}",
                    i + 1,
                    summary.strategy.label(),
                    summary.seed,
                    summary.rolls(),
                    summary.final_state.position,
                    err
                ));

                if self.tester.verbose() {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.tester.verbose() {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) rolls:{} severity:{}",
                        i + 1,
                        iterations,
                        summary.rolls(),
                        summary.overall_severity()
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: plan.strategy.label().to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            rolls,
            tiles_seen,
            severity_counts,
            average_duration,
            performance_data,
        }
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| err.to_string())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::AnswerStrategy;
    use mindboard_game::GameConfig;
    use std::sync::Arc;

    fn logic_tester() -> LogicTester {
        LogicTester::new(GameTester::new(Arc::new(GameConfig::default()), false))
    }

    #[test]
    fn runs_one_result_per_seed() {
        let plan = SimulationPlan::standard(AnswerStrategy::Mixed);
        let results = logic_tester().run_scenario(&plan, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
            assert_eq!(result.rolls.len(), 2);
            assert_eq!(result.severity_counts.values().sum::<usize>(), 2);
        }
    }

    #[test]
    fn failed_expectations_are_collected() {
        let plan = SimulationPlan::new(AnswerStrategy::Calm).with_expectation(
            |_: &SimulationSummary| -> anyhow::Result<()> { anyhow::bail!("always fails") },
        );
        let result = &logic_tester().run_scenario(&plan, &[5], 1)[0];
        assert!(!result.passed);
        assert!(result.failures[0].contains("always fails"));
        assert_eq!(result.average_duration, Duration::ZERO);
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Calm".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            rolls: vec![20, 30],
            tiles_seen: BTreeMap::new(),
            severity_counts: BTreeMap::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["average_duration"], 12);
        assert!((result.mean_rolls() - 25.0).abs() < f64::EPSILON);
    }
}
