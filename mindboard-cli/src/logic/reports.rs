use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

fn merged<'a>(
    results: &'a [ScenarioResult],
    field: impl Fn(&'a ScenarioResult) -> &'a BTreeMap<String, usize>,
) -> BTreeMap<&'a str, usize> {
    let mut totals = BTreeMap::new();
    for result in results {
        for (key, count) in field(result) {
            *totals.entry(key.as_str()).or_default() += count;
        }
    }
    totals
}

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len().max(1) as f64) * 100.0;
    rate
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total runs: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Mean rolls: {:.1}", result.mean_rolls())?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        for failure in &result.failures {
            writeln!(out, "     • {}", failure.red())?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "♞ Tile Effects".bright_yellow().bold())?;
    for (tile, count) in merged(results, |r| &r.tiles_seen) {
        writeln!(out, "   {tile:8} {count}")?;
    }
    writeln!(out, "{}", "🩺 Severity Distribution".bright_yellow().bold())?;
    for (severity, count) in merged(results, |r| &r.severity_counts) {
        writeln!(out, "   {severity:18} {count}")?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, results: &[ScenarioResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(out: &mut W, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Mindboard Simulation Results\n")?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    writeln!(out, "| Policy | Seed | Passed | Mean rolls |")?;
    writeln!(out, "|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            out,
            "| {} | {} | {} {}/{} | {:.1} |",
            result.scenario_name,
            result.seed,
            status,
            result.successful_iterations,
            result.iterations_run,
            result.mean_rolls()
        )?;
    }

    let failures: Vec<&String> = results.iter().flat_map(|r| &r.failures).collect();
    if !failures.is_empty() {
        writeln!(out, "\n## Failures\n")?;
        for failure in failures {
            writeln!(out, "- {failure}")?;
        }
    }

    writeln!(out, "\n## Severity Distribution\n")?;
    for (severity, count) in merged(results, |r| &r.severity_counts) {
        writeln!(out, "- {severity}: {count}")?;
    }
    Ok(())
}
