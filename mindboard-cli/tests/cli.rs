use std::io::Write;
use std::process::{Command, Stdio};

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "mindboard-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_simulation_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_mindboard");
    let output_path = temp_path("sim.json");
    let output = Command::new(exe)
        .args([
            "--mode",
            "simulate",
            "--report",
            "json",
            "--seeds",
            "1,2",
            "--iterations",
            "2",
            "--policy",
            "random",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Mindboard Simulator"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let results: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let results = results.as_array().expect("array of results");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_simulation_writes_markdown_report() {
    let exe = env!("CARGO_BIN_EXE_mindboard");
    let output_path = temp_path("sim.md");
    let status = Command::new(exe)
        .args([
            "--mode",
            "simulate",
            "--report",
            "markdown",
            "--iterations",
            "1",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("# Mindboard Simulation Results"));
}

#[test]
fn cli_rejects_invalid_config() {
    let exe = env!("CARGO_BIN_EXE_mindboard");
    let config_path = temp_path("bad-config.json");
    std::fs::write(&config_path, r#"{ "questions": { "questions": [] } }"#).expect("write config");
    let output = Command::new(exe)
        .args(["--mode", "simulate", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
}

#[test]
fn cli_simulation_accepts_a_custom_bank() {
    let exe = env!("CARGO_BIN_EXE_mindboard");
    let config_path = temp_path("small-bank.json");
    let output_path = temp_path("small-bank-report.json");
    std::fs::write(
        &config_path,
        r#"{ "questions": { "questions": [
            { "id": 1, "position": 12, "subscale": "stress", "prompt": "Tense?" },
            { "id": 2, "position": 50, "subscale": "anxiety", "prompt": "Worried?" }
        ] } }"#,
    )
    .expect("write config");
    let output = Command::new(exe)
        .args(["--mode", "simulate", "--policy", "distressed", "--report", "json"])
        .args(["--seeds", "3,4", "--iterations", "2", "--config"])
        .arg(&config_path)
        .arg("--output")
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stdout)
    );
    let content = std::fs::read_to_string(output_path).expect("read output");
    let results: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let results = results.as_array().expect("array of results");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_play_mode_saves_scores() {
    let exe = env!("CARGO_BIN_EXE_mindboard");
    let scores_path = temp_path("scores.jsonl");
    let mut child = Command::new(exe)
        .args(["--mode", "play", "--seed", "5", "--user", "cli-player", "--scores-file"])
        .arg(&scores_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn cli");

    let script = format!("start\n{}", "roll\nanswer 4\nqueen diagonal\n".repeat(400));
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(script.as_bytes())
        .expect("write script");
    let output = child.wait_with_output().expect("wait cli");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Assessment complete"));
    let saved = std::fs::read_to_string(scores_path).expect("scores file");
    assert_eq!(saved.lines().count(), 1);
    let row: serde_json::Value = serde_json::from_str(saved.trim()).expect("score line");
    assert_eq!(row["user_id"], "cli-player");
    assert_eq!(row["stress_score"], 42);
}
