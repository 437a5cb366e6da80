use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "aura-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn run(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aura-cli"))
        .arg("--store")
        .arg(store)
        .args(args)
        .output()
        .expect("run cli")
}

#[test]
fn cli_play_writes_json_report_and_persists_progress() {
    let store = temp_path("play-store.json");
    let report = temp_path("play-report.json");
    let output = Command::new(env!("CARGO_BIN_EXE_aura-cli"))
        .arg("--store")
        .arg(&store)
        .args(["--seed", "7", "--output"])
        .arg(&report)
        .args([
            "play",
            "--runs",
            "2",
            "--policy",
            "safe",
            "--max-decisions",
            "4",
            "--report",
            "json",
        ])
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let content = std::fs::read_to_string(&report).expect("read report");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let runs = value["runs"].as_array().expect("runs array");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["outcome"]["reason"], "CASHED OUT");
    assert_eq!(runs[0]["decisions"].as_array().map(Vec::len), Some(4));
    assert_eq!(value["summary"]["runs"], 2);

    let saved = std::fs::read_to_string(&store).expect("read store");
    let saved: serde_json::Value = serde_json::from_str(&saved).expect("store json");
    let stats: serde_json::Value =
        serde_json::from_str(saved["aura_game_stats"].as_str().expect("stats entry"))
            .expect("stats json");
    assert_eq!(stats["totalGamesPlayed"], 2);
    assert_eq!(stats["totalDecisions"], 8);

    let _ = std::fs::remove_file(store);
    let _ = std::fs::remove_file(report);
}

#[test]
fn cli_share_prints_summary_and_feedback() {
    let store = temp_path("share.json");
    let output = run(&store, &["share"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.starts_with("±AURA STATS"));
    assert!(stdout.contains("Current Rank: NPC"));
    assert!(stderr.contains("STATS COPIED!"));
    let _ = std::fs::remove_file(store);
}

#[test]
fn cli_stats_and_challenges_list_progress() {
    let store = temp_path("stats.json");
    let stats = run(&store, &["stats"]);
    assert!(stats.status.success());
    let stdout = String::from_utf8_lossy(&stats.stdout);
    assert!(stdout.contains("Games played: 0"));
    assert!(stdout.contains("FIRST BLOOD"));

    let challenges = run(&store, &["challenges"]);
    assert!(challenges.status.success());
    let stdout = String::from_utf8_lossy(&challenges.stdout);
    assert_eq!(stdout.lines().filter(|l| l.ends_with(" Aura")).count(), 3);
    let _ = std::fs::remove_file(store);
}

#[test]
fn cli_reset_clears_saved_games() {
    let store = temp_path("reset.json");
    let played = run(
        &store,
        &[
            "--seed",
            "1",
            "play",
            "--max-decisions",
            "2",
            "--report",
            "markdown",
        ],
    );
    assert!(played.status.success());
    assert!(String::from_utf8_lossy(&played.stdout).contains("| 1 | Safe |"));

    let reset = run(&store, &["reset"]);
    assert!(reset.status.success());
    assert!(String::from_utf8_lossy(&reset.stdout).contains("Progress reset"));

    let stats = run(&store, &["stats"]);
    assert!(String::from_utf8_lossy(&stats.stdout).contains("Games played: 0"));
    let _ = std::fs::remove_file(store);
}

#[test]
fn cli_rejects_unknown_policy() {
    let store = temp_path("bad.json");
    let output = run(&store, &["play", "--policy", "yolo"]);
    assert!(!output.status.success());
    assert!(!store.exists());
}
