//! Integration tests for complete dry runs.
//!
//! Tests the full flow of:
//! - Settings file -> coordinator with dry-run API
//! - Scheduled agents -> event monitor -> run summary
//! - Early shutdown before the time limit

use std::time::Duration;

use swarm_runner::settings::SwarmSettings;
use swarm_runner::swarm::{run_swarm, RunOptions};

const SETTINGS: &str = r#"
[kernel]
cooldown_ms = 0
conflict_window_ms = 0

[[zones]]
id = 1
name = "everything"
x_start = 0
x_end = 499
y_start = 0
y_end = 499

[[agents]]
id = "zen"
name = "Zen"
type = "minimalist_zen"
colors = [0]
min_delay_ms = 1000
max_delay_ms = 1000

[[agents]]
id = "weaver"
name = "Weaver"
type = "pattern_weaver"
colors = [3, 11]
min_delay_ms = 500
max_delay_ms = 500
"#;

fn load_settings(name: &str) -> SwarmSettings {
    let path = std::env::temp_dir().join(format!("swarm-run-{}-{name}.toml", std::process::id()));
    std::fs::write(&path, SETTINGS).unwrap();
    let settings = SwarmSettings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    settings
}

#[tokio::test(start_paused = true)]
async fn test_dry_run_for_fixed_duration() {
    let options = RunOptions {
        dry_run: true,
        duration: Some(Duration::from_millis(5_500)),
        seed: Some(11),
    };
    let summary = run_swarm(load_settings("fixed"), options, std::future::pending())
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.seed, Some(11));
    // Zen ticks at 0, 1000, ..., 5000
    assert_eq!(summary.stats.agents["Zen"].accepted, 6);
    assert_eq!(summary.stats.agents["Zen"].errors, 0);
    // Weaver ticks 12 times; an off-canvas tail of a motif can leave a tick idle
    let weaver = summary.stats.agents["Weaver"].accepted;
    assert!((1..=12).contains(&weaver), "weaver placed {weaver}");
    assert_eq!(summary.total_errors, 0);
    assert_eq!(summary.ledger.granted, summary.total_accepted);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_ends_run_early() {
    let options = RunOptions {
        dry_run: true,
        duration: Some(Duration::from_secs(3_600)),
        seed: Some(1),
    };
    let shutdown = tokio::time::sleep(Duration::from_millis(2_500));
    let summary = run_swarm(load_settings("early"), options, shutdown)
        .await
        .unwrap();

    assert_eq!(summary.stats.agents["Zen"].accepted, 3);
    assert!(summary.duration_ms() < 3_600_000);
}
