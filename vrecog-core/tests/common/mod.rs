//! Shared helpers for integration tests

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
use tempfile::TempDir;

pub fn init_log() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn model_dir(composable: bool) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), composable);
    dir
}

pub fn speaker_dir(min_frames: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let dim = vrecog_core::model::SPEAKER_BANDS * 2;
    std::fs::write(dir.path().join("mean.vec"), vec!["-40.0"; dim].join(" ")).unwrap();

    let rows: Vec<String> = (0..8)
        .map(|r| {
            (0..dim)
                .map(|c| if c % 8 == r { "0.5" } else { "0.0" })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    std::fs::write(dir.path().join("transform.mat"), rows.join("\n")).unwrap();
    std::fs::write(dir.path().join("spk.toml"), format!("min_frames = {}\n", min_frames)).unwrap();
    dir
}

pub fn json(s: &str) -> serde_json::Value {
    serde_json::from_str(s).unwrap_or_else(|e| panic!("invalid JSON {:?}: {}", s, e))
}
