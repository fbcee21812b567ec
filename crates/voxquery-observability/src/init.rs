// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for voxquery
//!
//! Console output always; with the `file-logging` feature, JSON log files in
//! a timestamped run folder with retention cleanup.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LogOutput, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Keeps file writers alive; logs are flushed when this is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).with_context(|| format!("Invalid log filter: {}", filter))
}

/// Initialize the global tracing subscriber
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags raising individual crates to debug
/// * `config` - Base level, format and output destination
///
/// # Errors
/// Fails if the filter is malformed, the log directory can't be created, or a
/// global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&config.level);

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(env_filter(&filter)?)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_filter(env_filter(&filter)?)
            .boxed(),
    };
    layers.push(console_layer);

    let mut guard = LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: Vec::new(),
        log_dir: None,
    };

    if let LogOutput::Files(base_log_dir) = &config.output {
        if let Some(file_layer) = file_output(base_log_dir, &filter, &mut guard)? {
            layers.push(file_layer);
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}

/// JSON file layer writing into a fresh run folder under `base_log_dir`
///
/// Prunes old run folders first. Records the run folder and the writer's
/// guard in `guard`.
#[cfg(feature = "file-logging")]
fn file_output(
    base_log_dir: &Path,
    filter: &str,
    guard: &mut LoggingGuard,
) -> Result<Option<BoxedLayer>> {
    let run_folder = base_log_dir.join(run_folder_name(Utc::now()));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    cleanup_old_logs(base_log_dir, None, None)?;

    let appender = tracing_appender::rolling::daily(&run_folder, "voxquery.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
    guard._file_guards.push(file_guard);
    guard.log_dir = Some(run_folder);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(env_filter(filter)?)
        .boxed();
    Ok(Some(file_layer))
}

/// Without `file-logging` nothing is written, so no run folder is created
#[cfg(not(feature = "file-logging"))]
fn file_output(
    base_log_dir: &Path,
    _filter: &str,
    _guard: &mut LoggingGuard,
) -> Result<Option<BoxedLayer>> {
    eprintln!(
        "Warning: file logging to {} requested but voxquery-observability was built without the `file-logging` feature",
        base_log_dir.display()
    );
    Ok(None)
}

/// Initialize logging from the loaded application config
pub fn init_logging_from_config(
    debug_flags: &CrateDebugFlags,
    config: &voxquery_config::VoxqueryConfig,
) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingConfig::from_config(config))
}

/// Folder name for a logging run, e.g. `run_20250101_120000`
pub fn run_folder_name(started: DateTime<Utc>) -> String {
    format!("{}{}", RUN_PREFIX, started.format(RUN_TIMESTAMP_FORMAT))
}

fn parse_run_folder(dir_name: &str) -> Option<DateTime<Utc>> {
    let timestamp = dir_name.strip_prefix(RUN_PREFIX)?;
    NaiveDateTime::parse_from_str(timestamp, RUN_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Clean up old run directories based on retention policy
///
/// Removes runs older than `retention_days` (default 30), then keeps at most
/// `retention_runs` (default 10) of the remaining ones.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: Option<u64>,
    retention_runs: Option<usize>,
) -> Result<()> {
    if !base_log_dir.exists() {
        return Ok(());
    }

    let retention_days = retention_days.unwrap_or(30);
    let retention_runs = retention_runs.unwrap_or(10);
    let cutoff_date = Utc::now() - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(started) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_run_folder)
        {
            runs.push((path, started));
        }
    }

    // oldest first
    runs.sort_by_key(|(_, started)| *started);

    let (expired, mut kept): (Vec<_>, Vec<_>) =
        runs.into_iter().partition(|(_, started)| *started < cutoff_date);

    let excess = kept.len().saturating_sub(retention_runs);
    let to_remove = expired.into_iter().chain(kept.drain(..excess));

    for (path, _) in to_remove {
        if let Err(e) = std::fs::remove_dir_all(&path) {
            eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_run_folder_name_roundtrip() {
        let started = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let name = run_folder_name(started);
        assert_eq!(name, "run_20250102_030405");
        assert_eq!(parse_run_folder(&name), Some(started));
        assert_eq!(parse_run_folder("not_a_run"), None);
    }

    #[test]
    fn test_cleanup_keeps_most_recent_runs() {
        let dir = tempdir().unwrap();
        let now = Utc::now();
        for minutes in 0..5 {
            let started = now - chrono::Duration::minutes(minutes);
            std::fs::create_dir(dir.path().join(run_folder_name(started))).unwrap();
        }
        std::fs::create_dir(dir.path().join("unrelated")).unwrap();

        cleanup_old_logs(dir.path(), Some(30), Some(2)).unwrap();

        let remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.contains(&"unrelated".to_string()));
        assert!(remaining.contains(&run_folder_name(now)));
    }

    #[test]
    fn test_cleanup_removes_expired_runs() {
        let dir = tempdir().unwrap();
        let old = Utc::now() - chrono::Duration::days(40);
        let old_folder = dir.path().join(run_folder_name(old));
        std::fs::create_dir(&old_folder).unwrap();

        cleanup_old_logs(dir.path(), None, None).unwrap();
        assert!(!old_folder.exists());
    }

    #[cfg(not(feature = "file-logging"))]
    #[test]
    fn test_file_output_without_feature_creates_nothing() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("logs");
        let mut guard = LoggingGuard { log_dir: None };

        let layer = file_output(&base, "info", &mut guard).unwrap();
        assert!(layer.is_none());
        assert!(guard.log_dir().is_none());
        assert!(!base.exists());
    }

    #[cfg(feature = "file-logging")]
    #[test]
    fn test_file_output_creates_run_folder() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("logs");
        let mut guard = LoggingGuard {
            _file_guards: Vec::new(),
            log_dir: None,
        };

        let layer = file_output(&base, "info", &mut guard).unwrap();
        assert!(layer.is_some());
        let run_folder = guard.log_dir().unwrap();
        assert!(run_folder.is_dir());
        assert!(run_folder.starts_with(&base));
    }

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        let dir = tempdir().unwrap();
        assert!(cleanup_old_logs(&dir.path().join("absent"), None, None).is_ok());
    }
}
