//! This module configures `tracing_subscriber` to write to a log file and optionally to standard
//! output.
use std::collections::HashSet;

use anyhow::anyhow;
use serde::Deserialize;
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::from_env::optional_var;
use crate::from_env::FromEnvError;

const TRACING_MODE_VAR: &str = "ATLASPACK_TRACING_MODE";

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum TracerMode {
  /// Output the Tracer logs to Stdout
  Stdout,
  /// Only write the rolling log file, which is always enabled
  File,
}

impl TracerMode {
  pub fn from_env() -> Result<Vec<Self>, FromEnvError> {
    let Some(mode) = optional_var(TRACING_MODE_VAR) else {
      return Ok(vec![]);
    };

    let mut tracer_modes = vec![];
    let mut used_modes = HashSet::new();

    for mode in mode.split(',').map(|s| s.trim()) {
      let tracer_mode = match mode {
        "stdout" => Self::Stdout,
        "file" => Self::File,
        value => {
          return Err(FromEnvError::InvalidKey(
            String::from(TRACING_MODE_VAR),
            anyhow!("Invalid value: {}", value),
          ))
        }
      };

      if used_modes.insert(mode) {
        tracer_modes.push(tracer_mode);
      }
    }

    Ok(tracer_modes)
  }
}

pub struct Tracer {
  #[allow(unused)]
  worker_guards: Vec<WorkerGuard>,
}

impl Tracer {
  pub fn new(options: &[TracerMode]) -> anyhow::Result<Self> {
    let mut worker_guards = vec![];

    // We will always write tracing to the log file
    let directory = std::env::temp_dir().join("atlaspack_trace");
    let file_appender = tracing_appender::rolling::Builder::new()
      .rotation(tracing_appender::rolling::Rotation::HOURLY)
      .max_log_files(4)
      .filename_prefix("atlaspack-tracing")
      .build(&directory)
      .map_err(|err| anyhow!(err))?;
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);

    let layer = tracing_subscriber::fmt::layer()
      .with_writer(non_blocking)
      .with_span_events(FmtSpan::CLOSE)
      .with_filter(EnvFilter::from_default_env());

    worker_guards.push(worker_guard);

    let stdout_layer = if options.contains(&TracerMode::Stdout) {
      let (non_blocking, worker_guard) = tracing_appender::non_blocking(std::io::stdout());
      let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(EnvFilter::from_default_env());

      worker_guards.push(worker_guard);

      Some(stdout_layer)
    } else {
      None
    };

    let subscriber = Registry::default().with(layer).with(stdout_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Self { worker_guards })
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

  #[test]
  fn test_tracing_options_sets_to_none_if_no_mode_is_set() {
    let _guard = TEST_LOCK.lock();
    std::env::remove_var(TRACING_MODE_VAR);
    let options = TracerMode::from_env().unwrap();
    assert!(options.is_empty());
  }

  #[test]
  fn test_tracing_options_deduplicates_modes() {
    let _guard = TEST_LOCK.lock();
    std::env::set_var(TRACING_MODE_VAR, "stdout, file,stdout");
    let options = TracerMode::from_env().unwrap();
    std::env::remove_var(TRACING_MODE_VAR);
    assert_eq!(options, vec![TracerMode::Stdout, TracerMode::File]);
  }

  #[test]
  fn test_tracing_options_rejects_unknown_modes() {
    let _guard = TEST_LOCK.lock();
    std::env::set_var(TRACING_MODE_VAR, "stdout,chrome");
    let result = TracerMode::from_env();
    std::env::remove_var(TRACING_MODE_VAR);
    assert!(matches!(result, Err(FromEnvError::InvalidKey(key, _)) if key == TRACING_MODE_VAR));
  }
}
