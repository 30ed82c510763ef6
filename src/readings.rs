//! Live device readings.
//!
//! Readings come from an external measurement process. The crate only sees
//! the [`ReadingSource`] trait; [`CommandReadingSource`] runs a command that
//! prints one JSON object of `name -> value` pairs on stdout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ReadingsConfig;

/// Key the measurement process uses for its own sample label.
const TIMESTAMP_KEY: &str = "timestamp";

/// One live value, e.g. `bess_SoC = 54.2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub value: f64,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ReadingsError {
    #[error("failed to start measurement process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("measurement process timed out after {0:?}")]
    Timeout(Duration),

    #[error("measurement process exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("measurement process returned no data")]
    Empty,

    #[error("measurement output is not a JSON object: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch_live_readings(&self) -> Result<Vec<Reading>, ReadingsError>;
}

/// Runs an external command per fetch and parses its stdout.
#[derive(Debug, Clone)]
pub struct CommandReadingSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandReadingSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(cfg: &ReadingsConfig) -> Self {
        Self::new(
            cfg.program.clone(),
            cfg.args.clone(),
            Duration::from_secs(cfg.timeout_seconds.max(1)),
        )
    }
}

#[async_trait]
impl ReadingSource for CommandReadingSource {
    async fn fetch_live_readings(&self) -> Result<Vec<Reading>, ReadingsError> {
        debug!(program = %self.program, "running measurement process");

        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| ReadingsError::Timeout(self.timeout))?
            .map_err(ReadingsError::Spawn)?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ReadingsError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!(stderr = %stderr, "measurement process wrote to stderr");
        }

        parse_readings(&String::from_utf8_lossy(&output.stdout), Utc::now())
    }
}

/// Parse measurement output into readings sorted by name.
///
/// Non-numeric members and the process's own timestamp label are skipped.
pub fn parse_readings(stdout: &str, captured_at: DateTime<Utc>) -> Result<Vec<Reading>, ReadingsError> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(ReadingsError::Empty);
    }

    let members: Map<String, Value> = serde_json::from_str(stdout)?;
    let readings = members
        .into_iter()
        .filter(|(name, _)| name != TIMESTAMP_KEY)
        .filter_map(|(name, value)| match value.as_f64() {
            Some(value) => Some(Reading {
                name,
                value,
                captured_at,
            }),
            None => {
                debug!(name = %name, "skipping non-numeric reading");
                None
            }
        })
        .collect();

    Ok(readings)
}
