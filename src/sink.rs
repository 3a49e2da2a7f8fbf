//! Result delivery.
//!
//! Collectors hand every pass outcome to a [`ResultSink`]; persistence is a
//! collaborator behind this trait, not part of the collection core. Sinks
//! must tolerate concurrent delivery from multiple devices and tiers.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::collector::{CollectionResult, PassError};

/// Errors from sink construction or writes.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Consumer of collection pass outcomes.
///
/// `Ok` carries a full [`CollectionResult`]; `Err` is delivered only when
/// session acquisition for a pass failed. Per-group failures never arrive
/// here as errors; they are folded into the result's summary.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync + 'static {
    async fn deliver(&self, outcome: Result<CollectionResult, PassError>);
}

// =============================================================================
// Channel sink
// =============================================================================

/// Sink forwarding outcomes over an unbounded channel.
///
/// The embedding side holds the receiver; used by tests and by callers that
/// run their own persistence task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Result<CollectionResult, PassError>>,
}

impl ChannelSink {
    /// Create the sink and its receiving end.
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<Result<CollectionResult, PassError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait::async_trait]
impl ResultSink for ChannelSink {
    async fn deliver(&self, outcome: Result<CollectionResult, PassError>) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!("result receiver dropped, outcome discarded");
        }
    }
}

// =============================================================================
// JSON-lines sink
// =============================================================================

/// Record appended for a pass whose session could not be opened.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureRecord<'a> {
    device_id: &'a str,
    tier: &'a str,
    ts: chrono::DateTime<Utc>,
    error: String,
}

/// Append-only JSON-lines history file.
///
/// One line per outcome; the time-series log consumed by reporting lives
/// outside this crate and reads this format.
pub struct JsonlSink {
    file: tokio::sync::Mutex<File>,
    path: PathBuf,
}

impl JsonlSink {
    /// Open (or create) the history file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append_line(&self, line: String) -> Result<(), SinkError> {
        let mut file = self.file.lock().await;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResultSink for JsonlSink {
    async fn deliver(&self, outcome: Result<CollectionResult, PassError>) {
        let line = match &outcome {
            Ok(result) => serde_json::to_string(result),
            Err(err) => serde_json::to_string(&FailureRecord {
                device_id: &err.device_id,
                tier: err.tier.as_str(),
                ts: Utc::now(),
                error: err.to_string(),
            }),
        };

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outcome");
                return;
            }
        };

        if let Err(e) = self.append_line(line).await {
            tracing::error!(path = %self.path.display(), error = %e, "history append failed");
        }
    }
}
