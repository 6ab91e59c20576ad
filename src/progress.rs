//! Index and resync progress reporting.
//!
//! Progress is an event stream, separate from the durable status the
//! pipeline writes to the `connections` row: the row is what other
//! readers poll, events are what the person running the command watches.
//! Events go to **stderr** so stdout remains parseable for scripts.

use serde::Serialize;
use std::io::Write;

use crate::models::ConnectionStatus;

/// A single progress event for an index or resync run.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IndexProgressEvent {
    StatusChanged {
        connection_id: String,
        status: ConnectionStatus,
    },
    /// Tree listed and filtered.
    Listed { eligible: u64, total: u64 },
    BatchCompleted {
        batch: u64,
        batches: u64,
        module_count: u64,
    },
    Summarizing { pending: u64 },
    Synthesizing { modules: u64 },
    Finished { module_count: u64 },
    Failed { message: String },
}

/// Receives progress events. Called from the pipeline after the matching
/// durable write, never instead of it.
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexProgressEvent);
}

/// Human-friendly progress on stderr: "index  batch 2 / 9  (10 modules)".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = match &event {
            IndexProgressEvent::StatusChanged {
                connection_id,
                status,
            } => format!("index {}  {}\n", connection_id, status),
            IndexProgressEvent::Listed { eligible, total } => format!(
                "index  listed {} files, {} eligible\n",
                format_number(*total),
                format_number(*eligible)
            ),
            IndexProgressEvent::BatchCompleted {
                batch,
                batches,
                module_count,
            } => format!(
                "index  batch {} / {}  ({} modules)\n",
                batch,
                batches,
                format_number(*module_count)
            ),
            IndexProgressEvent::Summarizing { pending } => {
                format!("index  summarizing {} modules\n", format_number(*pending))
            }
            IndexProgressEvent::Synthesizing { modules } => format!(
                "index  synthesizing architecture from {} summaries\n",
                format_number(*modules)
            ),
            IndexProgressEvent::Finished { module_count } => {
                format!("index  done  {} modules\n", format_number(*module_count))
            }
            IndexProgressEvent::Failed { message } => format!("index  failed: {}\n", message),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> std::sync::Arc<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => std::sync::Arc::new(NoProgress),
            ProgressMode::Human => std::sync::Arc::new(StderrProgress),
            ProgressMode::Json => std::sync::Arc::new(JsonProgress),
        }
    }
}
