//! Progress events emitted by the run loop.
//!
//! The loop sends [`RunEvent`]s on an optional channel so a long study can be
//! watched from outside the process. [`EventLog`] drains such a channel into a
//! JSON-lines file.

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use rp_types::TrialStage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

use crate::run_loop::RunSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        at: DateTime<Utc>,
        run_id: Uuid,
        prefix: String,
        target_successes: usize,
    },
    TrialSucceeded {
        at: DateTime<Utc>,
        attempt: u64,
        success_index: usize,
        artifact: String,
        elapsed_seconds: f64,
        successes: usize,
        failures: usize,
    },
    TrialFailed {
        at: DateTime<Utc>,
        attempt: u64,
        stage: TrialStage,
        description: String,
        successes: usize,
        failures: usize,
    },
    Finished {
        at: DateTime<Utc>,
        summary: RunSummary,
    },
}

impl RunEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            RunEvent::Started { at, .. }
            | RunEvent::TrialSucceeded { at, .. }
            | RunEvent::TrialFailed { at, .. }
            | RunEvent::Finished { at, .. } => *at,
        }
    }
}

/// Background writer appending one JSON object per event.
pub struct EventLog {
    handle: JoinHandle<io::Result<usize>>,
}

impl EventLog {
    /// Create (truncate) `path` and start draining `events` into it. The
    /// writer stops once every sender has been dropped.
    pub fn spawn(path: &Path, events: Receiver<RunEvent>) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        let handle = thread::spawn(move || -> io::Result<usize> {
            let mut written = 0;
            for event in events {
                serde_json::to_writer(&mut writer, &event)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
                written += 1;
            }
            Ok(written)
        });
        Ok(Self { handle })
    }

    /// Wait for the writer to finish; returns the number of events written.
    pub fn join(self) -> io::Result<usize> {
        self.handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "event log writer panicked"))?
    }
}
