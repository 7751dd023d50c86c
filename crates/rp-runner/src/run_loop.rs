//! The success/failure-bounded retry loop.

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use rp_models::DatasetSource;
use rp_optimizer::Optimizer;
use rp_types::{PersistenceError, RpResult, RunConfig, TrialFailure, TrialOutcome, TrialStage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::RunEvent;
use crate::executor::{contain, ReplicateExecutor};
use crate::sink::{artifact_file_name, create_json_atomic, summary_file_name, ArtifactSink};

/// Success and failure tallies. Only the run loop mutates them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    successes: usize,
    failures: usize,
}

impl RunCounters {
    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn attempts(&self) -> usize {
        self.successes + self.failures
    }

    /// The failure budget equals the success target.
    pub fn should_continue(&self, target: usize) -> bool {
        self.successes < target && self.failures < target
    }

    /// Index the next successful trial will be stored under (1-based).
    pub fn next_success_index(&self) -> usize {
        self.successes + 1
    }

    fn record_success(&mut self) {
        self.successes += 1;
    }

    fn record_failure(&mut self) {
        self.failures += 1;
    }
}

/// How a run ended. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndState {
    Completed,
    BudgetExhausted,
}

/// Final accounting of a run, also persisted next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub prefix: String,
    pub config: RunConfig,
    pub state: RunEndState,
    pub target_successes: usize,
    pub successes: usize,
    pub failures: usize,
    pub attempts: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    /// Artifact file names in success order.
    pub artifacts: Vec<String>,
}

impl RunSummary {
    pub fn target_reached(&self) -> bool {
        self.state == RunEndState::Completed
    }
}

/// Drives trials until the success target or the failure budget is reached.
pub struct Runner<'a> {
    config: &'a RunConfig,
    executor: ReplicateExecutor<'a>,
    sink: &'a dyn ArtifactSink,
    events: Option<Sender<RunEvent>>,
    write_summary: bool,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: &'a RunConfig,
        source: &'a dyn DatasetSource,
        optimizer: &'a dyn Optimizer,
        sink: &'a dyn ArtifactSink,
    ) -> Self {
        Self {
            config,
            executor: ReplicateExecutor::new(source, optimizer),
            sink,
            events: None,
            write_summary: true,
        }
    }

    /// Publish progress events on `events`.
    pub fn with_events(mut self, events: Sender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Skip writing `{prefix}_summary.json` at the end of the run.
    pub fn without_summary_file(mut self) -> Self {
        self.write_summary = false;
        self
    }

    /// Run the study.
    ///
    /// Only configuration problems are returned as errors, and only before
    /// the first trial. Every per-trial error is counted and the loop keeps
    /// going.
    pub fn run(&self) -> RpResult<RunSummary> {
        self.config.validate()?;
        self.config.prepare_output_dir()?;

        let target = self.config.target_successes;
        let prefix = self.config.naming_prefix();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        info!(
            "Starting run {}: {} x {} series of model {}, target {} successes, {} threads per optimizer call",
            run_id,
            self.config.replicate_count,
            self.config.series_length,
            self.config.model_name,
            target,
            self.config.parallelism_degree
        );
        self.emit(RunEvent::Started {
            at: started_at,
            run_id,
            prefix: prefix.clone(),
            target_successes: target,
        });

        let mut counters = RunCounters::default();
        let mut artifacts = Vec::new();

        while counters.should_continue(target) {
            let attempt = counters.attempts() as u64 + 1;
            let success_index = counters.next_success_index();
            let name = artifact_file_name(&prefix, success_index);
            let path = self.config.output_dir().join(&name);

            match self.attempt(&path, attempt) {
                Ok(elapsed_seconds) => {
                    counters.record_success();
                    info!(
                        "Trial {}: success {}/{} (failures {}), optimizer {:.3}s -> {}",
                        attempt,
                        counters.successes(),
                        target,
                        counters.failures(),
                        elapsed_seconds,
                        name
                    );
                    self.emit(RunEvent::TrialSucceeded {
                        at: Utc::now(),
                        attempt,
                        success_index,
                        artifact: name.clone(),
                        elapsed_seconds,
                        successes: counters.successes(),
                        failures: counters.failures(),
                    });
                    artifacts.push(name);
                }
                Err(failure) => {
                    counters.record_failure();
                    warn!(
                        "Trial {}: {} (successes {}, failures {}/{})",
                        attempt,
                        failure,
                        counters.successes(),
                        counters.failures(),
                        target
                    );
                    self.emit(RunEvent::TrialFailed {
                        at: Utc::now(),
                        attempt,
                        stage: failure.stage,
                        description: failure.description,
                        successes: counters.successes(),
                        failures: counters.failures(),
                    });
                }
            }
        }

        let state = if counters.successes() >= target {
            RunEndState::Completed
        } else {
            RunEndState::BudgetExhausted
        };
        let summary = RunSummary {
            run_id,
            prefix,
            config: self.config.clone(),
            state,
            target_successes: target,
            successes: counters.successes(),
            failures: counters.failures(),
            attempts: counters.attempts(),
            started_at,
            finished_at: Utc::now(),
            elapsed_seconds: clock.elapsed().as_secs_f64(),
            artifacts,
        };

        if self.write_summary {
            let path = self
                .config
                .output_dir()
                .join(summary_file_name(&summary.prefix));
            match create_json_atomic(&path, &summary, true) {
                Ok(()) => {}
                Err(PersistenceError::AlreadyExists { .. }) => warn!(
                    "Run summary {} already exists; leaving it in place",
                    path.display()
                ),
                Err(e) => warn!("Could not write run summary: {}", e),
            }
        }

        match summary.state {
            RunEndState::Completed => info!(
                "Run complete: {} successes, {} failures in {:.1}s",
                summary.successes, summary.failures, summary.elapsed_seconds
            ),
            RunEndState::BudgetExhausted => warn!(
                "Failure budget exhausted: {} successes, {} failures in {:.1}s",
                summary.successes, summary.failures, summary.elapsed_seconds
            ),
        }
        self.emit(RunEvent::Finished {
            at: summary.finished_at,
            summary: summary.clone(),
        });

        Ok(summary)
    }

    /// One iteration: execute, then persist on success. Returns the optimizer
    /// duration.
    fn attempt(&self, path: &Path, attempt: u64) -> Result<f64, TrialFailure> {
        let record = match self.executor.execute(self.config, attempt) {
            TrialOutcome::Success(record) => record,
            TrialOutcome::Failure(failure) => return Err(failure),
        };
        let elapsed_seconds = record.elapsed_seconds;

        match contain(|| self.sink.write(path, &record)) {
            Ok(Ok(())) => Ok(elapsed_seconds),
            Ok(Err(e)) => Err(TrialFailure::from_error(TrialStage::Persistence, &e.into())),
            Err(msg) => Err(TrialFailure::new(
                TrialStage::Persistence,
                format!("panicked: {msg}"),
            )),
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                debug!("Event receiver dropped; progress event discarded");
            }
        }
    }
}
