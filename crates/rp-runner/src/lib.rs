//! # rp-runner
//!
//! Fault-tolerant runner for replicated simulation studies.
//!
//! A [`Runner`] repeatedly generates a synthetic dataset, hands it to an
//! optimizer and persists every successful result as its own artifact, until
//! `target_successes` trials succeeded or as many have failed. Trials run
//! strictly one after another; parallelism lives inside the optimizer call.
//!
//! Artifacts are named `{model}_R{replicates}_T{length}[_{salt}]_{index}.json`
//! with a gapless, 1-based success index. A failed trial, including a failed
//! write, never consumes an index.

pub mod audit;
pub mod events;
pub mod executor;
pub mod run_loop;
pub mod sink;

pub use audit::{load_artifact, parse_artifact_index, scan_artifacts, verify_sequence, SequenceError};
pub use events::{EventLog, RunEvent};
pub use executor::ReplicateExecutor;
pub use run_loop::{RunCounters, RunEndState, RunSummary, Runner};
pub use sink::{
    artifact_file_name, create_json_atomic, summary_file_name, write_json_atomic, ArtifactSink,
    JsonFileSink,
};
