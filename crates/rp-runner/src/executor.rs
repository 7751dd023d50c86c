//! One trial: generate data, run the optimizer, time it, build the record.

use rp_models::DatasetSource;
use rp_optimizer::Optimizer;
use rp_types::{ResultRecord, RpError, RunConfig, TrialFailure, TrialOutcome, TrialStage};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Runs single trials against the two external collaborators.
pub struct ReplicateExecutor<'a> {
    source: &'a dyn DatasetSource,
    optimizer: &'a dyn Optimizer,
}

impl<'a> ReplicateExecutor<'a> {
    pub fn new(source: &'a dyn DatasetSource, optimizer: &'a dyn Optimizer) -> Self {
        Self { source, optimizer }
    }

    /// Execute the trial for 1-based `attempt`.
    ///
    /// Errors and panics from either collaborator come back as
    /// [`TrialOutcome::Failure`]; a record is only built once both succeeded.
    pub fn execute(&self, config: &RunConfig, attempt: u64) -> TrialOutcome {
        let seed = config.seed_for_attempt(attempt);
        let generated = contain(|| {
            self.source.generate(
                &config.model_name,
                config.replicate_count,
                config.series_length,
                seed,
            )
        });
        let dataset = match generated {
            Ok(Ok(dataset)) => dataset,
            Ok(Err(e)) => return failure(TrialStage::Generation, e.into()),
            Err(msg) => return panicked(TrialStage::Generation, msg),
        };

        let started = Instant::now();
        let optimized = contain(|| {
            self.optimizer
                .optimize(&dataset, &config.grid, config.parallelism_degree)
        });
        let elapsed_seconds = started.elapsed().as_secs_f64();

        match optimized {
            Ok(Ok(optimization_output)) => TrialOutcome::Success(ResultRecord {
                generated_data: dataset,
                optimization_output,
                elapsed_seconds,
            }),
            Ok(Err(e)) => failure(TrialStage::Optimization, e.into()),
            Err(msg) => panicked(TrialStage::Optimization, msg),
        }
    }
}

fn failure(stage: TrialStage, error: RpError) -> TrialOutcome {
    TrialOutcome::Failure(TrialFailure::from_error(stage, &error))
}

fn panicked(stage: TrialStage, message: String) -> TrialOutcome {
    TrialOutcome::Failure(TrialFailure::new(stage, format!("panicked: {message}")))
}

/// Run `f`, turning a panic into its message.
pub(crate) fn contain<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
