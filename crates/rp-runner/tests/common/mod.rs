// Shared fakes for the run loop tests.
#![allow(dead_code)]

use rp_models::DatasetSource;
use rp_optimizer::Optimizer;
use rp_runner::{ArtifactSink, JsonFileSink};
use rp_types::{
    Dataset, GenerationError, HyperparameterGrid, OptimizationError, PersistenceError,
    ResultRecord, RunConfig,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Constant dataset, always succeeds.
pub struct ConstantSource;

impl DatasetSource for ConstantSource {
    fn generate(
        &self,
        model_name: &str,
        replicate_count: usize,
        series_length: usize,
        seed: u64,
    ) -> Result<Dataset, GenerationError> {
        Ok(Dataset::new(model_name, vec![vec![seed as f64; series_length]; replicate_count])
            .with_seed(seed))
    }
}

/// Fails on the listed 1-based call numbers, succeeds otherwise.
pub struct ScriptedOptimizer {
    fail_on: HashSet<u64>,
    calls: AtomicU64,
}

impl ScriptedOptimizer {
    pub fn failing_on(calls: impl IntoIterator<Item = u64>) -> Self {
        Self {
            fail_on: calls.into_iter().collect(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn always_succeeding() -> Self {
        Self::failing_on([])
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Optimizer for ScriptedOptimizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn optimize(
        &self,
        dataset: &Dataset,
        _grid: &HyperparameterGrid,
        parallelism: usize,
    ) -> Result<serde_json::Value, OptimizationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(OptimizationError::NonConvergence {
                message: format!("scripted failure on call {call}"),
            });
        }
        Ok(serde_json::json!({ "call": call, "seed": dataset.seed, "parallelism": parallelism }))
    }
}

/// Always fails.
pub struct BrokenOptimizer;

impl Optimizer for BrokenOptimizer {
    fn name(&self) -> &str {
        "broken"
    }

    fn optimize(
        &self,
        _dataset: &Dataset,
        _grid: &HyperparameterGrid,
        _parallelism: usize,
    ) -> Result<serde_json::Value, OptimizationError> {
        Err(OptimizationError::InvalidShape {
            message: "always".to_string(),
        })
    }
}

/// Real file sink whose listed 1-based write calls fail.
pub struct FlakySink {
    inner: JsonFileSink,
    fail_on: HashSet<u64>,
    calls: AtomicU64,
}

impl FlakySink {
    pub fn failing_on(calls: impl IntoIterator<Item = u64>) -> Self {
        Self {
            inner: JsonFileSink::new(),
            fail_on: calls.into_iter().collect(),
            calls: AtomicU64::new(0),
        }
    }
}

impl ArtifactSink for FlakySink {
    fn write(&self, path: &Path, record: &ResultRecord) -> Result<(), PersistenceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(PersistenceError::Write {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.write(path, record)
    }
}

pub fn config(dir: &Path, target: i64) -> RunConfig {
    RunConfig::try_new("fake", 2, 5, target, 3, dir).unwrap()
}

/// Success indices present on disk for `config`.
pub fn indices_on_disk(config: &RunConfig) -> Vec<usize> {
    rp_runner::scan_artifacts(config.output_dir(), &config.naming_prefix())
        .unwrap()
        .into_iter()
        .map(|(i, _)| i)
        .collect()
}
