//! Run configuration: validated once at startup, immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::grid::HyperparameterGrid;

/// Base seed used when none is supplied.
pub const DEFAULT_SEED: u64 = 1;

/// Parameters of one replicated study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Which data-generating model to invoke.
    pub model_name: String,
    /// Number of parallel series per generated dataset.
    pub replicate_count: usize,
    pub series_length: usize,
    /// Stop once this many trials succeeded. Also the failure budget.
    pub target_successes: usize,
    /// Worker threads available to a single optimizer call.
    pub parallelism_degree: usize,
    pub output_directory: PathBuf,

    /// Attempt `n` (1-based) generates with `seed + n - 1`.
    pub seed: u64,
    /// Extra naming component so runs sharing a directory cannot collide.
    pub naming_salt: Option<String>,
    pub grid: HyperparameterGrid,
}

impl RunConfig {
    /// Build a configuration from raw (possibly non-positive) integers, as
    /// they arrive from the command line.
    pub fn try_new(
        model_name: impl Into<String>,
        replicate_count: i64,
        series_length: i64,
        target_successes: i64,
        parallelism_degree: i64,
        output_directory: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            model_name: model_name.into(),
            replicate_count: positive("replicate_count", replicate_count)?,
            series_length: positive("series_length", series_length)?,
            target_successes: positive("target_successes", target_successes)?,
            parallelism_degree: positive("parallelism_degree", parallelism_degree)?,
            output_directory: output_directory.into(),
            seed: DEFAULT_SEED,
            naming_salt: None,
            grid: HyperparameterGrid::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_naming_salt(mut self, salt: impl Into<String>) -> Self {
        self.naming_salt = Some(salt.into());
        self
    }

    pub fn with_grid(mut self, grid: HyperparameterGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Check every invariant that does not touch the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "model_name",
                message: "must not be empty".to_string(),
            });
        }
        if !is_filename_safe(&self.model_name) {
            return Err(ConfigError::Invalid {
                field: "model_name",
                message: format!("'{}' contains characters unsafe in file names", self.model_name),
            });
        }
        for (field, value) in [
            ("replicate_count", self.replicate_count),
            ("series_length", self.series_length),
            ("target_successes", self.target_successes),
            ("parallelism_degree", self.parallelism_degree),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field, value: 0 });
            }
        }
        if let Some(salt) = &self.naming_salt {
            if salt.is_empty() || !is_filename_safe(salt) {
                return Err(ConfigError::Invalid {
                    field: "naming_salt",
                    message: format!("'{salt}' is not a usable file name component"),
                });
            }
        }
        self.grid.validate()
    }

    /// Create the output directory if needed and prove it is writable.
    pub fn prepare_output_dir(&self) -> Result<(), ConfigError> {
        let dir = &self.output_directory;
        let not_writable = |e: std::io::Error| ConfigError::OutputNotWritable {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        fs::create_dir_all(dir).map_err(not_writable)?;
        if !dir.is_dir() {
            return Err(ConfigError::OutputNotWritable {
                path: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let probe = dir.join(format!(".replica-probe-{}", std::process::id()));
        fs::write(&probe, b"").map_err(not_writable)?;
        fs::remove_file(&probe).map_err(not_writable)?;
        Ok(())
    }

    /// Name shared by every artifact of this run:
    /// `{model}_R{replicates}_T{length}[_{salt}]`.
    pub fn naming_prefix(&self) -> String {
        let mut prefix = format!(
            "{}_R{}_T{}",
            self.model_name, self.replicate_count, self.series_length
        );
        if let Some(salt) = &self.naming_salt {
            prefix.push('_');
            prefix.push_str(salt);
        }
        prefix
    }

    /// Seed for the 1-based attempt number.
    pub fn seed_for_attempt(&self, attempt: u64) -> u64 {
        self.seed.wrapping_add(attempt.saturating_sub(1))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_directory
    }
}

fn positive(field: &'static str, value: i64) -> Result<usize, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    usize::try_from(value).map_err(|_| ConfigError::Invalid {
        field,
        message: format!("{value} is out of range"),
    })
}

fn is_filename_safe(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
        && !s.starts_with('.')
}
