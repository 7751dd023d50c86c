//! Name -> model resolution.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rp_types::{Dataset, GenerationError};
use std::collections::HashMap;
use tracing::debug;

use crate::builtin::{Ar1, BandMixture, WhiteNoise};
use crate::DataGenerator;

/// Seam between the runner and whatever produces its datasets.
pub trait DatasetSource: Send + Sync {
    /// Generate one dataset for `model_name`, reproducibly from `seed`.
    fn generate(
        &self,
        model_name: &str,
        replicate_count: usize,
        series_length: usize,
        seed: u64,
    ) -> Result<Dataset, GenerationError>;
}

/// Registered data-generating models, keyed by name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Box<dyn DataGenerator>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with `white_noise`, `ar1`, `two_band` and
    /// `three_band`.
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WhiteNoise));
        registry.register(Box::new(Ar1::default()));
        registry.register(Box::new(BandMixture::two_band()));
        registry.register(Box::new(BandMixture::three_band()));
        registry
    }

    /// Add a model, replacing any model already registered under its name.
    pub fn register(&mut self, model: Box<dyn DataGenerator>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn get(&self, name: &str) -> Option<&dyn DataGenerator> {
        self.models.get(name).map(|m| m.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl DatasetSource for ModelRegistry {
    fn generate(
        &self,
        model_name: &str,
        replicate_count: usize,
        series_length: usize,
        seed: u64,
    ) -> Result<Dataset, GenerationError> {
        let model = self
            .get(model_name)
            .ok_or_else(|| GenerationError::UnknownModel {
                model: model_name.to_string(),
            })?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let dataset = model.generate(replicate_count, series_length, &mut rng)?;

        dataset
            .check_shape(replicate_count, series_length)
            .map_err(|message| GenerationError::Malformed {
                model: model_name.to_string(),
                message,
            })?;
        if let Some((series, index)) = dataset.first_non_finite() {
            return Err(GenerationError::Diverged {
                model: model_name.to_string(),
                message: format!("non-finite value in series {series} at t={index}"),
            });
        }

        debug!(
            "Generated {} x {} dataset from {} (seed {})",
            replicate_count, series_length, model_name, seed
        );
        Ok(dataset.with_seed(seed))
    }
}
