//! # rp-models
//!
//! Data-generating collaborators for Replica. A [`DataGenerator`] turns a
//! replicate count and series length into a [`Dataset`]; the
//! [`ModelRegistry`] resolves model names to generators and enforces the
//! shape and finiteness of what they return.

mod builtin;
mod registry;

pub use builtin::{Ar1, BandMixture, WhiteNoise};
pub use registry::{DatasetSource, ModelRegistry};

use rand::RngCore;
use rp_types::{Dataset, GenerationError};

/// A pure `(replicates, length) -> dataset` model, driven by the supplied RNG.
pub trait DataGenerator: Send + Sync + std::fmt::Debug {
    /// Name the model is registered under.
    fn name(&self) -> &str;

    /// Produce `replicate_count` series of `series_length` observations.
    fn generate(
        &self,
        replicate_count: usize,
        series_length: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, GenerationError>;

    /// Model parameters, for logging and audit.
    fn config(&self) -> serde_json::Value;
}
