//! # rp-optimizer
//!
//! Optimizer collaborators for Replica. An [`Optimizer`] receives one
//! generated dataset, the `(bands, subpopulations)` hyperparameter grid and a
//! parallelism degree, and returns an opaque JSON result.
//!
//! [`BandSubpopOptimizer`] is the built-in implementation: it summarises every
//! series by its share of spectral power per frequency band, clusters those
//! profiles into subpopulations, and scores every grid point with a
//! BIC-style criterion.

mod band;
mod kmeans;
mod spectral;

pub use band::{BandFit, BandSubpopOptimizer, GridFit, GridScore};
pub use kmeans::{kmeans, Clustering};
pub use spectral::{band_edges, band_shares, periodogram};

use rp_types::{Dataset, HyperparameterGrid, OptimizationError};

/// Black-box optimizer invoked once per trial.
pub trait Optimizer: Send + Sync {
    /// Human-readable optimizer name.
    fn name(&self) -> &str;

    /// Search `grid` for the best fit to `dataset` using at most `parallelism`
    /// worker threads. Blocks until done.
    fn optimize(
        &self,
        dataset: &Dataset,
        grid: &HyperparameterGrid,
        parallelism: usize,
    ) -> Result<serde_json::Value, OptimizationError>;
}
