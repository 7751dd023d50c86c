//! Band/subpopulation grid search.

use rayon::prelude::*;
use rp_types::{Dataset, HyperparameterGrid, OptimizationError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kmeans::kmeans;
use crate::spectral::{band_edges, band_shares, periodogram};
use crate::Optimizer;

/// Score of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScore {
    pub bands: u32,
    pub subpopulations: u32,
    /// BIC-style criterion, smaller is better.
    pub score: f64,
    pub converged: bool,
}

/// Full fit at one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFit {
    pub bands: u32,
    pub subpopulations: u32,
    pub score: f64,
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Frequency-index boundaries of the bands.
    pub band_edges: Vec<usize>,
    /// Subpopulation of every series.
    pub assignments: Vec<usize>,
    /// Mean band-power profile of every subpopulation.
    pub centers: Vec<Vec<f64>>,
}

impl GridFit {
    fn summary(&self) -> GridScore {
        GridScore {
            bands: self.bands,
            subpopulations: self.subpopulations,
            score: self.score,
            converged: self.converged,
        }
    }
}

/// Best fit plus the score of every grid point, in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandFit {
    pub best: GridFit,
    pub candidates: Vec<GridScore>,
}

#[derive(Debug, Clone, Default)]
pub struct BandSubpopOptimizer;

impl BandSubpopOptimizer {
    pub fn new() -> Self {
        Self
    }

    fn validate(
        dataset: &Dataset,
        grid: &HyperparameterGrid,
        parallelism: usize,
    ) -> Result<(), OptimizationError> {
        grid.validate()
            .map_err(|e| OptimizationError::InvalidGrid {
                message: e.to_string(),
            })?;
        if parallelism == 0 {
            return Err(OptimizationError::WorkerPool {
                message: "parallelism degree must be positive".to_string(),
            });
        }
        if dataset.is_empty() {
            return Err(OptimizationError::InvalidShape {
                message: "dataset has no series".to_string(),
            });
        }

        let n = dataset.replicate_count();
        let len = dataset.series_length();
        dataset
            .check_shape(n, len)
            .map_err(|message| OptimizationError::InvalidShape { message })?;
        if let Some((series, t)) = dataset.first_non_finite() {
            return Err(OptimizationError::InvalidShape {
                message: format!("non-finite value in series {series} at t={t}"),
            });
        }

        let max_k = grid.subpopulations.high as usize;
        if n < max_k {
            return Err(OptimizationError::InvalidShape {
                message: format!("{n} series cannot be split into {max_k} subpopulations"),
            });
        }
        let max_b = grid.bands.high as usize;
        if len / 2 < max_b {
            return Err(OptimizationError::InvalidShape {
                message: format!(
                    "series length {len} gives {} frequencies, fewer than {max_b} bands",
                    len / 2
                ),
            });
        }
        Ok(())
    }

    fn fit_point(spectra: &[Vec<f64>], bands: u32, subpopulations: u32) -> GridFit {
        let n_freqs = spectra[0].len();
        let edges = band_edges(n_freqs, bands as usize);
        let profiles: Vec<Vec<f64>> = spectra.iter().map(|p| band_shares(p, &edges)).collect();
        let clustering = kmeans(&profiles, subpopulations as usize);

        let n = profiles.len() as f64;
        let mse = (clustering.sse / n).max(1e-12);
        let params = f64::from(bands) * f64::from(subpopulations);
        let score = n * mse.ln() + params * n.ln();

        GridFit {
            bands,
            subpopulations,
            score,
            sse: clustering.sse,
            iterations: clustering.iterations,
            converged: clustering.converged,
            band_edges: edges,
            assignments: clustering.assignments,
            centers: clustering.centers,
        }
    }

    /// Typed form of [`Optimizer::optimize`].
    pub fn fit(
        &self,
        dataset: &Dataset,
        grid: &HyperparameterGrid,
        parallelism: usize,
    ) -> Result<BandFit, OptimizationError> {
        Self::validate(dataset, grid, parallelism)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| OptimizationError::WorkerPool {
                message: e.to_string(),
            })?;

        let points = grid.points();
        let fits: Vec<GridFit> = pool.install(|| {
            let spectra: Vec<Vec<f64>> = dataset
                .series
                .par_iter()
                .map(|s| periodogram(s))
                .collect();
            points
                .par_iter()
                .map(|&(b, k)| Self::fit_point(&spectra, b, k))
                .collect()
        });

        if let Some(bad) = fits.iter().find(|f| !f.score.is_finite()) {
            return Err(OptimizationError::NonConvergence {
                message: format!(
                    "non-finite score at bands={} subpopulations={}",
                    bad.bands, bad.subpopulations
                ),
            });
        }

        let candidates: Vec<GridScore> = fits.iter().map(GridFit::summary).collect();
        let best = fits
            .into_iter()
            .filter(|f| f.converged)
            .reduce(|best, f| if f.score < best.score { f } else { best })
            .ok_or_else(|| OptimizationError::NonConvergence {
                message: format!(
                    "no grid point converged within {} iterations",
                    crate::kmeans::MAX_ITERATIONS
                ),
            })?;

        debug!(
            "Best fit: bands={} subpopulations={} score={:.3} ({} candidates, {} threads)",
            best.bands,
            best.subpopulations,
            best.score,
            candidates.len(),
            parallelism
        );
        Ok(BandFit { best, candidates })
    }
}

impl Optimizer for BandSubpopOptimizer {
    fn name(&self) -> &str {
        "band_subpop"
    }

    fn optimize(
        &self,
        dataset: &Dataset,
        grid: &HyperparameterGrid,
        parallelism: usize,
    ) -> Result<serde_json::Value, OptimizationError> {
        let fit = self.fit(dataset, grid, parallelism)?;
        serde_json::to_value(fit).map_err(|e| OptimizationError::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_models::{DatasetSource, ModelRegistry};
    use rp_types::IntRange;

    fn two_band_dataset(replicates: usize, length: usize) -> Dataset {
        ModelRegistry::with_builtin_models()
            .generate("two_band", replicates, length, 5)
            .unwrap()
    }

    #[test]
    fn scores_every_grid_point() {
        let dataset = two_band_dataset(24, 128);
        let grid = HyperparameterGrid::default();
        let fit = BandSubpopOptimizer::new().fit(&dataset, &grid, 2).unwrap();

        assert_eq!(fit.candidates.len(), grid.size());
        assert_eq!(fit.best.assignments.len(), 24);
        assert_eq!(fit.best.band_edges.len(), fit.best.bands as usize + 1);
        assert!(fit
            .candidates
            .iter()
            .filter(|c| c.converged)
            .all(|c| c.score >= fit.best.score));
    }

    #[test]
    fn result_is_independent_of_thread_count() {
        let dataset = two_band_dataset(12, 64);
        let grid = HyperparameterGrid::new(IntRange::new(2, 3), IntRange::new(2, 3));
        let opt = BandSubpopOptimizer::new();
        assert_eq!(
            opt.fit(&dataset, &grid, 1).unwrap(),
            opt.fit(&dataset, &grid, 4).unwrap()
        );
    }

    #[test]
    fn optimize_returns_json() {
        let dataset = two_band_dataset(8, 64);
        let grid = HyperparameterGrid::new(IntRange::new(2, 2), IntRange::new(2, 2));
        let out = BandSubpopOptimizer::new().optimize(&dataset, &grid, 1).unwrap();
        assert_eq!(out["best"]["bands"], 2);
        assert_eq!(out["candidates"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn rejects_too_few_series() {
        let dataset = two_band_dataset(3, 64);
        let err = BandSubpopOptimizer::new()
            .fit(&dataset, &HyperparameterGrid::default(), 1)
            .unwrap_err();
        assert!(matches!(err, OptimizationError::InvalidShape { .. }));
    }

    #[test]
    fn rejects_short_series() {
        let dataset = two_band_dataset(10, 8);
        let err = BandSubpopOptimizer::new()
            .fit(&dataset, &HyperparameterGrid::default(), 1)
            .unwrap_err();
        assert!(matches!(err, OptimizationError::InvalidShape { .. }));
    }

    #[test]
    fn rejects_bad_inputs() {
        let opt = BandSubpopOptimizer::new();
        let grid = HyperparameterGrid::new(IntRange::new(2, 2), IntRange::new(2, 2));

        let empty = Dataset::new("m", Vec::new());
        assert!(matches!(
            opt.fit(&empty, &grid, 1),
            Err(OptimizationError::InvalidShape { .. })
        ));

        let nan = Dataset::new("m", vec![vec![0.0; 8], vec![f64::NAN; 8]]);
        assert!(matches!(
            opt.fit(&nan, &grid, 1),
            Err(OptimizationError::InvalidShape { .. })
        ));

        let ok = two_band_dataset(4, 16);
        assert!(matches!(
            opt.fit(&ok, &grid, 0),
            Err(OptimizationError::WorkerPool { .. })
        ));
        let inverted = HyperparameterGrid::new(IntRange::new(3, 2), IntRange::new(2, 2));
        assert!(matches!(
            opt.fit(&ok, &inverted, 1),
            Err(OptimizationError::InvalidGrid { .. })
        ));
    }
}
