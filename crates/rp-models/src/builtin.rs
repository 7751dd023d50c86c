//! Built-in synthetic models.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal, StandardNormal};
use rp_types::{Dataset, GenerationError};
use serde_json::json;
use std::f64::consts::PI;

use crate::DataGenerator;

/// I.i.d. standard normal noise.
#[derive(Debug, Clone, Default)]
pub struct WhiteNoise;

impl DataGenerator for WhiteNoise {
    fn name(&self) -> &str {
        "white_noise"
    }

    fn generate(
        &self,
        replicate_count: usize,
        series_length: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, GenerationError> {
        let series: Vec<Vec<f64>> = (0..replicate_count)
            .map(|_| {
                (0..series_length)
                    .map(|_| -> f64 { StandardNormal.sample(&mut *rng) })
                    .collect()
            })
            .collect();
        Ok(Dataset::new(self.name(), series))
    }

    fn config(&self) -> serde_json::Value {
        json!({ "model": self.name() })
    }
}

/// First-order autoregression `x[t] = phi * x[t-1] + e[t]`, started at zero.
#[derive(Debug, Clone)]
pub struct Ar1 {
    pub phi: f64,
    pub innovation_sd: f64,
}

impl Default for Ar1 {
    fn default() -> Self {
        Self {
            phi: 0.5,
            innovation_sd: 1.0,
        }
    }
}

impl DataGenerator for Ar1 {
    fn name(&self) -> &str {
        "ar1"
    }

    fn generate(
        &self,
        replicate_count: usize,
        series_length: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, GenerationError> {
        let noise = Normal::new(0.0, self.innovation_sd).map_err(|e| {
            GenerationError::Diverged {
                model: self.name().to_string(),
                message: e.to_string(),
            }
        })?;

        let mut series = Vec::with_capacity(replicate_count);
        for _ in 0..replicate_count {
            let mut prev = 0.0;
            let mut s = Vec::with_capacity(series_length);
            for _ in 0..series_length {
                prev = self.phi * prev + noise.sample(&mut *rng);
                s.push(prev);
            }
            series.push(s);
        }
        Ok(Dataset::new(self.name(), series))
    }

    fn config(&self) -> serde_json::Value {
        json!({ "model": self.name(), "phi": self.phi, "innovation_sd": self.innovation_sd })
    }
}

/// Sum of sinusoids at fixed frequencies plus Gaussian noise.
///
/// Every replicate is drawn from one of several subpopulations, each with its
/// own amplitude profile across the frequency bands.
#[derive(Debug, Clone)]
pub struct BandMixture {
    name: String,
    /// Frequencies in cycles per observation, each in `(0, 0.5)`.
    pub frequencies: Vec<f64>,
    /// `weights[k][j]` is the amplitude of frequency `j` in subpopulation `k`.
    pub weights: Vec<Vec<f64>>,
    pub noise_sd: f64,
}

impl BandMixture {
    pub fn new(
        name: impl Into<String>,
        frequencies: Vec<f64>,
        weights: Vec<Vec<f64>>,
        noise_sd: f64,
    ) -> Self {
        Self {
            name: name.into(),
            frequencies,
            weights,
            noise_sd,
        }
    }

    /// Two bands, two subpopulations.
    pub fn two_band() -> Self {
        Self::new(
            "two_band",
            vec![0.05, 0.30],
            vec![vec![2.0, 0.4], vec![0.4, 2.0]],
            1.0,
        )
    }

    /// Three bands, three subpopulations.
    pub fn three_band() -> Self {
        Self::new(
            "three_band",
            vec![0.04, 0.18, 0.38],
            vec![
                vec![2.0, 0.4, 0.4],
                vec![0.4, 2.0, 0.4],
                vec![0.4, 0.4, 2.0],
            ],
            1.0,
        )
    }

    fn malformed(&self, message: String) -> GenerationError {
        GenerationError::Malformed {
            model: self.name.clone(),
            message,
        }
    }
}

impl DataGenerator for BandMixture {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(
        &self,
        replicate_count: usize,
        series_length: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Dataset, GenerationError> {
        if self.weights.is_empty() {
            return Err(self.malformed("no subpopulations configured".to_string()));
        }
        if let Some(w) = self.weights.iter().find(|w| w.len() != self.frequencies.len()) {
            return Err(self.malformed(format!(
                "weight profile has {} entries for {} frequencies",
                w.len(),
                self.frequencies.len()
            )));
        }
        let noise = Normal::new(0.0, self.noise_sd).map_err(|e| self.malformed(e.to_string()))?;

        let mut series = Vec::with_capacity(replicate_count);
        for _ in 0..replicate_count {
            let profile = &self.weights[rng.gen_range(0..self.weights.len())];
            let phases: Vec<f64> = self
                .frequencies
                .iter()
                .map(|_| rng.gen_range(0.0..2.0 * PI))
                .collect();

            let s: Vec<f64> = (0..series_length)
                .map(|t| {
                    let signal: f64 = self
                        .frequencies
                        .iter()
                        .zip(profile)
                        .zip(&phases)
                        .map(|((f, w), phase)| w * (2.0 * PI * f * t as f64 + phase).sin())
                        .sum();
                    signal + noise.sample(&mut *rng)
                })
                .collect();
            series.push(s);
        }
        Ok(Dataset::new(self.name(), series))
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "model": self.name,
            "frequencies": self.frequencies,
            "weights": self.weights,
            "noise_sd": self.noise_sd,
        })
    }
}
