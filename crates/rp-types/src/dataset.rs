//! Synthetic replicate datasets produced by the data-generating models.

use serde::{Deserialize, Serialize};

/// `replicate_count` equally long real-valued series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub model: String,
    /// Seed the generator was driven with, when it was seeded.
    pub seed: Option<u64>,
    /// One inner vector per replicate series.
    pub series: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn new(model: impl Into<String>, series: Vec<Vec<f64>>) -> Self {
        Self {
            model: model.into(),
            seed: None,
            series,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn replicate_count(&self) -> usize {
        self.series.len()
    }

    /// Length of the first series (0 for an empty dataset).
    pub fn series_length(&self) -> usize {
        self.series.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Verify the dataset is `replicates x length`, describing the first
    /// mismatch found.
    pub fn check_shape(&self, replicates: usize, length: usize) -> Result<(), String> {
        if self.series.len() != replicates {
            return Err(format!(
                "expected {replicates} series, got {}",
                self.series.len()
            ));
        }
        if let Some((i, s)) = self.series.iter().enumerate().find(|(_, s)| s.len() != length) {
            return Err(format!(
                "series {i} has length {}, expected {length}",
                s.len()
            ));
        }
        Ok(())
    }

    /// Position `(series, index)` of the first NaN or infinite value.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.series.iter().enumerate().find_map(|(i, s)| {
            s.iter().position(|v| !v.is_finite()).map(|j| (i, j))
        })
    }
}
