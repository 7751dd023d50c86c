//! Hyperparameter grid searched inside a single optimizer call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Default lower bound for both grid axes.
pub const DEFAULT_GRID_MIN: u32 = 2;
/// Default upper bound for both grid axes.
pub const DEFAULT_GRID_MAX: u32 = 6;

/// Closed integer range `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: u32,
    pub high: u32,
}

impl IntRange {
    pub fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Number of candidates in the range.
    pub fn len(&self) -> usize {
        if self.high < self.low {
            0
        } else {
            (u64::from(self.high) - u64::from(self.low) + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> impl Iterator<Item = u32> {
        self.low..=self.high
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.low == 0 {
            return Err(ConfigError::Invalid {
                field,
                message: "lower bound must be at least 1".to_string(),
            });
        }
        if self.high < self.low {
            return Err(ConfigError::Invalid {
                field,
                message: format!("empty range {}:{}", self.low, self.high),
            });
        }
        Ok(())
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Parses `MIN:MAX` (inclusive) or a single value `N` meaning `N:N`.
impl FromStr for IntRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid bound '{part}': {e}"))
        };
        match s.split_once(':') {
            Some((low, high)) => Ok(Self::new(parse(low)?, parse(high)?)),
            None => {
                let v = parse(s)?;
                Ok(Self::new(v, v))
            }
        }
    }
}

/// Candidate band counts and subpopulation counts handed to the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperparameterGrid {
    pub bands: IntRange,
    pub subpopulations: IntRange,
}

impl Default for HyperparameterGrid {
    fn default() -> Self {
        Self {
            bands: IntRange::new(DEFAULT_GRID_MIN, DEFAULT_GRID_MAX),
            subpopulations: IntRange::new(DEFAULT_GRID_MIN, DEFAULT_GRID_MAX),
        }
    }
}

impl HyperparameterGrid {
    pub fn new(bands: IntRange, subpopulations: IntRange) -> Self {
        Self {
            bands,
            subpopulations,
        }
    }

    /// Total number of `(bands, subpopulations)` combinations.
    pub fn size(&self) -> usize {
        self.bands.len().saturating_mul(self.subpopulations.len())
    }

    /// Every `(bands, subpopulations)` pair, bands-major.
    pub fn points(&self) -> Vec<(u32, u32)> {
        self.bands
            .values()
            .flat_map(|b| self.subpopulations.values().map(move |k| (b, k)))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bands.validate("bands")?;
        self.subpopulations.validate("subpopulations")
    }
}
