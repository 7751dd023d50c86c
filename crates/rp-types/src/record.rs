//! Per-trial outcomes and the record persisted for every success.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::Dataset;
use crate::errors::RpError;

/// Artifact of a successful trial.
///
/// The serialized field names (`data`, `fbam_out`, `time`) are the on-disk
/// contract read by downstream analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "data")]
    pub generated_data: Dataset,

    /// Optimizer result, opaque to the runner.
    #[serde(rename = "fbam_out")]
    pub optimization_output: serde_json::Value,

    /// Wall-clock seconds spent inside the optimizer call only.
    #[serde(rename = "time")]
    pub elapsed_seconds: f64,
}

/// Where in a trial a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStage {
    Generation,
    Optimization,
    Persistence,
}

impl fmt::Display for TrialStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrialStage::Generation => "generation",
            TrialStage::Optimization => "optimization",
            TrialStage::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialFailure {
    pub stage: TrialStage,
    pub description: String,
}

impl TrialFailure {
    pub fn new(stage: TrialStage, description: impl Into<String>) -> Self {
        Self {
            stage,
            description: description.into(),
        }
    }

    pub fn from_error(stage: TrialStage, error: &RpError) -> Self {
        Self::new(stage, error.to_string())
    }
}

impl fmt::Display for TrialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.description)
    }
}

/// Result of one trial. Never both a record and a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Success(ResultRecord),
    Failure(TrialFailure),
}

impl TrialOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrialOutcome::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GenerationError;

    #[test]
    fn record_uses_artifact_field_names() {
        let record = ResultRecord {
            generated_data: Dataset::new("m", vec![vec![1.0, 2.0]]),
            optimization_output: serde_json::json!({"best": {"bands": 2}}),
            elapsed_seconds: 0.25,
        };

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("data"));
        assert_eq!(obj["fbam_out"]["best"]["bands"], 2);
        assert_eq!(obj["time"], 0.25);
    }

    #[test]
    fn failure_description_comes_from_error() {
        let err: RpError = GenerationError::UnknownModel {
            model: "nope".into(),
        }
        .into();
        let failure = TrialFailure::from_error(TrialStage::Generation, &err);
        assert_eq!(failure.stage, TrialStage::Generation);
        assert!(failure.description.contains("nope"));
        assert!(failure.to_string().starts_with("generation failed"));
    }

    #[test]
    fn outcome_kind() {
        let fail = TrialOutcome::Failure(TrialFailure::new(TrialStage::Optimization, "x"));
        assert!(!fail.is_success());
    }
}
