use thiserror::Error;

/// Main error type for Replica
#[derive(Error, Debug)]
pub enum RpError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Optimization error: {0}")]
    Optimization(#[from] OptimizationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpError {
    /// Whether this error may be absorbed as a trial failure. Only
    /// configuration problems are allowed to end a study abnormally.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RpError::Config(_))
    }
}

/// Run-parameter errors. Always fatal, raised before the first iteration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be a positive integer, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("Output directory {path} is not writable: {message}")]
    OutputNotWritable { path: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Data-generating collaborator errors
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    #[error("Generation diverged for model {model}: {message}")]
    Diverged { model: String, message: String },

    #[error("Model {model} produced a malformed dataset: {message}")]
    Malformed { model: String, message: String },

    #[error("Data generation failed: {0}")]
    Other(String),
}

/// Optimizer collaborator errors
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("Invalid input shape: {message}")]
    InvalidShape { message: String },

    #[error("Optimizer did not converge: {message}")]
    NonConvergence { message: String },

    #[error("Invalid hyperparameter grid: {message}")]
    InvalidGrid { message: String },

    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    #[error("Optimization failed: {0}")]
    Other(String),
}

/// Artifact write/read errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Artifact already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode artifact {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read artifact {path}: {message}")]
    Read { path: String, message: String },
}

/// Result type alias for Replica operations
pub type RpResult<T> = Result<T, RpError>;

/// Macro for creating free-form configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::ConfigError::Other(format!($($arg)*))
    };
}

/// Macro for creating free-form generation errors
#[macro_export]
macro_rules! generation_error {
    ($($arg:tt)*) => {
        $crate::GenerationError::Other(format!($($arg)*))
    };
}

/// Macro for creating free-form optimization errors
#[macro_export]
macro_rules! optimization_error {
    ($($arg:tt)*) => {
        $crate::OptimizationError::Other(format!($($arg)*))
    };
}
