//! # rp-types
//!
//! Shared domain types for Replica: run configuration, datasets, the
//! hyperparameter grid, per-trial outcomes and the error taxonomy.

pub mod config;
pub mod dataset;
pub mod errors;
pub mod grid;
pub mod record;

pub use config::*;
pub use dataset::*;
pub use errors::*;
pub use grid::*;
pub use record::*;
