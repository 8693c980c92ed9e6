//! # Releval Core
//!
//! Marshals nested relevance judgments and system scores into canonically
//! ordered rankings, resolves measure specifiers against the built-in
//! TREC-style measure catalog, and drives per-query evaluation into a nested
//! `query -> measure -> value` mapping.

pub mod aggregate;
pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod ranking;
pub mod resolver;
pub mod session;

// Re-export commonly used types at the crate root.
pub use aggregate::{aggregate, compute_aggregated_measure};
pub use assembler::{EvaluationResults, MeasureValues};
pub use config::{EvalConfig, load_config};
pub use engine::catalog::{expand_nicknames, nicknames, supported_measures};
pub use engine::{EvalParams, Measure, MeasureCatalog, MeasureParams, SharedCatalog};
pub use error::{ConfigError, RelevalError, Result, ShapeViolation};
pub use ranking::{JudgmentSet, Relevance, ResultSet, Score};
pub use resolver::{MeasureSet, MeasureSpec};
pub use session::EvaluationSession;
