use thiserror::Error;

/// Invariant violations raised by the engine.
///
/// These signal a bug in the engine or its catalogs, not a malformed
/// pipeline. Malformed pipelines are reported as [`crate::issue::Issue`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Base table '{0}' was not found in the table catalog")]
    BaseTableNotFound(String),
    #[error("Base table '{0}' has no columns")]
    EmptyBaseTable(String),
    #[error("Catalog inconsistency at step {step}: {message}")]
    CatalogInconsistency { step: usize, message: String },
}
