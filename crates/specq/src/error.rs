use specq_core::{response::ResponseError, source::SourceError, spec::SpecError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error taxonomy for facade callers.
///
/// - `Spec`: invalid specification configuration; raised synchronously at
///   build or compile time, never from a provider.
/// - `Response`: cardinality violations over materialized rows (the
///   ambiguous-result case).
/// - `Source`: provider failures, propagated unchanged — the facade
///   performs no retries and no recovery.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("{0}")]
    Spec(#[from] SpecError),

    #[error("{0}")]
    Response(#[from] ResponseError),

    #[error("{0}")]
    Source(#[from] SourceError),
}

impl Error {
    /// Whether this error came from the provider rather than from
    /// specification compilation or result interpretation.
    #[must_use]
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
