//! Declarative query specifications compiled into provider-agnostic
//! composed queries, plus a repository-style execution facade.
//!
//! ## Crate layout
//! - `core`: specification model, predicate AST, evaluator chain, provider
//!   boundary, in-memory reference source.
//! - `error`: public error taxonomy for facade callers.
//! - `repository`: execution facade over one query source.

pub use specq_core as core;

mod error;
mod repository;

pub use error::Error;
pub use repository::Repository;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{Error, Repository};
    pub use specq_core::{
        cancel::CancelToken,
        entity::{Entity, FieldValues},
        evaluator::{CustomEvaluator, SpecificationEvaluator},
        memory::MemorySource,
        predicate::Predicate,
        query::{ComposedQuery, OrderDirection, Toggle},
        response::Response,
        source::{MutableSource, QuerySource, SourceError},
        spec::{ProjectedSpecification, SpecError, Specification},
        value::Value,
    };
}
