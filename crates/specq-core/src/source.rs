use crate::{
    cancel::CancelToken,
    entity::Entity,
    query::{ComposedQuery, RowGroup},
};
use futures::future::BoxFuture;
use thiserror::Error as ThisError;

///
/// SourceError
///
/// Failures surfaced by a query source. The core performs no retries and
/// no recovery; these propagate to the caller unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SourceError {
    #[error("provider failure: {0}")]
    Provider(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("conflicting write for key '{key}'")]
    Conflict { key: String },
}

///
/// QuerySource
///
/// Abstract queryable data source. A composed query stays inert data until
/// one of these materializing calls runs it; everything before that point
/// is deferred. Implementations interpret the query's predicate, order,
/// includes, grouping, page and options with their own engine.
///
/// Object-safe: methods return boxed futures so sources can live behind
/// `dyn` at the facade boundary.
///

pub trait QuerySource<E: Entity>: Send + Sync {
    /// Materialize matching rows.
    fn fetch<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<E>, SourceError>>;

    /// Materialize a grouped query into keyed row groups.
    fn fetch_grouped<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<RowGroup<E>>, SourceError>>;

    /// Count matching rows — groups, for a grouped query.
    fn count<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<u64, SourceError>>;

    /// Whether at least one row matches.
    fn exists<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<bool, SourceError>>;
}

///
/// MutableSource
///
/// Write half of the provider boundary. Commit semantics (transactions,
/// retries, constraint enforcement) belong to the provider; the core only
/// routes intents through.
///

pub trait MutableSource<E: Entity>: QuerySource<E> {
    /// Insert one entity; an existing row under the same key is a
    /// `Conflict`.
    fn insert<'a>(
        &'a self,
        entity: E,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>>;

    fn insert_many<'a>(
        &'a self,
        entities: Vec<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>>;

    /// Replace the row under the entity's key; a missing row is a
    /// `Conflict`.
    fn update<'a>(
        &'a self,
        entity: E,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>>;

    fn update_many<'a>(
        &'a self,
        entities: Vec<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>>;

    /// Remove the row under the entity's key; a missing row is a
    /// `Conflict`.
    fn remove<'a>(
        &'a self,
        entity: &'a E,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>>;

    fn remove_many<'a>(
        &'a self,
        entities: &'a [E],
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>>;

    /// Remove every row matching the query and return how many went.
    fn remove_matching<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<u64, SourceError>>;
}
