use crate::{
    predicate::Predicate,
    query::{IncludePath, OrderDirection, Toggle},
    spec::{
        DEFAULT_SEARCH_GROUP, OrderChain, OrderExpr, PostProcess, ProjectedSpecification,
        SearchTerm, Selection, Specification,
    },
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// SpecError
///
/// Invalid specification configuration. Raised synchronously at build or
/// compile time; no partial specification or composed query exists on
/// error.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SpecError {
    #[error("then_by requires a preceding order_by on the same specification")]
    ThenByWithoutOrder,

    #[error("then_include requires a preceding include on the same specification")]
    ThenIncludeWithoutInclude,

    #[error("group_by cannot be combined with a projection selector")]
    GroupWithProjection,

    #[error("include path must not be empty or contain empty segments: '{path}'")]
    EmptyIncludePath { path: String },

    #[error("search pattern must not be empty")]
    EmptySearchPattern,

    #[error("evaluator '{name}' rejected the specification: {message}")]
    Evaluator { name: &'static str, message: String },
}

///
/// SpecificationBuilder
///
/// Fluent accumulator for query-shaping rules. Calls append to the
/// specification's ordered collections; misuse is remembered and surfaced
/// by `build()`, first error wins. Builder call order does not decide
/// evaluation order — the evaluator chain does.
///

pub struct SpecificationBuilder<E> {
    spec: Specification<E>,
    error: Option<SpecError>,
}

impl<E> SpecificationBuilder<E> {
    pub(crate) const fn new() -> Self {
        Self {
            spec: Specification::empty(),
            error: None,
        }
    }

    fn fail(mut self, error: SpecError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// Add a filter predicate; all predicates combine with AND.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.spec.filters.push(predicate);
        self
    }

    /// Start an ascending order chain, discarding any existing one.
    #[must_use]
    pub fn order_by(self, field: impl Into<String>) -> Self {
        self.primary_order(field.into(), OrderDirection::Asc)
    }

    /// Start a descending order chain, discarding any existing one.
    #[must_use]
    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.primary_order(field.into(), OrderDirection::Desc)
    }

    /// Append an ascending tie-break key to the current order chain.
    #[must_use]
    pub fn then_by(self, field: impl Into<String>) -> Self {
        self.chained_order(field.into(), OrderDirection::Asc)
    }

    /// Append a descending tie-break key to the current order chain.
    #[must_use]
    pub fn then_by_desc(self, field: impl Into<String>) -> Self {
        self.chained_order(field.into(), OrderDirection::Desc)
    }

    fn primary_order(mut self, field: String, direction: OrderDirection) -> Self {
        self.spec.orders.clear();
        self.spec.orders.push(OrderExpr {
            field,
            direction,
            chain: OrderChain::Primary,
        });
        self
    }

    fn chained_order(mut self, field: String, direction: OrderDirection) -> Self {
        if self.spec.orders.is_empty() {
            return self.fail(SpecError::ThenByWithoutOrder);
        }
        self.spec.orders.push(OrderExpr {
            field,
            direction,
            chain: OrderChain::Then,
        });
        self
    }

    /// Eager-load one single-hop navigation.
    #[must_use]
    pub fn include(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if segment.is_empty() {
            return self.fail(SpecError::EmptyIncludePath { path: segment });
        }
        self.spec.includes.push(IncludePath::new(segment));
        self
    }

    /// Eager-load a dotted navigation path (`company.country`).
    #[must_use]
    pub fn include_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return self.fail(SpecError::EmptyIncludePath { path });
        }

        let mut segments = path.split('.');
        let mut include = IncludePath::new(segments.next().unwrap_or_default());
        for segment in segments {
            include.push(segment);
        }
        self.spec.includes.push(include);
        self
    }

    /// Continue the immediately preceding include path one hop deeper.
    #[must_use]
    pub fn then_include(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if segment.is_empty() {
            return self.fail(SpecError::EmptyIncludePath { path: segment });
        }

        if self.spec.includes.is_empty() {
            return self.fail(SpecError::ThenIncludeWithoutInclude);
        }
        if let Some(include) = self.spec.includes.last_mut() {
            include.push(segment);
        }
        self
    }

    /// Add a search term to the default search group.
    #[must_use]
    pub fn search(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.search_group(field, pattern, DEFAULT_SEARCH_GROUP)
    }

    /// Add a search term to a named group. Terms inside one group OR
    /// together; distinct groups AND into the filter stage.
    #[must_use]
    pub fn search_group(
        mut self,
        field: impl Into<String>,
        pattern: impl Into<String>,
        group: u32,
    ) -> Self {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return self.fail(SpecError::EmptySearchPattern);
        }

        self.spec.search.add(
            group,
            SearchTerm {
                field: field.into(),
                pattern,
            },
        );
        self
    }

    /// Skip the first `n` rows of the ordered result.
    #[must_use]
    pub const fn skip(mut self, n: u64) -> Self {
        self.spec.skip = Some(n);
        self
    }

    /// Truncate the result to `n` rows.
    #[must_use]
    pub const fn take(mut self, n: u64) -> Self {
        self.spec.take = Some(n);
        self
    }

    /// Set both paging bounds at once.
    #[must_use]
    pub const fn paginate(mut self, skip: u64, take: u64) -> Self {
        self.spec.skip = Some(skip);
        self.spec.take = Some(take);
        self
    }

    /// Group results by one key field. Entity specifications only.
    #[must_use]
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.spec.group_by = Some(field.into());
        self
    }

    /// Explicitly enable or disable provider change tracking.
    #[must_use]
    pub const fn tracking(mut self, enabled: bool) -> Self {
        self.spec.options.tracking = Toggle::from_bool(enabled);
        self
    }

    /// Explicitly mark the query (non-)cacheable.
    #[must_use]
    pub const fn cacheable(mut self, enabled: bool) -> Self {
        self.spec.options.cacheable = Toggle::from_bool(enabled);
        self
    }

    /// Explicitly request split or single-query eager loading.
    #[must_use]
    pub const fn split_relations(mut self, enabled: bool) -> Self {
        self.spec.options.split_relations = Toggle::from_bool(enabled);
        self
    }

    /// Bypass provider-level default filters.
    #[must_use]
    pub const fn ignore_default_filters(mut self) -> Self {
        self.spec.options.ignore_default_filters = true;
        self
    }

    /// In-memory post-processing over materialized entity rows. Runs
    /// strictly after the provider returns, never inside the query.
    #[must_use]
    pub fn post_process(mut self, step: impl Fn(Vec<E>) -> Vec<E> + Send + Sync + 'static) -> Self {
        self.spec.post_process = Some(Arc::new(step));
        self
    }

    /// Project each entity into one result value.
    ///
    /// Entity-level `post_process` does not apply to projected execution;
    /// use `ProjectionBuilder::post_process` for the result type.
    #[must_use]
    pub fn select<R>(
        self,
        selector: impl Fn(&E) -> R + Send + Sync + 'static,
    ) -> ProjectionBuilder<E, R> {
        ProjectionBuilder {
            spec: self.spec,
            selection: Selection::Select(Arc::new(selector)),
            post_process: None,
            error: self.error,
        }
    }

    /// Project each entity into zero or more result values, flattened
    /// before paging applies.
    #[must_use]
    pub fn select_many<R>(
        self,
        selector: impl Fn(&E) -> Vec<R> + Send + Sync + 'static,
    ) -> ProjectionBuilder<E, R> {
        ProjectionBuilder {
            spec: self.spec,
            selection: Selection::SelectMany(Arc::new(selector)),
            post_process: None,
            error: self.error,
        }
    }

    /// Validate and freeze the specification.
    pub fn build(self) -> Result<Specification<E>, SpecError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.spec),
        }
    }
}

impl<E> Default for SpecificationBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for SpecificationBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationBuilder")
            .field("spec", &self.spec)
            .field("error", &self.error)
            .finish()
    }
}

///
/// ProjectionBuilder
///
/// Terminal builder stage for projected specifications.
///

pub struct ProjectionBuilder<E, R> {
    spec: Specification<E>,
    selection: Selection<E, R>,
    post_process: Option<PostProcess<R>>,
    error: Option<SpecError>,
}

impl<E, R> ProjectionBuilder<E, R> {
    /// In-memory post-processing over projected rows.
    #[must_use]
    pub fn post_process(mut self, step: impl Fn(Vec<R>) -> Vec<R> + Send + Sync + 'static) -> Self {
        self.post_process = Some(Arc::new(step));
        self
    }

    /// Validate and freeze the projected specification.
    pub fn build(self) -> Result<ProjectedSpecification<E, R>, SpecError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.spec.group_by.is_some() {
            return Err(SpecError::GroupWithProjection);
        }

        Ok(ProjectedSpecification {
            base: self.spec,
            selection: self.selection,
            post_process: self.post_process,
        })
    }
}

impl<E, R> fmt::Debug for ProjectionBuilder<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionBuilder")
            .field("spec", &self.spec)
            .field("selection", &self.selection)
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}
