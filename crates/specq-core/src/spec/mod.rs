mod builder;

pub use builder::{ProjectionBuilder, SpecError, SpecificationBuilder};

use crate::{
    predicate::Predicate,
    query::{IncludePath, OrderDirection, QueryOptions},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Search group id used when the caller does not name one.
pub const DEFAULT_SEARCH_GROUP: u32 = 1;

/// In-memory post-processing step over materialized results. This is the
/// only stage allowed to run arbitrary logic the query engine cannot
/// express, and it runs strictly after the provider has returned rows.
pub type PostProcess<T> = Arc<dyn Fn(Vec<T>) -> Vec<T> + Send + Sync>;

///
/// OrderChain
///
/// Chain position of one ordering key. The first entry of a built
/// specification is always `Primary`; `Then` entries extend it.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum OrderChain {
    Primary,
    Then,
}

///
/// OrderExpr
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderExpr {
    pub field: String,
    pub direction: OrderDirection,
    pub chain: OrderChain,
}

///
/// SearchTerm
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SearchTerm {
    pub field: String,
    pub pattern: String,
}

///
/// SearchGroups
///
/// Search terms keyed by group id. Terms inside one group combine with OR;
/// distinct groups combine with AND into the filter stage.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SearchGroups {
    groups: BTreeMap<u32, Vec<SearchTerm>>,
}

impl SearchGroups {
    pub(crate) fn add(&mut self, group: u32, term: SearchTerm) {
        self.groups.entry(group).or_default().push(term);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate groups in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[SearchTerm])> {
        self.groups
            .iter()
            .map(|(group, terms)| (*group, terms.as_slice()))
    }
}

///
/// Specification
///
/// Declarative, reusable description of *what data the caller wants*.
/// Built once through `SpecificationBuilder`, immutable afterwards, and
/// read-only for every evaluation: compiling the same specification twice
/// yields an equal composed query.
///

pub struct Specification<E> {
    pub(crate) filters: Vec<Predicate>,
    pub(crate) orders: Vec<OrderExpr>,
    pub(crate) includes: Vec<IncludePath>,
    pub(crate) search: SearchGroups,
    pub(crate) skip: Option<u64>,
    pub(crate) take: Option<u64>,
    pub(crate) group_by: Option<String>,
    pub(crate) options: QueryOptions,
    pub(crate) post_process: Option<PostProcess<E>>,
}

impl<E> Specification<E> {
    #[must_use]
    pub fn builder() -> SpecificationBuilder<E> {
        SpecificationBuilder::new()
    }

    pub(crate) const fn empty() -> Self {
        Self {
            filters: Vec::new(),
            orders: Vec::new(),
            includes: Vec::new(),
            search: SearchGroups {
                groups: BTreeMap::new(),
            },
            skip: None,
            take: None,
            group_by: None,
            options: QueryOptions::new(),
            post_process: None,
        }
    }

    #[must_use]
    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    #[must_use]
    pub fn orders(&self) -> &[OrderExpr] {
        &self.orders
    }

    #[must_use]
    pub fn includes(&self) -> &[IncludePath] {
        &self.includes
    }

    #[must_use]
    pub const fn search(&self) -> &SearchGroups {
        &self.search
    }

    #[must_use]
    pub const fn skip(&self) -> Option<u64> {
        self.skip
    }

    #[must_use]
    pub const fn take(&self) -> Option<u64> {
        self.take
    }

    #[must_use]
    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    #[must_use]
    pub fn has_post_process(&self) -> bool {
        self.post_process.is_some()
    }

    /// Run the post-processing step over materialized rows, if configured.
    #[must_use]
    pub fn post_process_rows(&self, rows: Vec<E>) -> Vec<E> {
        match &self.post_process {
            Some(step) => step(rows),
            None => rows,
        }
    }
}

impl<E> Clone for Specification<E> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            orders: self.orders.clone(),
            includes: self.includes.clone(),
            search: self.search.clone(),
            skip: self.skip,
            take: self.take,
            group_by: self.group_by.clone(),
            options: self.options,
            post_process: self.post_process.clone(),
        }
    }
}

impl<E> fmt::Debug for Specification<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("filters", &self.filters)
            .field("orders", &self.orders)
            .field("includes", &self.includes)
            .field("search", &self.search)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("group_by", &self.group_by)
            .field("options", &self.options)
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}

///
/// Selection
///
/// Projection shape of a projected specification: single-valued or
/// flattening. Selectors are closures by necessity — they produce an
/// arbitrary result type — so they run in-process only, never inside a
/// provider.
///

pub enum Selection<E, R> {
    Select(Arc<dyn Fn(&E) -> R + Send + Sync>),
    SelectMany(Arc<dyn Fn(&E) -> Vec<R> + Send + Sync>),
}

impl<E, R> Selection<E, R> {
    #[must_use]
    pub fn apply(&self, rows: &[E]) -> Vec<R> {
        match self {
            Self::Select(f) => rows.iter().map(|row| f(row)).collect(),
            Self::SelectMany(f) => rows.iter().flat_map(|row| f(row)).collect(),
        }
    }
}

impl<E, R> Clone for Selection<E, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Select(f) => Self::Select(Arc::clone(f)),
            Self::SelectMany(f) => Self::SelectMany(Arc::clone(f)),
        }
    }
}

impl<E, R> fmt::Debug for Selection<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(_) => f.write_str("Select"),
            Self::SelectMany(_) => f.write_str("SelectMany"),
        }
    }
}

///
/// ProjectedSpecification
///
/// Entity specification plus a projection and result-typed
/// post-processing. Grouping and projection are mutually exclusive;
/// the builder rejects that combination.
///

pub struct ProjectedSpecification<E, R> {
    pub(crate) base: Specification<E>,
    pub(crate) selection: Selection<E, R>,
    pub(crate) post_process: Option<PostProcess<R>>,
}

impl<E, R> ProjectedSpecification<E, R> {
    #[must_use]
    pub const fn base(&self) -> &Specification<E> {
        &self.base
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection<E, R> {
        &self.selection
    }

    #[must_use]
    pub fn has_post_process(&self) -> bool {
        self.post_process.is_some()
    }

    /// Run the post-processing step over projected rows, if configured.
    #[must_use]
    pub fn post_process_rows(&self, rows: Vec<R>) -> Vec<R> {
        match &self.post_process {
            Some(step) => step(rows),
            None => rows,
        }
    }
}

impl<E, R> Clone for ProjectedSpecification<E, R> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            selection: self.selection.clone(),
            post_process: self.post_process.clone(),
        }
    }
}

impl<E, R> fmt::Debug for ProjectedSpecification<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectedSpecification")
            .field("base", &self.base)
            .field("selection", &self.selection)
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}
