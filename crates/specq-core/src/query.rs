use crate::{predicate::Predicate, spec::Selection, value::Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

///
/// OrderSpec
///
/// Ordered sort keys. The first entry is the primary key; every later
/// entry breaks ties left by the keys before it. Direction is independent
/// per key.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderSpec {
    pub fields: Vec<(String, OrderDirection)>,
}

///
/// PageSpec
///
/// Paging window. `skip` and `take` are independent; either may be set
/// alone. A `take` without a `skip` still truncates.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PageSpec {
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl PageSpec {
    #[must_use]
    pub const fn new(skip: Option<u64>, take: Option<u64>) -> Self {
        Self { skip, take }
    }

    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Apply the window to already-materialized rows.
    #[must_use]
    pub fn window<T>(&self, rows: Vec<T>) -> Vec<T> {
        let skip = self
            .skip
            .map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let iter = rows.into_iter().skip(skip);

        match self.take {
            Some(take) => iter
                .take(usize::try_from(take).unwrap_or(usize::MAX))
                .collect(),
            None => iter.collect(),
        }
    }
}

///
/// IncludePath
///
/// Eager-load navigation path: one or more segments, nested paths being
/// continuations of the segment before them. Providers without navigation
/// loading may ignore these.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IncludePath {
    segments: Vec<String>,
}

impl IncludePath {
    #[must_use]
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    pub(crate) fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted rendering of the path (`company.country`).
    #[must_use]
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

///
/// Toggle
///
/// Tri-state provider hint. `Unset` inherits the provider default, which
/// is distinct from an explicit `Off`.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Toggle {
    #[default]
    Unset,
    On,
    Off,
}

impl Toggle {
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }

    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Resolve against the provider default.
    #[must_use]
    pub const fn resolve(self, default: bool) -> bool {
        match self {
            Self::Unset => default,
            Self::On => true,
            Self::Off => false,
        }
    }

    const fn overlaid(self, over: Self) -> Self {
        if over.is_set() { over } else { self }
    }
}

///
/// QueryOptions
///
/// Provider-level query options carried on a composed query. All of these
/// are hints: a provider without the matching capability ignores them.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct QueryOptions {
    /// Read/write change tracking.
    pub tracking: Toggle,
    /// Result-cache eligibility.
    pub cacheable: Toggle,
    /// Split eager-load paths into separate provider queries.
    pub split_relations: Toggle,
    /// Bypass provider-level default filters.
    pub ignore_default_filters: bool,
}

impl QueryOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tracking: Toggle::Unset,
            cacheable: Toggle::Unset,
            split_relations: Toggle::Unset,
            ignore_default_filters: false,
        }
    }

    /// Overlay another option set; unset toggles keep the current value.
    pub(crate) const fn overlay(&mut self, over: &Self) {
        self.tracking = self.tracking.overlaid(over.tracking);
        self.cacheable = self.cacheable.overlaid(over.cacheable);
        self.split_relations = self.split_relations.overlaid(over.split_relations);
        self.ignore_default_filters = self.ignore_default_filters || over.ignore_default_filters;
    }
}

///
/// ComposedQuery
///
/// Immutable, pure-data description of "entity set + accumulated
/// operations". Each evaluator consumes one composed query and returns a
/// new one, so the chain behaves as a pure transformation pipeline.
/// Nothing here touches a provider; execution is deferred until a source
/// materializes the query.
///

pub struct ComposedQuery<E> {
    pub predicate: Option<Predicate>,
    pub order: Option<OrderSpec>,
    pub includes: Vec<IncludePath>,
    pub group: Option<String>,
    pub page: Option<PageSpec>,
    pub options: QueryOptions,
    marker: PhantomData<fn() -> E>,
}

impl<E> ComposedQuery<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            predicate: None,
            order: None,
            includes: Vec::new(),
            group: None,
            page: None,
            options: QueryOptions::new(),
            marker: PhantomData,
        }
    }

    /// Add a predicate, implicitly AND-ing with any existing predicate.
    #[must_use]
    pub fn and_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Predicate::And(vec![existing, predicate]),
            None => predicate,
        });
        self
    }
}

impl<E> Default for ComposedQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ComposedQuery<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            order: self.order.clone(),
            includes: self.includes.clone(),
            group: self.group.clone(),
            page: self.page,
            options: self.options,
            marker: PhantomData,
        }
    }
}

impl<E> PartialEq for ComposedQuery<E> {
    fn eq(&self, other: &Self) -> bool {
        self.predicate == other.predicate
            && self.order == other.order
            && self.includes == other.includes
            && self.group == other.group
            && self.page == other.page
            && self.options == other.options
    }
}

impl<E> Eq for ComposedQuery<E> {}

impl<E> fmt::Debug for ComposedQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedQuery")
            .field("predicate", &self.predicate)
            .field("order", &self.order)
            .field("includes", &self.includes)
            .field("group", &self.group)
            .field("page", &self.page)
            .field("options", &self.options)
            .finish()
    }
}

///
/// ProjectedQuery
///
/// Composed query plus a projection. The entity part never carries paging;
/// the window lives here and applies to the projected sequence, which is
/// what makes flattening projections page correctly.
///

pub struct ProjectedQuery<E, R> {
    pub query: ComposedQuery<E>,
    pub selection: Selection<E, R>,
    pub page: Option<PageSpec>,
}

impl<E, R> ProjectedQuery<E, R> {
    /// Project materialized entity rows and apply the paging window.
    #[must_use]
    pub fn materialize(&self, rows: &[E]) -> Vec<R> {
        let projected = self.selection.apply(rows);

        match &self.page {
            Some(page) => page.window(projected),
            None => projected,
        }
    }
}

impl<E, R> Clone for ProjectedQuery<E, R> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            selection: self.selection.clone(),
            page: self.page,
        }
    }
}

impl<E, R> fmt::Debug for ProjectedQuery<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectedQuery")
            .field("query", &self.query)
            .field("selection", &self.selection)
            .field("page", &self.page)
            .finish()
    }
}

///
/// RowGroup
///
/// One keyed group of rows from a grouped query. Rows missing the grouping
/// field land in a `Value::Null` group.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowGroup<E> {
    pub key: Value,
    pub rows: Vec<E>,
}
