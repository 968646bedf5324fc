use crate::{
    predicate::Predicate,
    query::{ComposedQuery, OrderSpec, PageSpec, ProjectedQuery},
    spec::{ProjectedSpecification, SpecError, Specification},
};
use std::fmt;
use std::sync::Arc;

///
/// CustomEvaluator
///
/// Extension point for cross-cutting query transformations (for example a
/// soft-delete filter). Custom evaluators execute after the built-in set,
/// in registration order, on the same pure contract.
///

pub trait CustomEvaluator<E>: Send + Sync {
    /// Stable name used in logs and evaluator errors.
    fn name(&self) -> &'static str;

    /// Whether this evaluator also applies in criteria-only compilation.
    /// Return `true` when the transformation affects cardinality.
    fn is_criteria(&self) -> bool {
        false
    }

    fn apply(
        &self,
        query: ComposedQuery<E>,
        spec: &Specification<E>,
    ) -> Result<ComposedQuery<E>, SpecError>;
}

///
/// Evaluator
///
/// One tagged query transformation. Each variant consumes the current
/// composed query and the specification and returns a new composed query
/// with exactly one concern applied. The fixed relative order of the
/// built-in variants is enforced by `SpecificationEvaluator`, not by
/// builder call order.
///

pub enum Evaluator<E> {
    Where,
    Search,
    Order,
    Group,
    Include,
    Flags,
    Paging,
    Custom(Arc<dyn CustomEvaluator<E>>),
}

impl<E> Evaluator<E> {
    /// Whether this evaluator affects cardinality and therefore runs in
    /// criteria-only compilation.
    fn is_criteria(&self) -> bool {
        match self {
            Self::Where | Self::Search | Self::Group => true,
            Self::Order | Self::Include | Self::Flags | Self::Paging => false,
            Self::Custom(custom) => custom.is_criteria(),
        }
    }

    fn apply(
        &self,
        query: ComposedQuery<E>,
        spec: &Specification<E>,
    ) -> Result<ComposedQuery<E>, SpecError> {
        let query = match self {
            Self::Where => apply_where(query, spec),
            Self::Search => apply_search(query, spec),
            Self::Order => apply_order(query, spec),
            Self::Group => apply_group(query, spec),
            Self::Include => apply_include(query, spec),
            Self::Flags => apply_flags(query, spec),
            Self::Paging => apply_paging(query, spec),
            Self::Custom(custom) => custom.apply(query, spec)?,
        };

        Ok(query)
    }
}

impl<E> Clone for Evaluator<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Where => Self::Where,
            Self::Search => Self::Search,
            Self::Order => Self::Order,
            Self::Group => Self::Group,
            Self::Include => Self::Include,
            Self::Flags => Self::Flags,
            Self::Paging => Self::Paging,
            Self::Custom(custom) => Self::Custom(Arc::clone(custom)),
        }
    }
}

impl<E> fmt::Debug for Evaluator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Where => f.write_str("Where"),
            Self::Search => f.write_str("Search"),
            Self::Order => f.write_str("Order"),
            Self::Group => f.write_str("Group"),
            Self::Include => f.write_str("Include"),
            Self::Flags => f.write_str("Flags"),
            Self::Paging => f.write_str("Paging"),
            Self::Custom(custom) => write!(f, "Custom({})", custom.name()),
        }
    }
}

/// Fold all filter predicates with AND onto the composed query.
fn apply_where<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    for predicate in spec.filters() {
        query = query.and_predicate(predicate.clone());
    }
    query
}

/// For each search group, OR the group's terms and AND the group into the
/// filter stage.
fn apply_search<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    for (_, terms) in spec.search().iter() {
        let mut alternatives: Vec<Predicate> = terms
            .iter()
            .map(|term| Predicate::like(term.field.as_str(), term.pattern.as_str()))
            .collect();

        let group = match alternatives.len() {
            0 => continue,
            1 => alternatives.remove(0),
            _ => Predicate::Or(alternatives),
        };

        query = query.and_predicate(group);
    }
    query
}

/// Apply the order chain; the first key is primary, later keys break
/// ties. An empty chain leaves ordering provider-defined.
fn apply_order<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    if spec.orders().is_empty() {
        return query;
    }

    query.order = Some(OrderSpec {
        fields: spec
            .orders()
            .iter()
            .map(|order| (order.field.clone(), order.direction))
            .collect(),
    });
    query
}

fn apply_group<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    if let Some(field) = spec.group_by() {
        query.group = Some(field.to_string());
    }
    query
}

/// Append eager-load paths in configuration order.
fn apply_include<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    query.includes.extend(spec.includes().iter().cloned());
    query
}

/// Overlay provider options; unset tri-state flags leave the base query
/// (and thereby the provider default) untouched.
fn apply_flags<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    query.options.overlay(spec.options());
    query
}

/// Apply `skip` then `take`. Skipped entirely when both are unset; never
/// reached in criteria-only compilation.
fn apply_paging<E>(mut query: ComposedQuery<E>, spec: &Specification<E>) -> ComposedQuery<E> {
    if spec.skip().is_none() && spec.take().is_none() {
        return query;
    }

    query.page = Some(PageSpec::new(spec.skip(), spec.take()));
    query
}

///
/// SpecificationEvaluator
///
/// Orchestrates the ordered application of evaluators to a base query.
/// The built-in chain runs in one fixed relative order regardless of how
/// the specification was configured:
///
/// Where → Search → Order → Group → Include → Flags → Paging
///
/// Criteria-only compilation (count/exists callers) runs only the
/// evaluators that affect cardinality. Compilation is pure: evaluating the
/// same built specification twice yields an equal composed query.
///

pub struct SpecificationEvaluator<E> {
    evaluators: Vec<Evaluator<E>>,
}

impl<E> SpecificationEvaluator<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            evaluators: vec![
                Evaluator::Where,
                Evaluator::Search,
                Evaluator::Order,
                Evaluator::Group,
                Evaluator::Include,
                Evaluator::Flags,
                Evaluator::Paging,
            ],
        }
    }

    /// Append a custom evaluator; custom evaluators run after the
    /// built-in chain in registration order.
    #[must_use]
    pub fn with_custom(mut self, evaluator: Arc<dyn CustomEvaluator<E>>) -> Self {
        self.evaluators.push(Evaluator::Custom(evaluator));
        self
    }

    #[must_use]
    pub fn evaluators(&self) -> &[Evaluator<E>] {
        &self.evaluators
    }

    /// Compile a specification onto a base query.
    pub fn get_query(
        &self,
        base: ComposedQuery<E>,
        spec: &Specification<E>,
        criteria_only: bool,
    ) -> Result<ComposedQuery<E>, SpecError> {
        let mut query = base;
        for evaluator in &self.evaluators {
            if criteria_only && !evaluator.is_criteria() {
                continue;
            }
            query = evaluator.apply(query, spec)?;
        }

        tracing::debug!(
            entity = std::any::type_name::<E>(),
            criteria_only,
            evaluators = self.evaluators.len(),
            "compiled specification"
        );

        Ok(query)
    }

    /// Compile a projected specification. Every non-paging evaluator
    /// applies to the entity query; the selector attaches after them and
    /// the paging window applies to the projected sequence.
    pub fn get_projected_query<R>(
        &self,
        base: ComposedQuery<E>,
        spec: &ProjectedSpecification<E, R>,
    ) -> Result<ProjectedQuery<E, R>, SpecError> {
        if spec.base().group_by().is_some() {
            return Err(SpecError::GroupWithProjection);
        }

        let mut query = base;
        for evaluator in &self.evaluators {
            if matches!(evaluator, Evaluator::Paging) {
                continue;
            }
            query = evaluator.apply(query, spec.base())?;
        }

        let page = match (spec.base().skip(), spec.base().take()) {
            (None, None) => None,
            (skip, take) => Some(PageSpec::new(skip, take)),
        };

        tracing::debug!(
            entity = std::any::type_name::<E>(),
            result = std::any::type_name::<R>(),
            "compiled projected specification"
        );

        Ok(ProjectedQuery {
            query,
            selection: spec.selection().clone(),
            page,
        })
    }
}

impl<E> Default for SpecificationEvaluator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for SpecificationEvaluator<E> {
    fn clone(&self) -> Self {
        Self {
            evaluators: self.evaluators.clone(),
        }
    }
}

impl<E> fmt::Debug for SpecificationEvaluator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationEvaluator")
            .field("evaluators", &self.evaluators)
            .finish()
    }
}

#[cfg(test)]
mod tests;
