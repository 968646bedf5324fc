use crate::Error;
use specq_core::{
    cancel::CancelToken,
    entity::Entity,
    evaluator::SpecificationEvaluator,
    predicate::Predicate,
    query::{ComposedQuery, RowGroup},
    response::Response,
    source::{MutableSource, QuerySource},
    spec::{ProjectedSpecification, Specification},
    value::Value,
};

///
/// Repository
///
/// Execution facade over one query source. Specifications compile through
/// the evaluator chain into composed queries; materializing calls run them
/// against the provider. Count and existence callers compile
/// criteria-only, so paging, ordering, includes and flags never affect a
/// cardinality check. Post-processing runs strictly after materialization.
///
/// The composed query and the source belong to the caller's scope for the
/// duration of one operation; nothing is shared across calls.
///

pub struct Repository<E: Entity, S> {
    source: S,
    evaluator: SpecificationEvaluator<E>,
}

impl<E: Entity, S: QuerySource<E>> Repository<E, S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            evaluator: SpecificationEvaluator::new(),
        }
    }

    /// Build a repository with a custom evaluator chain.
    #[must_use]
    pub const fn with_evaluator(source: S, evaluator: SpecificationEvaluator<E>) -> Self {
        Self { source, evaluator }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    fn compile(
        &self,
        spec: &Specification<E>,
        criteria_only: bool,
    ) -> Result<ComposedQuery<E>, Error> {
        Ok(self
            .evaluator
            .get_query(ComposedQuery::new(), spec, criteria_only)?)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Materialize every row of the entity set.
    pub async fn list_all(&self, cancel: &CancelToken) -> Result<Vec<E>, Error> {
        Ok(self.source.fetch(&ComposedQuery::new(), cancel).await?)
    }

    /// Materialize the rows matching a specification, post-processed.
    pub async fn list(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<Vec<E>, Error> {
        let query = self.compile(spec, false)?;
        let rows = self.source.fetch(&query, cancel).await?;

        Ok(spec.post_process_rows(rows))
    }

    /// Materialize and project the rows matching a projected
    /// specification, post-processed on the result type.
    pub async fn list_projected<R>(
        &self,
        spec: &ProjectedSpecification<E, R>,
        cancel: &CancelToken,
    ) -> Result<Vec<R>, Error> {
        let projected = self
            .evaluator
            .get_projected_query(ComposedQuery::new(), spec)?;
        let rows = self.source.fetch(&projected.query, cancel).await?;

        Ok(spec.post_process_rows(projected.materialize(&rows)))
    }

    /// Materialize a grouped specification into keyed row groups.
    pub async fn list_grouped(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<Vec<RowGroup<E>>, Error> {
        let query = self.compile(spec, false)?;
        Ok(self.source.fetch_grouped(&query, cancel).await?)
    }

    /// First matching row in response order, or `None`.
    pub async fn first(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<Option<E>, Error> {
        let query = self.compile(spec, false)?;
        let rows = self.source.fetch(&query, cancel).await?;

        Ok(Response::new(E::NAME, rows).first_row())
    }

    /// First projected value in response order, or `None`.
    pub async fn first_projected<R>(
        &self,
        spec: &ProjectedSpecification<E, R>,
        cancel: &CancelToken,
    ) -> Result<Option<R>, Error> {
        let projected = self
            .evaluator
            .get_projected_query(ComposedQuery::new(), spec)?;
        let rows = self.source.fetch(&projected.query, cancel).await?;

        Ok(Response::new(E::NAME, projected.materialize(&rows)).first_row())
    }

    /// At most one matching row: `None` for zero matches, an
    /// ambiguous-result error for more than one.
    pub async fn single(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<Option<E>, Error> {
        let query = self.compile(spec, false)?;
        let rows = self.source.fetch(&query, cancel).await?;

        Ok(Response::new(E::NAME, rows).one_opt()?)
    }

    /// At most one projected value; same cardinality contract as `single`.
    pub async fn single_projected<R>(
        &self,
        spec: &ProjectedSpecification<E, R>,
        cancel: &CancelToken,
    ) -> Result<Option<R>, Error> {
        let projected = self
            .evaluator
            .get_projected_query(ComposedQuery::new(), spec)?;
        let rows = self.source.fetch(&projected.query, cancel).await?;

        Ok(Response::new(E::NAME, projected.materialize(&rows)).one_opt()?)
    }

    /// Look one row up by its key value. Absence is `None`, not an error.
    pub async fn get_by_id(
        &self,
        id: impl Into<Value>,
        cancel: &CancelToken,
    ) -> Result<Option<E>, Error> {
        let spec = Specification::<E>::builder()
            .filter(Predicate::eq(E::KEY_FIELD, id))
            .build()?;

        self.first(&spec, cancel).await
    }

    /// Count every row of the entity set.
    pub async fn count_all(&self, cancel: &CancelToken) -> Result<u64, Error> {
        Ok(self.source.count(&ComposedQuery::new(), cancel).await?)
    }

    /// Count rows matching a specification. Compiled criteria-only:
    /// paging configured on the specification never affects the count.
    pub async fn count(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<u64, Error> {
        let query = self.compile(spec, true)?;
        Ok(self.source.count(&query, cancel).await?)
    }

    /// Whether the entity set has any rows at all.
    pub async fn any_all(&self, cancel: &CancelToken) -> Result<bool, Error> {
        Ok(self.source.exists(&ComposedQuery::new(), cancel).await?)
    }

    /// Whether any row matches a specification. Compiled criteria-only.
    pub async fn any(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<bool, Error> {
        let query = self.compile(spec, true)?;
        Ok(self.source.exists(&query, cancel).await?)
    }
}

impl<E: Entity, S: MutableSource<E>> Repository<E, S> {
    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub async fn add(&self, entity: E, cancel: &CancelToken) -> Result<(), Error> {
        Ok(self.source.insert(entity, cancel).await?)
    }

    pub async fn add_range(&self, entities: Vec<E>, cancel: &CancelToken) -> Result<(), Error> {
        Ok(self.source.insert_many(entities, cancel).await?)
    }

    pub async fn update(&self, entity: E, cancel: &CancelToken) -> Result<(), Error> {
        Ok(self.source.update(entity, cancel).await?)
    }

    pub async fn update_range(&self, entities: Vec<E>, cancel: &CancelToken) -> Result<(), Error> {
        Ok(self.source.update_many(entities, cancel).await?)
    }

    pub async fn delete(&self, entity: &E, cancel: &CancelToken) -> Result<(), Error> {
        Ok(self.source.remove(entity, cancel).await?)
    }

    pub async fn delete_range(&self, entities: &[E], cancel: &CancelToken) -> Result<(), Error> {
        Ok(self.source.remove_many(entities, cancel).await?)
    }

    /// Delete every row matching a specification and return how many
    /// went. Compiled criteria-only: only filters, search and grouping
    /// decide what matches.
    pub async fn delete_matching(
        &self,
        spec: &Specification<E>,
        cancel: &CancelToken,
    ) -> Result<u64, Error> {
        let query = self.compile(spec, true)?;
        let removed = self.source.remove_matching(&query, cancel).await?;

        tracing::debug!(entity = E::NAME, removed, "delete_matching");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
