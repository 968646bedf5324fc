use crate::{
    cancel::CancelToken,
    entity::Entity,
    predicate::eval,
    query::{ComposedQuery, OrderDirection, OrderSpec, RowGroup},
    source::{MutableSource, QuerySource, SourceError},
    value::Value,
};
use futures::future::BoxFuture;
use std::cmp::Ordering;
use std::sync::RwLock;

///
/// MemorySource
///
/// Reference provider executing composed queries over an in-memory row
/// set. Post-access semantics are filter, then order, then page; on a
/// grouped query the paging window applies to the group list. Includes and
/// tracking/cache/split options are carried but have no effect here —
/// they exist for providers with real navigation loading and change
/// tracking.
///

#[derive(Debug, Default)]
pub struct MemorySource<E> {
    rows: RwLock<Vec<E>>,
}

impl<E: Entity> MemorySource<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_rows(rows: Vec<E>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Clone the current row set, in storage order.
    pub fn snapshot(&self) -> Result<Vec<E>, SourceError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<E>>, SourceError> {
        self.rows
            .read()
            .map_err(|_| SourceError::Provider("row store poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<E>>, SourceError> {
        self.rows
            .write()
            .map_err(|_| SourceError::Provider("row store poisoned".to_string()))
    }

    /// Rows passing the query predicate, in storage order.
    fn matching(&self, query: &ComposedQuery<E>, cancel: &CancelToken) -> Result<Vec<E>, SourceError> {
        let rows = self.read()?;
        let mut out = Vec::new();

        for row in rows.iter() {
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            let keep = query.predicate.as_ref().is_none_or(|p| eval(row, p));
            if keep {
                out.push(row.clone());
            }
        }

        Ok(out)
    }

    fn execute(&self, query: &ComposedQuery<E>, cancel: &CancelToken) -> Result<Vec<E>, SourceError> {
        let mut rows = self.matching(query, cancel)?;

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| compare_rows(a, b, order));
        }
        if let Some(page) = &query.page {
            rows = page.window(rows);
        }

        tracing::trace!(entity = E::NAME, rows = rows.len(), "memory fetch");
        Ok(rows)
    }

    fn execute_grouped(
        &self,
        query: &ComposedQuery<E>,
        cancel: &CancelToken,
    ) -> Result<Vec<RowGroup<E>>, SourceError> {
        let Some(field) = query.group.as_deref() else {
            return Err(SourceError::Provider(
                "grouped fetch requires a grouping key".to_string(),
            ));
        };

        let mut rows = self.matching(query, cancel)?;
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| compare_rows(a, b, order));
        }

        let mut groups: Vec<RowGroup<E>> = Vec::new();
        for row in rows {
            let key = row.get_value(field).unwrap_or(Value::Null);
            match groups.iter().position(|group| group.key == key) {
                Some(index) => groups[index].rows.push(row),
                None => groups.push(RowGroup {
                    key,
                    rows: vec![row],
                }),
            }
        }

        groups.sort_by(|a, b| a.key.compare(&b.key).unwrap_or(Ordering::Equal));

        if let Some(page) = &query.page {
            groups = page.window(groups);
        }

        Ok(groups)
    }

    fn count_rows(&self, query: &ComposedQuery<E>, cancel: &CancelToken) -> Result<u64, SourceError> {
        let rows = self.matching(query, cancel)?;

        let count = match query.group.as_deref() {
            Some(field) => {
                let mut keys: Vec<Value> = Vec::new();
                for row in &rows {
                    let key = row.get_value(field).unwrap_or(Value::Null);
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys.len()
            }
            None => rows.len(),
        };

        Ok(count as u64)
    }

    fn exists_row(&self, query: &ComposedQuery<E>, cancel: &CancelToken) -> Result<bool, SourceError> {
        let rows = self.read()?;

        for row in rows.iter() {
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            if query.predicate.as_ref().is_none_or(|p| eval(row, p)) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn insert_row(&self, entity: E, cancel: &CancelToken) -> Result<(), SourceError> {
        ensure_active(cancel)?;
        let mut rows = self.write()?;

        let key = entity.key_value();
        if rows.iter().any(|row| row.key_value() == key) {
            return Err(SourceError::Conflict {
                key: key.to_string(),
            });
        }

        rows.push(entity);
        Ok(())
    }

    fn update_row(&self, entity: E, cancel: &CancelToken) -> Result<(), SourceError> {
        ensure_active(cancel)?;
        let mut rows = self.write()?;

        let key = entity.key_value();
        match rows.iter_mut().find(|row| row.key_value() == key) {
            Some(row) => {
                *row = entity;
                Ok(())
            }
            None => Err(SourceError::Conflict {
                key: key.to_string(),
            }),
        }
    }

    fn remove_row(&self, entity: &E, cancel: &CancelToken) -> Result<(), SourceError> {
        ensure_active(cancel)?;
        let mut rows = self.write()?;

        let key = entity.key_value();
        match rows.iter().position(|row| row.key_value() == key) {
            Some(index) => {
                rows.remove(index);
                Ok(())
            }
            None => Err(SourceError::Conflict {
                key: key.to_string(),
            }),
        }
    }

    fn remove_matching_rows(
        &self,
        query: &ComposedQuery<E>,
        cancel: &CancelToken,
    ) -> Result<u64, SourceError> {
        ensure_active(cancel)?;
        let mut rows = self.write()?;

        let before = rows.len();
        rows.retain(|row| !query.predicate.as_ref().is_none_or(|p| eval(row, p)));
        let removed = before - rows.len();

        tracing::trace!(entity = E::NAME, removed, "memory remove_matching");
        Ok(removed as u64)
    }
}

fn ensure_active(cancel: &CancelToken) -> Result<(), SourceError> {
    if cancel.is_cancelled() {
        return Err(SourceError::Cancelled);
    }
    Ok(())
}

/// Multi-key row comparison. Missing or incomparable field values order
/// before present ones ascending, keeping sorts total and deterministic.
fn compare_rows<E: Entity>(a: &E, b: &E, order: &OrderSpec) -> Ordering {
    for (field, direction) in &order.fields {
        let ordering = compare_field(a.get_value(field), b.get_value(field));
        let ordering = match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn compare_field(a: Option<Value>, b: Option<Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(&b).unwrap_or(Ordering::Equal),
    }
}

impl<E: Entity> QuerySource<E> for MemorySource<E> {
    fn fetch<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<E>, SourceError>> {
        Box::pin(async move { self.execute(query, cancel) })
    }

    fn fetch_grouped<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<RowGroup<E>>, SourceError>> {
        Box::pin(async move { self.execute_grouped(query, cancel) })
    }

    fn count<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<u64, SourceError>> {
        Box::pin(async move { self.count_rows(query, cancel) })
    }

    fn exists<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<bool, SourceError>> {
        Box::pin(async move { self.exists_row(query, cancel) })
    }
}

impl<E: Entity> MutableSource<E> for MemorySource<E> {
    fn insert<'a>(
        &'a self,
        entity: E,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move { self.insert_row(entity, cancel) })
    }

    fn insert_many<'a>(
        &'a self,
        entities: Vec<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            for entity in entities {
                self.insert_row(entity, cancel)?;
            }
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        entity: E,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move { self.update_row(entity, cancel) })
    }

    fn update_many<'a>(
        &'a self,
        entities: Vec<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            for entity in entities {
                self.update_row(entity, cancel)?;
            }
            Ok(())
        })
    }

    fn remove<'a>(
        &'a self,
        entity: &'a E,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move { self.remove_row(entity, cancel) })
    }

    fn remove_many<'a>(
        &'a self,
        entities: &'a [E],
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            for entity in entities {
                self.remove_row(entity, cancel)?;
            }
            Ok(())
        })
    }

    fn remove_matching<'a>(
        &'a self,
        query: &'a ComposedQuery<E>,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<u64, SourceError>> {
        Box::pin(async move { self.remove_matching_rows(query, cancel) })
    }
}
