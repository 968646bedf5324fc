use derive_more::{Deref, IntoIterator};
use thiserror::Error as ThisError;

///
/// ResponseError
///
/// Cardinality violations when interpreting a materialized response.
/// Absence for first/optional lookups is `None`, never an error; only an
/// explicit exactly-one requirement turns 0 rows into `NotFound`.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ResponseError {
    #[error("expected exactly one row, found 0 (entity {entity})")]
    NotFound { entity: &'static str },

    #[error("expected at most one row, found {count} (entity {entity})")]
    NotUnique { entity: &'static str, count: u64 },
}

///
/// Response
///
/// Materialized query result rows for one entity (or projection) type,
/// with cardinality helpers.
///

#[derive(Clone, Debug, Deref, IntoIterator)]
pub struct Response<T> {
    #[deref]
    #[into_iterator(owned)]
    rows: Vec<T>,
    entity: &'static str,
}

impl<T> Response<T> {
    #[must_use]
    pub const fn new(entity: &'static str, rows: Vec<T>) -> Self {
        Self { rows, entity }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn count(&self) -> u64 {
        self.rows.len() as u64
    }

    /// First row in response order, if any.
    #[must_use]
    pub fn first_row(self) -> Option<T> {
        self.rows.into_iter().next()
    }

    /// Require exactly one row.
    pub fn one(self) -> Result<T, ResponseError> {
        let count = self.count();

        match count {
            0 => Err(ResponseError::NotFound {
                entity: self.entity,
            }),
            1 => Ok(self.rows.into_iter().next().unwrap()),
            _ => Err(ResponseError::NotUnique {
                entity: self.entity,
                count,
            }),
        }
    }

    /// Require at most one row.
    pub fn one_opt(self) -> Result<Option<T>, ResponseError> {
        let count = self.count();

        match count {
            0 => Ok(None),
            1 => Ok(self.rows.into_iter().next()),
            _ => Err(ResponseError::NotUnique {
                entity: self.entity,
                count,
            }),
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.rows
    }
}
