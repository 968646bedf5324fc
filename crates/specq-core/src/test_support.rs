//! Shared hand-rolled test entities for core tests.

use crate::{
    entity::{Entity, FieldValues},
    value::Value,
};

///
/// Store
///
/// Minimal retail entity used across core tests. `city` is optional and
/// reads as a missing field when unset, which the ordering and predicate
/// tests rely on.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Store {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
}

impl Store {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            city: None,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}

impl FieldValues for Store {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Int(self.id)),
            "name" => Some(self.name.as_str().into()),
            "city" => self.city.as_deref().map(Into::into),
            _ => None,
        }
    }
}

impl Entity for Store {
    const NAME: &'static str = "test_support::Store";
    const KEY_FIELD: &'static str = "id";

    fn key_value(&self) -> Value {
        Value::Int(self.id)
    }
}

/// The two-row fixture used by the scenario tests.
pub(crate) fn sample_stores() -> Vec<Store> {
    vec![Store::new(1, "Store"), Store::new(2, "Shop")]
}
