use crate::value::Value;

///
/// FieldValues
///
/// Field-by-name access over a row-like type as plain data. This is the
/// seam that lets predicates, ordering and grouping stay schema-agnostic:
/// everything downstream sees `Value`s, never concrete entity types.
///
/// Returning `None` means the field is absent on this row, which is
/// distinct from a present `Value::Null`.
///

pub trait FieldValues {
    fn get_value(&self, field: &str) -> Option<Value>;
}

///
/// Entity
///
/// Identity contract for queryable entities. The key is exposed as a plain
/// `Value` so id lookups compile to ordinary predicate data and providers
/// need no key-type knowledge.
///

pub trait Entity: FieldValues + Clone + Send + Sync + 'static {
    /// Stable entity name used in logs and error messages.
    const NAME: &'static str;

    /// Field name the key lives under; `key_value` must agree with
    /// `get_value(KEY_FIELD)`.
    const KEY_FIELD: &'static str;

    fn key_value(&self) -> Value;
}
