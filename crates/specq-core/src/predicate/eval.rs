use crate::{
    entity::FieldValues,
    predicate::{CompareOp, ComparePredicate, Predicate},
    value::Value,
};
use std::cmp::Ordering;

///
/// FieldPresence
///
/// Result of reading a field from a row during predicate evaluation.
/// Distinguishes a missing field from a present field whose value is
/// `Value::Null`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldPresence {
    Present(Value),
    Missing,
}

///
/// Row
///
/// Abstraction over a row-like value that exposes fields by name,
/// decoupling predicate evaluation from concrete entity types.
///

pub trait Row {
    fn field(&self, name: &str) -> FieldPresence;
}

impl<T: FieldValues> Row for T {
    fn field(&self, name: &str) -> FieldPresence {
        match self.get_value(name) {
            Some(value) => FieldPresence::Present(value),
            None => FieldPresence::Missing,
        }
    }
}

///
/// Evaluate a predicate against a single row.
///
/// Pure runtime evaluation: no provider access, no planning. Missing
/// fields and undefined comparisons evaluate to `false`, never panic.
///
#[must_use]
pub fn eval<R: Row + ?Sized>(row: &R, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::False => false,

        Predicate::And(children) => children.iter().all(|child| eval(row, child)),
        Predicate::Or(children) => children.iter().any(|child| eval(row, child)),
        Predicate::Not(inner) => !eval(row, inner),

        Predicate::Compare(cmp) => eval_compare(row, cmp),

        Predicate::Like { field, pattern } => match row.field(field) {
            FieldPresence::Present(value) => value.text_like(pattern).unwrap_or(false),
            FieldPresence::Missing => false,
        },
    }
}

/// Returns `false` when the field is missing or the comparison is not
/// defined for the value kinds involved.
fn eval_compare<R: Row + ?Sized>(row: &R, cmp: &ComparePredicate) -> bool {
    let ComparePredicate { field, op, value } = cmp;

    let FieldPresence::Present(actual) = row.field(field) else {
        return false;
    };

    match op {
        CompareOp::Eq => actual.equal(value),
        CompareOp::Ne => actual.compare(value).is_some_and(Ordering::is_ne),

        CompareOp::Lt => actual.compare(value).is_some_and(Ordering::is_lt),
        CompareOp::Lte => actual.compare(value).is_some_and(Ordering::is_le),
        CompareOp::Gt => actual.compare(value).is_some_and(Ordering::is_gt),
        CompareOp::Gte => actual.compare(value).is_some_and(Ordering::is_ge),

        CompareOp::In => in_list(&actual, value).unwrap_or(false),
        CompareOp::NotIn => in_list(&actual, value).is_some_and(|matched| !matched),
    }
}

/// Membership against a list value; `None` when the right side is not a
/// list.
fn in_list(actual: &Value, value: &Value) -> Option<bool> {
    match value {
        Value::List(candidates) => Some(candidates.iter().any(|candidate| actual.equal(candidate))),
        _ => None,
    }
}
