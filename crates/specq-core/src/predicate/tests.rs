use super::*;
use crate::test_support::Store;
use proptest::prelude::*;

fn store() -> Store {
    Store::new(1, "Store")
}

#[test]
fn operator_composition_builds_the_expected_tree() {
    let combined = Predicate::gt("id", 0) & Predicate::like("name", "%tore%");

    let expected = Predicate::And(vec![
        Predicate::Compare(ComparePredicate::new("id", CompareOp::Gt, 0i64)),
        Predicate::Like {
            field: "name".to_string(),
            pattern: "%tore%".to_string(),
        },
    ]);

    assert_eq!(combined, expected);
}

#[test]
fn and_matches_the_intersection() {
    let p = Predicate::gt("id", 0) & Predicate::lt("id", 10);
    assert!(eval(&store(), &p));

    let p = Predicate::gt("id", 0) & Predicate::lt("id", 1);
    assert!(!eval(&store(), &p));
}

#[test]
fn or_and_not_compose() {
    let p = Predicate::eq("name", "Shop") | Predicate::eq("name", "Store");
    assert!(eval(&store(), &p));

    let p = Predicate::not(Predicate::eq("name", "Store"));
    assert!(!eval(&store(), &p));
}

#[test]
fn membership_uses_widening_equality() {
    let p = Predicate::in_("id", vec![3i64, 1, 2]);
    assert!(eval(&store(), &p));

    let p = Predicate::not_in("id", vec![3i64, 4]);
    assert!(eval(&store(), &p));

    // Non-list right side is an undefined comparison, not a panic.
    let p = Predicate::Compare(ComparePredicate::new("id", CompareOp::In, 1i64));
    assert!(!eval(&store(), &p));
}

#[test]
fn missing_fields_never_match() {
    let p = Predicate::eq("city", "Berlin");
    assert!(!eval(&store(), &p));

    let p = Predicate::like("city", "%erl%");
    assert!(!eval(&store(), &p));

    // Ne against a missing field is false too: absence is not inequality.
    let p = Predicate::ne("city", "Berlin");
    assert!(!eval(&store(), &p));
}

#[test]
fn incomparable_kinds_never_match() {
    let p = Predicate::gt("name", 5i64);
    assert!(!eval(&store(), &p));

    let p = Predicate::ne("name", 5i64);
    assert!(!eval(&store(), &p));
}

#[test]
fn predicates_round_trip_through_serde() {
    let p = (Predicate::gt("id", 0) & Predicate::like("name", "%tore%"))
        | Predicate::in_("id", vec![7i64, 9]);

    let json = serde_json::to_string(&p).unwrap();
    let back: Predicate = serde_json::from_str(&json).unwrap();

    assert_eq!(p, back);
}

proptest! {
    #[test]
    fn range_conjunction_agrees_with_arithmetic(x: i64, a: i64, b: i64) {
        let row = Store::new(x, "anything");
        let p = Predicate::gt("id", a) & Predicate::lt("id", b);
        prop_assert_eq!(eval(&row, &p), x > a && x < b);
    }

    #[test]
    fn not_inverts(x: i64, a: i64) {
        let row = Store::new(x, "anything");
        let p = Predicate::gte("id", a);
        prop_assert_eq!(eval(&row, &Predicate::not(p.clone())), !eval(&row, &p));
    }
}
