use super::*;
use crate::predicate::{CompareOp, ComparePredicate};
use crate::query::{OrderDirection, Toggle};
use crate::test_support::Store;
use crate::value::Value;
use std::sync::Arc;

fn compile(spec: &Specification<Store>) -> ComposedQuery<Store> {
    SpecificationEvaluator::new()
        .get_query(ComposedQuery::new(), spec, false)
        .unwrap()
}

fn compile_criteria(spec: &Specification<Store>) -> ComposedQuery<Store> {
    SpecificationEvaluator::new()
        .get_query(ComposedQuery::new(), spec, true)
        .unwrap()
}

#[test]
fn compilation_is_idempotent() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::gt("id", 0))
        .search("name", "%tore%")
        .order_by("id")
        .then_by("name")
        .include_path("company.country")
        .paginate(1, 1)
        .tracking(false)
        .build()
        .unwrap();

    assert_eq!(compile(&spec), compile(&spec));
    assert_eq!(compile_criteria(&spec), compile_criteria(&spec));
}

#[test]
fn filters_fold_with_and() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::gt("id", 0))
        .filter(Predicate::lt("id", 10))
        .build()
        .unwrap();

    let query = compile(&spec);

    let expected = Predicate::And(vec![
        Predicate::gt("id", 0),
        Predicate::lt("id", 10),
    ]);
    assert_eq!(query.predicate, Some(expected));
}

#[test]
fn search_groups_or_inside_and_between() {
    let spec = Specification::<Store>::builder()
        .search("name", "%tore%")
        .search("name", "%hop%")
        .search_group("city", "%ber%", 2)
        .build()
        .unwrap();

    let query = compile(&spec);

    let expected = Predicate::And(vec![
        Predicate::Or(vec![
            Predicate::like("name", "%tore%"),
            Predicate::like("name", "%hop%"),
        ]),
        Predicate::like("city", "%ber%"),
    ]);
    assert_eq!(query.predicate, Some(expected));
}

#[test]
fn single_term_groups_skip_the_or_wrapper() {
    let spec = Specification::<Store>::builder()
        .search("name", "%tore%")
        .build()
        .unwrap();

    let query = compile(&spec);
    assert_eq!(query.predicate, Some(Predicate::like("name", "%tore%")));
}

#[test]
fn order_chain_preserves_direction_per_key() {
    let spec = Specification::<Store>::builder()
        .order_by("id")
        .then_by_desc("name")
        .build()
        .unwrap();

    let query = compile(&spec);
    let order = query.order.unwrap();

    assert_eq!(
        order.fields,
        vec![
            ("id".to_string(), OrderDirection::Asc),
            ("name".to_string(), OrderDirection::Desc),
        ]
    );
}

#[test]
fn unordered_specifications_leave_ordering_provider_defined() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::True)
        .build()
        .unwrap();

    assert_eq!(compile(&spec).order, None);
}

#[test]
fn criteria_only_skips_order_include_paging_and_flags() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::gt("id", 0))
        .search("name", "%o%")
        .order_by("id")
        .include("company")
        .paginate(1, 1)
        .tracking(false)
        .group_by("city")
        .build()
        .unwrap();

    let query = compile_criteria(&spec);

    assert!(query.predicate.is_some());
    assert_eq!(query.group.as_deref(), Some("city"));
    assert_eq!(query.order, None);
    assert!(query.includes.is_empty());
    assert_eq!(query.page, None);
    assert_eq!(query.options.tracking, Toggle::Unset);
}

#[test]
fn paging_is_skipped_when_both_bounds_are_unset() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::True)
        .build()
        .unwrap();

    assert_eq!(compile(&spec).page, None);
}

#[test]
fn take_alone_still_truncates() {
    let spec = Specification::<Store>::builder().take(5).build().unwrap();

    let page = compile(&spec).page.unwrap();
    assert_eq!(page.skip, None);
    assert_eq!(page.take, Some(5));
}

#[test]
fn unset_flags_leave_base_query_options_untouched() {
    let spec = Specification::<Store>::builder()
        .cacheable(true)
        .build()
        .unwrap();

    let mut base = ComposedQuery::<Store>::new();
    base.options.tracking = Toggle::Off;

    let query = SpecificationEvaluator::new()
        .get_query(base, &spec, false)
        .unwrap();

    // The specification never touched tracking, so the base value stays.
    assert_eq!(query.options.tracking, Toggle::Off);
    assert_eq!(query.options.cacheable, Toggle::On);
}

struct TenantFilter;

impl CustomEvaluator<Store> for TenantFilter {
    fn name(&self) -> &'static str {
        "tenant-filter"
    }

    fn is_criteria(&self) -> bool {
        true
    }

    fn apply(
        &self,
        query: ComposedQuery<Store>,
        _spec: &Specification<Store>,
    ) -> Result<ComposedQuery<Store>, SpecError> {
        Ok(query.and_predicate(Predicate::ne("city", "closed")))
    }
}

#[test]
fn custom_evaluators_run_after_the_built_in_chain() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::gt("id", 0))
        .build()
        .unwrap();

    let evaluator = SpecificationEvaluator::new().with_custom(Arc::new(TenantFilter));
    let query = evaluator
        .get_query(ComposedQuery::new(), &spec, false)
        .unwrap();

    let expected = Predicate::And(vec![
        Predicate::gt("id", 0),
        Predicate::ne("city", "closed"),
    ]);
    assert_eq!(query.predicate, Some(expected));

    // Criteria evaluators participate in criteria-only compilation.
    let query = evaluator
        .get_query(ComposedQuery::new(), &spec, true)
        .unwrap();
    assert_eq!(query.predicate, Some(expected_criteria()));
}

fn expected_criteria() -> Predicate {
    Predicate::And(vec![
        Predicate::gt("id", 0),
        Predicate::ne("city", "closed"),
    ])
}

struct Rejecting;

impl CustomEvaluator<Store> for Rejecting {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn apply(
        &self,
        _query: ComposedQuery<Store>,
        _spec: &Specification<Store>,
    ) -> Result<ComposedQuery<Store>, SpecError> {
        Err(SpecError::Evaluator {
            name: "rejecting",
            message: "not allowed".to_string(),
        })
    }
}

#[test]
fn custom_evaluator_errors_fail_compilation_fast() {
    let spec = Specification::<Store>::builder().build().unwrap();

    let err = SpecificationEvaluator::new()
        .with_custom(Arc::new(Rejecting))
        .get_query(ComposedQuery::new(), &spec, false)
        .unwrap_err();

    assert!(matches!(err, SpecError::Evaluator { name: "rejecting", .. }));
}

#[test]
fn projected_compilation_moves_paging_past_the_selector() {
    let spec = Specification::<Store>::builder()
        .filter(Predicate::gt("id", 0))
        .order_by("id")
        .paginate(1, 2)
        .select(|store: &Store| store.name.clone())
        .build()
        .unwrap();

    let projected = SpecificationEvaluator::new()
        .get_projected_query(ComposedQuery::new(), &spec)
        .unwrap();

    // The entity query carries everything except paging.
    assert!(projected.query.predicate.is_some());
    assert!(projected.query.order.is_some());
    assert_eq!(projected.query.page, None);
    assert_eq!(projected.page, Some(PageSpec::new(Some(1), Some(2))));
}

#[test]
fn select_many_flattens_before_paging() {
    let spec = Specification::<Store>::builder()
        .take(3)
        .select_many(|store: &Store| {
            store.name.chars().map(|c| c.to_string()).collect()
        })
        .build()
        .unwrap();

    let projected = SpecificationEvaluator::new()
        .get_projected_query(ComposedQuery::new(), &spec)
        .unwrap();

    let rows = vec![Store::new(1, "ab"), Store::new(2, "cd")];
    let out = projected.materialize(&rows);

    // Four flattened values, truncated to three after flattening.
    assert_eq!(out, vec!["a", "b", "c"]);
}

#[test]
fn where_evaluator_preserves_predicate_shape() {
    // The composed predicate keeps the specification's exact data; no
    // normalization happens during compilation.
    let spec = Specification::<Store>::builder()
        .filter(Predicate::Compare(ComparePredicate::new(
            "id",
            CompareOp::In,
            Value::List(vec![Value::Int(1), Value::Int(2)]),
        )))
        .build()
        .unwrap();

    let query = compile(&spec);
    assert_eq!(
        query.predicate,
        Some(Predicate::in_("id", vec![1i64, 2])),
    );
}
