use super::*;
use specq_core::{
    entity::FieldValues,
    evaluator::CustomEvaluator,
    memory::MemorySource,
    response::ResponseError,
    source::SourceError,
    spec::SpecError,
};
use std::sync::Arc;

///
/// Store
///
/// Facade-level test entity mirroring the core fixtures.
///

#[derive(Clone, Debug, Eq, PartialEq)]
struct Store {
    id: i64,
    name: String,
    archived: bool,
}

impl Store {
    fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            archived: false,
        }
    }

    fn archived(mut self) -> Self {
        self.archived = true;
        self
    }
}

impl FieldValues for Store {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Int(self.id)),
            "name" => Some(self.name.as_str().into()),
            "archived" => Some(Value::Bool(self.archived)),
            _ => None,
        }
    }
}

impl Entity for Store {
    const NAME: &'static str = "tests::Store";
    const KEY_FIELD: &'static str = "id";

    fn key_value(&self) -> Value {
        Value::Int(self.id)
    }
}

fn repository() -> Repository<Store, MemorySource<Store>> {
    Repository::new(MemorySource::with_rows(vec![
        Store::new(1, "Store"),
        Store::new(2, "Shop"),
    ]))
}

fn by_name(pattern: &str) -> Specification<Store> {
    Specification::builder()
        .search("name", pattern)
        .build()
        .unwrap()
}

#[tokio::test]
async fn list_applies_the_full_pipeline() {
    let spec = Specification::builder()
        .filter(Predicate::gt("id", 0))
        .order_by("id")
        .skip(1)
        .take(1)
        .build()
        .unwrap();

    let rows = repository().list(&spec, &CancelToken::new()).await.unwrap();

    assert_eq!(rows, vec![Store::new(2, "Shop")]);
}

#[tokio::test]
async fn search_matches_case_insensitively() {
    let rows = repository()
        .list(&by_name("%tore%"), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(rows, vec![Store::new(1, "Store")]);
}

#[tokio::test]
async fn search_groups_and_between_or_within() {
    let repo = repository();
    let cancel = CancelToken::new();

    // Same group: either pattern may match.
    let spec = Specification::builder()
        .search("name", "%tore%")
        .search("name", "%hop%")
        .build()
        .unwrap();
    assert_eq!(repo.count(&spec, &cancel).await.unwrap(), 2);

    // Distinct groups: both patterns must match the same row.
    let spec = Specification::builder()
        .search("name", "%tore%")
        .search_group("name", "%oo%", 2)
        .build()
        .unwrap();
    assert_eq!(repo.count(&spec, &cancel).await.unwrap(), 0);

    let spec = Specification::builder()
        .search("name", "%tore%")
        .search_group("name", "%o%", 2)
        .build()
        .unwrap();
    assert_eq!(repo.count(&spec, &cancel).await.unwrap(), 1);
}

#[tokio::test]
async fn post_processing_runs_after_materialization() {
    let spec = Specification::builder()
        .order_by("id")
        .post_process(|mut rows: Vec<Store>| {
            rows.reverse();
            rows
        })
        .build()
        .unwrap();

    let rows = repository().list(&spec, &CancelToken::new()).await.unwrap();
    let ids: Vec<i64> = rows.iter().map(|s| s.id).collect();

    // The compiled query sorted ascending; the reverse proves the step ran
    // on materialized rows, not inside the query.
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn count_ignores_paging_configured_on_the_specification() {
    let spec = Specification::builder()
        .filter(Predicate::gt("id", 1))
        .skip(5)
        .take(1)
        .build()
        .unwrap();

    let count = repository().count(&spec, &CancelToken::new()).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn single_distinguishes_absence_from_ambiguity() {
    let repo = repository();
    let cancel = CancelToken::new();

    let none = repo.single(&by_name("%zzz%"), &cancel).await.unwrap();
    assert_eq!(none, None);

    let err = repo.single(&by_name("%o%"), &cancel).await.unwrap_err();
    assert_eq!(
        err,
        Error::Response(ResponseError::NotUnique {
            entity: Store::NAME,
            count: 2
        })
    );
}

#[tokio::test]
async fn first_returns_the_lowest_ordered_row() {
    let spec = Specification::builder().order_by_desc("id").build().unwrap();

    let first = repository().first(&spec, &CancelToken::new()).await.unwrap();
    assert_eq!(first, Some(Store::new(2, "Shop")));
}

#[tokio::test]
async fn get_by_id_is_an_ordinary_key_predicate() {
    let repo = repository();
    let cancel = CancelToken::new();

    let found = repo.get_by_id(2i64, &cancel).await.unwrap();
    assert_eq!(found, Some(Store::new(2, "Shop")));

    let missing = repo.get_by_id(99i64, &cancel).await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn projected_queries_page_after_flattening() {
    let spec = Specification::builder()
        .order_by("id")
        .take(3)
        .select_many(|store: &Store| store.name.chars().map(|c| c.to_string()).collect())
        .build()
        .unwrap();

    let out = repository()
        .list_projected(&spec, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(out, vec!["S", "t", "o"]);
}

#[tokio::test]
async fn projected_single_keeps_the_cardinality_contract() {
    let spec = Specification::builder()
        .filter(Predicate::eq("id", 1i64))
        .select(|store: &Store| store.name.clone())
        .build()
        .unwrap();

    let name = repository()
        .single_projected(&spec, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(name, Some("Store".to_string()));

    let spec = Specification::builder()
        .select(|store: &Store| store.id)
        .build()
        .unwrap();

    let err = repository()
        .single_projected(&spec, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Response(ResponseError::NotUnique { .. })
    ));
}

#[tokio::test]
async fn projected_post_processing_sees_projected_rows() {
    let spec = Specification::builder()
        .order_by("id")
        .select(|store: &Store| store.name.clone())
        .post_process(|mut names: Vec<String>| {
            names.reverse();
            names
        })
        .build()
        .unwrap();

    let names = repository()
        .list_projected(&spec, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(names, vec!["Shop", "Store"]);
}

#[tokio::test]
async fn invalid_configuration_fails_before_the_provider_runs() {
    let err = Specification::<Store>::builder()
        .then_by("name")
        .build()
        .unwrap_err();

    assert_eq!(err, SpecError::ThenByWithoutOrder);
}

#[tokio::test]
async fn grouped_lists_come_back_keyed() {
    let repo = Repository::new(MemorySource::with_rows(vec![
        Store::new(1, "Store"),
        Store::new(2, "Shop"),
        Store::new(3, "Shop"),
    ]));

    let spec = Specification::builder().group_by("name").build().unwrap();
    let groups = repo.list_grouped(&spec, &CancelToken::new()).await.unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, Value::from("Shop"));
    assert_eq!(groups[0].rows.len(), 2);
}

#[tokio::test]
async fn writes_round_trip_through_the_source() {
    let repo = repository();
    let cancel = CancelToken::new();

    repo.add(Store::new(3, "Depot"), &cancel).await.unwrap();
    assert_eq!(repo.count_all(&cancel).await.unwrap(), 3);

    repo.update(Store::new(3, "Warehouse"), &cancel).await.unwrap();
    let updated = repo.get_by_id(3i64, &cancel).await.unwrap().unwrap();
    assert_eq!(updated.name, "Warehouse");

    repo.delete(&updated, &cancel).await.unwrap();
    assert_eq!(repo.count_all(&cancel).await.unwrap(), 2);
}

#[tokio::test]
async fn delete_matching_uses_criteria_only_compilation() {
    let repo = repository();
    let cancel = CancelToken::new();

    // Paging on a delete specification must not shrink the deletion set.
    let spec = Specification::builder()
        .filter(Predicate::gt("id", 0))
        .take(1)
        .build()
        .unwrap();

    let removed = repo.delete_matching(&spec, &cancel).await.unwrap();
    assert_eq!(removed, 2);
    assert!(!repo.any_all(&cancel).await.unwrap());
}

#[tokio::test]
async fn cancellation_surfaces_as_a_source_error() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = repository().list_all(&cancel).await.unwrap_err();
    assert_eq!(err, Error::Source(SourceError::Cancelled));
    assert!(err.is_provider());
}

struct NotArchived;

impl CustomEvaluator<Store> for NotArchived {
    fn name(&self) -> &'static str {
        "not-archived"
    }

    fn is_criteria(&self) -> bool {
        true
    }

    fn apply(
        &self,
        query: ComposedQuery<Store>,
        _spec: &Specification<Store>,
    ) -> Result<ComposedQuery<Store>, SpecError> {
        Ok(query.and_predicate(Predicate::eq("archived", false)))
    }
}

#[tokio::test]
async fn custom_evaluators_extend_every_execution_path() {
    let source = MemorySource::with_rows(vec![
        Store::new(1, "Store"),
        Store::new(2, "Shop").archived(),
    ]);
    let evaluator = SpecificationEvaluator::new().with_custom(Arc::new(NotArchived));
    let repo = Repository::with_evaluator(source, evaluator);
    let cancel = CancelToken::new();

    let spec = Specification::builder()
        .filter(Predicate::gt("id", 0))
        .build()
        .unwrap();

    let rows = repo.list(&spec, &cancel).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);

    // Criteria-flagged custom evaluators shape counts too.
    assert_eq!(repo.count(&spec, &cancel).await.unwrap(), 1);
}
