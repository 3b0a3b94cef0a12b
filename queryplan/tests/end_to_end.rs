//! End-to-end scenarios over a `User { id, name, age }` record type (`id`
//! unique clustered, `{name}` non-unique, `{age,name}` non-unique), exercising
//! the full planner + executor pipeline through `QueryEngine`/`StandardQuery`.

mod common;

use std::sync::Arc;

use filter::{BoundFilter, ComparisonOperator, Filter, FilterValues, Value};

use queryplan::analyzer::{ForeignCatalog, IndexedQueryAnalyzer, NoJoins, UnionPlan, UnionQueryAnalyzer};
use queryplan::analyzer::ChosenIndex;
use queryplan::storage::QueryHints;
use queryplan::types::{Direction, OrderingEntry, TypeInfo};
use queryplan::QueryEngine;

use common::{cmp, eq, none_hints, MemoryStorage, Rec, UserTypeInfo};

struct NoCatalog;
impl ForeignCatalog for NoCatalog {
    fn type_info(&self, _type_name: &str) -> Option<Arc<dyn TypeInfo>> { None }
}

fn engine(records: Vec<Rec>) -> Arc<QueryEngine<Rec>> {
    let type_info: Arc<dyn TypeInfo> = Arc::new(UserTypeInfo::new());
    let storage = MemoryStorage::new(records);
    QueryEngine::new(type_info, storage, Arc::new(NoCatalog))
}

fn fixture() -> Vec<Rec> {
    vec![
        Rec::new(1, "Alice", 30),
        Rec::new(2, "Bob", 41),
        Rec::new(3, "Carol", 17),
        Rec::new(4, "Alice", 64),
        Rec::new(5, "Dave", 30),
    ]
}

#[tokio::test]
async fn scenario_1_equality_with_ordering_uses_composite_index() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(eq("age", 30)), vec![OrderingEntry::asc("name")], none_hints());

    let plan = query.print_plan().unwrap();
    assert!(plan.contains("age_name"), "expected the {{age,name}} index to be chosen, got: {plan}");

    let mut stream = query.fetch().await.unwrap();
    let mut names = Vec::new();
    while let Some(rec) = futures::StreamExt::next(&mut stream).await {
        names.push(rec.unwrap().name);
    }
    assert_eq!(names, vec!["Alice".to_string(), "Dave".to_string()]);
}

#[tokio::test]
async fn scenario_2_range_conjunction_uses_range_scan() {
    let engine = engine(fixture());
    let filter = cmp("age", ComparisonOperator::Gt, 18).and(cmp("age", ComparisonOperator::Lt, 65));
    let query = engine.query(BoundFilter::constant(filter), vec![], none_hints());

    let mut stream = query.fetch().await.unwrap();
    let mut ages = Vec::new();
    while let Some(rec) = futures::StreamExt::next(&mut stream).await {
        ages.push(rec.unwrap().age);
    }
    ages.sort();
    assert_eq!(ages, vec![30, 30, 41]);
}

#[tokio::test]
async fn scenario_3_mergeable_disjuncts_collapse_to_one_indexed_plan() {
    let engine = engine(fixture());
    let filter = eq("name", "Alice").or(eq("name", "Bob"));
    let query = engine.query(BoundFilter::constant(filter), vec![OrderingEntry::desc("id")], none_hints());

    let plan = query.print_plan().unwrap();
    assert!(!plan.contains("union"), "mergeable disjuncts on the same index should not produce a union, got: {plan}");

    let mut stream = query.fetch().await.unwrap();
    let mut ids = Vec::new();
    while let Some(rec) = futures::StreamExt::next(&mut stream).await {
        ids.push(rec.unwrap().id);
    }
    assert_eq!(ids, vec![4, 2, 1]);
}

#[tokio::test]
async fn scenario_4_unmergeable_disjuncts_union_with_primary_key_ordering() {
    let engine = engine(fixture());
    let filter = eq("age", 30).or(eq("name", "Alice"));
    let query = engine.query(BoundFilter::constant(filter), vec![], none_hints());

    let plan = query.print_plan().unwrap();
    assert!(plan.contains("union"), "disjuncts on different indexes should union, got: {plan}");

    let mut stream = query.fetch().await.unwrap();
    let mut ids = Vec::new();
    while let Some(rec) = futures::StreamExt::next(&mut stream).await {
        ids.push(rec.unwrap().id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids, vec![1, 4, 5]);
}

#[tokio::test]
async fn scenario_5_empty_filter_with_full_ordering_is_a_full_scan_index() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(Filter::Open), vec![OrderingEntry::asc("age"), OrderingEntry::asc("name")], none_hints());

    let plan = query.print_plan().unwrap();
    assert!(plan.contains("full index scan") && plan.contains("age_name"), "expected a full-scan-indexed plan, got: {plan}");

    let mut stream = query.fetch().await.unwrap();
    let mut ages = Vec::new();
    while let Some(rec) = futures::StreamExt::next(&mut stream).await {
        ages.push(rec.unwrap().age);
    }
    assert_eq!(ages, vec![17, 30, 30, 41, 64]);
}

#[tokio::test]
async fn closed_filter_always_yields_zero_records() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(Filter::Closed), vec![], none_hints());
    assert_eq!(query.count().await.unwrap(), 0);
}

#[tokio::test]
async fn unique_index_fully_bound_resolves_load_one() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(eq("id", 1i64)), vec![], none_hints());
    let rec = query.load_one().await.unwrap();
    assert_eq!(rec.name, "Alice");
}

#[tokio::test]
async fn descending_order_over_an_ascending_index_reverses_without_a_sort_stage() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(eq("age", 30)), vec![OrderingEntry::desc("name")], none_hints());
    let plan = query.print_plan().unwrap();
    assert!(!plan.contains("full sort"), "reversing a single-property index shouldn't need a full in-memory sort, got: {plan}");

    let mut stream = query.fetch().await.unwrap();
    let mut names = Vec::new();
    while let Some(rec) = futures::StreamExt::next(&mut stream).await {
        names.push(rec.unwrap().name);
    }
    assert_eq!(names, vec!["Dave".to_string(), "Alice".to_string()]);
}

#[tokio::test]
async fn load_one_fails_with_multiple_when_more_than_one_record_matches() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(eq("age", 30)), vec![], none_hints());
    let err = query.load_one().await.unwrap_err();
    assert!(matches!(err, queryplan::PlanError::Multiple));
}

#[tokio::test]
async fn load_one_fails_with_not_found_when_nothing_matches() {
    let engine = engine(fixture());
    let query = engine.query(BoundFilter::constant(eq("age", 999i64)), vec![], none_hints());
    let err = query.load_one().await.unwrap_err();
    assert!(matches!(err, queryplan::PlanError::NotFound));
}

#[tokio::test]
async fn unbound_filter_is_rejected_before_planning() {
    let engine = engine(fixture());
    let param_filter = Filter::Compare(filter::PropertyFilter::param("age", ComparisonOperator::Eq, 0));
    let query = engine.query(BoundFilter::new(param_filter, FilterValues::empty()), vec![], none_hints());
    let err = query.fetch().await.unwrap_err();
    assert!(matches!(err, queryplan::PlanError::Unbound));
}

/// Scenario 6 (join across `order.customerId`) is verified at the analyzer
/// level: a fully-fledged foreign storage harness is out of scope for these
/// fixtures, but the shape the planner picks for a cross-reference filter is
/// exactly what a `JoinResolver` needs to build a `Joined` executor from.
#[test]
fn scenario_6_join_predicate_resolves_to_a_foreign_chosen_index() {
    struct OrderTypeInfo {
        keys: Vec<queryplan::types::Key>,
        indexes: Vec<queryplan::types::IndexDescriptor>,
        refs: Vec<queryplan::types::ReferenceProperty>,
    }
    impl TypeInfo for OrderTypeInfo {
        fn type_name(&self) -> &str { "Order" }
        fn has_property(&self, _path: &filter::PropertyPath) -> bool { true }
        fn keys(&self) -> &[queryplan::types::Key] { &self.keys }
        fn indexes(&self) -> &[queryplan::types::IndexDescriptor] { &self.indexes }
        fn reference_properties(&self) -> &[queryplan::types::ReferenceProperty] { &self.refs }
    }

    struct UnitTypeInfo {
        keys: Vec<queryplan::types::Key>,
        indexes: Vec<queryplan::types::IndexDescriptor>,
    }
    impl TypeInfo for UnitTypeInfo {
        fn type_name(&self) -> &str { "U" }
        fn has_property(&self, _path: &filter::PropertyPath) -> bool { true }
        fn keys(&self) -> &[queryplan::types::Key] { &self.keys }
        fn indexes(&self) -> &[queryplan::types::IndexDescriptor] { &self.indexes }
        fn reference_properties(&self) -> &[queryplan::types::ReferenceProperty] { &[] }
    }

    struct Catalog;
    impl ForeignCatalog for Catalog {
        fn type_info(&self, type_name: &str) -> Option<Arc<dyn TypeInfo>> {
            match type_name {
                "U" => Some(Arc::new(UnitTypeInfo {
                    keys: vec![queryplan::types::Key::new("orderId", vec![filter::PropertyPath::direct("orderId")])],
                    indexes: vec![queryplan::types::IndexDescriptor::new(
                        "orderId_total",
                        vec![OrderingEntry::asc("orderId"), OrderingEntry::asc("total")],
                        false,
                        false,
                    )],
                })),
                _ => None,
            }
        }
    }

    let order_type: Arc<dyn TypeInfo> = Arc::new(OrderTypeInfo {
        keys: vec![queryplan::types::Key::new("id", vec![filter::PropertyPath::direct("id")])],
        indexes: vec![queryplan::types::IndexDescriptor::new("customerId", vec![OrderingEntry::asc("customerId")], false, false)],
        refs: vec![queryplan::types::ReferenceProperty {
            name: "order".to_string(),
            referenced_type: "U".to_string(),
            internal_keys: vec![filter::PropertyPath::direct("customerId")],
            external_keys: vec![filter::PropertyPath::direct("orderId")],
            outer_join: false,
        }],
    });

    let indexed = IndexedQueryAnalyzer::new(order_type.clone(), Arc::new(Catalog));
    let analyzer = UnionQueryAnalyzer::new(order_type, indexed);

    let join_filter = Filter::Compare(filter::PropertyFilter::eq(filter::PropertyPath::chain(["order", "total"]), 500i64));
    let plan = analyzer.analyze(&join_filter, &[], &QueryHints::none(), 1).unwrap();

    match plan {
        UnionPlan::Single(result) => assert!(matches!(result.chosen, ChosenIndex::Foreign { .. }), "expected a foreign chosen index"),
        UnionPlan::Empty => panic!("expected a single analysis result, got the empty plan"),
        UnionPlan::Union { .. } => panic!("expected a single analysis result, got a union plan"),
    }
}
