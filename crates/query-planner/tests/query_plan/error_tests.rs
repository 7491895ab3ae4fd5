use federation_query_planner::FieldOwnership;
use federation_query_planner::FieldType;
use federation_query_planner::ObjectType;
use federation_query_planner::Operation;
use federation_query_planner::OperationKind;
use federation_query_planner::PlanningContext;
use federation_query_planner::QueryPlanner;
use federation_query_planner::QueryPlannerConfig;
use federation_query_planner::Schema;
use federation_query_planner::Selection;
use federation_query_planner::SelectionSet;
use federation_query_planner::SinglePlanningError;
use federation_query_planner::TypeKind;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::support::leaf;
use super::support::node;
use super::support::schema_builder;
use super::support::set;

fn order_with(selections: SelectionSet) -> SelectionSet {
    set([Selection::field("order")
        .with_argument("id", 1)
        .with_selection_set(selections)])
}

fn search_with(selections: SelectionSet) -> SelectionSet {
    set([Selection::field("search").with_selection_set(selections)])
}

#[rstest]
#[case::unknown_root_field(
    set([leaf("shipments")]),
    SinglePlanningError::UnknownField {
        type_name: "Query".to_owned(),
        field_name: "shipments".to_owned(),
    }
)]
#[case::unknown_nested_field(
    order_with(set([leaf("weight")])),
    SinglePlanningError::UnknownField {
        type_name: "Order".to_owned(),
        field_name: "weight".to_owned(),
    }
)]
#[case::fragment_on_object(
    order_with(SelectionSet::new().with_fragment("Order", set([leaf("id")]))),
    SinglePlanningError::UnflattenedQuery { type_name: "Order".to_owned() }
)]
#[case::field_on_union(
    search_with(set([leaf("title")])),
    SinglePlanningError::UnionSelection {
        union_name: "SearchResult".to_owned(),
        selection: "title".to_owned(),
    }
)]
#[case::repeated_fragment(
    search_with(
        SelectionSet::new()
            .with_fragment("Book", set([leaf("title")]))
            .with_fragment("Book", set([leaf("isbn")]))
    ),
    SinglePlanningError::DuplicateFragment {
        union_name: "SearchResult".to_owned(),
        type_condition: "Book".to_owned(),
    }
)]
#[case::fragment_on_non_member(
    search_with(SelectionSet::new().with_fragment("Order", set([leaf("id")]))),
    SinglePlanningError::UnknownFragmentTarget {
        union_name: "SearchResult".to_owned(),
        type_condition: "Order".to_owned(),
    }
)]
#[case::sub_selection_on_scalar(
    order_with(set([node("total", [leaf("amount")])])),
    SinglePlanningError::UnsupportedType {
        type_name: "Float".to_owned(),
        kind: TypeKind::Scalar,
    }
)]
#[case::sub_selection_on_enum(
    order_with(set([node("status", [leaf("label")])])),
    SinglePlanningError::UnsupportedType {
        type_name: "OrderStatus".to_owned(),
        kind: TypeKind::Enum,
    }
)]
#[case::field_without_owner(
    order_with(set([leaf("notes")])),
    SinglePlanningError::UnownedField {
        type_name: "Order".to_owned(),
        field_name: "notes".to_owned(),
    }
)]
#[case::alias_shadowing_key(
    order_with(set([leaf("id").with_alias("__federation")])),
    SinglePlanningError::ReservedAlias {
        type_name: "Order".to_owned(),
        field_name: "id".to_owned(),
    }
)]
#[case::alias_shadowing_key_on_union(
    search_with(
        SelectionSet::new()
            .with_selection(Selection::typename().with_alias("__federation"))
            .with_fragment("Book", set([leaf("title"), node("reviews", [leaf("body")])]))
    ),
    SinglePlanningError::ReservedAlias {
        type_name: "SearchResult".to_owned(),
        field_name: "__typename".to_owned(),
    }
)]
#[case::key_with_sub_selection(
    order_with(set([Selection::federation_key().with_selection_set(set([leaf("id")]))])),
    SinglePlanningError::ReservedAlias {
        type_name: "Order".to_owned(),
        field_name: "__federation".to_owned(),
    }
)]
#[case::key_with_arguments(
    order_with(set([Selection::federation_key().with_argument("version", 2)])),
    SinglePlanningError::ReservedAlias {
        type_name: "Order".to_owned(),
        field_name: "__federation".to_owned(),
    }
)]
fn invalid_queries_are_rejected(
    #[case] selection_set: SelectionSet,
    #[case] expected: SinglePlanningError,
) {
    let planner = planner!();
    let error = planner
        .plan_root(&Operation::query(selection_set))
        .unwrap_err();
    assert_eq!(error.root_cause(), &expected);
}

#[test]
fn nested_errors_name_where_they_happened() {
    let planner = planner!();
    let error = planner
        .plan_root(&Operation::query(order_with(set([node(
            "customer",
            [leaf("age")],
        )]))))
        .unwrap_err();

    assert_eq!(
        error.contexts(),
        vec![
            &PlanningContext::Service("orders".to_owned()),
            &PlanningContext::Field("order".to_owned()),
            &PlanningContext::Service("users".to_owned()),
            &PlanningContext::Field("customer".to_owned()),
        ]
    );
    assert_eq!(
        error.to_string(),
        "planning for service \"orders\": planning for field \"order\": \
         planning for service \"users\": planning for field \"customer\": \
         type User has no field age"
    );
}

#[test]
fn fragment_errors_name_the_type_condition() {
    let planner = planner!();
    let error = planner
        .plan_root(&Operation::query(search_with(
            SelectionSet::new().with_fragment("Book", set([leaf("pages")])),
        )))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "planning for service \"catalog\": planning for field \"search\": \
         planning for fragment on \"Book\": type Book has no field pages"
    );
}

#[test]
fn unflattened_query_names_the_object() {
    let planner = planner!();
    let error = planner
        .plan_root(&Operation::query(order_with(
            SelectionSet::new().with_fragment("Order", set([leaf("id")])),
        )))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "planning for service \"orders\": planning for field \"order\": \
         selection set on Order has fragments, expected flattened query"
    );
}

#[test]
fn mutation_across_services_is_rejected() {
    let planner = planner!();
    let error = planner
        .plan_root(&Operation::mutation(set([
            node("placeOrder", [leaf("id")]),
            node("updateProfile", [leaf("name")]),
        ])))
        .unwrap_err();

    assert_eq!(
        error.root_cause(),
        &SinglePlanningError::MutationFanout {
            services: vec!["orders".to_owned(), "users".to_owned()],
        }
    );
    assert!(error.contexts().is_empty());
    assert_eq!(
        error.to_string(),
        "only support 1 mutation step to maintain ordering, mutation fields are resolved by orders, users"
    );
}

#[rstest]
#[case("subscription")]
#[case("Query")]
#[case("")]
fn unknown_operation_kinds_are_rejected(#[case] kind: &str) {
    let planner = planner!();
    let error = planner
        .plan_root(&Operation::new(kind, set([node("me", [leaf("name")])])))
        .unwrap_err();

    assert_eq!(
        error.root_cause(),
        &SinglePlanningError::UnknownOperationKind(kind.to_owned())
    );
}

#[test]
fn mutation_without_mutation_root_is_rejected() {
    let planner = planner!(
        schema = Schema::builder()
            .query_type("Query")
            .scalar("String")
            .object(ObjectType::new("Query").field("ping", FieldType::named("String")))
            .resolve("Query", "ping", FieldOwnership::new("health"))
    );
    let error = planner
        .plan_root(&Operation::mutation(set([leaf("ping")])))
        .unwrap_err();

    assert_eq!(
        error.root_cause(),
        &SinglePlanningError::MissingRootType {
            kind: OperationKind::Mutation,
        }
    );
    assert_eq!(error.to_string(), "schema has no mutation root type");
}

#[test]
fn planning_from_a_service_rejects_undefined_types() {
    let planner = planner!();
    let error = planner
        .plan_from_service(&FieldType::named("Shipment"), &set([leaf("id")]), "orders")
        .unwrap_err();

    assert_eq!(
        error.root_cause(),
        &SinglePlanningError::UnknownType {
            type_name: "Shipment".to_owned(),
        }
    );
}

#[test]
fn nesting_beyond_the_limit_is_rejected() {
    let config = QueryPlannerConfig {
        max_depth: 3,
        ..Default::default()
    };
    let planner = QueryPlanner::new(schema_builder().build().unwrap(), config);

    // me.reviews.author.reviews nests four fields deep.
    let operation = Operation::query(set([node(
        "me",
        [node(
            "reviews",
            [node("author", [node("reviews", [leaf("body")])])],
        )],
    )]));
    let error = planner.plan_root(&operation).unwrap_err();

    assert_eq!(
        error.root_cause(),
        &SinglePlanningError::RecursionLimitExceeded { limit: 3 }
    );
}
