use std::collections::BTreeSet;

use federation_composition::CompositionError;
use federation_composition::CompositionOptions;
use federation_composition::ContractTagOptions;
use federation_composition::federate_subgraphs_contract;
use federation_composition::federate_subgraphs_with_contracts;
use federation_composition::schema::TypeKind;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use test_log::test;

use super::ServiceDefinition;
use super::field_names;
use super::has_type;
use super::normalized_sdl;
use super::parse_subgraphs;

const OBJECT: ServiceDefinition<'static> = ServiceDefinition {
    name: "object",
    type_defs: r#"
        type Object @tag(name: "one") {
          name: String!
        }
    "#,
};

const QUERY: ServiceDefinition<'static> = ServiceDefinition {
    name: "query",
    type_defs: r#"
        type Query {
          dummy: String!
        }
    "#,
};

#[test]
fn excluded_unreferenced_types_disappear() {
    let subgraphs = parse_subgraphs(&[OBJECT, QUERY]);
    let contracts = IndexMap::from([("one".to_owned(), ContractTagOptions::exclude(["one"]))]);
    let results =
        federate_subgraphs_with_contracts(&subgraphs, &contracts, &CompositionOptions::default())
            .unwrap();
    let contract = results["one"].as_ref().unwrap();
    assert_eq!(
        contract.federated_graph_client_sdl,
        normalized_sdl("type Query { dummy: String! }")
    );
    assert!(has_type(&contract.federated_graph_schema, "Object"));
    assert!(contract.federated_graph_sdl.contains("@inaccessible"));
}

#[test]
fn base_failures_fail_every_contract() {
    let subgraphs = parse_subgraphs(&[OBJECT]);
    let contracts = IndexMap::from([("one".to_owned(), ContractTagOptions::exclude(["one"]))]);
    let Err(failure) =
        federate_subgraphs_with_contracts(&subgraphs, &contracts, &CompositionOptions::default())
    else {
        panic!("expected the base federation to fail");
    };
    assert_eq!(
        failure.errors,
        vec![CompositionError::NoQueryRootType {
            is_router_schema: true
        }]
    );
}

#[test]
fn contracts_fail_independently() {
    let subgraphs = parse_subgraphs(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query {
              public: String @tag(name: "public")
              internal: Internal
            }
            type Internal @tag(name: "internal") {
              id: ID
            }
        "#,
    }]);
    let contracts = IndexMap::from([
        (
            "public".to_owned(),
            ContractTagOptions::exclude(["internal"]),
        ),
        (
            "everything".to_owned(),
            ContractTagOptions::exclude(["unused"]),
        ),
    ]);
    let results =
        federate_subgraphs_with_contracts(&subgraphs, &contracts, &CompositionOptions::default())
            .unwrap();
    let Err(failure) = &results["public"] else {
        panic!("expected the public contract to fail");
    };
    assert_eq!(
        failure.errors,
        vec![CompositionError::InvalidReferencesOfInaccessibleType {
            kind: TypeKind::Object,
            type_name: "Internal".to_owned(),
            paths: vec!["Query.internal".to_owned()],
        }]
    );
    assert!(results["everything"].is_ok());
}

#[test]
fn exclusion_and_inclusion_are_complementary() {
    let subgraphs = parse_subgraphs(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query {
              a: String @tag(name: "x")
              b: String @tag(name: "y")
              c: Int @tag(name: "y")
              d: Int @tag(name: "x")
            }
        "#,
    }]);
    let options = CompositionOptions::default();
    let excluded =
        federate_subgraphs_contract(&subgraphs, &ContractTagOptions::exclude(["x"]), &options)
            .unwrap();
    let included =
        federate_subgraphs_contract(&subgraphs, &ContractTagOptions::include(["x"]), &options)
            .unwrap();
    let excluded_fields: BTreeSet<String> =
        field_names(&excluded.federated_graph_client_schema, "Query")
            .into_iter()
            .collect();
    let included_fields: BTreeSet<String> =
        field_names(&included.federated_graph_client_schema, "Query")
            .into_iter()
            .collect();
    assert_eq!(
        excluded_fields.iter().map(String::as_str).collect::<Vec<_>>(),
        ["b", "c"]
    );
    assert_eq!(
        included_fields.iter().map(String::as_str).collect::<Vec<_>>(),
        ["a", "d"]
    );
    assert!(excluded_fields.is_disjoint(&included_fields));
}

#[test]
fn exclusion_wins_over_inclusion() {
    let subgraphs = parse_subgraphs(&[OBJECT, QUERY]);
    let options = ContractTagOptions {
        tag_names_to_exclude: BTreeSet::from(["one".to_owned()]),
        tag_names_to_include: BTreeSet::from(["one".to_owned()]),
    };
    let contract =
        federate_subgraphs_contract(&subgraphs, &options, &CompositionOptions::default()).unwrap();
    assert!(!has_type(&contract.federated_graph_client_schema, "Object"));
}
