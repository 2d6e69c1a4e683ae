use federation_composition::CompositionError;
use federation_composition::WarningCode;
use federation_composition::error::ShareabilityViolation;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use test_log::test;

use super::ServiceDefinition;
use super::compose_successfully;
use super::compose_with_failure;
use super::field_names;

#[test]
fn unshareable_fields_in_multiple_subgraphs_fail() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { product: Product @shareable }
                type Product @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Product @key(fields: "id") {
                  id: ID!
                  name: String @shareable
                }
            "#,
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::InvalidFieldShareability {
            type_name: "Product".to_owned(),
            violations: vec![ShareabilityViolation {
                field_name: "name".to_owned(),
                shareable_subgraphs: vec!["b".to_owned()],
                non_shareable_subgraphs: vec!["a".to_owned()],
            }],
        }]
    );
}

#[test]
fn version_one_fields_are_implicitly_shareable() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { product: Product }
                type Product @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Product @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
    ]);
    assert_eq!(
        field_names(&success.federated_graph_client_schema, "Product"),
        ["id", "name"]
    );
}

#[test]
fn object_level_shareable_covers_its_fields() {
    compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { position: Position @shareable }
                type Position @shareable {
                  x: Int!
                  y: Int!
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query { position: Position @shareable }
                type Position @shareable {
                  x: Int!
                  y: Int!
                }
            "#,
        },
    ]);
}

#[test]
fn overridden_instances_do_not_count() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  total: Int @override(from: "b")
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query {
                  total: Int
                  other: String @shareable
                }
            "#,
        },
    ]);
    assert_eq!(
        field_names(&success.federated_graph_client_schema, "Query"),
        ["other", "total"]
    );
}

#[test]
fn unknown_override_sources_are_ignored_with_a_warning() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  total: Int @override(from: "missing")
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query {
                  total: Int
                  other: String @shareable
                }
            "#,
        },
    ]);
    assert_eq!(
        failure
            .warnings
            .iter()
            .map(|warning| (warning.code, warning.subgraph.as_str()))
            .collect::<Vec<_>>(),
        [(WarningCode::InvalidOverrideTargetSubgraphName, "a")]
    );
    assert_eq!(
        failure.errors[0].code(),
        "INVALID_FIELD_SHAREABILITY",
        "the ignored override leaves two unshareable instances"
    );
}

#[test]
fn fields_external_everywhere_fail() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { product: Product }
                type Product @key(fields: "id") {
                  id: ID!
                  name: String @external
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Product @key(fields: "id") {
                  id: ID!
                  name: String @external
                }
            "#,
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::AllExternalFieldInstances {
            type_name: "Product".to_owned(),
            subgraph_names_by_field_name: IndexMap::from([(
                "name".to_owned(),
                vec!["a".to_owned(), "b".to_owned()]
            )]),
        }]
    );
}

#[test]
fn conditionally_provided_external_fields_are_not_resolvable_instances() {
    compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { product: Product @provides(fields: "name") @shareable }
                type Product @key(fields: "id") {
                  id: ID!
                  name: String @external
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Product @key(fields: "id") {
                  id: ID!
                  name: String
                }
            "#,
        },
    ]);
}
