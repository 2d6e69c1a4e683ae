use federation_composition::CompositionError;
use federation_composition::CompositionOptions;
use federation_composition::federate_subgraphs;
use federation_composition::schema::TypeDefinitionData;
use federation_composition::schema::TypeKind;
use itertools::Itertools;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::ServiceDefinition;
use super::compose_successfully;
use super::compose_with_failure;
use super::error_codes;
use super::normalized_sdl;
use super::parse_subgraphs;

const USERS: ServiceDefinition<'static> = ServiceDefinition {
    name: "users",
    type_defs: r#"
        schema { query: RootQuery }
        type RootQuery {
          me: User
        }
        type User @key(fields: "id") {
          id: ID!
          name: String
        }
    "#,
};

const REVIEWS: ServiceDefinition<'static> = ServiceDefinition {
    name: "reviews",
    type_defs: r#"
        type Query {
          reviews(first: Int = 10): [Review!]!
        }
        type Review {
          body: String!
          author: User
        }
        extend type User @key(fields: "id") {
          id: ID! @external
          reviews: [Review!]!
        }
    "#,
};

const PRODUCTS: ServiceDefinition<'static> = ServiceDefinition {
    name: "products",
    type_defs: r#"
        type Query {
          products: [Product]
        }
        "A product."
        type Product @key(fields: "upc") {
          upc: String!
          price: Int
        }
    "#,
};

#[test_log::test]
fn merges_types_from_every_subgraph() {
    let success = compose_successfully(&[USERS, REVIEWS, PRODUCTS]);
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl(
            r#"
            "A product."
            type Product {
              price: Int
              upc: String!
            }

            type Query {
              me: User
              products: [Product]
              reviews(first: Int = 10): [Review!]!
            }

            type Review {
              author: User
              body: String!
            }

            type User {
              id: ID!
              name: String
              reviews: [Review!]!
            }
            "#
        )
    );
    assert!(success.warnings.is_empty());
}

#[rstest]
#[case::forward(&[0, 1, 2])]
#[case::reversed(&[2, 1, 0])]
#[case::rotated(&[1, 2, 0])]
fn output_does_not_depend_on_subgraph_order(#[case] order: &[usize]) {
    let services = [USERS, REVIEWS, PRODUCTS];
    let expected = compose_successfully(&services);
    let subgraphs = parse_subgraphs(&services);
    let reordered = order
        .iter()
        .map(|index| subgraphs[*index].clone())
        .collect_vec();
    let actual = federate_subgraphs(&reordered, &CompositionOptions::default()).unwrap();
    assert_eq!(actual.federated_graph_sdl, expected.federated_graph_sdl);
    assert_eq!(
        actual.federated_graph_client_sdl,
        expected.federated_graph_client_sdl
    );
}

const NON_NULL_SHAPES: ServiceDefinition<'static> = ServiceDefinition {
    name: "strict",
    type_defs: r#"
        type Query {
          names: [String!]!
          search(term: String!, tags: [String!]!): [Int]
        }
    "#,
};

const NULLABLE_SHAPES: ServiceDefinition<'static> = ServiceDefinition {
    name: "lenient",
    type_defs: r#"
        type Query {
          names: [String!]
          search(term: String, tags: [String]): [Int!]
        }
    "#,
};

#[rstest]
#[case::strict_first([NON_NULL_SHAPES, NULLABLE_SHAPES])]
#[case::lenient_first([NULLABLE_SHAPES, NON_NULL_SHAPES])]
fn wrapper_differences_merge_the_same_in_either_order(#[case] services: [ServiceDefinition<'static>; 2]) {
    let success = compose_successfully(&services);
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl(
            r#"
            type Query {
              names: [String!]
              search(tags: [String!]!, term: String!): [Int]
            }
            "#
        )
    );
}

#[test_log::test]
fn nullable_output_types_win() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { name: String! list: [Int!]! }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { name: String list: [Int!] }",
        },
    ]);
    let Some(TypeDefinitionData::Object(query)) = success.registry().get("Query") else {
        panic!("expected a Query object");
    };
    assert_eq!(query.fields["name"].ty.to_string(), "String");
    assert_eq!(query.fields["list"].ty.to_string(), "[Int!]");
}

#[test_log::test]
fn non_null_input_types_win() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { search(term: String!): [String] }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { search(term: String): [String] }",
        },
    ]);
    let Some(TypeDefinitionData::Object(query)) = success.registry().get("Query") else {
        panic!("expected a Query object");
    };
    assert_eq!(
        query.fields["search"].arguments["term"].ty.to_string(),
        "String!"
    );
}

#[test_log::test]
fn incompatible_field_types_fail() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { value: String }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { value: Int }",
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::IncompatibleMergedTypes {
            coords: "Query.value".to_owned(),
            expected: "String".to_owned(),
            actual: "Int".to_owned(),
            is_argument: false,
        }]
    );
}

#[test_log::test]
fn incompatible_parent_kinds_fail() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { a: Thing } type Thing { id: ID }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { b: Thing } enum Thing { ONE }",
        },
    ]);
    assert!(error_codes(&failure).contains(&"INCOMPATIBLE_PARENT_KIND"));
}

#[test_log::test]
fn required_arguments_must_be_defined_everywhere() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { items(first: Int!): [String] }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { items: [String] }",
        },
    ]);
    assert_eq!(error_codes(&failure), ["INVALID_REQUIRED_INPUT_VALUE"]);
    assert!(failure.errors[0].to_string().contains(
        "The argument \"first\" is required in the following subgraph: \"a\""
    ));
}

#[test_log::test]
fn conflicting_default_values_fail() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { items(first: Int = 5): [String] }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { items(first: Int = 10): [String] }",
        },
    ]);
    assert_eq!(error_codes(&failure), ["INCOMPATIBLE_INPUT_VALUE_DEFAULT_VALUES"]);
}

#[test_log::test]
fn input_enums_keep_the_intersection_of_values() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { a(status: Status): String } enum Status { ACTIVE ARCHIVED }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { b(status: Status): String } enum Status { ACTIVE }",
        },
    ]);
    let Some(TypeDefinitionData::Enum(status)) = success.registry().get("Status") else {
        panic!("expected a Status enum");
    };
    assert_eq!(status.values.keys().map(|name| name.as_str()).collect_vec(), ["ACTIVE"]);
}

#[test_log::test]
fn output_enums_keep_the_union_of_values() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { a: Status } enum Status { ACTIVE }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { b: Status } enum Status { ARCHIVED }",
        },
    ]);
    assert!(
        success
            .federated_graph_client_sdl
            .contains("enum Status {\n  ACTIVE\n  ARCHIVED\n}")
    );
}

#[test_log::test]
fn enums_used_as_input_and_output_must_match() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { a(status: Status): Status } enum Status { ACTIVE ARCHIVED }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { b: Status } enum Status { ACTIVE }",
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::IncompatibleSharedEnum {
            type_name: "Status".to_owned()
        }]
    );
}

#[test_log::test]
fn input_objects_require_shared_required_fields() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { a(filter: Filter): String } input Filter { term: String! limit: Int }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { b(filter: Filter): String } input Filter { limit: Int }",
        },
    ]);
    assert_eq!(error_codes(&failure), ["INVALID_REQUIRED_INPUT_VALUE"]);
}

#[test_log::test]
fn extensions_need_a_base_definition() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: "type Query { widget: Widget } extend type Widget { id: ID }",
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::NoBaseDefinitionForExtension {
            kind: TypeKind::Object,
            type_name: "Widget".to_owned(),
        }]
    );
}

#[test_log::test]
fn interface_implementations_are_validated() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { node: Node }
                interface Node { id: ID! name: String }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query { user: User }
                interface Node { id: ID! }
                type User implements Node { id: ID }
            "#,
        },
    ]);
    assert_eq!(error_codes(&failure), ["INVALID_INTERFACE_IMPLEMENTATION"]);
    let message = failure.errors[0].to_string();
    assert!(message.contains("The following field is not implemented: \"name\""));
    assert!(message.contains(
        "The implemented response type \"ID\" is not a valid subtype (equally or more restrictive) of the response type \"ID!\" for \"Node.id\"."
    ));
}

#[test_log::test]
fn missing_query_root_fails() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: "type Product { id: ID }",
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::NoQueryRootType {
            is_router_schema: true
        }]
    );
}

#[test_log::test]
fn invalid_subgraphs_are_reported_by_name() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: "type Query { a: String }",
        },
        ServiceDefinition {
            name: "b",
            type_defs: "type Query { b: Missing }",
        },
    ]);
    assert_eq!(error_codes(&failure), ["SUBGRAPH_VALIDATION"]);
    assert!(
        failure.errors[0]
            .to_string()
            .starts_with("The subgraph \"b\" could not be federated")
    );
}
