use federation_composition::CompositionError;
use federation_composition::schema::TypeKind;
use pretty_assertions::assert_eq;
use test_log::test;

use super::ServiceDefinition;
use super::compose_successfully;
use super::compose_with_failure;
use super::field_names;
use super::has_type;
use super::normalized_sdl;

#[test]
fn inaccessible_elements_stay_in_the_router_schema() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  me: User @inaccessible
                  users: [User]
                }
                type User @key(fields: "id") {
                  id: ID!
                  name: String!
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type User @key(fields: "id") {
                  id: ID!
                  age: Int! @inaccessible
                }
            "#,
        },
    ]);
    assert!(success.federated_graph_sdl.contains("me: User @inaccessible"));
    assert!(success.federated_graph_sdl.contains("age: Int! @inaccessible"));
    assert_eq!(
        field_names(&success.federated_graph_client_schema, "Query"),
        ["users"]
    );
    assert_eq!(
        field_names(&success.federated_graph_client_schema, "User"),
        ["id", "name"]
    );
    assert!(!success.federated_graph_client_sdl.contains("@inaccessible"));
}

#[test]
fn objects_without_accessible_fields_are_removed() {
    let success = compose_successfully(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query { dummy: String! }
            type Object { name: String! @inaccessible }
        "#,
    }]);
    assert!(has_type(&success.federated_graph_schema, "Object"));
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl("type Query { dummy: String! }")
    );
}

#[test]
fn unions_without_accessible_members_fail() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query {
              dummy: String!
              union: Union
            }
            union Union = Object
            type Object { name: String! @inaccessible }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::AllChildDefinitionsAreInaccessible {
            kind: TypeKind::Union,
            type_name: "Union".to_owned(),
            child_type: "union member type".to_owned(),
        }]
    );
}

#[test]
fn referenced_objects_without_accessible_fields_fail() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query { object: Object }
            type Object { name: String! @inaccessible }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::AllChildDefinitionsAreInaccessible {
            kind: TypeKind::Object,
            type_name: "Object".to_owned(),
            child_type: "field".to_owned(),
        }]
    );
}

#[test]
fn inaccessible_types_must_not_be_referenced() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query {
              secret: Secret
              search(filter: Filter): String
            }
            type Secret @inaccessible { id: ID }
            input Filter @inaccessible { term: String }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![
            CompositionError::InvalidReferencesOfInaccessibleType {
                kind: TypeKind::InputObject,
                type_name: "Filter".to_owned(),
                paths: vec!["Query.search(filter: ...)".to_owned()],
            },
            CompositionError::InvalidReferencesOfInaccessibleType {
                kind: TypeKind::Object,
                type_name: "Secret".to_owned(),
                paths: vec!["Query.secret".to_owned()],
            },
        ]
    );
}

#[test]
fn required_arguments_must_stay_accessible() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query {
              item(id: ID! @inaccessible, locale: String @inaccessible): String
            }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::InaccessibleRequiredInputValue {
            name: "id".to_owned(),
            coords: "Query.item(id: ...)".to_owned(),
            parent_coords: "Query.item".to_owned(),
            is_argument: true,
        }]
    );
}

#[test]
fn query_must_stay_accessible() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: "type Query @inaccessible { a: String }",
    }]);
    assert_eq!(failure.errors, vec![CompositionError::InaccessibleQueryRootType]);

    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: "type Query { a: String @inaccessible }",
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::NoQueryRootType {
            is_router_schema: false
        }]
    );
}

#[test]
fn enums_need_an_accessible_value() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query { status: Status }
            enum Status { ACTIVE @inaccessible }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::AllChildDefinitionsAreInaccessible {
            kind: TypeKind::Enum,
            type_name: "Status".to_owned(),
            child_type: "Enum value".to_owned(),
        }]
    );
}
