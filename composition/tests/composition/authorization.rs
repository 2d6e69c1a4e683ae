use federation_composition::CompositionError;
use federation_composition::authorization::FieldConfiguration;
use federation_composition::authorization::MAX_OR_SCOPES;
use pretty_assertions::assert_eq;
use test_log::test;

use super::ServiceDefinition;
use super::compose_successfully;
use super::compose_with_failure;
use super::error_codes;

fn scopes(or_scopes: &[&[&str]]) -> Vec<Vec<String>> {
    or_scopes
        .iter()
        .map(|and_scopes| and_scopes.iter().map(|scope| (*scope).to_owned()).collect())
        .collect()
}

#[test]
fn fields_inherit_type_level_scopes() {
    let success = compose_successfully(&[ServiceDefinition {
        name: "products",
        type_defs: r#"
            type Query {
              product: Product @requiresScopes(scopes: [["a"], ["b"]])
            }
            type Product @requiresScopes(scopes: [["c"]]) {
              id: ID!
            }
        "#,
    }]);
    assert_eq!(
        success.field_configurations,
        vec![
            FieldConfiguration {
                type_name: "Query".to_owned(),
                field_name: "product".to_owned(),
                argument_names: vec![],
                requires_authentication: false,
                required_scopes: scopes(&[&["a", "c"], &["b", "c"]]),
                required_scopes_by_or: scopes(&[&["a", "c"], &["b", "c"]]),
            },
            FieldConfiguration {
                type_name: "Product".to_owned(),
                field_name: "id".to_owned(),
                argument_names: vec![],
                requires_authentication: false,
                required_scopes: scopes(&[&["c"]]),
                required_scopes_by_or: scopes(&[&["c"]]),
            },
        ]
    );
    assert!(success.federated_graph_sdl.contains("@requiresScopes"));
    assert!(!success.federated_graph_client_sdl.contains("@requiresScopes"));
}

#[test]
fn field_requirements_are_combined_across_subgraphs() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { me: User @authenticated @shareable }
                type User @key(fields: "id") { id: ID! }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query { me: User @requiresScopes(scopes: [["read:user"]]) @shareable }
                type User @key(fields: "id") {
                  id: ID!
                  email: String @authenticated
                }
            "#,
        },
    ]);
    assert_eq!(
        success.field_configurations,
        vec![
            FieldConfiguration {
                type_name: "Query".to_owned(),
                field_name: "me".to_owned(),
                argument_names: vec![],
                requires_authentication: true,
                required_scopes: scopes(&[&["read:user"]]),
                required_scopes_by_or: scopes(&[&["read:user"]]),
            },
            FieldConfiguration {
                type_name: "User".to_owned(),
                field_name: "email".to_owned(),
                argument_names: vec![],
                requires_authentication: true,
                required_scopes: vec![],
                required_scopes_by_or: vec![],
            },
        ]
    );
    let query = &success.authorization_data_by_parent_type_name["Query"];
    assert!(query.field_authorization_data_by_field_name["me"]
        .original_data
        .requires_authentication);
}

#[test]
fn fields_with_arguments_get_configurations() {
    let success = compose_successfully(&[ServiceDefinition {
        name: "search",
        type_defs: "type Query { search(term: String, limit: Int): [String] }",
    }]);
    assert_eq!(
        success.field_configurations,
        vec![FieldConfiguration {
            type_name: "Query".to_owned(),
            field_name: "search".to_owned(),
            argument_names: vec!["limit".to_owned(), "term".to_owned()],
            ..Default::default()
        }]
    );
}

#[test]
fn combined_scopes_are_limited() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query {
                  secret: String @shareable @requiresScopes(scopes: [["a1"], ["a2"], ["a3"], ["a4"], ["a5"]])
                }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query {
                  secret: String @shareable @requiresScopes(scopes: [["b1"], ["b2"], ["b3"], ["b4"]])
                }
            "#,
        },
    ]);
    assert_eq!(error_codes(&failure), ["OR_SCOPES_LIMIT"]);
    assert!(failure.errors[0].to_string().contains("\"Query.secret\""));
}

#[test]
fn configurations_follow_declaration_order() {
    let success = compose_successfully(&[ServiceDefinition {
        name: "catalog",
        type_defs: r#"
            type Query {
              zeta(id: ID): String
              product: Product
            }
            type Product @authenticated {
              id: ID!
            }
        "#,
    }]);
    assert_eq!(
        success
            .field_configurations
            .iter()
            .map(|configuration| format!("{}.{}", configuration.type_name, configuration.field_name))
            .collect::<Vec<_>>(),
        ["Query.zeta", "Query.product", "Product.id"]
    );
}

#[test]
fn return_types_from_other_subgraphs_are_inherited() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { product: Product }
                type Product @key(fields: "id") { id: ID! }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Product @key(fields: "id") @requiresScopes(scopes: [["read:product"]]) {
                  id: ID!
                  name: String
                }
            "#,
        },
    ]);
    let inherited = scopes(&[&["read:product"]]);
    assert_eq!(
        success.field_configurations,
        ["Query.product", "Product.id", "Product.name"]
            .into_iter()
            .map(|coords| {
                let (type_name, field_name) = coords.split_once('.').unwrap();
                FieldConfiguration {
                    type_name: type_name.to_owned(),
                    field_name: field_name.to_owned(),
                    argument_names: vec![],
                    requires_authentication: false,
                    required_scopes: inherited.clone(),
                    required_scopes_by_or: inherited.clone(),
                }
            })
            .collect::<Vec<_>>()
    );
}

#[test]
fn type_level_authentication_reaches_referencing_fields() {
    let success = compose_successfully(&[ServiceDefinition {
        name: "accounts",
        type_defs: r#"
            type Query { me: User }
            type User @authenticated { id: ID! }
        "#,
    }]);
    assert_eq!(
        success.field_configurations,
        vec![
            FieldConfiguration {
                type_name: "Query".to_owned(),
                field_name: "me".to_owned(),
                requires_authentication: true,
                ..Default::default()
            },
            FieldConfiguration {
                type_name: "User".to_owned(),
                field_name: "id".to_owned(),
                requires_authentication: true,
                ..Default::default()
            },
        ]
    );
}

#[test]
fn type_scopes_declared_in_different_subgraphs_are_alternatives_by_or() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { scalar: Scalar! @shareable }
                scalar Scalar @requiresScopes(scopes: [["e"]])
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query { scalar: Scalar! @shareable }
                scalar Scalar @requiresScopes(scopes: [["j"]])
            "#,
        },
    ]);
    assert_eq!(
        success.field_configurations,
        vec![FieldConfiguration {
            type_name: "Query".to_owned(),
            field_name: "scalar".to_owned(),
            argument_names: vec![],
            requires_authentication: false,
            required_scopes: scopes(&[&["e", "j"]]),
            required_scopes_by_or: scopes(&[&["e"], &["j"]]),
        }]
    );
}

#[test]
fn inherited_scopes_are_limited() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query {
              secret: Secret @requiresScopes(scopes: [["a1"], ["a2"], ["a3"], ["a4"], ["a5"]])
            }
            type Secret @requiresScopes(scopes: [["b1"], ["b2"], ["b3"], ["b4"]]) {
              id: ID
            }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::OrScopesLimit {
            max_or_scopes: MAX_OR_SCOPES,
            coords: vec!["Query.secret".to_owned()],
        }]
    );
}

#[test]
fn router_schema_keeps_declared_requirements() {
    let success = compose_successfully(&[ServiceDefinition {
        name: "products",
        type_defs: r#"
            type Query {
              product: Product @requiresScopes(scopes: [["a"]])
              products: [Product]
            }
            type Product @requiresScopes(scopes: [["c"]]) {
              id: ID!
            }
        "#,
    }]);
    let sdl = &success.federated_graph_sdl;
    assert!(sdl.contains(r#"product: Product @requiresScopes(scopes: [["a"]])"#));
    assert!(sdl.contains("products: [Product]\n"));
    assert!(sdl.contains(r#"type Product @requiresScopes(scopes: [["c"]])"#));
}
