use federation_composition::CompositionError;
use pretty_assertions::assert_eq;
use test_log::test;

use super::ServiceDefinition;
use super::compose_successfully;
use super::compose_with_failure;
use super::normalized_sdl;

const DESCRIBED: ServiceDefinition<'static> = ServiceDefinition {
    name: "described",
    type_defs: r#"
        "The longest description of the root type."
        type Query {
          "The longest description of the field."
          dummy: String!
        }
    "#,
};

#[test]
fn longest_description_wins_without_configuration() {
    let success = compose_successfully(&[
        DESCRIBED,
        ServiceDefinition {
            name: "short",
            type_defs: r#"
                "Short."
                type Query { dummy: String! }
            "#,
        },
    ]);
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl(
            r#"
            "The longest description of the root type."
            type Query {
              "The longest description of the field."
              dummy: String!
            }
            "#
        )
    );
}

#[test]
fn propagated_description_replaces_the_longest() {
    let success = compose_successfully(&[
        DESCRIBED,
        ServiceDefinition {
            name: "configured",
            type_defs: r#"
                "Short."
                type Query @openfed__configureDescription {
                  dummy: String! @openfed__configureDescription(descriptionOverride: "Overridden.")
                }
            "#,
        },
    ]);
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl(
            r#"
            "Short."
            type Query {
              "Overridden."
              dummy: String!
            }
            "#
        )
    );
    assert!(
        !success
            .federated_graph_sdl
            .contains("openfed__configureDescription")
    );
}

#[test]
fn withheld_descriptions_are_not_merged() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "withheld",
            type_defs: r#"
                "An internal description."
                type Query @openfed__configureDescription(propagate: false) {
                  dummy: String!
                }
            "#,
        },
        ServiceDefinition {
            name: "plain",
            type_defs: "type Query { dummy: String! }",
        },
    ]);
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl("type Query { dummy: String! }")
    );
}

#[test]
fn withheld_description_leaves_others_in_place() {
    let success = compose_successfully(&[
        DESCRIBED,
        ServiceDefinition {
            name: "withheld",
            type_defs: r#"
                "An internal description that is longer than any other description."
                type Query @openfed__configureDescription(propagate: false) {
                  dummy: String!
                }
            "#,
        },
    ]);
    assert_eq!(
        success.federated_graph_client_sdl,
        normalized_sdl(DESCRIBED.type_defs)
    );
}

#[test]
fn only_one_subgraph_may_propagate_a_description() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                "From a."
                type Query @openfed__configureDescription { dummy: String! }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query @openfed__configureDescription(descriptionOverride: "From b.") {
                  dummy: String!
                }
            "#,
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::ConfigureDescriptionPropagation {
            coords: "Query".to_owned(),
            subgraph_names: vec!["a".to_owned(), "b".to_owned()],
        }]
    );
}

#[test]
fn configuration_without_any_description_is_rejected() {
    let failure = compose_with_failure(&[ServiceDefinition {
        name: "a",
        type_defs: r#"
            type Query { dummy(limit: Int @openfed__configureDescription): String! }
        "#,
    }]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::SubgraphValidation {
            subgraph: "a".to_owned(),
            errors: vec![CompositionError::ConfigureDescriptionNoDescription {
                kind: "argument".to_owned(),
                coords: "Query.dummy(limit: ...)".to_owned(),
            }],
        }]
    );
}
