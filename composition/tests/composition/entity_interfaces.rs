use federation_composition::CompositionError;
use federation_composition::error::UndefinedEntityInterfaceImplementations;
use indexmap::IndexMap;
use itertools::Itertools;
use pretty_assertions::assert_eq;
use test_log::test;

use super::ServiceDefinition;
use super::compose_successfully;
use super::compose_with_failure;
use super::field_names;

const ENTITY_INTERFACE: ServiceDefinition<'static> = ServiceDefinition {
    name: "subgraph-a",
    type_defs: r#"
        type Query {
          interfaces: [Interface!]! @shareable
        }

        interface Interface @key(fields: "id") {
          id: ID!
          name: String!
        }

        type Entity implements Interface @key(fields: "id") {
          id: ID!
          name: String!
        }
    "#,
};

#[test]
fn every_resolving_subgraph_defines_all_implementations() {
    let failure = compose_with_failure(&[
        ServiceDefinition {
            name: "subgraph-e",
            type_defs: r#"
                type Query {
                  interface: Interface!
                }

                interface Interface @key(fields: "id") {
                  id: ID!
                  name: String!
                }

                type EntityOne implements Interface @key(fields: "id") {
                  id: ID!
                  name: String!
                }

                type EntityTwo implements Interface @key(fields: "id") {
                  id: ID!
                  name: String!
                }
            "#,
        },
        ServiceDefinition {
            name: "subgraph-f",
            type_defs: r#"
                interface Interface @key(fields: "id") {
                  id: ID!
                  age: Int!
                }

                type EntityOne implements Interface @key(fields: "id") {
                  id: ID!
                  age: Int!
                }

                type EntityThree implements Interface @key(fields: "id") {
                  id: ID!
                  age: Int!
                }
            "#,
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![CompositionError::UndefinedEntityInterfaceImplementations {
            interfaces: vec![UndefinedEntityInterfaceImplementations {
                interface_name: "Interface".to_owned(),
                concrete_type_names: vec![
                    "EntityOne".to_owned(),
                    "EntityTwo".to_owned(),
                    "EntityThree".to_owned(),
                ],
                missing_type_names_by_subgraph_name: IndexMap::from([
                    ("subgraph-e".to_owned(), vec!["EntityThree".to_owned()]),
                    ("subgraph-f".to_owned(), vec!["EntityTwo".to_owned()]),
                ]),
            }],
        }]
    );
}

#[test]
fn unresolvable_entity_interfaces_may_omit_implementations() {
    let success = compose_successfully(&[
        ServiceDefinition {
            name: "subgraph-g",
            type_defs: r#"
                interface Interface @key(fields: "id", resolvable: false) {
                  id: ID!
                }

                type Entity implements Interface @key(fields: "id") {
                  id: ID!
                }
            "#,
        },
        ServiceDefinition {
            name: "subgraph-h",
            type_defs: r#"
                type Query {
                  entities: [Interface!]!
                }

                interface Interface @key(fields: "id") {
                  id: ID!
                  name: String!
                }

                type Entity implements Interface @key(fields: "id") {
                  id: ID!
                  name: String!
                }

                type Other implements Interface @key(fields: "id") {
                  id: ID!
                  name: String!
                }
            "#,
        },
    ]);
    let entity_interface = &success.entity_interfaces["Interface"];
    assert_eq!(
        entity_interface
            .concrete_type_names
            .iter()
            .map(|name| name.as_str())
            .collect_vec(),
        ["Entity", "Other"]
    );
    assert!(entity_interface.interface_object_subgraph_names.is_empty());
}

#[test]
fn interface_objects_contribute_fields_to_every_implementation() {
    let success = compose_successfully(&[
        ENTITY_INTERFACE,
        ServiceDefinition {
            name: "subgraph-b",
            type_defs: r#"
                type Query {
                  interfaces: [Interface!]! @shareable
                }

                type Interface @key(fields: "id") @interfaceObject {
                  id: ID!
                  age: Int!
                }
            "#,
        },
    ]);
    let entity_interface = &success.entity_interfaces["Interface"];
    assert_eq!(
        entity_interface
            .concrete_type_names
            .iter()
            .map(|name| name.as_str())
            .collect_vec(),
        ["Entity"]
    );
    assert_eq!(
        entity_interface
            .interface_object_subgraph_names
            .iter()
            .collect_vec(),
        ["subgraph-b"]
    );
    assert!(
        success
            .federated_graph_client_sdl
            .contains("interface Interface {\n  age: Int!\n  id: ID!\n  name: String!\n}")
    );
    assert_eq!(
        field_names(&success.federated_graph_client_schema, "Entity"),
        ["age", "id", "name"]
    );
}

#[test]
fn interface_objects_must_not_define_implementations() {
    let failure = compose_with_failure(&[
        ENTITY_INTERFACE,
        ServiceDefinition {
            name: "subgraph-b",
            type_defs: r#"
                type Query {
                  interfaces: [Interface!]! @shareable
                }

                type Interface @key(fields: "id") @interfaceObject {
                  id: ID!
                  age: Int!
                }

                type Entity @key(fields: "id") {
                  id: ID!
                }
            "#,
        },
    ]);
    assert_eq!(
        failure.errors,
        vec![
            CompositionError::InvalidInterfaceObjectImplementationDefinitions {
                type_name: "Interface".to_owned(),
                subgraph_name: "subgraph-b".to_owned(),
                implementation_type_names: vec!["Entity".to_owned()],
            }
        ]
    );
}
