//! Entity interfaces: interfaces declared with `@key`.
//!
//! A subgraph either defines an entity interface as an interface, together with the entities
//! that implement it, or as an `@interfaceObject`, in which case it knows nothing about the
//! implementations. Both shapes are checked before any type is merged.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;
use serde::Serialize;

use crate::error::CompositionError;
use crate::error::UndefinedEntityInterfaceImplementations;
use crate::normalization::NormalizationSuccess;
use crate::schema::TypeDefinitionData;

/// An entity interface of the federated graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityInterfaceData {
    pub type_name: Name,
    /// The entities that implement the interface, across every subgraph that defines it as an
    /// interface.
    pub concrete_type_names: IndexSet<Name>,
    /// Subgraphs that declare the interface as an object with `@interfaceObject`.
    pub interface_object_subgraph_names: IndexSet<String>,
}

#[derive(Debug)]
struct SubgraphEntityInterface {
    subgraph_name: String,
    concrete_type_names: IndexSet<Name>,
    is_interface_object: bool,
    /// At least one `@key` of the interface can be resolved by the subgraph.
    resolvable: bool,
}

fn subgraph_entity_interfaces(subgraph: &NormalizationSuccess) -> Vec<(Name, SubgraphEntityInterface)> {
    subgraph
        .registry
        .values()
        .filter_map(|data| {
            let (composite, is_interface_object) = match data {
                TypeDefinitionData::Interface(composite) if composite.is_entity() => (composite, false),
                TypeDefinitionData::Object(composite)
                    if composite.is_interface_object && composite.is_entity() =>
                {
                    (composite, true)
                }
                _ => return None,
            };
            let concrete_type_names = if is_interface_object {
                IndexSet::new()
            } else {
                subgraph
                    .registry
                    .values()
                    .filter_map(|candidate| match candidate {
                        TypeDefinitionData::Object(object)
                            if object.implements.contains(&composite.name) =>
                        {
                            Some(object.name.clone())
                        }
                        _ => None,
                    })
                    .collect()
            };
            Some((
                composite.name.clone(),
                SubgraphEntityInterface {
                    subgraph_name: subgraph.subgraph_name.clone(),
                    concrete_type_names,
                    is_interface_object,
                    resolvable: composite.keys.iter().any(|key| key.resolvable),
                },
            ))
        })
        .collect()
}

/// Collects the entity interfaces of all subgraphs.
///
/// Every subgraph that resolves an entity interface must define each of its implementations,
/// and a subgraph that declares it as an `@interfaceObject` must define none of them.
pub(crate) fn collect_entity_interfaces(
    subgraphs: &[NormalizationSuccess],
) -> Result<IndexMap<Name, EntityInterfaceData>, Vec<CompositionError>> {
    let mut subgraph_data_by_type_name: IndexMap<Name, Vec<SubgraphEntityInterface>> =
        IndexMap::new();
    for subgraph in subgraphs {
        for (type_name, data) in subgraph_entity_interfaces(subgraph) {
            subgraph_data_by_type_name
                .entry(type_name)
                .or_default()
                .push(data);
        }
    }

    let mut entity_interfaces = IndexMap::new();
    for (type_name, subgraph_datas) in &subgraph_data_by_type_name {
        let concrete_type_names: IndexSet<Name> = subgraph_datas
            .iter()
            .flat_map(|data| data.concrete_type_names.iter().cloned())
            .collect();
        entity_interfaces.insert(
            type_name.clone(),
            EntityInterfaceData {
                type_name: type_name.clone(),
                concrete_type_names,
                interface_object_subgraph_names: subgraph_datas
                    .iter()
                    .filter(|data| data.is_interface_object)
                    .map(|data| data.subgraph_name.clone())
                    .collect(),
            },
        );
    }

    // An implementation counts as defined if the subgraph defines it for any entity interface.
    let mut defined_type_names_by_subgraph_name: IndexMap<&str, IndexSet<&Name>> = IndexMap::new();
    for (type_name, subgraph_datas) in &subgraph_data_by_type_name {
        for data in subgraph_datas {
            let defined = defined_type_names_by_subgraph_name
                .entry(data.subgraph_name.as_str())
                .or_default();
            if data.is_interface_object {
                defined.extend(entity_interfaces[type_name].concrete_type_names.iter());
            } else {
                defined.extend(data.concrete_type_names.iter());
            }
        }
    }

    let mut errors = Vec::new();
    let mut undefined_implementations = Vec::new();
    for (type_name, subgraph_datas) in &subgraph_data_by_type_name {
        let entity_interface = &entity_interfaces[type_name];
        let mut missing_type_names_by_subgraph_name = IndexMap::new();
        for data in subgraph_datas {
            if data.is_interface_object {
                let implementation_type_names = subgraphs
                    .iter()
                    .filter(|subgraph| subgraph.subgraph_name == data.subgraph_name)
                    .flat_map(|subgraph| {
                        entity_interface
                            .concrete_type_names
                            .iter()
                            .filter(|name| subgraph.registry.contains_key(*name))
                    })
                    .map(|name| name.to_string())
                    .collect_vec();
                if !implementation_type_names.is_empty() {
                    errors.push(
                        CompositionError::InvalidInterfaceObjectImplementationDefinitions {
                            type_name: type_name.to_string(),
                            subgraph_name: data.subgraph_name.clone(),
                            implementation_type_names,
                        },
                    );
                }
                continue;
            }
            if !data.resolvable {
                continue;
            }
            let defined = &defined_type_names_by_subgraph_name[data.subgraph_name.as_str()];
            let missing = entity_interface
                .concrete_type_names
                .iter()
                .filter(|name| !defined.contains(name))
                .map(|name| name.to_string())
                .collect_vec();
            if !missing.is_empty() {
                missing_type_names_by_subgraph_name.insert(data.subgraph_name.clone(), missing);
            }
        }
        if !missing_type_names_by_subgraph_name.is_empty() {
            undefined_implementations.push(UndefinedEntityInterfaceImplementations {
                interface_name: type_name.to_string(),
                concrete_type_names: entity_interface
                    .concrete_type_names
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
                missing_type_names_by_subgraph_name,
            });
        }
    }
    if !undefined_implementations.is_empty() {
        errors.push(CompositionError::UndefinedEntityInterfaceImplementations {
            interfaces: undefined_implementations,
        });
    }
    if errors.is_empty() {
        Ok(entity_interfaces)
    } else {
        Err(errors)
    }
}
