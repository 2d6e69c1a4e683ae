//! Contracts: filtered variants of one federated graph.
//!
//! A contract marks the tagged (or untagged) parts of the federated registry `@inaccessible`
//! and then derives its own client schema. The base federation runs once for any number of
//! contracts.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::federation::FederationResult;
use crate::federation::FederationResultWithContracts;
use crate::federation::FederationSuccess;
use crate::federation::build_success;
use crate::federation::federate_subgraphs;
use crate::options::CompositionOptions;
use crate::options::ContractTagOptions;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;
use crate::subgraph::Subgraph;

/// Federates `subgraphs` once and derives one contract per entry of `tag_options_by_contract_name`.
///
/// A failure of the base federation fails every contract; otherwise each contract succeeds or
/// fails on its own.
#[cfg_attr(
    feature = "snapshot_tracing",
    tracing::instrument(level = "trace", skip_all, name = "federate_subgraphs_with_contracts")
)]
pub fn federate_subgraphs_with_contracts(
    subgraphs: &[Subgraph],
    tag_options_by_contract_name: &IndexMap<String, ContractTagOptions>,
    options: &CompositionOptions,
) -> FederationResultWithContracts {
    let base = federate_subgraphs(subgraphs, options)?;
    Ok(tag_options_by_contract_name
        .iter()
        .map(|(contract_name, tag_options)| {
            debug!(contract = contract_name.as_str(), "deriving contract");
            (contract_name.clone(), derive_contract(&base, tag_options))
        })
        .collect())
}

/// Federates `subgraphs` and derives a single contract from the result.
pub fn federate_subgraphs_contract(
    subgraphs: &[Subgraph],
    tag_options: &ContractTagOptions,
    options: &CompositionOptions,
) -> FederationResult {
    let base = federate_subgraphs(subgraphs, options)?;
    derive_contract(&base, tag_options)
}

fn derive_contract(base: &FederationSuccess, tag_options: &ContractTagOptions) -> FederationResult {
    let mut registry = base.registry.clone();
    if !tag_options.tag_names_to_exclude.is_empty() {
        exclude_tagged(&mut registry, &tag_options.tag_names_to_exclude);
    } else if !tag_options.tag_names_to_include.is_empty() {
        include_tagged(&mut registry, &tag_options.tag_names_to_include);
    }
    build_success(
        registry,
        base.authorization_data_by_parent_type_name.clone(),
        base.field_configurations.clone(),
        base.entity_interfaces.clone(),
        base.warnings.clone(),
    )
}

fn is_tagged_with(tags: &BTreeSet<String>, tag_names: &BTreeSet<String>) -> bool {
    !tags.is_disjoint(tag_names)
}

/// Whether every child of an enum, input object, object or interface is inaccessible.
fn has_no_accessible_children(data: &TypeDefinitionData) -> bool {
    match data {
        TypeDefinitionData::Enum(data) => {
            !data.values.is_empty() && data.values.values().all(|value| value.directives.is_inaccessible)
        }
        TypeDefinitionData::InputObject(data) => {
            !data.fields.is_empty() && data.fields.values().all(|field| field.is_inaccessible())
        }
        TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
            !data.fields.is_empty() && data.fields.values().all(|field| field.is_inaccessible())
        }
        TypeDefinitionData::Scalar(_) | TypeDefinitionData::Union(_) => false,
    }
}

/// Marks children whose tags satisfy `is_hidden` inaccessible.
fn hide_children(data: &mut TypeDefinitionData, is_hidden: impl Fn(&BTreeSet<String>) -> bool) {
    match data {
        TypeDefinitionData::Enum(data) => {
            for value in data.values.values_mut() {
                value.directives.is_inaccessible |= is_hidden(&value.directives.tags);
            }
        }
        TypeDefinitionData::InputObject(data) => {
            for field in data.fields.values_mut() {
                field.directives.is_inaccessible |= is_hidden(&field.directives.tags);
            }
        }
        TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
            for field in data.fields.values_mut() {
                field.directives.is_inaccessible |= is_hidden(&field.directives.tags);
                for argument in field.arguments.values_mut() {
                    // Untagged arguments follow their field.
                    if !argument.directives.tags.is_empty() {
                        argument.directives.is_inaccessible |= is_hidden(&argument.directives.tags);
                    }
                }
            }
        }
        TypeDefinitionData::Scalar(_) | TypeDefinitionData::Union(_) => {}
    }
}

fn exclude_tagged(registry: &mut TypeRegistry, tag_names: &BTreeSet<String>) {
    for data in registry.values_mut() {
        if is_tagged_with(&data.directives().tags, tag_names) {
            data.directives_mut().is_inaccessible = true;
            continue;
        }
        hide_children(data, |tags| is_tagged_with(tags, tag_names));
        if has_no_accessible_children(data) {
            data.directives_mut().is_inaccessible = true;
        }
    }
}

fn include_tagged(registry: &mut TypeRegistry, tag_names: &BTreeSet<String>) {
    for data in registry.values_mut() {
        if is_tagged_with(&data.directives().tags, tag_names) {
            continue;
        }
        let is_judged_by_own_tags = matches!(
            data,
            TypeDefinitionData::Scalar(_) | TypeDefinitionData::Union(_)
        );
        if is_judged_by_own_tags || data.child_tag_names().is_empty() {
            data.directives_mut().is_inaccessible = true;
            continue;
        }
        hide_children(data, |tags| !is_tagged_with(tags, tag_names));
        if has_no_accessible_children(data) {
            data.directives_mut().is_inaccessible = true;
        }
    }
}
