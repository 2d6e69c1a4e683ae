//! Checks that can only run once every subgraph has been merged.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;

use crate::error::CompositionError;
use crate::error::ImplementationErrors;
use crate::error::InvalidArgumentImplementation;
use crate::error::InvalidFieldImplementation;
use crate::error::InvalidRequiredInputValueData;
use crate::error::ShareabilityViolation;
use crate::federation::FederationFactory;
use crate::schema::CompositeDefinitionData;
use crate::schema::EnumDefinitionData;
use crate::schema::FieldData;
use crate::schema::InputObjectDefinitionData;
use crate::schema::QUERY;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;
use crate::schema::type_utils::is_type_valid_implementation;

impl FederationFactory {
    pub(super) fn validate_federated_graph(&mut self) {
        let (input_enum_names, output_enum_names) = enum_usage(&self.registry);
        for data in self.registry.values_mut() {
            match data {
                TypeDefinitionData::Enum(data) => {
                    let is_input = input_enum_names.contains(data.name.as_str());
                    let is_output = output_enum_names.contains(data.name.as_str());
                    self.errors.extend(reconcile_enum(data, is_input, is_output));
                }
                TypeDefinitionData::InputObject(data) => {
                    self.errors.extend(reconcile_input_object(data));
                }
                _ => {}
            }
        }

        for data in self.registry.values() {
            self.errors.extend(missing_base_definition(data));
            let Some(composite) = data.as_composite() else {
                continue;
            };
            if matches!(data, TypeDefinitionData::Object(_)) {
                self.errors.extend(validate_shareability(composite));
            }
            for field in composite.fields.values() {
                self.errors.extend(validate_semantic_non_null(field));
                self.errors.extend(validate_required_arguments(field));
            }
            self.errors.extend(validate_implementations(
                data,
                &self.registry,
                &self.interface_object_subgraphs_by_type_name,
            ));
        }

        let has_query_fields = self
            .registry
            .get(QUERY)
            .and_then(TypeDefinitionData::as_composite)
            .is_some_and(|query| !query.fields.is_empty());
        if !has_query_fields {
            self.errors.push(CompositionError::NoQueryRootType {
                is_router_schema: true,
            });
        }
    }
}

/// Names of the enums referenced in input positions and in output positions.
fn enum_usage(registry: &TypeRegistry) -> (IndexSet<String>, IndexSet<String>) {
    let is_enum = |name: &str| matches!(registry.get(name), Some(TypeDefinitionData::Enum(_)));
    let mut input_enum_names = IndexSet::new();
    let mut output_enum_names = IndexSet::new();
    for data in registry.values() {
        match data {
            TypeDefinitionData::InputObject(data) => {
                for field in data.fields.values() {
                    let name = field.ty.inner_named_type().as_str();
                    if is_enum(name) {
                        input_enum_names.insert(name.to_owned());
                    }
                }
            }
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
                for field in data.fields.values() {
                    let name = field.named_type_name().as_str();
                    if is_enum(name) {
                        output_enum_names.insert(name.to_owned());
                    }
                    for argument in field.arguments.values() {
                        let name = argument.ty.inner_named_type().as_str();
                        if is_enum(name) {
                            input_enum_names.insert(name.to_owned());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    (input_enum_names, output_enum_names)
}

/// Output enums keep the union of their values, input enums keep the intersection, and enums
/// used in both positions must be identical in every subgraph.
fn reconcile_enum(
    data: &mut EnumDefinitionData,
    is_input: bool,
    is_output: bool,
) -> Option<CompositionError> {
    if !is_input {
        return None;
    }
    if is_output {
        let is_consistent = data
            .values
            .values()
            .all(|value| data.subgraph_names.is_subset(&value.subgraph_names));
        return (!is_consistent).then(|| CompositionError::IncompatibleSharedEnum {
            type_name: data.name.to_string(),
        });
    }
    let subgraph_names = &data.subgraph_names;
    data.values
        .retain(|_, value| subgraph_names.is_subset(&value.subgraph_names));
    None
}

/// Input objects keep the fields that every subgraph defines. Dropping a field that is required
/// anywhere is an error.
fn reconcile_input_object(data: &mut InputObjectDefinitionData) -> Vec<CompositionError> {
    let mut errors = Vec::new();
    let invalid_fields = data
        .fields
        .values()
        .filter(|field| {
            !field.required_subgraph_names.is_empty()
                && !data.subgraph_names.is_subset(&field.subgraph_names)
        })
        .map(|field| InvalidRequiredInputValueData {
            input_value_name: field.name.to_string(),
            required_subgraphs: field.required_subgraph_names.iter().cloned().collect(),
            missing_subgraphs: data
                .subgraph_names
                .difference(&field.subgraph_names)
                .cloned()
                .collect(),
        })
        .collect_vec();
    if !invalid_fields.is_empty() {
        errors.push(CompositionError::InvalidRequiredInputValue {
            type_string: "Input Object".to_owned(),
            coords: data.name.to_string(),
            errors: invalid_fields,
            is_argument: false,
        });
    }
    let subgraph_names = &data.subgraph_names;
    data.fields
        .retain(|_, field| subgraph_names.is_subset(&field.subgraph_names));
    if data.fields.is_empty() && errors.is_empty() {
        errors.push(CompositionError::NoInputValueDefinitions {
            type_name: data.name.to_string(),
        });
    }
    errors
}

fn missing_base_definition(data: &TypeDefinitionData) -> Option<CompositionError> {
    if !data.extension_type().is_extension() {
        return None;
    }
    if let Some(composite) = data.as_composite() {
        if composite.is_root_type() || composite.is_entity() || composite.is_interface_object {
            return None;
        }
    }
    Some(CompositionError::NoBaseDefinitionForExtension {
        kind: data.kind(),
        type_name: data.name().to_string(),
    })
}

fn is_defined_external(field: &FieldData, subgraph_name: &str) -> bool {
    field
        .is_external_by_subgraph_name
        .get(subgraph_name)
        .is_some_and(|data| data.is_defined_external)
}

/// An instance is resolvable unless it is external and only conditionally provided.
fn is_resolvable(field: &FieldData, subgraph_name: &str) -> bool {
    field
        .is_external_by_subgraph_name
        .get(subgraph_name)
        .is_none_or(|data| !data.is_defined_external || data.is_unconditionally_provided)
}

/// A field resolved by more than one subgraph must be `@shareable` in each of them.
///
/// Instances taken over by `@override` do not count.
fn validate_shareability(data: &CompositeDefinitionData) -> Vec<CompositionError> {
    let mut violations = Vec::new();
    let mut all_external_subgraph_names_by_field_name = IndexMap::new();
    for field in data.fields.values() {
        let overridden_subgraph_names = field.overridden_subgraph_names();
        let instances = field
            .subgraph_names
            .iter()
            .filter(|subgraph_name| !overridden_subgraph_names.contains(subgraph_name.as_str()))
            .collect_vec();
        if !instances.is_empty()
            && instances
                .iter()
                .all(|subgraph_name| is_defined_external(field, subgraph_name))
        {
            all_external_subgraph_names_by_field_name.insert(
                field.name.to_string(),
                instances.into_iter().cloned().collect_vec(),
            );
            continue;
        }
        let resolvable = instances
            .into_iter()
            .filter(|subgraph_name| is_resolvable(field, subgraph_name))
            .cloned()
            .collect_vec();
        if resolvable.len() < 2 {
            continue;
        }
        let (shareable_subgraphs, non_shareable_subgraphs): (Vec<_>, Vec<_>) =
            resolvable.into_iter().partition(|subgraph_name| {
                field
                    .is_shareable_by_subgraph_name
                    .get(subgraph_name)
                    .copied()
                    .unwrap_or_default()
            });
        if non_shareable_subgraphs.is_empty() {
            continue;
        }
        violations.push(ShareabilityViolation {
            field_name: field.name.to_string(),
            shareable_subgraphs,
            non_shareable_subgraphs,
        });
    }

    let mut errors = Vec::new();
    if !all_external_subgraph_names_by_field_name.is_empty() {
        errors.push(CompositionError::AllExternalFieldInstances {
            type_name: data.name.to_string(),
            subgraph_names_by_field_name: all_external_subgraph_names_by_field_name,
        });
    }
    if !violations.is_empty() {
        errors.push(CompositionError::InvalidFieldShareability {
            type_name: data.name.to_string(),
            violations,
        });
    }
    errors
}

fn validate_semantic_non_null(field: &FieldData) -> Option<CompositionError> {
    if field.null_levels_by_subgraph_name.values().all_equal() {
        return None;
    }
    Some(CompositionError::SemanticNonNullInconsistentLevels {
        coords: field.coords(),
        levels_by_subgraph_name: field
            .null_levels_by_subgraph_name
            .iter()
            .map(|(subgraph_name, levels)| {
                (subgraph_name.clone(), levels.iter().copied().collect())
            })
            .collect(),
    })
}

/// A required argument must be defined by every subgraph that defines the field.
fn validate_required_arguments(field: &FieldData) -> Option<CompositionError> {
    let errors = field
        .arguments
        .values()
        .filter(|argument| {
            !argument.required_subgraph_names.is_empty()
                && !field.subgraph_names.is_subset(&argument.subgraph_names)
        })
        .map(|argument| InvalidRequiredInputValueData {
            input_value_name: argument.name.to_string(),
            required_subgraphs: argument.required_subgraph_names.iter().cloned().collect(),
            missing_subgraphs: field
                .subgraph_names
                .difference(&argument.subgraph_names)
                .cloned()
                .collect(),
        })
        .collect_vec();
    if errors.is_empty() {
        return None;
    }
    Some(CompositionError::InvalidRequiredInputValue {
        type_string: "field".to_owned(),
        coords: field.coords(),
        errors,
        is_argument: true,
    })
}

fn validate_field_implementation(
    interface_field: &FieldData,
    field: &FieldData,
    registry: &TypeRegistry,
) -> InvalidFieldImplementation {
    let mut invalid = InvalidFieldImplementation::default();
    if !is_type_valid_implementation(&interface_field.ty, &field.ty, registry) {
        invalid.invalid_response_type =
            Some((field.ty.to_string(), interface_field.ty.to_string()));
    }
    for argument in interface_field.arguments.values() {
        match field.arguments.get(&argument.name) {
            None => invalid
                .unimplemented_arguments
                .push(argument.name.to_string()),
            Some(implemented) if implemented.ty != argument.ty => invalid
                .invalid_implemented_arguments
                .push(InvalidArgumentImplementation {
                    argument_name: argument.name.to_string(),
                    expected_type: argument.ty.to_string(),
                    actual_type: implemented.ty.to_string(),
                }),
            Some(_) => {}
        }
    }
    for argument in field.arguments.values() {
        if argument.is_required() && !interface_field.arguments.contains_key(&argument.name) {
            invalid
                .invalid_additional_arguments
                .push(argument.name.to_string());
        }
    }
    invalid.is_inaccessible = field.is_inaccessible() && !interface_field.is_inaccessible();
    invalid
}

/// Fields contributed only by `@interfaceObject` subgraphs are resolved through the interface
/// and are not expected on its implementations.
fn validate_implementations(
    data: &TypeDefinitionData,
    registry: &TypeRegistry,
    interface_object_subgraphs_by_type_name: &IndexMap<Name, IndexSet<String>>,
) -> Option<CompositionError> {
    let composite = data.as_composite()?;
    let mut errors_by_interface_name = IndexMap::new();
    for interface_name in &composite.implements {
        let Some(TypeDefinitionData::Interface(interface)) = registry.get(interface_name) else {
            continue;
        };
        let interface_object_subgraphs = interface_object_subgraphs_by_type_name.get(interface_name);
        let mut errors = ImplementationErrors::default();
        for interface_field in interface.fields.values() {
            if interface_object_subgraphs
                .is_some_and(|subgraph_names| interface_field.subgraph_names.is_subset(subgraph_names))
            {
                continue;
            }
            let Some(field) = composite.fields.get(&interface_field.name) else {
                errors
                    .unimplemented_fields
                    .push(interface_field.name.to_string());
                continue;
            };
            let invalid = validate_field_implementation(interface_field, field, registry);
            if !invalid.is_empty() {
                errors
                    .invalid_field_implementations
                    .insert(field.name.to_string(), invalid);
            }
        }
        if !errors.unimplemented_fields.is_empty()
            || !errors.invalid_field_implementations.is_empty()
        {
            errors_by_interface_name.insert(interface_name.to_string(), errors);
        }
    }
    if errors_by_interface_name.is_empty() {
        return None;
    }
    Some(CompositionError::InvalidInterfaceImplementation {
        kind: data.kind(),
        type_name: composite.name.to_string(),
        errors_by_interface_name,
    })
}
