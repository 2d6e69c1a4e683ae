//! Derivation of the client registry from the federated registry.
//!
//! Everything declared `@inaccessible` is removed. An object or interface whose fields are all
//! inaccessible disappears with them, as long as nothing accessible still refers to it.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;
use tracing::trace;

use crate::error::CompositionError;
use crate::schema::InputValueData;
use crate::schema::InputValueKind;
use crate::schema::QUERY;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeKind;
use crate::schema::TypeRegistry;

struct Removals {
    /// Types declared `@inaccessible`.
    inaccessible: IndexSet<Name>,
    /// Objects and interfaces left without an accessible field.
    childless: IndexSet<Name>,
}

impl Removals {
    fn collect(registry: &TypeRegistry) -> Self {
        let mut inaccessible = IndexSet::new();
        let mut childless = IndexSet::new();
        for data in registry.values() {
            if data.is_inaccessible() {
                inaccessible.insert(data.name().clone());
                continue;
            }
            if let Some(composite) = data.as_composite() {
                if !composite.fields.is_empty()
                    && composite.fields.values().all(|field| field.is_inaccessible())
                {
                    childless.insert(composite.name.clone());
                }
            }
        }
        Self {
            inaccessible,
            childless,
        }
    }

    fn contains(&self, type_name: &str) -> bool {
        self.inaccessible.contains(type_name) || self.childless.contains(type_name)
    }
}

#[derive(Default)]
struct ReferenceErrors {
    paths_by_type_name: IndexMap<Name, Vec<String>>,
    referenced_childless_type_names: IndexSet<Name>,
    required_input_values: Vec<CompositionError>,
}

impl ReferenceErrors {
    fn reference(&mut self, removals: &Removals, type_name: &Name, path: String) {
        if removals.inaccessible.contains(type_name) {
            self.paths_by_type_name
                .entry(type_name.clone())
                .or_default()
                .push(path);
        } else if removals.childless.contains(type_name) {
            self.referenced_childless_type_names
                .insert(type_name.clone());
        }
    }

    fn input_value(&mut self, removals: &Removals, data: &InputValueData, parent_coords: &str) {
        if data.is_inaccessible() {
            if data.is_required() {
                self.required_input_values
                    .push(CompositionError::InaccessibleRequiredInputValue {
                        name: data.name.to_string(),
                        coords: data.coords(),
                        parent_coords: parent_coords.to_owned(),
                        is_argument: data.kind == InputValueKind::Argument,
                    });
            }
            return;
        }
        self.reference(removals, data.ty.inner_named_type(), data.coords());
    }
}

fn collect_reference_errors(registry: &TypeRegistry, removals: &Removals) -> ReferenceErrors {
    let mut errors = ReferenceErrors::default();
    for data in registry.values() {
        if removals.contains(data.name()) {
            continue;
        }
        match data {
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
                for field in data.fields.values() {
                    if field.is_inaccessible() {
                        continue;
                    }
                    let coords = field.coords();
                    errors.reference(removals, field.named_type_name(), coords.clone());
                    for argument in field.arguments.values() {
                        errors.input_value(removals, argument, &coords);
                    }
                }
            }
            TypeDefinitionData::InputObject(data) => {
                for field in data.fields.values() {
                    errors.input_value(removals, field, data.name.as_str());
                }
            }
            _ => {}
        }
    }
    errors
}

/// Enums, input objects and unions must keep at least one accessible child.
fn childless_definition_errors(registry: &TypeRegistry, removals: &Removals) -> Vec<CompositionError> {
    let mut errors = Vec::new();
    for data in registry.values() {
        if removals.contains(data.name()) {
            continue;
        }
        let child_type = match data {
            TypeDefinitionData::Enum(data)
                if !data.values.is_empty()
                    && data.values.values().all(|value| value.directives.is_inaccessible) =>
            {
                "Enum value"
            }
            TypeDefinitionData::InputObject(data)
                if !data.fields.is_empty()
                    && data.fields.values().all(InputValueData::is_inaccessible) =>
            {
                "Input field"
            }
            TypeDefinitionData::Union(data)
                if !data.members.is_empty()
                    && data.members.iter().all(|member| removals.contains(member)) =>
            {
                "union member type"
            }
            _ => continue,
        };
        errors.push(CompositionError::AllChildDefinitionsAreInaccessible {
            kind: data.kind(),
            type_name: data.name().to_string(),
            child_type: child_type.to_owned(),
        });
    }
    errors
}

fn query_root_errors(registry: &TypeRegistry, removals: &Removals) -> Option<CompositionError> {
    if removals.inaccessible.contains(QUERY) {
        return Some(CompositionError::InaccessibleQueryRootType);
    }
    let has_accessible_field = registry
        .get(QUERY)
        .and_then(TypeDefinitionData::as_composite)
        .is_some_and(|query| query.fields.values().any(|field| !field.is_inaccessible()));
    (!has_accessible_field).then_some(CompositionError::NoQueryRootType {
        is_router_schema: false,
    })
}

fn validate(registry: &TypeRegistry, removals: &Removals) -> Vec<CompositionError> {
    let mut errors = Vec::new();
    errors.extend(query_root_errors(registry, removals));
    let references = collect_reference_errors(registry, removals);
    for (type_name, paths) in references
        .paths_by_type_name
        .into_iter()
        .sorted_by(|(left, _), (right, _)| left.cmp(right))
    {
        let kind = registry
            .get(&type_name)
            .map_or(TypeKind::Object, TypeDefinitionData::kind);
        errors.push(CompositionError::InvalidReferencesOfInaccessibleType {
            kind,
            type_name: type_name.to_string(),
            paths,
        });
    }
    for type_name in references.referenced_childless_type_names {
        let kind = registry
            .get(&type_name)
            .map_or(TypeKind::Object, TypeDefinitionData::kind);
        errors.push(CompositionError::AllChildDefinitionsAreInaccessible {
            kind,
            type_name: type_name.to_string(),
            child_type: "field".to_owned(),
        });
    }
    errors.extend(childless_definition_errors(registry, removals));
    errors.extend(references.required_input_values);
    errors
}

fn strip(registry: &TypeRegistry, removals: &Removals) -> TypeRegistry {
    let mut client_registry = TypeRegistry::with_capacity(registry.len());
    for (type_name, data) in registry {
        if removals.contains(type_name) {
            trace!(type_name = type_name.as_str(), "removing type from client schema");
            continue;
        }
        let mut data = data.clone();
        match &mut data {
            TypeDefinitionData::Enum(data) => {
                data.values
                    .retain(|_, value| !value.directives.is_inaccessible);
            }
            TypeDefinitionData::InputObject(data) => {
                data.fields.retain(|_, field| !field.is_inaccessible());
            }
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
                data.implements
                    .retain(|interface_name| !removals.contains(interface_name));
                data.fields.retain(|_, field| !field.is_inaccessible());
                for field in data.fields.values_mut() {
                    field
                        .arguments
                        .retain(|_, argument| !argument.is_inaccessible());
                }
            }
            TypeDefinitionData::Union(data) => {
                data.members.retain(|member| !removals.contains(member));
            }
            TypeDefinitionData::Scalar(_) => {}
        }
        client_registry.insert(type_name.clone(), data);
    }
    client_registry
}

/// Returns the registry clients see, or every reason it cannot be built.
pub(crate) fn derive_client_registry(
    registry: &TypeRegistry,
) -> Result<TypeRegistry, Vec<CompositionError>> {
    let removals = Removals::collect(registry);
    trace!(
        inaccessible = removals.inaccessible.iter().join(", "),
        childless = removals.childless.iter().join(", "),
        "collected client schema removals"
    );
    let errors = validate(registry, &removals);
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(strip(registry, &removals))
}
