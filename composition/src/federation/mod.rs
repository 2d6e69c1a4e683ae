//! Merging of normalized subgraphs into the federated graph.
//!
//! [`FederationFactory`] owns the registry of one composition run. Every subgraph registry is
//! merged into it type by type; once all subgraphs have been merged the federated registry is
//! validated, the client registry is derived from it and both schemas are printed.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use indexmap::IndexMap;
use indexmap::IndexSet;
use indexmap::map::Entry;
use itertools::Itertools;
use tracing::debug;
use tracing::trace;

use crate::authorization::AuthorizationDataByTypeName;
use crate::authorization::FieldConfiguration;
use crate::authorization::MAX_OR_SCOPES;
use crate::authorization::propagate;
use crate::client_schema::derive_client_registry;
use crate::error::CompositionError;
use crate::error::CompositionWarning;
use crate::error::WarningCode;
use crate::federation::entity_interfaces::collect_entity_interfaces;
use crate::federation::type_merging::Position;
use crate::federation::type_merging::TypeMergeError;
use crate::federation::type_merging::merge_types;
use crate::normalization::NormalizationSuccess;
use crate::normalization::normalize_subgraph;
use crate::options::CompositionOptions;
use crate::printer::PrintTarget;
use crate::printer::print_document;
use crate::schema::CompositeDefinitionData;
use crate::schema::ExtensionType;
use crate::schema::FieldData;
use crate::schema::InputValueData;
use crate::schema::InputValueKind;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeKind;
use crate::schema::TypeRegistry;
use crate::schema::for_each_described_definition;
use crate::schema::type_utils::MAXIMUM_TYPE_NESTING;
use crate::subgraph::Subgraph;
use crate::utils::human_readable::join_quoted;
use crate::utils::human_readable::pluralize;
use crate::utils::logging::snapshot;

mod entity_interfaces;
pub(crate) mod type_merging;
mod validation;

pub use entity_interfaces::EntityInterfaceData;

/// The federated graph and everything derived from it.
#[derive(Debug, Clone)]
pub struct FederationSuccess {
    /// The schema consumed by the router, `@inaccessible` and authorization directives included.
    pub federated_graph_schema: ast::Document,
    /// The schema exposed to clients.
    pub federated_graph_client_schema: ast::Document,
    pub federated_graph_sdl: String,
    pub federated_graph_client_sdl: String,
    pub field_configurations: Vec<FieldConfiguration>,
    pub authorization_data_by_parent_type_name: AuthorizationDataByTypeName,
    /// Interfaces declared with `@key`, keyed by type name.
    pub entity_interfaces: IndexMap<Name, EntityInterfaceData>,
    pub warnings: Vec<CompositionWarning>,
    pub(crate) registry: TypeRegistry,
}

impl FederationSuccess {
    /// The merged types of the federated graph.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}

#[derive(Debug, Clone)]
pub struct FederationFailure {
    pub errors: Vec<CompositionError>,
    pub warnings: Vec<CompositionWarning>,
}

pub type FederationResult = Result<FederationSuccess, FederationFailure>;

/// One result per contract name, or the failure of the base federation.
pub type FederationResultWithContracts =
    Result<IndexMap<String, FederationResult>, FederationFailure>;

/// Normalizes and merges `subgraphs` into one federated graph.
///
/// Subgraphs are processed in the given order. Every error found is reported; no schema is
/// returned when there is at least one.
#[cfg_attr(
    feature = "snapshot_tracing",
    tracing::instrument(level = "trace", skip_all, name = "federate_subgraphs")
)]
pub fn federate_subgraphs(subgraphs: &[Subgraph], options: &CompositionOptions) -> FederationResult {
    let normalized = normalize_subgraphs(subgraphs, options)?;
    let entity_interfaces = match collect_entity_interfaces(&normalized) {
        Ok(entity_interfaces) => entity_interfaces,
        Err(errors) => {
            return Err(FederationFailure {
                errors,
                warnings: normalized
                    .into_iter()
                    .flat_map(|subgraph| subgraph.warnings)
                    .collect(),
            });
        }
    };
    let mut factory = FederationFactory::new(
        subgraphs
            .iter()
            .map(|subgraph| subgraph.name.clone())
            .collect(),
        entity_interfaces,
    );
    for subgraph in normalized {
        factory.merge_subgraph(subgraph);
    }
    factory.finish()
}

fn validate_subgraph_names(subgraphs: &[Subgraph]) -> Result<(), CompositionError> {
    let empty_name_indices = subgraphs
        .iter()
        .positions(|subgraph| subgraph.name.is_empty())
        .collect_vec();
    let duplicate_names = subgraphs
        .iter()
        .map(|subgraph| subgraph.name.as_str())
        .filter(|name| !name.is_empty())
        .duplicates()
        .map(str::to_owned)
        .collect_vec();
    if empty_name_indices.is_empty() && duplicate_names.is_empty() {
        return Ok(());
    }
    Err(CompositionError::InvalidSubgraphNames {
        duplicate_names,
        empty_name_indices,
    })
}

fn normalize_subgraphs(
    subgraphs: &[Subgraph],
    options: &CompositionOptions,
) -> Result<Vec<NormalizationSuccess>, FederationFailure> {
    if let Err(error) = validate_subgraph_names(subgraphs) {
        return Err(FederationFailure {
            errors: vec![error],
            warnings: Vec::new(),
        });
    }
    let mut successes = Vec::with_capacity(subgraphs.len());
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for subgraph in subgraphs {
        match normalize_subgraph(subgraph, options) {
            Ok(success) => successes.push(success),
            Err(failure) => {
                warnings.extend(failure.warnings);
                errors.push(CompositionError::SubgraphValidation {
                    subgraph: subgraph.name.clone(),
                    errors: failure.errors,
                });
            }
        }
    }
    if !errors.is_empty() {
        return Err(FederationFailure { errors, warnings });
    }
    Ok(successes)
}

pub(crate) struct FederationFactory {
    subgraph_names: IndexSet<String>,
    registry: TypeRegistry,
    authorization_data_by_parent_type_name: AuthorizationDataByTypeName,
    /// Subgraphs in which an interface is declared as an object with `@interfaceObject`.
    interface_object_subgraphs_by_type_name: IndexMap<Name, IndexSet<String>>,
    entity_interfaces: IndexMap<Name, EntityInterfaceData>,
    or_scopes_limit_coords: Vec<String>,
    errors: Vec<CompositionError>,
    warnings: Vec<CompositionWarning>,
}

fn longest_description(existing: &mut Option<Node<str>>, incoming: Option<Node<str>>) {
    let Some(incoming) = incoming else {
        return;
    };
    if existing
        .as_ref()
        .is_none_or(|existing| incoming.len() > existing.len())
    {
        *existing = Some(incoming);
    }
}

fn merge_extension_types(existing: ExtensionType, incoming: ExtensionType) -> ExtensionType {
    match (existing, incoming) {
        (ExtensionType::None, _) | (_, ExtensionType::None) => ExtensionType::None,
        (ExtensionType::Extends, _) | (_, ExtensionType::Extends) => ExtensionType::Extends,
        (ExtensionType::Real, ExtensionType::Real) => ExtensionType::Real,
    }
}

impl FederationFactory {
    pub(crate) fn new(
        subgraph_names: IndexSet<String>,
        entity_interfaces: IndexMap<Name, EntityInterfaceData>,
    ) -> Self {
        Self {
            subgraph_names,
            registry: TypeRegistry::new(),
            authorization_data_by_parent_type_name: AuthorizationDataByTypeName::new(),
            interface_object_subgraphs_by_type_name: IndexMap::new(),
            entity_interfaces,
            or_scopes_limit_coords: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn merge_subgraph(&mut self, mut subgraph: NormalizationSuccess) {
        trace!(subgraph = subgraph.subgraph_name.as_str(), "merging subgraph");
        self.warnings.append(&mut subgraph.warnings);
        self.discard_unknown_override_sources(&mut subgraph);
        for_each_described_definition(&mut subgraph.registry, |definition| {
            if definition.directives.withholds_description() {
                *definition.description = None;
            }
        });
        for (_, incoming) in subgraph.registry {
            self.merge_type(incoming);
        }
        for (type_name, incoming) in subgraph.authorization_data_by_parent_type_name {
            match self.authorization_data_by_parent_type_name.entry(type_name) {
                Entry::Vacant(entry) => {
                    entry.insert(incoming);
                }
                Entry::Occupied(mut entry) => {
                    let overflowing_coords = entry.get_mut().merge(&incoming);
                    self.or_scopes_limit_coords.extend(overflowing_coords);
                }
            }
        }
    }

    /// An `@override` whose source is not one of the composed subgraphs is ignored.
    fn discard_unknown_override_sources(&mut self, subgraph: &mut NormalizationSuccess) {
        for data in subgraph
            .registry
            .values_mut()
            .filter_map(TypeDefinitionData::as_composite_mut)
        {
            let mut field_names_by_source: IndexMap<String, Vec<String>> = IndexMap::new();
            for field in data.fields.values_mut() {
                let Some(source) = field
                    .override_source_by_subgraph_name
                    .get(&subgraph.subgraph_name)
                else {
                    continue;
                };
                if self.subgraph_names.contains(source) {
                    continue;
                }
                field_names_by_source
                    .entry(source.clone())
                    .or_default()
                    .push(field.name.to_string());
                field
                    .override_source_by_subgraph_name
                    .shift_remove(&subgraph.subgraph_name);
            }
            for (source, field_names) in field_names_by_source {
                self.warnings.push(CompositionWarning {
                    code: WarningCode::InvalidOverrideTargetSubgraphName,
                    subgraph: subgraph.subgraph_name.clone(),
                    message: format!(
                        "The Object type \"{}\" defines the directive \"@override(from: \"{source}\")\" on the following {}: \"{}\".\nThe required \"from\" argument of type \"String!\" must be provided with an existing subgraph name.\nHowever, a subgraph by the name of \"{source}\" does not exist.\nConsequently, this directive will be ignored.",
                        data.name,
                        pluralize("field", field_names.len()),
                        join_quoted(&field_names)
                    ),
                });
            }
        }
    }

    fn merge_type(&mut self, incoming: TypeDefinitionData) {
        let type_name = incoming.name().clone();
        if let TypeDefinitionData::Object(data) = &incoming {
            if data.is_interface_object {
                self.interface_object_subgraphs_by_type_name
                    .entry(type_name.clone())
                    .or_default()
                    .extend(data.subgraph_names.iter().cloned());
            }
        }
        let Some(existing) = self.registry.get_mut(&type_name) else {
            self.registry.insert(type_name, incoming);
            return;
        };
        let existing_is_interface_object =
            matches!(existing, TypeDefinitionData::Object(data) if data.is_interface_object);
        let incoming = if existing_is_interface_object && incoming.kind() == TypeKind::Interface {
            std::mem::replace(existing, incoming)
        } else {
            incoming
        };

        longest_description(existing.description_mut(), incoming.description().cloned());
        existing.directives_mut().merge(incoming.directives());
        *existing.extension_type_mut() =
            merge_extension_types(existing.extension_type(), incoming.extension_type());
        existing
            .subgraph_names_mut()
            .extend(incoming.subgraph_names().iter().cloned());

        match (existing, incoming) {
            (TypeDefinitionData::Enum(existing), TypeDefinitionData::Enum(incoming)) => {
                for (value_name, value) in incoming.values {
                    match existing.values.entry(value_name) {
                        Entry::Vacant(entry) => {
                            entry.insert(value);
                        }
                        Entry::Occupied(mut entry) => {
                            let existing_value = entry.get_mut();
                            longest_description(&mut existing_value.description, value.description);
                            existing_value.directives.merge(&value.directives);
                            existing_value.subgraph_names.extend(value.subgraph_names);
                        }
                    }
                }
            }
            (
                TypeDefinitionData::InputObject(existing),
                TypeDefinitionData::InputObject(incoming),
            ) => {
                for (field_name, field) in incoming.fields {
                    match existing.fields.entry(field_name) {
                        Entry::Vacant(entry) => {
                            entry.insert(field);
                        }
                        Entry::Occupied(mut entry) => {
                            merge_input_value(entry.get_mut(), field, &mut self.errors);
                        }
                    }
                }
            }
            (TypeDefinitionData::Interface(existing), TypeDefinitionData::Object(incoming))
                if incoming.is_interface_object =>
            {
                merge_composite(existing, incoming, &mut self.errors);
            }
            (TypeDefinitionData::Interface(existing), TypeDefinitionData::Interface(incoming))
            | (TypeDefinitionData::Object(existing), TypeDefinitionData::Object(incoming)) => {
                merge_composite(existing, incoming, &mut self.errors);
            }
            (TypeDefinitionData::Scalar(_), TypeDefinitionData::Scalar(_)) => {}
            (TypeDefinitionData::Union(existing), TypeDefinitionData::Union(incoming)) => {
                existing.members.extend(incoming.members);
            }
            (existing, incoming) => {
                self.errors.push(CompositionError::IncompatibleParentKind {
                    type_name: type_name.to_string(),
                    expected: existing.kind(),
                    actual: incoming.kind(),
                });
            }
        }
    }

    pub(crate) fn finish(mut self) -> FederationResult {
        // Field configurations follow the order in which types were first encountered.
        let traversal_order = self.registry.keys().cloned().collect_vec();
        self.registry.sort_keys();
        self.resolve_configured_descriptions();
        self.validate_federated_graph();
        self.propagate_interface_object_fields();
        if !self.or_scopes_limit_coords.is_empty() {
            self.errors.push(CompositionError::OrScopesLimit {
                max_or_scopes: MAX_OR_SCOPES,
                coords: std::mem::take(&mut self.or_scopes_limit_coords),
            });
        }
        if !self.errors.is_empty() {
            return Err(self.into_failure());
        }
        let field_configurations = match propagate(
            &self.registry,
            &traversal_order,
            &mut self.authorization_data_by_parent_type_name,
        ) {
            Ok(field_configurations) => field_configurations,
            Err(error) => {
                self.errors.push(error);
                return Err(self.into_failure());
            }
        };
        snapshot!(field_configurations, "generated field configurations");
        build_success(
            self.registry,
            self.authorization_data_by_parent_type_name,
            field_configurations,
            self.entity_interfaces,
            self.warnings,
        )
    }

    fn into_failure(self) -> FederationFailure {
        debug!(errors = self.errors.len(), "federation failed");
        FederationFailure {
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    /// A description that exactly one subgraph propagates with `@openfed__configureDescription`
    /// replaces the longest description.
    fn resolve_configured_descriptions(&mut self) {
        let errors = &mut self.errors;
        for_each_described_definition(&mut self.registry, |definition| {
            let propagating = definition
                .directives
                .description_configurations
                .iter()
                .filter(|(_, configuration)| configuration.propagate)
                .collect_vec();
            match propagating.as_slice() {
                [] => {}
                [(_, configuration)] => {
                    *definition.description = Some(Node::new_str(&configuration.description));
                }
                _ => errors.push(CompositionError::ConfigureDescriptionPropagation {
                    coords: definition.coords,
                    subgraph_names: propagating
                        .iter()
                        .map(|(subgraph_name, _)| (*subgraph_name).clone())
                        .collect(),
                }),
            }
        });
    }

    /// Fields that only `@interfaceObject` subgraphs contribute to an interface are resolved
    /// through the interface, so every implementation exposes them too.
    fn propagate_interface_object_fields(&mut self) {
        let mut additions: Vec<(Name, FieldData)> = Vec::new();
        for (interface_name, subgraph_names) in &self.interface_object_subgraphs_by_type_name {
            let Some(TypeDefinitionData::Interface(interface)) = self.registry.get(interface_name)
            else {
                continue;
            };
            let interface_object_fields = interface
                .fields
                .values()
                .filter(|field| field.subgraph_names.is_subset(subgraph_names))
                .collect_vec();
            for implementation in self
                .registry
                .values()
                .filter_map(TypeDefinitionData::as_composite)
                .filter(|data| data.implements.contains(interface_name))
            {
                for field in &interface_object_fields {
                    if implementation.fields.contains_key(&field.name) {
                        continue;
                    }
                    let mut field = (*field).clone();
                    field.parent_type_name = implementation.name.clone();
                    additions.push((implementation.name.clone(), field));
                }
            }
        }
        for (type_name, field) in additions {
            if let Some(data) = self
                .registry
                .get_mut(&type_name)
                .and_then(TypeDefinitionData::as_composite_mut)
            {
                data.fields.insert(field.name.clone(), field);
            }
        }
    }
}

/// Derives the client registry and prints both schemas of a validated federated registry.
pub(crate) fn build_success(
    registry: TypeRegistry,
    authorization_data_by_parent_type_name: AuthorizationDataByTypeName,
    field_configurations: Vec<FieldConfiguration>,
    entity_interfaces: IndexMap<Name, EntityInterfaceData>,
    warnings: Vec<CompositionWarning>,
) -> FederationResult {
    let client_registry = match derive_client_registry(&registry) {
        Ok(client_registry) => client_registry,
        Err(errors) => {
            debug!(errors = errors.len(), "client schema derivation failed");
            return Err(FederationFailure { errors, warnings });
        }
    };
    let federated_graph_schema = print_document(
        &registry,
        &authorization_data_by_parent_type_name,
        PrintTarget::Router,
    );
    let federated_graph_client_schema = print_document(
        &client_registry,
        &authorization_data_by_parent_type_name,
        PrintTarget::Client,
    );
    let federated_graph_sdl = federated_graph_schema.to_string();
    let federated_graph_client_sdl = federated_graph_client_schema.to_string();
    snapshot!("RouterSchema", federated_graph_sdl.as_str(), "printed router schema");
    snapshot!(
        "ClientSchema",
        federated_graph_client_sdl.as_str(),
        "printed client schema"
    );
    debug!(
        types = registry.len(),
        field_configurations = field_configurations.len(),
        warnings = warnings.len(),
        "federation succeeded"
    );
    Ok(FederationSuccess {
        federated_graph_schema,
        federated_graph_client_schema,
        federated_graph_sdl,
        federated_graph_client_sdl,
        field_configurations,
        authorization_data_by_parent_type_name,
        entity_interfaces,
        warnings,
        registry,
    })
}

fn merge_composite(
    existing: &mut CompositeDefinitionData,
    incoming: CompositeDefinitionData,
    errors: &mut Vec<CompositionError>,
) {
    existing.implements.extend(incoming.implements);
    for key in incoming.keys {
        if !existing.keys.contains(&key) {
            existing.keys.push(key);
        }
    }
    existing.is_interface_object |= incoming.is_interface_object;
    for (field_name, field) in incoming.fields {
        match existing.fields.entry(field_name) {
            Entry::Vacant(entry) => {
                let mut field = field;
                field.parent_type_name = existing.name.clone();
                entry.insert(field);
            }
            Entry::Occupied(mut entry) => merge_field(entry.get_mut(), field, errors),
        }
    }
}

fn type_merge_error(
    error: TypeMergeError,
    coords: String,
    existing: &ast::Type,
    incoming: &ast::Type,
    is_argument: bool,
) -> CompositionError {
    match error {
        TypeMergeError::Incompatible => CompositionError::IncompatibleMergedTypes {
            coords,
            expected: existing.to_string(),
            actual: incoming.to_string(),
            is_argument,
        },
        TypeMergeError::MaximumNestingExceeded => CompositionError::MaximumTypeNestingExceeded {
            coords,
            max_nesting: MAXIMUM_TYPE_NESTING,
        },
    }
}

fn merge_field(existing: &mut FieldData, incoming: FieldData, errors: &mut Vec<CompositionError>) {
    match merge_types(&existing.ty, &incoming.ty, Position::Output) {
        Ok(ty) => existing.ty = ty,
        Err(error) => errors.push(type_merge_error(
            error,
            existing.coords(),
            &existing.ty,
            &incoming.ty,
            false,
        )),
    }
    longest_description(&mut existing.description, incoming.description);
    existing.directives.merge(&incoming.directives);
    existing
        .is_shareable_by_subgraph_name
        .extend(incoming.is_shareable_by_subgraph_name);
    existing
        .is_external_by_subgraph_name
        .extend(incoming.is_external_by_subgraph_name);
    existing
        .override_source_by_subgraph_name
        .extend(incoming.override_source_by_subgraph_name);
    existing
        .null_levels_by_subgraph_name
        .extend(incoming.null_levels_by_subgraph_name);
    existing.subgraph_names.extend(incoming.subgraph_names);
    for (argument_name, argument) in incoming.arguments {
        match existing.arguments.entry(argument_name) {
            Entry::Vacant(entry) => {
                entry.insert(argument);
            }
            Entry::Occupied(mut entry) => merge_input_value(entry.get_mut(), argument, errors),
        }
    }
}

/// A default value survives only while every instance defines the same one.
fn merge_input_value(
    existing: &mut InputValueData,
    incoming: InputValueData,
    errors: &mut Vec<CompositionError>,
) {
    let is_argument = existing.kind == InputValueKind::Argument;
    match merge_types(&existing.ty, &incoming.ty, Position::Input) {
        Ok(ty) => existing.ty = ty,
        Err(error) => errors.push(type_merge_error(
            error,
            existing.coords(),
            &existing.ty,
            &incoming.ty,
            is_argument,
        )),
    }
    match (&existing.default_value, &incoming.default_value) {
        (None, _) => {}
        (Some(_), None) => existing.default_value = None,
        (Some(expected), Some(actual)) => {
            let expected = expected.to_string();
            let actual = actual.to_string();
            if expected != actual {
                let prefix = if is_argument { "argument" } else { "Input field" };
                errors.push(CompositionError::IncompatibleInputValueDefaultValues {
                    prefix: format!("{prefix} \"{}\"", existing.name),
                    coords: existing.coords(),
                    subgraph_names: incoming.subgraph_names.iter().cloned().collect(),
                    expected,
                    actual,
                });
            }
        }
    }
    longest_description(&mut existing.description, incoming.description);
    existing.directives.merge(&incoming.directives);
    existing.subgraph_names.extend(incoming.subgraph_names);
    existing
        .required_subgraph_names
        .extend(incoming.required_subgraph_names);
}
