//! Normalization of a single subgraph.
//!
//! A subgraph document is walked twice. The first walk ([`walker`]) collects directive
//! definitions, root operation types and every type definition or extension into one
//! [`TypeRegistry`]. The second walk ([`apply`]) validates every directive application and
//! records its effect. Once both walks succeed, the field sets of `@key`, `@provides` and
//! `@requires` are checked against the complete registry and the canonical subgraph document is
//! printed.

use apollo_compiler::Name;
use apollo_compiler::ast;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;
use tracing::debug;

use crate::authorization::AuthorizationDataByTypeName;
use crate::authorization::MAX_OR_SCOPES;
use crate::directives::DirectiveName;
use crate::error::CompositionError;
use crate::error::CompositionWarning;
use crate::error::WarningCode;
use crate::normalization::directive_validation::DirectiveDefinitions;
use crate::normalization::field_set::FieldSetKind;
use crate::normalization::field_set::FieldSetReference;
use crate::normalization::field_set::validate_field_set;
use crate::options::CompositionOptions;
use crate::printer::PrintTarget;
use crate::printer::print_document;
use crate::schema::ExtensionType;
use crate::schema::QUERY;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;
use crate::schema::is_built_in_scalar;
use crate::subgraph::Subgraph;
use crate::utils::human_readable::ordinal;
use crate::utils::logging::snapshot;

mod apply;
pub(crate) mod directive_validation;
pub(crate) mod field_set;
mod walker;

/// A subgraph that passed normalization, in canonical form.
#[derive(Debug, Clone)]
pub struct NormalizationSuccess {
    pub subgraph_name: String,
    /// The alphabetized subgraph document, federation directives included.
    pub document: ast::Document,
    pub sdl: String,
    pub registry: TypeRegistry,
    pub authorization_data_by_parent_type_name: AuthorizationDataByTypeName,
    pub is_version_two: bool,
    pub warnings: Vec<CompositionWarning>,
}

#[derive(Debug, Clone)]
pub struct NormalizationFailure {
    pub errors: Vec<CompositionError>,
    pub warnings: Vec<CompositionWarning>,
}

pub type NormalizationResult = Result<NormalizationSuccess, NormalizationFailure>;

/// Validates and canonicalizes one subgraph.
///
/// Normalization is all-or-nothing: if any error is found, no registry is returned.
#[cfg_attr(
    feature = "snapshot_tracing",
    tracing::instrument(level = "trace", skip_all, name = "normalize_subgraph")
)]
pub fn normalize_subgraph(subgraph: &Subgraph, options: &CompositionOptions) -> NormalizationResult {
    debug!(
        subgraph = subgraph.name.as_str(),
        compatibility_version = ?options.compatibility_version,
        "normalizing subgraph"
    );
    NormalizationFactory::new(&subgraph.name).normalize(&subgraph.document)
}

pub(crate) struct NormalizationFactory<'a> {
    subgraph_name: &'a str,
    directive_definitions: DirectiveDefinitions,
    /// Custom root operation type names, mapped to the default names.
    renames: IndexMap<Name, Name>,
    registry: TypeRegistry,
    authorization_data_by_parent_type_name: AuthorizationDataByTypeName,
    errors: Vec<CompositionError>,
    warnings: Vec<CompositionWarning>,
    is_version_two: bool,
    or_scopes_limit_coords: Vec<String>,
    /// Coordinates of fields selected by any field set of this subgraph.
    field_set_coords: IndexSet<String>,
    /// `@openfed__configureDescription` arguments `(propagate, descriptionOverride)` by coordinates.
    description_configurations_by_coords: IndexMap<String, (bool, Option<String>)>,
}

impl<'a> NormalizationFactory<'a> {
    fn new(subgraph_name: &'a str) -> Self {
        Self {
            subgraph_name,
            directive_definitions: DirectiveDefinitions::new(),
            renames: IndexMap::new(),
            registry: TypeRegistry::new(),
            authorization_data_by_parent_type_name: AuthorizationDataByTypeName::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            is_version_two: false,
            or_scopes_limit_coords: Vec::new(),
            field_set_coords: IndexSet::new(),
            description_configurations_by_coords: IndexMap::new(),
        }
    }

    fn normalize(mut self, document: &ast::Document) -> NormalizationResult {
        self.walk_directive_definitions(document);
        self.walk_schema_definitions(document);
        self.walk_type_definitions(document);
        self.apply_directives(document);
        self.apply_description_configurations();
        self.validate_referenced_types();
        self.apply_version_rules();
        self.validate_key_field_sets();
        self.validate_conditional_field_sets();
        self.validate_external_fields();
        self.validate_children();
        if !self.or_scopes_limit_coords.is_empty() {
            self.errors.push(CompositionError::OrScopesLimit {
                max_or_scopes: MAX_OR_SCOPES,
                coords: std::mem::take(&mut self.or_scopes_limit_coords),
            });
        }

        if !self.errors.is_empty() {
            debug!(
                subgraph = self.subgraph_name,
                errors = self.errors.len(),
                "subgraph failed normalization"
            );
            return Err(NormalizationFailure {
                errors: self.errors,
                warnings: self.warnings,
            });
        }
        let document = print_document(
            &self.registry,
            &self.authorization_data_by_parent_type_name,
            PrintTarget::Subgraph {
                subgraph_name: self.subgraph_name,
                is_version_two: self.is_version_two,
            },
        );
        let sdl = document.to_string();
        snapshot!("NormalizedSubgraph", sdl.as_str(), "normalized subgraph");
        snapshot!(
            self.authorization_data_by_parent_type_name,
            "subgraph authorization data"
        );
        Ok(NormalizationSuccess {
            subgraph_name: self.subgraph_name.to_owned(),
            document,
            sdl,
            registry: self.registry,
            authorization_data_by_parent_type_name: self.authorization_data_by_parent_type_name,
            is_version_two: self.is_version_two,
            warnings: self.warnings,
        })
    }

    fn validate_referenced_types(&mut self) {
        let mut referenced = IndexSet::new();
        for data in self.registry.values() {
            match data {
                TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
                    referenced.extend(data.implements.iter());
                    for field in data.fields.values() {
                        referenced.insert(field.named_type_name());
                        referenced.extend(
                            field
                                .arguments
                                .values()
                                .map(|argument| argument.ty.inner_named_type()),
                        );
                    }
                }
                TypeDefinitionData::InputObject(data) => {
                    referenced.extend(data.fields.values().map(|field| field.ty.inner_named_type()));
                }
                TypeDefinitionData::Union(data) => referenced.extend(data.members.iter()),
                TypeDefinitionData::Enum(_) | TypeDefinitionData::Scalar(_) => {}
            }
        }
        let undefined = referenced
            .into_iter()
            .filter(|name| !is_built_in_scalar(name) && !self.registry.contains_key(*name))
            .map(|name| CompositionError::UndefinedType {
                type_name: name.to_string(),
            })
            .collect_vec();
        self.errors.extend(undefined);
    }

    /// `@extends` has no meaning for version two subgraphs, and every field of a version one
    /// subgraph is shareable.
    fn apply_version_rules(&mut self) {
        for data in self
            .registry
            .values_mut()
            .filter_map(TypeDefinitionData::as_composite_mut)
        {
            if self.is_version_two {
                if data.extension_type == ExtensionType::Extends {
                    data.extension_type = ExtensionType::None;
                }
                continue;
            }
            for field in data.fields.values_mut() {
                field
                    .is_shareable_by_subgraph_name
                    .insert(self.subgraph_name.to_owned(), true);
            }
        }
    }

    fn invalid_field_set(
        directive_name: DirectiveName,
        coords: String,
        index: usize,
        messages: Vec<String>,
    ) -> CompositionError {
        CompositionError::InvalidDirective {
            directive_name: directive_name.to_string(),
            coords,
            ordinal: ordinal(index + 1),
            messages,
        }
    }

    /// Key fields are shareable. An external key field of an entity extension is resolvable by
    /// this subgraph regardless of `@external`.
    fn validate_key_field_sets(&mut self) {
        let mut key_references: Vec<(Name, bool, Vec<FieldSetReference>)> = Vec::new();
        for data in self
            .registry
            .values()
            .filter_map(TypeDefinitionData::as_composite)
        {
            for (index, key) in data.keys.iter().enumerate() {
                match validate_field_set(FieldSetKind::Key, &key.fields, &data.name, &self.registry)
                {
                    Ok(references) => key_references.push((
                        data.name.clone(),
                        data.extension_type.is_extension(),
                        references,
                    )),
                    Err(messages) => self.errors.push(Self::invalid_field_set(
                        DirectiveName::Key,
                        data.name.to_string(),
                        index,
                        messages,
                    )),
                }
            }
        }
        for (entity_name, is_extension, references) in key_references {
            for (parent_type_name, field_name) in references {
                let Some(field) = self
                    .registry
                    .get_mut(&parent_type_name)
                    .and_then(TypeDefinitionData::as_composite_mut)
                    .and_then(|data| data.fields.get_mut(&field_name))
                else {
                    continue;
                };
                field
                    .is_shareable_by_subgraph_name
                    .insert(self.subgraph_name.to_owned(), true);
                if is_extension && parent_type_name == entity_name {
                    if let Some(external) =
                        field.is_external_by_subgraph_name.get_mut(self.subgraph_name)
                    {
                        external.is_unconditionally_provided = true;
                    }
                }
                self.field_set_coords.insert(field.coords());
            }
        }
    }

    fn validate_conditional_field_sets(&mut self) {
        let mut references = Vec::new();
        for data in self
            .registry
            .values()
            .filter_map(TypeDefinitionData::as_composite)
        {
            for field in data.fields.values() {
                if let Some(fields) = &field.provides {
                    let named_type_name = field.named_type_name();
                    match self.registry.get(named_type_name) {
                        Some(TypeDefinitionData::Interface(_) | TypeDefinitionData::Object(_)) => {
                            match validate_field_set(
                                FieldSetKind::Provides,
                                fields,
                                named_type_name,
                                &self.registry,
                            ) {
                                Ok(provided) => references.extend(provided),
                                Err(messages) => self.errors.push(Self::invalid_field_set(
                                    DirectiveName::Provides,
                                    field.coords(),
                                    0,
                                    messages,
                                )),
                            }
                        }
                        _ => self.errors.push(Self::invalid_field_set(
                            DirectiveName::Provides,
                            field.coords(),
                            0,
                            vec![format!(
                                " A \"@provides\" directive is declared on field \"{}\".\n However, the response type \"{named_type_name}\" is not an Object nor Interface.",
                                field.coords()
                            )],
                        )),
                    }
                }
                if let Some(fields) = &field.requires {
                    match validate_field_set(FieldSetKind::Requires, fields, &data.name, &self.registry)
                    {
                        Ok(required) => references.extend(required),
                        Err(messages) => self.errors.push(Self::invalid_field_set(
                            DirectiveName::Requires,
                            field.coords(),
                            0,
                            messages,
                        )),
                    }
                }
            }
        }
        self.field_set_coords.extend(
            references
                .into_iter()
                .map(|(parent_type_name, field_name)| format!("{parent_type_name}.{field_name}")),
        );
    }

    fn validate_external_fields(&mut self) {
        for data in self.registry.values() {
            let external_field_names = data
                .as_composite()
                .into_iter()
                .flat_map(|data| data.fields.values())
                .filter(|field| {
                    field
                        .is_external_by_subgraph_name
                        .get(self.subgraph_name)
                        .is_some_and(|external| external.is_defined_external)
                })
                .collect_vec();
            if let TypeDefinitionData::Interface(data) = data {
                if external_field_names.is_empty() {
                    continue;
                }
                let error = CompositionError::ExternalInterfaceFields {
                    type_name: data.name.to_string(),
                    field_names: external_field_names
                        .iter()
                        .map(|field| field.name.to_string())
                        .collect(),
                };
                if self.is_version_two {
                    self.errors.push(error);
                } else {
                    self.warnings.push(CompositionWarning {
                        code: WarningCode::ExternalInterfaceFields,
                        subgraph: self.subgraph_name.to_owned(),
                        message: error.to_string(),
                    });
                }
                continue;
            }
            for field in external_field_names {
                let coords = field.coords();
                let is_unconditionally_provided = field
                    .is_external_by_subgraph_name
                    .get(self.subgraph_name)
                    .is_some_and(|external| external.is_unconditionally_provided);
                if is_unconditionally_provided || self.field_set_coords.contains(&coords) {
                    continue;
                }
                self.warnings.push(CompositionWarning {
                    code: WarningCode::UnusedExternalField,
                    subgraph: self.subgraph_name.to_owned(),
                    message: format!(
                        "The field \"{coords}\" is declared \"@external\" but is not selected by any \"@key\", \"@provides\" or \"@requires\" field set."
                    ),
                });
            }
        }
    }

    fn validate_children(&mut self) {
        for data in self.registry.values() {
            match data {
                TypeDefinitionData::Interface(composite) | TypeDefinitionData::Object(composite)
                    if composite.fields.is_empty() && composite.name != QUERY =>
                {
                    self.errors.push(CompositionError::NoFieldDefinitions {
                        kind: data.kind(),
                        type_name: composite.name.to_string(),
                    });
                }
                TypeDefinitionData::InputObject(input) if input.fields.is_empty() => {
                    self.errors.push(CompositionError::NoInputValueDefinitions {
                        type_name: input.name.to_string(),
                    });
                }
                _ => {}
            }
        }
    }
}
