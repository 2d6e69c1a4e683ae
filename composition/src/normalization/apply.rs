//! Second walk over a subgraph document: every directive application is validated and its
//! effect recorded on the registry built by the first walk.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::Type;
use indexmap::IndexSet;

use crate::authorization::AuthorizationData;
use crate::authorization::AuthorizationRequirements;
use crate::authorization::MAX_OR_SCOPES;
use crate::directives::DescriptionConfiguration;
use crate::directives::DirectiveName;
use crate::directives::FederationDirective;
use crate::error::CompositionError;
use crate::normalization::NormalizationFactory;
use crate::normalization::directive_validation::DirectiveValidator;
use crate::normalization::walker::is_federation_internal_type;
use crate::schema::ExtensionType;
use crate::schema::ExternalFieldData;
use crate::schema::FieldData;
use crate::schema::KeyData;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeKind;
use crate::schema::for_each_described_definition;
use crate::schema::type_utils::non_null_by_level;
use crate::utils::human_readable::ordinal;

struct ValidatedField {
    name: Name,
    directives: Vec<FederationDirective>,
    directives_by_argument_name: Vec<(Name, Vec<FederationDirective>)>,
}

fn requirements_of(directive: &FederationDirective) -> Option<AuthorizationRequirements> {
    match directive {
        FederationDirective::Authenticated => {
            Some(AuthorizationRequirements::new(true, Vec::new()))
        }
        FederationDirective::RequiresScopes { scopes } => {
            Some(AuthorizationRequirements::new(false, scopes.clone()))
        }
        _ => None,
    }
}

/// Checks `@semanticNonNull(levels:)` against the shape of the field type.
///
/// Level `0` is the field type itself and each list wrapper adds one level. Only nullable
/// positions may be declared semantically non-null.
fn semantic_non_null_messages(levels: &[i32], ty: &Type) -> Vec<String> {
    let non_null_by_level = non_null_by_level(ty);
    let max_index = non_null_by_level.len().saturating_sub(1);
    let type_string = ty.to_string();
    let mut messages = Vec::new();
    for level in levels {
        let Some(is_non_null) = usize::try_from(*level)
            .ok()
            .and_then(|index| non_null_by_level.get(index))
        else {
            messages.push(if max_index > 0 {
                format!(
                    " Index \"{level}\" is out of bounds for type {type_string}; valid indices are 0-{max_index} inclusive."
                )
            } else {
                format!(
                    " Index \"{level}\" is out of bounds for type {type_string}; the only valid index is 0."
                )
            });
            continue;
        };
        if *is_non_null {
            messages.push(format!(
                " Index \"{level}\" of type {type_string} is non-null but must be nullable."
            ));
        }
    }
    messages
}

impl NormalizationFactory<'_> {
    fn record_version(&mut self, directives: &[FederationDirective]) {
        if directives
            .iter()
            .filter_map(FederationDirective::name)
            .any(DirectiveName::is_version_two)
        {
            self.is_version_two = true;
        }
    }

    fn validate(
        &mut self,
        directives: &DirectiveList,
        location: DirectiveLocation,
        coords: &str,
    ) -> Vec<FederationDirective> {
        let validator = DirectiveValidator {
            definitions: &self.directive_definitions,
            registry: &self.registry,
        };
        let mut validated = validator.validate(directives, location, coords, &mut self.errors);
        self.record_version(&validated);
        let exceeds_or_scopes_limit = |directive: &FederationDirective| {
            matches!(directive, FederationDirective::RequiresScopes { scopes } if scopes.len() > MAX_OR_SCOPES)
        };
        if validated.iter().any(exceeds_or_scopes_limit) {
            self.or_scopes_limit_coords.push(coords.to_owned());
            validated.retain(|directive| !exceeds_or_scopes_limit(directive));
        }
        validated.retain(|directive| match directive {
            FederationDirective::ConfigureDescription {
                propagate,
                description_override,
            } => {
                self.description_configurations_by_coords
                    .insert(coords.to_owned(), (*propagate, description_override.clone()));
                false
            }
            _ => true,
        });
        validated
    }

    /// Resolves `@openfed__configureDescription` once every block of a definition has been seen,
    /// so the directive may precede the description, for instance on an extension.
    pub(super) fn apply_description_configurations(&mut self) {
        if self.description_configurations_by_coords.is_empty() {
            return;
        }
        let subgraph_name = self.subgraph_name;
        let configurations_by_coords = &mut self.description_configurations_by_coords;
        let errors = &mut self.errors;
        for_each_described_definition(&mut self.registry, |definition| {
            let Some((propagate, description_override)) =
                configurations_by_coords.shift_remove(&definition.coords)
            else {
                return;
            };
            let is_override = description_override.is_some();
            let Some(description) = description_override
                .or_else(|| definition.description.as_deref().map(str::to_owned))
                .filter(|description| !description.is_empty())
            else {
                errors.push(CompositionError::ConfigureDescriptionNoDescription {
                    kind: definition.kind,
                    coords: definition.coords,
                });
                return;
            };
            definition.directives.description_configurations.insert(
                subgraph_name.to_owned(),
                DescriptionConfiguration {
                    propagate,
                    description,
                    is_override,
                },
            );
        });
    }

    fn authorization_mut(&mut self, type_name: &Name) -> &mut AuthorizationData {
        self.authorization_data_by_parent_type_name
            .entry(type_name.to_string())
            .or_insert_with(|| AuthorizationData::new(type_name))
    }

    fn add_type_authorization(&mut self, type_name: &Name, directives: &[FederationDirective]) {
        for requirements in directives.iter().filter_map(requirements_of) {
            self.authorization_mut(type_name)
                .add_type_requirements(&requirements);
        }
    }

    /// The registry entry of a block, unless the block was rejected by the first walk.
    fn block_type_name(&self, name: &Name, kind: TypeKind) -> Option<Name> {
        let type_name = self.rename(name);
        if is_federation_internal_type(&type_name) {
            return None;
        }
        self.registry
            .get(&type_name)
            .filter(|data| data.kind() == kind)
            .map(|_| type_name)
    }

    pub(super) fn apply_directives(&mut self, document: &ast::Document) {
        for definition in &document.definitions {
            match definition {
                ast::Definition::SchemaDefinition(schema) => {
                    self.validate(&schema.directives, DirectiveLocation::Schema, "schema");
                }
                ast::Definition::SchemaExtension(schema) => {
                    self.validate(&schema.directives, DirectiveLocation::Schema, "schema");
                }
                ast::Definition::ObjectTypeDefinition(object) => self.apply_composite(
                    &object.name,
                    TypeKind::Object,
                    &object.directives,
                    &object.fields,
                ),
                ast::Definition::ObjectTypeExtension(object) => self.apply_composite(
                    &object.name,
                    TypeKind::Object,
                    &object.directives,
                    &object.fields,
                ),
                ast::Definition::InterfaceTypeDefinition(interface) => self.apply_composite(
                    &interface.name,
                    TypeKind::Interface,
                    &interface.directives,
                    &interface.fields,
                ),
                ast::Definition::InterfaceTypeExtension(interface) => self.apply_composite(
                    &interface.name,
                    TypeKind::Interface,
                    &interface.directives,
                    &interface.fields,
                ),
                ast::Definition::EnumTypeDefinition(enum_) => {
                    self.apply_enum(&enum_.name, &enum_.directives, &enum_.values)
                }
                ast::Definition::EnumTypeExtension(enum_) => {
                    self.apply_enum(&enum_.name, &enum_.directives, &enum_.values)
                }
                ast::Definition::InputObjectTypeDefinition(input) => {
                    self.apply_input_object(&input.name, &input.directives, &input.fields)
                }
                ast::Definition::InputObjectTypeExtension(input) => {
                    self.apply_input_object(&input.name, &input.directives, &input.fields)
                }
                ast::Definition::ScalarTypeDefinition(scalar) => {
                    self.apply_scalar(&scalar.name, &scalar.directives)
                }
                ast::Definition::ScalarTypeExtension(scalar) => {
                    self.apply_scalar(&scalar.name, &scalar.directives)
                }
                ast::Definition::UnionTypeDefinition(union_) => {
                    self.apply_union(&union_.name, &union_.directives)
                }
                ast::Definition::UnionTypeExtension(union_) => {
                    self.apply_union(&union_.name, &union_.directives)
                }
                _ => {}
            }
        }
    }

    fn apply_composite(
        &mut self,
        name: &Name,
        kind: TypeKind,
        directives: &DirectiveList,
        fields: &[Node<ast::FieldDefinition>],
    ) {
        let Some(type_name) = self.block_type_name(name, kind) else {
            return;
        };
        let location = if kind == TypeKind::Interface {
            DirectiveLocation::Interface
        } else {
            DirectiveLocation::Object
        };
        let type_directives = self.validate(directives, location, &type_name);
        let known_field_names = self
            .registry
            .get(&type_name)
            .and_then(TypeDefinitionData::as_composite)
            .map(|data| data.fields.keys().cloned().collect::<IndexSet<_>>())
            .unwrap_or_default();
        let mut validated_fields = Vec::new();
        for field in fields {
            if !known_field_names.contains(&field.name) {
                continue;
            }
            let coords = format!("{type_name}.{}", field.name);
            let directives =
                self.validate(&field.directives, DirectiveLocation::FieldDefinition, &coords);
            let mut directives_by_argument_name = Vec::new();
            for argument in &field.arguments {
                let argument_coords = format!("{coords}({}: ...)", argument.name);
                directives_by_argument_name.push((
                    argument.name.clone(),
                    self.validate(
                        &argument.directives,
                        DirectiveLocation::ArgumentDefinition,
                        &argument_coords,
                    ),
                ));
            }
            validated_fields.push(ValidatedField {
                name: field.name.clone(),
                directives,
                directives_by_argument_name,
            });
        }

        self.add_type_authorization(&type_name, &type_directives);
        let is_block_external = type_directives.contains(&FederationDirective::External);
        let is_block_shareable = type_directives.contains(&FederationDirective::Shareable);
        let Some(data) = self
            .registry
            .get_mut(&type_name)
            .and_then(TypeDefinitionData::as_composite_mut)
        else {
            return;
        };
        for directive in &type_directives {
            match directive {
                FederationDirective::Extends if data.extension_type == ExtensionType::None => {
                    data.extension_type = ExtensionType::Extends;
                }
                FederationDirective::Key { fields, resolvable } => {
                    if !data.keys.iter().any(|key| &key.fields == fields) {
                        data.keys.push(KeyData {
                            fields: fields.clone(),
                            resolvable: *resolvable,
                        });
                    }
                }
                FederationDirective::InterfaceObject => data.is_interface_object = true,
                other => {
                    data.directives.apply(other);
                }
            }
        }

        let mut field_requirements = Vec::new();
        for validated in validated_fields {
            let Some(field) = data.fields.get_mut(&validated.name) else {
                continue;
            };
            if is_block_external {
                field.is_external_by_subgraph_name.insert(
                    self.subgraph_name.to_owned(),
                    ExternalFieldData {
                        is_defined_external: true,
                        is_unconditionally_provided: false,
                    },
                );
            }
            if is_block_shareable {
                field
                    .is_shareable_by_subgraph_name
                    .insert(self.subgraph_name.to_owned(), true);
            }
            for directive in &validated.directives {
                if let Some(requirements) = requirements_of(directive) {
                    field_requirements.push((field.name.clone(), requirements));
                    continue;
                }
                if let Some(error) = apply_field_directive(self.subgraph_name, field, directive) {
                    self.errors.push(error);
                }
            }
            for (argument_name, directives) in validated.directives_by_argument_name {
                if let Some(argument) = field.arguments.get_mut(&argument_name) {
                    for directive in &directives {
                        argument.directives.apply(directive);
                    }
                }
            }
        }
        for (field_name, requirements) in field_requirements {
            self.authorization_mut(&type_name)
                .field_mut(&field_name)
                .original_data
                .and(&requirements);
        }
    }

    fn apply_enum(
        &mut self,
        name: &Name,
        directives: &DirectiveList,
        values: &[Node<ast::EnumValueDefinition>],
    ) {
        let Some(type_name) = self.block_type_name(name, TypeKind::Enum) else {
            return;
        };
        let type_directives = self.validate(directives, DirectiveLocation::Enum, &type_name);
        let mut validated_values = Vec::new();
        for value in values {
            let coords = format!("{type_name}.{}", value.value);
            validated_values.push((
                value.value.clone(),
                self.validate(&value.directives, DirectiveLocation::EnumValue, &coords),
            ));
        }
        self.add_type_authorization(&type_name, &type_directives);
        let Some(TypeDefinitionData::Enum(data)) = self.registry.get_mut(&type_name) else {
            return;
        };
        for directive in &type_directives {
            data.directives.apply(directive);
        }
        for (value_name, directives) in validated_values {
            if let Some(value) = data.values.get_mut(&value_name) {
                for directive in &directives {
                    value.directives.apply(directive);
                }
            }
        }
    }

    fn apply_input_object(
        &mut self,
        name: &Name,
        directives: &DirectiveList,
        fields: &[Node<ast::InputValueDefinition>],
    ) {
        let Some(type_name) = self.block_type_name(name, TypeKind::InputObject) else {
            return;
        };
        let type_directives = self.validate(directives, DirectiveLocation::InputObject, &type_name);
        let mut validated_fields = Vec::new();
        for field in fields {
            let coords = format!("{type_name}.{}", field.name);
            validated_fields.push((
                field.name.clone(),
                self.validate(
                    &field.directives,
                    DirectiveLocation::InputFieldDefinition,
                    &coords,
                ),
            ));
        }
        let Some(TypeDefinitionData::InputObject(data)) = self.registry.get_mut(&type_name) else {
            return;
        };
        for directive in &type_directives {
            data.directives.apply(directive);
        }
        for (field_name, directives) in validated_fields {
            if let Some(field) = data.fields.get_mut(&field_name) {
                for directive in &directives {
                    field.directives.apply(directive);
                }
            }
        }
    }

    fn apply_scalar(&mut self, name: &Name, directives: &DirectiveList) {
        let Some(type_name) = self.block_type_name(name, TypeKind::Scalar) else {
            return;
        };
        let type_directives = self.validate(directives, DirectiveLocation::Scalar, &type_name);
        self.add_type_authorization(&type_name, &type_directives);
        if let Some(data) = self.registry.get_mut(&type_name) {
            for directive in &type_directives {
                data.directives_mut().apply(directive);
            }
        }
    }

    fn apply_union(&mut self, name: &Name, directives: &DirectiveList) {
        let Some(type_name) = self.block_type_name(name, TypeKind::Union) else {
            return;
        };
        let type_directives = self.validate(directives, DirectiveLocation::Union, &type_name);
        if let Some(data) = self.registry.get_mut(&type_name) {
            for directive in &type_directives {
                data.directives_mut().apply(directive);
            }
        }
    }
}

/// Records a field-level directive; authorization is handled by the caller.
fn apply_field_directive(
    subgraph_name: &str,
    field: &mut FieldData,
    directive: &FederationDirective,
) -> Option<CompositionError> {
    match directive {
        FederationDirective::External => {
            field.is_external_by_subgraph_name.insert(
                subgraph_name.to_owned(),
                ExternalFieldData {
                    is_defined_external: true,
                    is_unconditionally_provided: false,
                },
            );
        }
        FederationDirective::Shareable => {
            field
                .is_shareable_by_subgraph_name
                .insert(subgraph_name.to_owned(), true);
        }
        FederationDirective::Override { from } => {
            if from == subgraph_name {
                return Some(CompositionError::InvalidDirective {
                    directive_name: DirectiveName::Override.to_string(),
                    coords: field.coords(),
                    ordinal: ordinal(1),
                    messages: vec![format!(
                        " Cannot override field \"{}\" because the source and target subgraph names are both \"{subgraph_name}\"",
                        field.coords()
                    )],
                });
            }
            field
                .override_source_by_subgraph_name
                .insert(subgraph_name.to_owned(), from.clone());
        }
        FederationDirective::Provides { fields } => field.provides = Some(fields.clone()),
        FederationDirective::Requires { fields } => field.requires = Some(fields.clone()),
        FederationDirective::SemanticNonNull { levels } => {
            let messages = semantic_non_null_messages(levels, &field.ty);
            if !messages.is_empty() {
                return Some(CompositionError::InvalidDirective {
                    directive_name: DirectiveName::SemanticNonNull.to_string(),
                    coords: field.coords(),
                    ordinal: ordinal(1),
                    messages,
                });
            }
            field
                .null_levels_by_subgraph_name
                .insert(subgraph_name.to_owned(), levels.iter().copied().collect());
        }
        other => {
            field.directives.apply(other);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ty;

    use super::*;

    #[test]
    fn semantic_non_null_levels_must_point_at_nullable_positions() {
        assert!(semantic_non_null_messages(&[0, 1], &ty!([String])).is_empty());
        assert_eq!(
            semantic_non_null_messages(&[0], &ty!(String!)),
            vec![" Index \"0\" of type String! is non-null but must be nullable.".to_owned()]
        );
        assert_eq!(
            semantic_non_null_messages(&[2], &ty!([String])),
            vec![
                " Index \"2\" is out of bounds for type [String]; valid indices are 0-1 inclusive."
                    .to_owned()
            ]
        );
        assert_eq!(
            semantic_non_null_messages(&[-1], &ty!(Int)),
            vec![" Index \"-1\" is out of bounds for type Int; the only valid index is 0.".to_owned()]
        );
    }
}
