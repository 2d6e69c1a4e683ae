//! First walk over a subgraph document: directive definitions, root operation types and every
//! type definition or extension, merged into one registry entry per type name.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::OperationType;
use indexmap::IndexMap;
use indexmap::IndexSet;
use indexmap::map::Entry;
use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::directives::DirectiveName;
use crate::directives::PersistedDirectives;
use crate::error::CompositionError;
use crate::normalization::NormalizationFactory;
use crate::schema::CompositeDefinitionData;
use crate::schema::EnumDefinitionData;
use crate::schema::EnumValueData;
use crate::schema::ExtensionType;
use crate::schema::FieldData;
use crate::schema::InputObjectDefinitionData;
use crate::schema::InputValueData;
use crate::schema::InputValueKind;
use crate::schema::MUTATION;
use crate::schema::QUERY;
use crate::schema::SUBSCRIPTION;
use crate::schema::ScalarDefinitionData;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeKind;
use crate::schema::UnionDefinitionData;
use crate::schema::type_utils::rename_type;

/// Types and fields that only exist to serve the federation protocol itself.
pub(crate) fn is_federation_internal_type(name: &str) -> bool {
    matches!(
        name,
        "_Any"
            | "_Entity"
            | "_FieldSet"
            | "_Service"
            | "federation__FieldSet"
            | "federation__Scope"
            | "link__Import"
            | "link__Purpose"
            | "openfed__FieldSet"
            | "openfed__Scope"
    )
}

fn is_federation_internal_field(type_name: &str, field_name: &str) -> bool {
    type_name == QUERY && matches!(field_name, "_entities" | "_service")
}

pub(crate) fn default_root_type_name(operation_type: OperationType) -> &'static str {
    match operation_type {
        OperationType::Query => QUERY,
        OperationType::Mutation => MUTATION,
        OperationType::Subscription => SUBSCRIPTION,
    }
}

impl NormalizationFactory<'_> {
    pub(super) fn walk_directive_definitions(&mut self, document: &ast::Document) {
        self.directive_definitions.extend(
            DirectiveName::iter().map(|directive_name| {
                (directive_name.as_name(), directive_name.definition())
            }),
        );
        let mut custom_names = IndexSet::new();
        for definition in &document.definitions {
            let ast::Definition::DirectiveDefinition(directive_definition) = definition else {
                continue;
            };
            // Redefinitions of the directives composition knows about are ignored.
            if directive_definition.name.parse::<DirectiveName>().is_ok() {
                continue;
            }
            if !custom_names.insert(directive_definition.name.clone()) {
                self.errors
                    .push(CompositionError::DuplicateDirectiveDefinition {
                        directive_name: directive_definition.name.to_string(),
                    });
                continue;
            }
            self.directive_definitions
                .insert(directive_definition.name.clone(), directive_definition.clone());
        }
    }

    pub(super) fn walk_schema_definitions(&mut self, document: &ast::Document) {
        let mut type_name_by_operation: IndexMap<&'static str, Name> = IndexMap::new();
        for definition in &document.definitions {
            let root_operations = match definition {
                ast::Definition::SchemaDefinition(schema) => &schema.root_operations,
                ast::Definition::SchemaExtension(schema) => &schema.root_operations,
                _ => continue,
            };
            for root_operation in root_operations {
                let (operation_type, type_name) = &**root_operation;
                let default_name = default_root_type_name(*operation_type);
                match type_name_by_operation.entry(default_name) {
                    Entry::Occupied(existing) if existing.get() != type_name => {
                        self.errors.push(CompositionError::DuplicateOperationType {
                            operation_type: operation_type.to_string(),
                            new_type_name: type_name.to_string(),
                            old_type_name: existing.get().to_string(),
                        });
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(entry) => {
                        entry.insert(type_name.clone());
                    }
                }
            }
        }
        for (default_name, type_name) in type_name_by_operation {
            if type_name != default_name {
                if let Ok(default_name) = Name::new(default_name) {
                    self.renames.insert(type_name, default_name);
                }
            }
        }
    }

    pub(super) fn rename(&self, name: &Name) -> Name {
        self.renames.get(name).unwrap_or(name).clone()
    }

    /// Finds or creates the registry entry of a definition or extension.
    ///
    /// Returns the renamed type name when children of this block should be added.
    fn upsert_type(
        &mut self,
        name: &Name,
        kind: TypeKind,
        description: Option<&Node<str>>,
        is_extension: bool,
        create: impl FnOnce(Name, ExtensionType) -> TypeDefinitionData,
    ) -> Option<Name> {
        let type_name = self.rename(name);
        if is_federation_internal_type(&type_name) {
            return None;
        }
        let Some(existing) = self.registry.get_mut(&type_name) else {
            let extension_type = if is_extension {
                ExtensionType::Real
            } else {
                ExtensionType::None
            };
            let mut data = create(type_name.clone(), extension_type);
            *data.description_mut() = description.cloned();
            data.subgraph_names_mut()
                .insert(self.subgraph_name.to_owned());
            self.registry.insert(type_name.clone(), data);
            return Some(type_name);
        };
        if existing.kind() != kind {
            self.errors.push(if is_extension {
                CompositionError::IncompatibleExtensionKind {
                    type_name: type_name.to_string(),
                    expected: existing.kind(),
                    actual: kind,
                }
            } else {
                CompositionError::DuplicateTypeDefinition {
                    kind,
                    type_name: type_name.to_string(),
                }
            });
            return None;
        }
        if !is_extension {
            if existing.extension_type() != ExtensionType::Real {
                self.errors.push(CompositionError::DuplicateTypeDefinition {
                    kind,
                    type_name: type_name.to_string(),
                });
                return None;
            }
            *existing.extension_type_mut() = ExtensionType::None;
            if description.is_some() {
                *existing.description_mut() = description.cloned();
            }
        }
        Some(type_name)
    }

    pub(super) fn walk_type_definitions(&mut self, document: &ast::Document) {
        for definition in &document.definitions {
            match definition {
                ast::Definition::ObjectTypeDefinition(object) => self.walk_composite(
                    &object.name,
                    TypeKind::Object,
                    object.description.as_ref(),
                    false,
                    &object.implements_interfaces,
                    &object.fields,
                ),
                ast::Definition::ObjectTypeExtension(object) => self.walk_composite(
                    &object.name,
                    TypeKind::Object,
                    None,
                    true,
                    &object.implements_interfaces,
                    &object.fields,
                ),
                ast::Definition::InterfaceTypeDefinition(interface) => self.walk_composite(
                    &interface.name,
                    TypeKind::Interface,
                    interface.description.as_ref(),
                    false,
                    &interface.implements_interfaces,
                    &interface.fields,
                ),
                ast::Definition::InterfaceTypeExtension(interface) => self.walk_composite(
                    &interface.name,
                    TypeKind::Interface,
                    None,
                    true,
                    &interface.implements_interfaces,
                    &interface.fields,
                ),
                ast::Definition::EnumTypeDefinition(enum_) => self.walk_enum(
                    &enum_.name,
                    enum_.description.as_ref(),
                    false,
                    &enum_.values,
                ),
                ast::Definition::EnumTypeExtension(enum_) => {
                    self.walk_enum(&enum_.name, None, true, &enum_.values)
                }
                ast::Definition::InputObjectTypeDefinition(input) => self.walk_input_object(
                    &input.name,
                    input.description.as_ref(),
                    false,
                    &input.fields,
                ),
                ast::Definition::InputObjectTypeExtension(input) => {
                    self.walk_input_object(&input.name, None, true, &input.fields)
                }
                ast::Definition::ScalarTypeDefinition(scalar) => {
                    self.walk_scalar(&scalar.name, scalar.description.as_ref(), false)
                }
                ast::Definition::ScalarTypeExtension(scalar) => {
                    self.walk_scalar(&scalar.name, None, true)
                }
                ast::Definition::UnionTypeDefinition(union_) => self.walk_union(
                    &union_.name,
                    union_.description.as_ref(),
                    false,
                    &union_.members,
                ),
                ast::Definition::UnionTypeExtension(union_) => {
                    self.walk_union(&union_.name, None, true, &union_.members)
                }
                _ => {}
            }
        }
    }

    fn walk_composite(
        &mut self,
        name: &Name,
        kind: TypeKind,
        description: Option<&Node<str>>,
        is_extension: bool,
        implements: &[Name],
        fields: &[Node<ast::FieldDefinition>],
    ) {
        let Some(type_name) = self.upsert_type(name, kind, description, is_extension, |name, extension_type| {
            let data = CompositeDefinitionData {
                name,
                description: None,
                directives: PersistedDirectives::default(),
                extension_type,
                fields: IndexMap::new(),
                implements: IndexSet::new(),
                keys: Vec::new(),
                is_interface_object: false,
                subgraph_names: IndexSet::new(),
            };
            if kind == TypeKind::Interface {
                TypeDefinitionData::Interface(data)
            } else {
                TypeDefinitionData::Object(data)
            }
        }) else {
            return;
        };
        let new_fields = fields
            .iter()
            .filter(|field| !is_federation_internal_field(&type_name, &field.name))
            .map(|field| (field, self.field_data(&type_name, field)))
            .collect_vec();
        let Some(data) = self
            .registry
            .get_mut(&type_name)
            .and_then(TypeDefinitionData::as_composite_mut)
        else {
            return;
        };
        for interface_name in implements {
            if !data.implements.insert(interface_name.clone()) {
                self.errors
                    .push(CompositionError::DuplicateImplementedInterface {
                        kind,
                        type_name: type_name.to_string(),
                        interface_name: interface_name.to_string(),
                    });
            }
        }
        for (field, field_data) in new_fields {
            if data.fields.contains_key(&field.name) {
                self.errors.push(CompositionError::DuplicateFieldDefinition {
                    kind,
                    type_name: type_name.to_string(),
                    field_name: field.name.to_string(),
                });
                continue;
            }
            data.fields.insert(field.name.clone(), field_data);
        }
    }

    fn field_data(&mut self, type_name: &Name, field: &ast::FieldDefinition) -> FieldData {
        let field_coords = format!("{type_name}.{}", field.name);
        let mut arguments = IndexMap::new();
        let mut duplicate_argument_names = IndexSet::new();
        for argument in &field.arguments {
            if arguments.contains_key(&argument.name) {
                duplicate_argument_names.insert(argument.name.to_string());
                continue;
            }
            arguments.insert(
                argument.name.clone(),
                self.input_value_data(InputValueKind::Argument, &field_coords, argument),
            );
        }
        if !duplicate_argument_names.is_empty() {
            self.errors.push(CompositionError::DuplicateArguments {
                field_coords,
                argument_names: duplicate_argument_names.into_iter().collect(),
            });
        }
        FieldData {
            name: field.name.clone(),
            parent_type_name: type_name.clone(),
            description: field.description.clone(),
            ty: rename_type(&field.ty, &self.renames),
            arguments,
            directives: PersistedDirectives::default(),
            is_shareable_by_subgraph_name: IndexMap::from([(self.subgraph_name.to_owned(), false)]),
            is_external_by_subgraph_name: IndexMap::new(),
            override_source_by_subgraph_name: IndexMap::new(),
            null_levels_by_subgraph_name: IndexMap::new(),
            subgraph_names: IndexSet::from([self.subgraph_name.to_owned()]),
            provides: None,
            requires: None,
        }
    }

    fn input_value_data(
        &self,
        kind: InputValueKind,
        parent_coords: &str,
        definition: &ast::InputValueDefinition,
    ) -> InputValueData {
        let mut data = InputValueData {
            name: definition.name.clone(),
            kind,
            parent_coords: parent_coords.to_owned(),
            description: definition.description.clone(),
            ty: rename_type(&definition.ty, &self.renames),
            default_value: definition.default_value.clone(),
            directives: PersistedDirectives::default(),
            subgraph_names: IndexSet::from([self.subgraph_name.to_owned()]),
            required_subgraph_names: IndexSet::new(),
        };
        if data.is_required() {
            data.required_subgraph_names
                .insert(self.subgraph_name.to_owned());
        }
        data
    }

    fn walk_enum(
        &mut self,
        name: &Name,
        description: Option<&Node<str>>,
        is_extension: bool,
        values: &[Node<ast::EnumValueDefinition>],
    ) {
        let Some(type_name) = self.upsert_type(
            name,
            TypeKind::Enum,
            description,
            is_extension,
            |name, extension_type| {
                TypeDefinitionData::Enum(EnumDefinitionData {
                    name,
                    description: None,
                    directives: PersistedDirectives::default(),
                    extension_type,
                    values: IndexMap::new(),
                    subgraph_names: IndexSet::new(),
                })
            },
        ) else {
            return;
        };
        let Some(TypeDefinitionData::Enum(data)) = self.registry.get_mut(&type_name) else {
            return;
        };
        for value in values {
            if data.values.contains_key(&value.value) {
                self.errors
                    .push(CompositionError::DuplicateEnumValueDefinition {
                        type_name: type_name.to_string(),
                        value_name: value.value.to_string(),
                    });
                continue;
            }
            data.values.insert(
                value.value.clone(),
                EnumValueData {
                    name: value.value.clone(),
                    parent_type_name: type_name.clone(),
                    description: value.description.clone(),
                    directives: PersistedDirectives::default(),
                    subgraph_names: IndexSet::from([self.subgraph_name.to_owned()]),
                },
            );
        }
    }

    fn walk_input_object(
        &mut self,
        name: &Name,
        description: Option<&Node<str>>,
        is_extension: bool,
        fields: &[Node<ast::InputValueDefinition>],
    ) {
        let Some(type_name) = self.upsert_type(
            name,
            TypeKind::InputObject,
            description,
            is_extension,
            |name, extension_type| {
                TypeDefinitionData::InputObject(InputObjectDefinitionData {
                    name,
                    description: None,
                    directives: PersistedDirectives::default(),
                    extension_type,
                    fields: IndexMap::new(),
                    subgraph_names: IndexSet::new(),
                })
            },
        ) else {
            return;
        };
        let new_fields = fields
            .iter()
            .map(|field| {
                (
                    field,
                    self.input_value_data(InputValueKind::InputField, &type_name, field),
                )
            })
            .collect_vec();
        let Some(TypeDefinitionData::InputObject(data)) = self.registry.get_mut(&type_name) else {
            return;
        };
        for (field, field_data) in new_fields {
            if data.fields.contains_key(&field.name) {
                self.errors
                    .push(CompositionError::DuplicateInputFieldDefinition {
                        type_name: type_name.to_string(),
                        field_name: field.name.to_string(),
                    });
                continue;
            }
            data.fields.insert(field.name.clone(), field_data);
        }
    }

    fn walk_scalar(&mut self, name: &Name, description: Option<&Node<str>>, is_extension: bool) {
        self.upsert_type(
            name,
            TypeKind::Scalar,
            description,
            is_extension,
            |name, extension_type| {
                TypeDefinitionData::Scalar(ScalarDefinitionData {
                    name,
                    description: None,
                    directives: PersistedDirectives::default(),
                    extension_type,
                    subgraph_names: IndexSet::new(),
                })
            },
        );
    }

    fn walk_union(
        &mut self,
        name: &Name,
        description: Option<&Node<str>>,
        is_extension: bool,
        members: &[Name],
    ) {
        let Some(type_name) = self.upsert_type(
            name,
            TypeKind::Union,
            description,
            is_extension,
            |name, extension_type| {
                TypeDefinitionData::Union(UnionDefinitionData {
                    name,
                    description: None,
                    directives: PersistedDirectives::default(),
                    extension_type,
                    members: IndexSet::new(),
                    subgraph_names: IndexSet::new(),
                })
            },
        ) else {
            return;
        };
        let renamed_members = members.iter().map(|member| self.rename(member)).collect_vec();
        let Some(TypeDefinitionData::Union(data)) = self.registry.get_mut(&type_name) else {
            return;
        };
        for member in renamed_members {
            if !data.members.insert(member.clone()) {
                self.errors.push(CompositionError::DuplicateUnionMember {
                    type_name: type_name.to_string(),
                    member_name: member.to_string(),
                });
            }
        }
    }
}
