//! The in-memory type registry shared by normalization, federation and the client schema pass.
//!
//! Every named type is stored once per registry, keyed by name. References between types
//! (implemented interfaces, union members, field return types) are names that are looked up in
//! the same registry, which keeps cyclic type graphs free of ownership cycles.

use std::collections::BTreeSet;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Serialize;

use crate::directives::PersistedDirectives;

pub(crate) mod type_utils;

pub const QUERY: &str = "Query";
pub const MUTATION: &str = "Mutation";
pub const SUBSCRIPTION: &str = "Subscription";

/// Named types of a subgraph or of the federated graph, keyed by type name.
pub type TypeRegistry = IndexMap<Name, TypeDefinitionData>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display)]
pub enum TypeKind {
    Enum,
    #[strum(to_string = "Input Object")]
    InputObject,
    Interface,
    Object,
    Scalar,
    Union,
}

/// How a type came to exist in a subgraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExtensionType {
    /// A base definition exists.
    #[default]
    None,
    /// The base definition is declared with `@extends`.
    Extends,
    /// The type is only ever declared through `extend` blocks.
    Real,
}

impl ExtensionType {
    pub fn is_extension(self) -> bool {
        self != ExtensionType::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputValueKind {
    Argument,
    InputField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyData {
    pub fields: String,
    pub resolvable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExternalFieldData {
    pub is_defined_external: bool,
    pub is_unconditionally_provided: bool,
}

#[derive(Debug, Clone)]
pub struct FieldData {
    pub name: Name,
    pub parent_type_name: Name,
    pub description: Option<Node<str>>,
    pub ty: Type,
    pub arguments: IndexMap<Name, InputValueData>,
    pub directives: PersistedDirectives,
    pub is_shareable_by_subgraph_name: IndexMap<String, bool>,
    pub is_external_by_subgraph_name: IndexMap<String, ExternalFieldData>,
    /// The `from` argument of `@override`, keyed by the subgraph that declares it.
    pub override_source_by_subgraph_name: IndexMap<String, String>,
    pub null_levels_by_subgraph_name: IndexMap<String, BTreeSet<i32>>,
    pub subgraph_names: IndexSet<String>,
    pub provides: Option<String>,
    pub requires: Option<String>,
}

impl FieldData {
    pub fn coords(&self) -> String {
        format!("{}.{}", self.parent_type_name, self.name)
    }

    pub fn named_type_name(&self) -> &Name {
        self.ty.inner_named_type()
    }

    pub fn is_inaccessible(&self) -> bool {
        self.directives.is_inaccessible
    }

    /// Subgraphs whose instance of this field has been taken over by `@override`.
    pub fn overridden_subgraph_names(&self) -> IndexSet<&str> {
        self.override_source_by_subgraph_name
            .values()
            .map(String::as_str)
            .collect()
    }

    /// The union of levels declared by `@semanticNonNull` in every subgraph, if any.
    pub fn semantic_non_null_levels(&self) -> Option<BTreeSet<i32>> {
        if self.null_levels_by_subgraph_name.is_empty() {
            return None;
        }
        Some(
            self.null_levels_by_subgraph_name
                .values()
                .flatten()
                .copied()
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct InputValueData {
    pub name: Name,
    pub kind: InputValueKind,
    /// `Type.field` for arguments, `Type` for input fields.
    pub parent_coords: String,
    pub description: Option<Node<str>>,
    pub ty: Type,
    pub default_value: Option<Node<Value>>,
    pub directives: PersistedDirectives,
    pub subgraph_names: IndexSet<String>,
    pub required_subgraph_names: IndexSet<String>,
}

impl InputValueData {
    pub fn coords(&self) -> String {
        match self.kind {
            InputValueKind::Argument => format!("{}({}: ...)", self.parent_coords, self.name),
            InputValueKind::InputField => format!("{}.{}", self.parent_coords, self.name),
        }
    }

    /// A non-null input value without a default must be supplied by the client.
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }

    pub fn is_inaccessible(&self) -> bool {
        self.directives.is_inaccessible
    }
}

#[derive(Debug, Clone)]
pub struct EnumValueData {
    pub name: Name,
    pub parent_type_name: Name,
    pub description: Option<Node<str>>,
    pub directives: PersistedDirectives,
    pub subgraph_names: IndexSet<String>,
}

/// Object and interface definitions.
#[derive(Debug, Clone)]
pub struct CompositeDefinitionData {
    pub name: Name,
    pub description: Option<Node<str>>,
    pub directives: PersistedDirectives,
    pub extension_type: ExtensionType,
    pub fields: IndexMap<Name, FieldData>,
    pub implements: IndexSet<Name>,
    pub keys: Vec<KeyData>,
    pub is_interface_object: bool,
    pub subgraph_names: IndexSet<String>,
}

impl CompositeDefinitionData {
    pub fn is_entity(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn is_root_type(&self) -> bool {
        [QUERY, MUTATION, SUBSCRIPTION].contains(&self.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct EnumDefinitionData {
    pub name: Name,
    pub description: Option<Node<str>>,
    pub directives: PersistedDirectives,
    pub extension_type: ExtensionType,
    pub values: IndexMap<Name, EnumValueData>,
    pub subgraph_names: IndexSet<String>,
}

#[derive(Debug, Clone)]
pub struct InputObjectDefinitionData {
    pub name: Name,
    pub description: Option<Node<str>>,
    pub directives: PersistedDirectives,
    pub extension_type: ExtensionType,
    pub fields: IndexMap<Name, InputValueData>,
    pub subgraph_names: IndexSet<String>,
}

#[derive(Debug, Clone)]
pub struct ScalarDefinitionData {
    pub name: Name,
    pub description: Option<Node<str>>,
    pub directives: PersistedDirectives,
    pub extension_type: ExtensionType,
    pub subgraph_names: IndexSet<String>,
}

#[derive(Debug, Clone)]
pub struct UnionDefinitionData {
    pub name: Name,
    pub description: Option<Node<str>>,
    pub directives: PersistedDirectives,
    pub extension_type: ExtensionType,
    pub members: IndexSet<Name>,
    pub subgraph_names: IndexSet<String>,
}

/// A named type definition, one variant per GraphQL kind.
#[derive(Debug, Clone)]
pub enum TypeDefinitionData {
    Enum(EnumDefinitionData),
    InputObject(InputObjectDefinitionData),
    Interface(CompositeDefinitionData),
    Object(CompositeDefinitionData),
    Scalar(ScalarDefinitionData),
    Union(UnionDefinitionData),
}

macro_rules! each_variant {
    ($self:expr, $data:ident => $body:expr) => {
        match $self {
            TypeDefinitionData::Enum($data) => $body,
            TypeDefinitionData::InputObject($data) => $body,
            TypeDefinitionData::Interface($data) => $body,
            TypeDefinitionData::Object($data) => $body,
            TypeDefinitionData::Scalar($data) => $body,
            TypeDefinitionData::Union($data) => $body,
        }
    };
}

impl TypeDefinitionData {
    pub fn name(&self) -> &Name {
        each_variant!(self, data => &data.name)
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDefinitionData::Enum(_) => TypeKind::Enum,
            TypeDefinitionData::InputObject(_) => TypeKind::InputObject,
            TypeDefinitionData::Interface(_) => TypeKind::Interface,
            TypeDefinitionData::Object(_) => TypeKind::Object,
            TypeDefinitionData::Scalar(_) => TypeKind::Scalar,
            TypeDefinitionData::Union(_) => TypeKind::Union,
        }
    }

    pub fn description(&self) -> Option<&Node<str>> {
        each_variant!(self, data => data.description.as_ref())
    }

    pub(crate) fn description_mut(&mut self) -> &mut Option<Node<str>> {
        each_variant!(self, data => &mut data.description)
    }

    pub fn directives(&self) -> &PersistedDirectives {
        each_variant!(self, data => &data.directives)
    }

    pub(crate) fn directives_mut(&mut self) -> &mut PersistedDirectives {
        each_variant!(self, data => &mut data.directives)
    }

    pub fn extension_type(&self) -> ExtensionType {
        each_variant!(self, data => data.extension_type)
    }

    pub(crate) fn extension_type_mut(&mut self) -> &mut ExtensionType {
        each_variant!(self, data => &mut data.extension_type)
    }

    pub fn subgraph_names(&self) -> &IndexSet<String> {
        each_variant!(self, data => &data.subgraph_names)
    }

    pub(crate) fn subgraph_names_mut(&mut self) -> &mut IndexSet<String> {
        each_variant!(self, data => &mut data.subgraph_names)
    }

    pub fn is_inaccessible(&self) -> bool {
        self.directives().is_inaccessible
    }

    pub fn as_composite(&self) -> Option<&CompositeDefinitionData> {
        match self {
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_composite_mut(&mut self) -> Option<&mut CompositeDefinitionData> {
        match self {
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => Some(data),
            _ => None,
        }
    }

    /// Output types are everything but input objects; input types are enums, scalars and input
    /// objects.
    pub fn is_input_type(&self) -> bool {
        matches!(
            self,
            TypeDefinitionData::Enum(_)
                | TypeDefinitionData::InputObject(_)
                | TypeDefinitionData::Scalar(_)
        )
    }

    pub fn is_output_type(&self) -> bool {
        !matches!(self, TypeDefinitionData::InputObject(_))
    }

    /// Tag names declared on the children of this type (fields, arguments, input fields, values).
    pub(crate) fn child_tag_names(&self) -> BTreeSet<&str> {
        let mut tags = BTreeSet::new();
        match self {
            TypeDefinitionData::Enum(data) => {
                for value in data.values.values() {
                    tags.extend(value.directives.tags.iter().map(String::as_str));
                }
            }
            TypeDefinitionData::InputObject(data) => {
                for field in data.fields.values() {
                    tags.extend(field.directives.tags.iter().map(String::as_str));
                }
            }
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
                for field in data.fields.values() {
                    tags.extend(field.directives.tags.iter().map(String::as_str));
                    for argument in field.arguments.values() {
                        tags.extend(argument.directives.tags.iter().map(String::as_str));
                    }
                }
            }
            TypeDefinitionData::Scalar(_) | TypeDefinitionData::Union(_) => {}
        }
        tags
    }
}

/// A definition that may carry a description: a named type or one of its children.
pub(crate) struct DescribedDefinition<'a> {
    /// `Object`, `field`, `argument` and so on, as used in error messages.
    pub(crate) kind: String,
    pub(crate) coords: String,
    pub(crate) description: &'a mut Option<Node<str>>,
    pub(crate) directives: &'a mut PersistedDirectives,
}

/// Visits every type of `registry` followed by its children, in registry order.
pub(crate) fn for_each_described_definition(
    registry: &mut TypeRegistry,
    mut visit: impl FnMut(DescribedDefinition<'_>),
) {
    for data in registry.values_mut() {
        let kind = data.kind();
        match data {
            TypeDefinitionData::Enum(data) => {
                visit(DescribedDefinition {
                    kind: kind.to_string(),
                    coords: data.name.to_string(),
                    description: &mut data.description,
                    directives: &mut data.directives,
                });
                for value in data.values.values_mut() {
                    visit(DescribedDefinition {
                        kind: "Enum value".to_owned(),
                        coords: format!("{}.{}", data.name, value.name),
                        description: &mut value.description,
                        directives: &mut value.directives,
                    });
                }
            }
            TypeDefinitionData::InputObject(data) => {
                visit(DescribedDefinition {
                    kind: kind.to_string(),
                    coords: data.name.to_string(),
                    description: &mut data.description,
                    directives: &mut data.directives,
                });
                for field in data.fields.values_mut() {
                    visit(DescribedDefinition {
                        kind: "Input field".to_owned(),
                        coords: field.coords(),
                        description: &mut field.description,
                        directives: &mut field.directives,
                    });
                }
            }
            TypeDefinitionData::Interface(data) | TypeDefinitionData::Object(data) => {
                visit(DescribedDefinition {
                    kind: kind.to_string(),
                    coords: data.name.to_string(),
                    description: &mut data.description,
                    directives: &mut data.directives,
                });
                for field in data.fields.values_mut() {
                    visit(DescribedDefinition {
                        kind: "field".to_owned(),
                        coords: field.coords(),
                        description: &mut field.description,
                        directives: &mut field.directives,
                    });
                    for argument in field.arguments.values_mut() {
                        visit(DescribedDefinition {
                            kind: "argument".to_owned(),
                            coords: argument.coords(),
                            description: &mut argument.description,
                            directives: &mut argument.directives,
                        });
                    }
                }
            }
            TypeDefinitionData::Scalar(data) => visit(DescribedDefinition {
                kind: kind.to_string(),
                coords: data.name.to_string(),
                description: &mut data.description,
                directives: &mut data.directives,
            }),
            TypeDefinitionData::Union(data) => visit(DescribedDefinition {
                kind: kind.to_string(),
                coords: data.name.to_string(),
                description: &mut data.description,
                directives: &mut data.directives,
            }),
        }
    }
}

pub(crate) fn is_built_in_scalar(name: &str) -> bool {
    matches!(name, "Boolean" | "Float" | "ID" | "Int" | "String")
}
