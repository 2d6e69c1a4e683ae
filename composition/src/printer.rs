//! Turns a type registry back into an SDL document.
//!
//! Every printed schema is alphabetized: types, fields, arguments, input fields, enum values,
//! union members and implemented interfaces are sorted by name, which makes the output
//! independent of the order in which subgraphs were supplied.

use std::collections::BTreeSet;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::Argument;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::OperationType;
use apollo_compiler::ast::Value;
use apollo_compiler::name;
use itertools::Itertools;

use crate::authorization::AuthorizationDataByTypeName;
use crate::authorization::AuthorizationRequirements;
use crate::directives::DirectiveName;
use crate::directives::PersistedDirectives;
use crate::directives::definitions::FIELD_SET_SCALAR;
use crate::directives::definitions::SCOPE_SCALAR;
use crate::directives::definitions::scalar_definition;
use crate::directives::simple_directive;
use crate::directives::string_argument;
use crate::schema::CompositeDefinitionData;
use crate::schema::ExtensionType;
use crate::schema::FieldData;
use crate::schema::InputValueData;
use crate::schema::MUTATION;
use crate::schema::QUERY;
use crate::schema::SUBSCRIPTION;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrintTarget<'a> {
    /// The canonical form of one normalized subgraph, federation directives included.
    Subgraph {
        subgraph_name: &'a str,
        is_version_two: bool,
    },
    /// The federated schema consumed by the router.
    Router,
    /// The schema exposed to clients.
    Client,
}

struct Printer<'a> {
    registry: &'a TypeRegistry,
    authorization: &'a AuthorizationDataByTypeName,
    target: PrintTarget<'a>,
    used_directives: BTreeSet<DirectiveName>,
}

pub(crate) fn print_document(
    registry: &TypeRegistry,
    authorization: &AuthorizationDataByTypeName,
    target: PrintTarget<'_>,
) -> ast::Document {
    let mut printer = Printer {
        registry,
        authorization,
        target,
        used_directives: BTreeSet::new(),
    };
    let type_definitions = registry
        .values()
        .sorted_by(|left, right| left.name().cmp(right.name()))
        .map(|data| printer.type_definition(data))
        .collect_vec();

    let mut document = ast::Document::new();
    if target == PrintTarget::Router {
        let root_operations = [
            (OperationType::Query, QUERY),
            (OperationType::Mutation, MUTATION),
            (OperationType::Subscription, SUBSCRIPTION),
        ]
        .into_iter()
        .filter_map(|(operation_type, type_name)| {
            registry
                .get(type_name)
                .filter(|data| matches!(data, TypeDefinitionData::Object(_)))
                .map(|data| Node::new((operation_type, data.name().clone())))
        })
        .collect_vec();
        if !root_operations.is_empty() {
            document
                .definitions
                .push(ast::Definition::SchemaDefinition(Node::new(
                    ast::SchemaDefinition {
                        description: None,
                        directives: DirectiveList::default(),
                        root_operations,
                    },
                )));
        }
    }
    for directive_name in &printer.used_directives {
        if printer.prints_definition(*directive_name) {
            document
                .definitions
                .push(ast::Definition::DirectiveDefinition(directive_name.definition()));
        }
    }
    if matches!(target, PrintTarget::Subgraph { .. })
        && [
            DirectiveName::Key,
            DirectiveName::Provides,
            DirectiveName::Requires,
        ]
        .iter()
        .any(|directive_name| printer.used_directives.contains(directive_name))
    {
        document
            .definitions
            .push(ast::Definition::ScalarTypeDefinition(scalar_definition(
                FIELD_SET_SCALAR,
            )));
    }
    if target != PrintTarget::Client
        && printer
            .used_directives
            .contains(&DirectiveName::RequiresScopes)
    {
        document
            .definitions
            .push(ast::Definition::ScalarTypeDefinition(scalar_definition(
                SCOPE_SCALAR,
            )));
    }
    document.definitions.extend(type_definitions);
    document
}

impl Printer<'_> {
    fn prints_definition(&self, directive_name: DirectiveName) -> bool {
        match self.target {
            PrintTarget::Subgraph { .. } => !matches!(
                directive_name,
                DirectiveName::Deprecated | DirectiveName::SpecifiedBy
            ),
            PrintTarget::Router => matches!(
                directive_name,
                DirectiveName::Authenticated
                    | DirectiveName::Inaccessible
                    | DirectiveName::OneOf
                    | DirectiveName::RequiresScopes
                    | DirectiveName::SemanticNonNull
                    | DirectiveName::Tag
            ),
            PrintTarget::Client => matches!(
                directive_name,
                DirectiveName::OneOf | DirectiveName::SemanticNonNull
            ),
        }
    }

    fn subgraph_name(&self) -> Option<&str> {
        match self.target {
            PrintTarget::Subgraph { subgraph_name, .. } => Some(subgraph_name),
            PrintTarget::Router | PrintTarget::Client => None,
        }
    }

    /// Sorts applications by directive name and records which directives are in use.
    fn finish(&mut self, mut directives: Vec<Node<Directive>>) -> DirectiveList {
        directives.sort_by(|left, right| left.name.cmp(&right.name));
        for directive in &directives {
            if let Ok(directive_name) = directive.name.parse::<DirectiveName>() {
                self.used_directives.insert(directive_name);
            }
        }
        DirectiveList(directives)
    }

    fn persisted(&self, directives: &PersistedDirectives) -> Vec<Node<Directive>> {
        let mut list = directives
            .to_directive_list(self.target == PrintTarget::Client)
            .0;
        if let Some(subgraph_name) = self.subgraph_name() {
            list.extend(directives.description_configuration_directive(subgraph_name));
        }
        list
    }

    fn authorization(&self, requirements: &AuthorizationRequirements) -> Vec<Node<Directive>> {
        if self.target == PrintTarget::Client {
            return Vec::new();
        }
        let mut directives = Vec::new();
        if requirements.requires_authentication {
            directives.push(simple_directive(DirectiveName::Authenticated));
        }
        if !requirements.required_scopes.is_empty() {
            let scopes = requirements
                .required_scopes
                .iter()
                .map(|and_scopes| {
                    Node::new(Value::List(
                        and_scopes
                            .iter()
                            .map(|scope| Node::new(Value::String(scope.clone())))
                            .collect(),
                    ))
                })
                .collect();
            directives.push(Node::new(Directive {
                name: DirectiveName::RequiresScopes.as_name(),
                arguments: vec![Node::new(Argument {
                    name: name!("scopes"),
                    value: Node::new(Value::List(scopes)),
                })],
            }));
        }
        directives
    }

    fn type_authorization(&self, type_name: &Name) -> Vec<Node<Directive>> {
        match self.authorization.get(type_name.as_str()) {
            Some(data) if data.has_parent_level_authorization => {
                self.authorization(&data.requirements)
            }
            _ => Vec::new(),
        }
    }

    fn type_definition(&mut self, data: &TypeDefinitionData) -> ast::Definition {
        let mut directives = self.persisted(data.directives());
        if matches!(
            data,
            TypeDefinitionData::Enum(_)
                | TypeDefinitionData::Interface(_)
                | TypeDefinitionData::Object(_)
                | TypeDefinitionData::Scalar(_)
        ) {
            directives.extend(self.type_authorization(data.name()));
        }
        match data {
            TypeDefinitionData::Enum(data) => {
                let directives = self.finish(directives);
                let values = data
                    .values
                    .values()
                    .sorted_by(|left, right| left.name.cmp(&right.name))
                    .map(|value| {
                        let directives = self.persisted(&value.directives);
                        Node::new(ast::EnumValueDefinition {
                            description: value.description.clone(),
                            value: value.name.clone(),
                            directives: self.finish(directives),
                        })
                    })
                    .collect();
                ast::Definition::EnumTypeDefinition(Node::new(ast::EnumTypeDefinition {
                    description: data.description.clone(),
                    name: data.name.clone(),
                    directives,
                    values,
                }))
            }
            TypeDefinitionData::InputObject(data) => {
                let directives = self.finish(directives);
                let fields = data
                    .fields
                    .values()
                    .sorted_by(|left, right| left.name.cmp(&right.name))
                    .map(|field| self.input_value_definition(field))
                    .collect();
                ast::Definition::InputObjectTypeDefinition(Node::new(
                    ast::InputObjectTypeDefinition {
                        description: data.description.clone(),
                        name: data.name.clone(),
                        directives,
                        fields,
                    },
                ))
            }
            TypeDefinitionData::Interface(data) => {
                directives.extend(self.composite_directives(data));
                let directives = self.finish(directives);
                ast::Definition::InterfaceTypeDefinition(Node::new(
                    ast::InterfaceTypeDefinition {
                        description: data.description.clone(),
                        name: data.name.clone(),
                        implements_interfaces: data.implements.iter().sorted().cloned().collect(),
                        directives,
                        fields: self.field_definitions(data),
                    },
                ))
            }
            TypeDefinitionData::Object(data) => {
                directives.extend(self.composite_directives(data));
                let directives = self.finish(directives);
                ast::Definition::ObjectTypeDefinition(Node::new(ast::ObjectTypeDefinition {
                    description: data.description.clone(),
                    name: data.name.clone(),
                    implements_interfaces: data.implements.iter().sorted().cloned().collect(),
                    directives,
                    fields: self.field_definitions(data),
                }))
            }
            TypeDefinitionData::Scalar(data) => {
                ast::Definition::ScalarTypeDefinition(Node::new(ast::ScalarTypeDefinition {
                    description: data.description.clone(),
                    name: data.name.clone(),
                    directives: self.finish(directives),
                }))
            }
            TypeDefinitionData::Union(data) => {
                ast::Definition::UnionTypeDefinition(Node::new(ast::UnionTypeDefinition {
                    description: data.description.clone(),
                    name: data.name.clone(),
                    directives: self.finish(directives),
                    members: data.members.iter().sorted().cloned().collect(),
                }))
            }
        }
    }

    /// `@extends`, `@key` and `@interfaceObject` only exist in subgraph documents.
    fn composite_directives(&self, data: &CompositeDefinitionData) -> Vec<Node<Directive>> {
        if self.subgraph_name().is_none() {
            return Vec::new();
        }
        let mut directives = Vec::new();
        if data.extension_type == ExtensionType::Extends {
            directives.push(simple_directive(DirectiveName::Extends));
        }
        if data.is_interface_object {
            directives.push(simple_directive(DirectiveName::InterfaceObject));
        }
        for key in &data.keys {
            let mut arguments = vec![string_argument(name!("fields"), &key.fields)];
            if !key.resolvable {
                arguments.push(Node::new(Argument {
                    name: name!("resolvable"),
                    value: false.into(),
                }));
            }
            directives.push(Node::new(Directive {
                name: DirectiveName::Key.as_name(),
                arguments,
            }));
        }
        directives
    }

    fn field_definitions(&mut self, data: &CompositeDefinitionData) -> Vec<Node<ast::FieldDefinition>> {
        data.fields
            .values()
            .sorted_by(|left, right| left.name.cmp(&right.name))
            .map(|field| self.field_definition(field))
            .collect()
    }

    fn field_definition(&mut self, field: &FieldData) -> Node<ast::FieldDefinition> {
        let mut directives = self.persisted(&field.directives);
        if let Some(data) = self
            .authorization
            .get(field.parent_type_name.as_str())
            .and_then(|data| {
                data.field_authorization_data_by_field_name
                    .get(field.name.as_str())
            })
        {
            directives.extend(self.authorization(&data.original_data));
        }
        if let Some(levels) = field.semantic_non_null_levels() {
            let mut arguments = Vec::new();
            if levels != BTreeSet::from([0]) {
                arguments.push(Node::new(Argument {
                    name: name!("levels"),
                    value: Node::new(Value::List(
                        levels.iter().map(|level| (*level).into()).collect(),
                    )),
                }));
            }
            directives.push(Node::new(Directive {
                name: DirectiveName::SemanticNonNull.as_name(),
                arguments,
            }));
        }
        if let PrintTarget::Subgraph {
            subgraph_name,
            is_version_two,
        } = self.target
        {
            if field
                .is_external_by_subgraph_name
                .get(subgraph_name)
                .is_some_and(|data| data.is_defined_external)
            {
                directives.push(simple_directive(DirectiveName::External));
            }
            if let Some(from) = field.override_source_by_subgraph_name.get(subgraph_name) {
                directives.push(Node::new(Directive {
                    name: DirectiveName::Override.as_name(),
                    arguments: vec![string_argument(name!("from"), from)],
                }));
            }
            for (directive_name, fields) in [
                (DirectiveName::Provides, &field.provides),
                (DirectiveName::Requires, &field.requires),
            ] {
                if let Some(fields) = fields {
                    directives.push(Node::new(Directive {
                        name: directive_name.as_name(),
                        arguments: vec![string_argument(name!("fields"), fields)],
                    }));
                }
            }
            if is_version_two
                && field.is_shareable_by_subgraph_name.get(subgraph_name) == Some(&true)
            {
                directives.push(simple_directive(DirectiveName::Shareable));
            }
        }
        let arguments = field
            .arguments
            .values()
            .sorted_by(|left, right| left.name.cmp(&right.name))
            .map(|argument| self.input_value_definition(argument))
            .collect();
        Node::new(ast::FieldDefinition {
            description: field.description.clone(),
            name: field.name.clone(),
            arguments,
            ty: field.ty.clone(),
            directives: self.finish(directives),
        })
    }

    fn input_value_definition(&mut self, data: &InputValueData) -> Node<ast::InputValueDefinition> {
        let directives = self.persisted(&data.directives);
        Node::new(ast::InputValueDefinition {
            description: data.description.clone(),
            name: data.name.clone(),
            ty: Node::new(data.ty.clone()),
            default_value: data.default_value.clone(),
            directives: self.finish(directives),
        })
    }
}
