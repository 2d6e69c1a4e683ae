//! Definitions of the directives every subgraph may use without declaring them.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::ScalarTypeDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::name;
use apollo_compiler::ty;

use crate::directives::DirectiveName;

pub const FIELD_SET_SCALAR: Name = name!("openfed__FieldSet");
pub const SCOPE_SCALAR: Name = name!("openfed__Scope");
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

fn argument(name: Name, ty: Type, default_value: Option<Node<Value>>) -> Node<InputValueDefinition> {
    Node::new(InputValueDefinition {
        description: None,
        name,
        ty: ty.into(),
        default_value,
        directives: Default::default(),
    })
}

fn definition(
    name: DirectiveName,
    arguments: Vec<Node<InputValueDefinition>>,
    repeatable: bool,
    locations: Vec<DirectiveLocation>,
) -> Node<DirectiveDefinition> {
    Node::new(DirectiveDefinition {
        description: None,
        name: name.as_name(),
        arguments,
        repeatable,
        locations,
    })
}

impl DirectiveName {
    /// The definition a subgraph is validated against.
    pub fn definition(self) -> Node<DirectiveDefinition> {
        use DirectiveLocation as L;
        match self {
            DirectiveName::Authenticated => definition(
                self,
                vec![],
                false,
                vec![
                    L::Enum,
                    L::FieldDefinition,
                    L::Interface,
                    L::Object,
                    L::Scalar,
                ],
            ),
            DirectiveName::ComposeDirective => definition(
                self,
                vec![argument(name!("name"), ty!(String!), None)],
                true,
                vec![L::Schema],
            ),
            DirectiveName::ConfigureChildDescriptions => definition(
                self,
                vec![argument(name!("propagate"), ty!(Boolean!), Some(true.into()))],
                false,
                vec![L::Enum, L::InputObject, L::Interface, L::Object],
            ),
            DirectiveName::ConfigureDescription => definition(
                self,
                vec![
                    argument(name!("propagate"), ty!(Boolean!), Some(true.into())),
                    argument(name!("descriptionOverride"), ty!(String), None),
                ],
                false,
                vec![
                    L::ArgumentDefinition,
                    L::Enum,
                    L::EnumValue,
                    L::FieldDefinition,
                    L::InputFieldDefinition,
                    L::InputObject,
                    L::Interface,
                    L::Object,
                    L::Scalar,
                    L::Schema,
                    L::Union,
                ],
            ),
            DirectiveName::Deprecated => definition(
                self,
                vec![argument(
                    name!("reason"),
                    ty!(String),
                    Some(Node::new(Value::String(
                        DEFAULT_DEPRECATION_REASON.to_owned(),
                    ))),
                )],
                false,
                vec![
                    L::ArgumentDefinition,
                    L::EnumValue,
                    L::FieldDefinition,
                    L::InputFieldDefinition,
                ],
            ),
            DirectiveName::Extends => {
                definition(self, vec![], false, vec![L::Interface, L::Object])
            }
            DirectiveName::External => {
                definition(self, vec![], false, vec![L::FieldDefinition, L::Object])
            }
            DirectiveName::Inaccessible => definition(
                self,
                vec![],
                false,
                vec![
                    L::ArgumentDefinition,
                    L::Enum,
                    L::EnumValue,
                    L::FieldDefinition,
                    L::InputFieldDefinition,
                    L::InputObject,
                    L::Interface,
                    L::Object,
                    L::Scalar,
                    L::Union,
                ],
            ),
            DirectiveName::InterfaceObject => definition(self, vec![], false, vec![L::Object]),
            DirectiveName::Key => definition(
                self,
                vec![
                    argument(name!("fields"), ty!(openfed__FieldSet!), None),
                    argument(name!("resolvable"), ty!(Boolean), Some(true.into())),
                ],
                true,
                vec![L::Interface, L::Object],
            ),
            DirectiveName::Link => definition(
                self,
                vec![
                    argument(name!("url"), ty!(String!), None),
                    argument(name!("as"), ty!(String), None),
                    argument(name!("for"), ty!(String), None),
                    argument(name!("import"), ty!([String]), None),
                ],
                true,
                vec![L::Schema],
            ),
            DirectiveName::OneOf => definition(self, vec![], false, vec![L::InputObject]),
            DirectiveName::Override => definition(
                self,
                vec![argument(name!("from"), ty!(String!), None)],
                false,
                vec![L::FieldDefinition],
            ),
            DirectiveName::Provides | DirectiveName::Requires => definition(
                self,
                vec![argument(name!("fields"), ty!(openfed__FieldSet!), None)],
                false,
                vec![L::FieldDefinition],
            ),
            DirectiveName::RequiresScopes => definition(
                self,
                vec![argument(name!("scopes"), ty!([[openfed__Scope!]!]!), None)],
                false,
                vec![
                    L::Enum,
                    L::FieldDefinition,
                    L::Interface,
                    L::Object,
                    L::Scalar,
                ],
            ),
            DirectiveName::SemanticNonNull => definition(
                self,
                vec![argument(
                    name!("levels"),
                    ty!([Int!]!),
                    Some(Node::new(Value::List(vec![0.into()]))),
                )],
                false,
                vec![L::FieldDefinition],
            ),
            DirectiveName::Shareable => {
                definition(self, vec![], true, vec![L::FieldDefinition, L::Object])
            }
            DirectiveName::SpecifiedBy => definition(
                self,
                vec![argument(name!("url"), ty!(String!), None)],
                false,
                vec![L::Scalar],
            ),
            DirectiveName::Tag => definition(
                self,
                vec![argument(name!("name"), ty!(String!), None)],
                true,
                vec![
                    L::ArgumentDefinition,
                    L::Enum,
                    L::EnumValue,
                    L::FieldDefinition,
                    L::InputFieldDefinition,
                    L::InputObject,
                    L::Interface,
                    L::Object,
                    L::Scalar,
                    L::Union,
                ],
            ),
        }
    }
}

pub(crate) fn scalar_definition(name: Name) -> Node<ScalarTypeDefinition> {
    Node::new(ScalarTypeDefinition {
        description: None,
        name,
        directives: Default::default(),
    })
}
