use std::collections::BTreeSet;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::Argument;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::Value;
use apollo_compiler::name;
use indexmap::IndexMap;
use serde::Serialize;

use crate::directives::DirectiveName;
use crate::directives::FederationDirective;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Deprecation {
    pub reason: Option<String>,
}

/// The description a subgraph declares through `@openfed__configureDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionConfiguration {
    pub propagate: bool,
    /// The override, or else the description of the definition itself.
    pub description: String,
    pub is_override: bool,
}

/// The directives that survive composition and are printed in the federated schemas.
///
/// Authorization and `@semanticNonNull` are tracked separately because they are merged with
/// their own rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedDirectives {
    pub deprecated: Option<Deprecation>,
    pub is_inaccessible: bool,
    pub is_one_of: bool,
    pub specified_by: Option<String>,
    pub tags: BTreeSet<String>,
    pub description_configurations: IndexMap<String, DescriptionConfiguration>,
}

impl PersistedDirectives {
    pub(crate) fn merge(&mut self, other: &PersistedDirectives) {
        if let Some(incoming) = &other.deprecated {
            let existing = self.deprecated.get_or_insert_with(Deprecation::default);
            if existing.reason.is_none() {
                existing.reason.clone_from(&incoming.reason);
            }
        }
        self.is_inaccessible |= other.is_inaccessible;
        self.is_one_of |= other.is_one_of;
        if self.specified_by.is_none() {
            self.specified_by.clone_from(&other.specified_by);
        }
        self.tags.extend(other.tags.iter().cloned());
        for (subgraph_name, configuration) in &other.description_configurations {
            self.description_configurations
                .entry(subgraph_name.clone())
                .or_insert_with(|| configuration.clone());
        }
    }

    /// The `@openfed__configureDescription` application of one subgraph.
    pub(crate) fn description_configuration_directive(
        &self,
        subgraph_name: &str,
    ) -> Option<Node<Directive>> {
        let configuration = self.description_configurations.get(subgraph_name)?;
        let mut arguments = Vec::new();
        if configuration.is_override {
            arguments.push(string_argument(
                name!("descriptionOverride"),
                &configuration.description,
            ));
        }
        if !configuration.propagate {
            arguments.push(Node::new(Argument {
                name: name!("propagate"),
                value: false.into(),
            }));
        }
        Some(Node::new(Directive {
            name: DirectiveName::ConfigureDescription.as_name(),
            arguments,
        }))
    }

    /// Whether a subgraph has declared `@openfed__configureDescription(propagate: false)`.
    pub(crate) fn withholds_description(&self) -> bool {
        self.description_configurations
            .values()
            .any(|configuration| !configuration.propagate)
    }

    /// Records `directive` if it is one of the persisted directives and reports whether it was.
    pub(crate) fn apply(&mut self, directive: &FederationDirective) -> bool {
        match directive {
            FederationDirective::Deprecated { reason } => {
                self.deprecated = Some(Deprecation {
                    reason: reason.clone(),
                });
            }
            FederationDirective::Inaccessible => self.is_inaccessible = true,
            FederationDirective::OneOf => self.is_one_of = true,
            FederationDirective::SpecifiedBy { url } => self.specified_by = Some(url.clone()),
            FederationDirective::Tag { name } => {
                self.tags.insert(name.clone());
            }
            _ => return false,
        }
        true
    }

    /// Directive applications for a printed schema, in alphabetical order of directive name.
    ///
    /// The client schema never exposes `@inaccessible` and `@tag`.
    pub(crate) fn to_directive_list(&self, is_client_schema: bool) -> DirectiveList {
        let mut directives = Vec::new();
        if let Some(deprecation) = &self.deprecated {
            directives.push(Node::new(Directive {
                name: DirectiveName::Deprecated.as_name(),
                arguments: deprecation
                    .reason
                    .iter()
                    .map(|reason| string_argument(name!("reason"), reason))
                    .collect(),
            }));
        }
        if self.is_inaccessible && !is_client_schema {
            directives.push(simple_directive(DirectiveName::Inaccessible));
        }
        if self.is_one_of {
            directives.push(simple_directive(DirectiveName::OneOf));
        }
        if let Some(url) = &self.specified_by {
            directives.push(Node::new(Directive {
                name: DirectiveName::SpecifiedBy.as_name(),
                arguments: vec![string_argument(name!("url"), url)],
            }));
        }
        if !is_client_schema {
            for tag in &self.tags {
                directives.push(Node::new(Directive {
                    name: DirectiveName::Tag.as_name(),
                    arguments: vec![string_argument(name!("name"), tag)],
                }));
            }
        }
        DirectiveList(directives)
    }
}

pub(crate) fn simple_directive(directive_name: DirectiveName) -> Node<Directive> {
    Node::new(Directive {
        name: directive_name.as_name(),
        arguments: Vec::new(),
    })
}

pub(crate) fn string_argument(name: Name, value: &str) -> Node<Argument> {
    Node::new(Argument {
        name,
        value: Node::new(Value::String(value.to_owned())),
    })
}
