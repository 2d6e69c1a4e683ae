//! Federation directives.
//!
//! Subgraphs annotate their schemas with directives whose arguments are untyped syntax. Every
//! application is validated once during normalization and turned into a [`FederationDirective`],
//! so later passes never inspect raw directive arguments again.

use std::collections::BTreeSet;

use apollo_compiler::Name;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::Value;
use apollo_compiler::name;

pub(crate) mod definitions;
mod persisted;

pub use persisted::DescriptionConfiguration;
pub use persisted::Deprecation;
pub use persisted::PersistedDirectives;
pub(crate) use persisted::simple_directive;
pub(crate) use persisted::string_argument;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum DirectiveName {
    Authenticated,
    ComposeDirective,
    #[strum(serialize = "openfed__configureChildDescriptions")]
    ConfigureChildDescriptions,
    #[strum(serialize = "openfed__configureDescription")]
    ConfigureDescription,
    Deprecated,
    Extends,
    External,
    Inaccessible,
    InterfaceObject,
    Key,
    Link,
    OneOf,
    Override,
    Provides,
    Requires,
    RequiresScopes,
    SemanticNonNull,
    Shareable,
    SpecifiedBy,
    Tag,
}

impl DirectiveName {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn as_name(self) -> Name {
        match self {
            DirectiveName::Authenticated => name!("authenticated"),
            DirectiveName::ComposeDirective => name!("composeDirective"),
            DirectiveName::ConfigureChildDescriptions => {
                name!("openfed__configureChildDescriptions")
            }
            DirectiveName::ConfigureDescription => name!("openfed__configureDescription"),
            DirectiveName::Deprecated => name!("deprecated"),
            DirectiveName::Extends => name!("extends"),
            DirectiveName::External => name!("external"),
            DirectiveName::Inaccessible => name!("inaccessible"),
            DirectiveName::InterfaceObject => name!("interfaceObject"),
            DirectiveName::Key => name!("key"),
            DirectiveName::Link => name!("link"),
            DirectiveName::OneOf => name!("oneOf"),
            DirectiveName::Override => name!("override"),
            DirectiveName::Provides => name!("provides"),
            DirectiveName::Requires => name!("requires"),
            DirectiveName::RequiresScopes => name!("requiresScopes"),
            DirectiveName::SemanticNonNull => name!("semanticNonNull"),
            DirectiveName::Shareable => name!("shareable"),
            DirectiveName::SpecifiedBy => name!("specifiedBy"),
            DirectiveName::Tag => name!("tag"),
        }
    }

    /// Using any of these directives opts a subgraph into federation version two rules.
    pub fn is_version_two(self) -> bool {
        matches!(
            self,
            DirectiveName::Authenticated
                | DirectiveName::ComposeDirective
                | DirectiveName::Inaccessible
                | DirectiveName::InterfaceObject
                | DirectiveName::Link
                | DirectiveName::Override
                | DirectiveName::RequiresScopes
                | DirectiveName::Shareable
        )
    }
}

/// A validated directive application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederationDirective {
    Authenticated,
    ComposeDirective { name: String },
    ConfigureChildDescriptions { propagate: bool },
    ConfigureDescription {
        propagate: bool,
        description_override: Option<String>,
    },
    Deprecated { reason: Option<String> },
    Extends,
    External,
    Inaccessible,
    InterfaceObject,
    Key { fields: String, resolvable: bool },
    Link { url: String },
    OneOf,
    Override { from: String },
    Provides { fields: String },
    Requires { fields: String },
    /// OR of AND-sets.
    RequiresScopes { scopes: Vec<BTreeSet<String>> },
    SemanticNonNull { levels: Vec<i32> },
    Shareable,
    SpecifiedBy { url: String },
    Tag { name: String },
    /// A directive defined by the subgraph itself; it is validated but not persisted.
    Custom { name: Name },
}

impl FederationDirective {
    /// The name of a directive known to composition; `None` for subgraph-defined directives.
    pub fn name(&self) -> Option<DirectiveName> {
        Some(match self {
            FederationDirective::Authenticated => DirectiveName::Authenticated,
            FederationDirective::ComposeDirective { .. } => DirectiveName::ComposeDirective,
            FederationDirective::ConfigureChildDescriptions { .. } => {
                DirectiveName::ConfigureChildDescriptions
            }
            FederationDirective::ConfigureDescription { .. } => DirectiveName::ConfigureDescription,
            FederationDirective::Deprecated { .. } => DirectiveName::Deprecated,
            FederationDirective::Extends => DirectiveName::Extends,
            FederationDirective::External => DirectiveName::External,
            FederationDirective::Inaccessible => DirectiveName::Inaccessible,
            FederationDirective::InterfaceObject => DirectiveName::InterfaceObject,
            FederationDirective::Key { .. } => DirectiveName::Key,
            FederationDirective::Link { .. } => DirectiveName::Link,
            FederationDirective::OneOf => DirectiveName::OneOf,
            FederationDirective::Override { .. } => DirectiveName::Override,
            FederationDirective::Provides { .. } => DirectiveName::Provides,
            FederationDirective::Requires { .. } => DirectiveName::Requires,
            FederationDirective::RequiresScopes { .. } => DirectiveName::RequiresScopes,
            FederationDirective::SemanticNonNull { .. } => DirectiveName::SemanticNonNull,
            FederationDirective::Shareable => DirectiveName::Shareable,
            FederationDirective::SpecifiedBy { .. } => DirectiveName::SpecifiedBy,
            FederationDirective::Tag { .. } => DirectiveName::Tag,
            FederationDirective::Custom { .. } => return None,
        })
    }

    /// Converts an application whose arguments have already been checked against the directive
    /// definition. A value that does not have the expected shape is reported as an error message.
    pub(crate) fn from_ast(directive: &Directive) -> Result<Self, String> {
        let Ok(directive_name) = directive.name.parse::<DirectiveName>() else {
            return Ok(FederationDirective::Custom {
                name: directive.name.clone(),
            });
        };
        let string_argument = |argument_name: &str| -> Result<String, String> {
            match directive.specified_argument_by_name(argument_name).map(|value| &**value) {
                Some(Value::String(value)) => Ok(value.clone()),
                _ => Err(format!(
                    " The argument \"{argument_name}\" of \"@{directive_name}\" must be a String."
                )),
            }
        };
        let propagate = !matches!(
            directive
                .specified_argument_by_name("propagate")
                .map(|value| &**value),
            Some(Value::Boolean(false))
        );
        Ok(match directive_name {
            DirectiveName::Authenticated => FederationDirective::Authenticated,
            DirectiveName::ComposeDirective => FederationDirective::ComposeDirective {
                name: string_argument("name")?,
            },
            DirectiveName::ConfigureChildDescriptions => {
                FederationDirective::ConfigureChildDescriptions { propagate }
            }
            DirectiveName::ConfigureDescription => FederationDirective::ConfigureDescription {
                propagate,
                description_override: match directive
                    .specified_argument_by_name("descriptionOverride")
                {
                    Some(_) => Some(string_argument("descriptionOverride")?),
                    None => None,
                },
            },
            DirectiveName::Deprecated => FederationDirective::Deprecated {
                reason: match directive.specified_argument_by_name("reason") {
                    Some(value) => value.as_str().map(str::to_owned),
                    None => None,
                },
            },
            DirectiveName::Extends => FederationDirective::Extends,
            DirectiveName::External => FederationDirective::External,
            DirectiveName::Inaccessible => FederationDirective::Inaccessible,
            DirectiveName::InterfaceObject => FederationDirective::InterfaceObject,
            DirectiveName::Key => FederationDirective::Key {
                fields: string_argument("fields")?,
                resolvable: !matches!(
                    directive
                        .specified_argument_by_name("resolvable")
                        .map(|value| &**value),
                    Some(Value::Boolean(false))
                ),
            },
            DirectiveName::Link => FederationDirective::Link {
                url: string_argument("url")?,
            },
            DirectiveName::OneOf => FederationDirective::OneOf,
            DirectiveName::Override => FederationDirective::Override {
                from: string_argument("from")?,
            },
            DirectiveName::Provides => FederationDirective::Provides {
                fields: string_argument("fields")?,
            },
            DirectiveName::Requires => FederationDirective::Requires {
                fields: string_argument("fields")?,
            },
            DirectiveName::RequiresScopes => FederationDirective::RequiresScopes {
                scopes: extract_scopes(directive)?,
            },
            DirectiveName::SemanticNonNull => FederationDirective::SemanticNonNull {
                levels: extract_levels(directive)?,
            },
            DirectiveName::Shareable => FederationDirective::Shareable,
            DirectiveName::SpecifiedBy => FederationDirective::SpecifiedBy {
                url: string_argument("url")?,
            },
            DirectiveName::Tag => FederationDirective::Tag {
                name: string_argument("name")?,
            },
        })
    }
}

fn extract_scopes(directive: &Directive) -> Result<Vec<BTreeSet<String>>, String> {
    let Some(Value::List(or_scopes)) = directive
        .specified_argument_by_name("scopes")
        .map(|value| &**value)
    else {
        return Err(" The argument \"scopes\" must be a list of lists of scopes.".to_owned());
    };
    or_scopes
        .iter()
        .map(|and_scopes| match &**and_scopes {
            Value::List(scopes) => scopes
                .iter()
                .map(|scope| {
                    scope
                        .as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| format!(" The scope \"{scope}\" is not a String."))
                })
                .collect::<Result<BTreeSet<_>, _>>(),
            other => Err(format!(" The value \"{other}\" is not a list of scopes.")),
        })
        .collect()
}

fn extract_levels(directive: &Directive) -> Result<Vec<i32>, String> {
    let Some(value) = directive.specified_argument_by_name("levels") else {
        return Ok(vec![0]);
    };
    let Value::List(levels) = &**value else {
        return Err(" Argument \"levels\" validation error.".to_owned());
    };
    levels
        .iter()
        .map(|level| match &**level {
            Value::Int(int) => int
                .try_to_i32()
                .map_err(|_| format!("Index \"{}\" is not a valid integer.", int.as_str())),
            other => Err(format!("Index \"{other}\" is not a valid integer.")),
        })
        .collect()
}
