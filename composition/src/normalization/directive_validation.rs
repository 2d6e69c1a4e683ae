//! Validation of directive applications against their definitions.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::directives::FederationDirective;
use crate::directives::definitions::FIELD_SET_SCALAR;
use crate::directives::definitions::SCOPE_SCALAR;
use crate::error::CompositionError;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;
use crate::utils::human_readable::is_or_are;
use crate::utils::human_readable::join_quoted;
use crate::utils::human_readable::ordinal;

/// Every directive definition visible to one subgraph, keyed by directive name.
pub(crate) type DirectiveDefinitions = IndexMap<Name, Node<DirectiveDefinition>>;

pub(crate) struct DirectiveValidator<'a> {
    pub(crate) definitions: &'a DirectiveDefinitions,
    pub(crate) registry: &'a TypeRegistry,
}

impl DirectiveValidator<'_> {
    /// Validates every application in `directives` and converts the valid ones.
    ///
    /// Problems are reported per application, with the ordinal of that application among the
    /// applications of the same directive on this element.
    pub(crate) fn validate(
        &self,
        directives: &DirectiveList,
        location: DirectiveLocation,
        coords: &str,
        errors: &mut Vec<CompositionError>,
    ) -> Vec<FederationDirective> {
        let mut valid = Vec::new();
        let mut count_by_name: IndexMap<&Name, usize> = IndexMap::new();
        for directive in directives.iter() {
            let count = count_by_name.entry(&directive.name).or_default();
            *count += 1;
            let instance = *count;
            let Some(definition) = self.definitions.get(&directive.name) else {
                errors.push(CompositionError::UndefinedDirective {
                    directive_name: directive.name.to_string(),
                    coords: coords.to_owned(),
                });
                continue;
            };
            let mut messages = self.validate_application(directive, definition, location);
            if instance > 1 && !definition.repeatable {
                messages.push(format!(
                    "The definition for the directive \"@{}\" does not define it as repeatable, but it is declared more than once on these coordinates.",
                    directive.name
                ));
            }
            if messages.is_empty() {
                match FederationDirective::from_ast(directive) {
                    Ok(parsed) => valid.push(parsed),
                    Err(message) => messages.push(message),
                }
            }
            if !messages.is_empty() {
                errors.push(CompositionError::InvalidDirective {
                    directive_name: directive.name.to_string(),
                    coords: coords.to_owned(),
                    ordinal: ordinal(instance),
                    messages,
                });
            }
        }
        valid
    }

    fn validate_application(
        &self,
        directive: &Directive,
        definition: &DirectiveDefinition,
        location: DirectiveLocation,
    ) -> Vec<String> {
        let mut messages = Vec::new();
        if !definition.locations.contains(&location) {
            messages.push(format!(
                " The definition for \"@{}\" does not define \"{location}\" as a valid location.",
                directive.name
            ));
        }
        let argument_counts = directive
            .arguments
            .iter()
            .map(|argument| &argument.name)
            .counts();
        let duplicate_names = directive
            .arguments
            .iter()
            .map(|argument| &argument.name)
            .unique()
            .filter(|name| argument_counts[name] > 1)
            .collect_vec();
        if !duplicate_names.is_empty() {
            messages.push(format!(
                " The following argument{} defined more than once: \"{}\"",
                is_or_are(duplicate_names.len()),
                join_quoted(&duplicate_names)
            ));
        }
        let unexpected_names = directive
            .arguments
            .iter()
            .filter(|argument| definition.argument_by_name(&argument.name).is_none())
            .map(|argument| &argument.name)
            .unique()
            .collect_vec();
        if !unexpected_names.is_empty() {
            messages.push(format!(
                " The definition for \"@{}\" does not define the following argument{} provided: \"{}\".",
                directive.name,
                if unexpected_names.len() > 1 {
                    "s that are"
                } else {
                    " that is"
                },
                join_quoted(&unexpected_names)
            ));
        }
        let required_names = definition
            .arguments
            .iter()
            .filter(|argument| argument.ty.is_non_null() && argument.default_value.is_none())
            .map(|argument| &argument.name)
            .collect_vec();
        let missing_names = required_names
            .iter()
            .filter(|name| argument_counts.get(**name).is_none())
            .collect_vec();
        if !missing_names.is_empty() {
            let mut message = format!(
                " The definition for \"@{}\" defines the following {} required argument{}: \"{}\".\n However,",
                directive.name,
                required_names.len(),
                if required_names.len() > 1 { "s" } else { "" },
                join_quoted(&required_names)
            );
            if directive.arguments.is_empty() {
                message.push_str(" no arguments are defined on this instance.");
            } else {
                message.push_str(&format!(
                    " the following required argument{} not defined on this instance: \"{}\".",
                    is_or_are(missing_names.len()),
                    join_quoted(&missing_names)
                ));
            }
            messages.push(message);
        }
        for argument in &directive.arguments {
            let Some(argument_definition) = definition.argument_by_name(&argument.name) else {
                continue;
            };
            if !self.is_valid_value(&argument.value, &argument_definition.ty) {
                messages.push(format!(
                    " The value \"{}\" provided to argument \"@{}({}: ...)\" is not a valid \"{}\" type.",
                    argument.value, directive.name, argument.name, argument_definition.ty
                ));
            }
        }
        messages
    }

    /// Single values are not coerced into lists.
    fn is_valid_value(&self, value: &Value, ty: &Type) -> bool {
        match (value, ty) {
            (Value::Null, _) => !ty.is_non_null(),
            (Value::Variable(_), _) => false,
            (Value::List(items), Type::List(inner) | Type::NonNullList(inner)) => {
                items.iter().all(|item| self.is_valid_value(item, inner))
            }
            (_, Type::List(_) | Type::NonNullList(_)) => false,
            (_, Type::Named(name) | Type::NonNullNamed(name)) => self.is_valid_named_value(value, name),
        }
    }

    fn is_valid_named_value(&self, value: &Value, type_name: &Name) -> bool {
        match type_name.as_str() {
            "String" => matches!(value, Value::String(_)),
            "ID" => matches!(value, Value::String(_) | Value::Int(_)),
            "Int" => matches!(value, Value::Int(_)),
            "Float" => matches!(value, Value::Float(_) | Value::Int(_)),
            "Boolean" => matches!(value, Value::Boolean(_)),
            _ if type_name == &FIELD_SET_SCALAR || type_name == &SCOPE_SCALAR => {
                matches!(value, Value::String(_))
            }
            _ => match self.registry.get(type_name) {
                Some(TypeDefinitionData::Enum(data)) => {
                    matches!(value, Value::Enum(name) if data.values.contains_key(name))
                }
                Some(TypeDefinitionData::InputObject(data)) => {
                    let Value::Object(fields) = value else {
                        return false;
                    };
                    let all_provided_fields_valid = fields.iter().all(|(name, value)| {
                        data.fields
                            .get(name)
                            .is_some_and(|field| self.is_valid_value(value, &field.ty))
                    });
                    let all_required_fields_provided = data
                        .fields
                        .values()
                        .filter(|field| field.is_required())
                        .all(|field| fields.iter().any(|(name, _)| name == &field.name));
                    all_provided_fields_valid && all_required_fields_provided
                }
                // Custom scalars accept any literal.
                Some(TypeDefinitionData::Scalar(_)) | None => true,
                Some(_) => false,
            },
        }
    }
}
