//! Errors and warnings produced while normalizing and federating subgraphs.
//!
//! Errors are values: every pass collects them and the caller decides whether a result can be
//! returned. Each variant maps to a stable code through [`CompositionError::code`].

use std::fmt::Write;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::schema::TypeKind;
use crate::utils::human_readable::is_or_are;
use crate::utils::human_readable::join_quoted;
use crate::utils::human_readable::pluralize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareabilityViolation {
    pub field_name: String,
    pub shareable_subgraphs: Vec<String>,
    pub non_shareable_subgraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRequiredInputValueData {
    pub input_value_name: String,
    pub required_subgraphs: Vec<String>,
    pub missing_subgraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidArgumentImplementation {
    pub argument_name: String,
    pub expected_type: String,
    pub actual_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidFieldImplementation {
    pub unimplemented_arguments: Vec<String>,
    pub invalid_implemented_arguments: Vec<InvalidArgumentImplementation>,
    pub invalid_additional_arguments: Vec<String>,
    /// `(implemented type, interface type)` when the response type is not a subtype.
    pub invalid_response_type: Option<(String, String)>,
    pub is_inaccessible: bool,
}

impl InvalidFieldImplementation {
    pub fn is_empty(&self) -> bool {
        self == &InvalidFieldImplementation::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImplementationErrors {
    pub unimplemented_fields: Vec<String>,
    pub invalid_field_implementations: IndexMap<String, InvalidFieldImplementation>,
}

/// An entity interface whose implementations are not all defined by the subgraphs that resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndefinedEntityInterfaceImplementations {
    pub interface_name: String,
    /// Every entity that implements the interface across all subgraphs.
    pub concrete_type_names: Vec<String>,
    pub missing_type_names_by_subgraph_name: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositionError {
    #[error("The subgraph \"{subgraph}\" could not be parsed:\n{message}")]
    #[strum(serialize = "INVALID_GRAPHQL")]
    InvalidGraphQL { subgraph: String, message: String },
    #[error("{}", invalid_subgraph_names_message(.duplicate_names, .empty_name_indices))]
    InvalidSubgraphNames {
        duplicate_names: Vec<String>,
        empty_name_indices: Vec<usize>,
    },
    #[error(
        "The subgraph \"{subgraph}\" could not be federated for the following reason{}:\n{}",
        plural_s(.errors.len()),
        join_lines(.errors)
    )]
    SubgraphValidation {
        subgraph: String,
        errors: Vec<CompositionError>,
    },
    #[error("The {kind} \"{type_name}\" must only be defined once.")]
    DuplicateTypeDefinition { kind: TypeKind, type_name: String },
    #[error("The directive \"{directive_name}\" must only be defined once.")]
    DuplicateDirectiveDefinition { directive_name: String },
    #[error("The {kind} \"{type_name}\" must only define the field definition \"{field_name}\" once.")]
    DuplicateFieldDefinition {
        kind: TypeKind,
        type_name: String,
        field_name: String,
    },
    #[error("The Enum \"{type_name}\" must only define the Enum value definition \"{value_name}\" once.")]
    DuplicateEnumValueDefinition {
        type_name: String,
        value_name: String,
    },
    #[error(
        "The Input Object \"{type_name}\" must only define the Input field definition \"{field_name}\" once."
    )]
    DuplicateInputFieldDefinition {
        type_name: String,
        field_name: String,
    },
    #[error("The {kind} \"{type_name}\" must only implement the Interface \"{interface_name}\" once.")]
    DuplicateImplementedInterface {
        kind: TypeKind,
        type_name: String,
        interface_name: String,
    },
    #[error("The Union \"{type_name}\" must only define the Union member \"{member_name}\" once.")]
    DuplicateUnionMember {
        type_name: String,
        member_name: String,
    },
    #[error(
        "The field \"{field_coords}\" is invalid because:\n The following argument{} defined more than once: \"{}\"\n",
        is_or_are(.argument_names.len()),
        join_quoted(.argument_names)
    )]
    DuplicateArguments {
        field_coords: String,
        argument_names: Vec<String>,
    },
    #[error(
        "The operation type \"{operation_type}\" cannot be defined as \"{new_type_name}\" because it has already been defined as \"{old_type_name}\"."
    )]
    DuplicateOperationType {
        operation_type: String,
        new_type_name: String,
        old_type_name: String,
    },
    #[error(
        "The {actual} extension \"{type_name}\" is incompatible with the {expected} definition of the same name."
    )]
    IncompatibleExtensionKind {
        type_name: String,
        expected: TypeKind,
        actual: TypeKind,
    },
    #[error("The type \"{type_name}\" was referenced in the schema, but it was never defined.")]
    UndefinedType { type_name: String },
    #[error(
        "The directive \"@{directive_name}\" declared on coordinates \"{coords}\" is not defined in the schema."
    )]
    UndefinedDirective {
        directive_name: String,
        coords: String,
    },
    #[error(
        "The {ordinal} instance of the directive \"@{directive_name}\" declared on coordinates \"{coords}\" is invalid for the following reason{}:\n{}",
        plural_s(.messages.len()),
        join_lines(.messages)
    )]
    InvalidDirective {
        directive_name: String,
        coords: String,
        ordinal: String,
        messages: Vec<String>,
    },
    #[error("The {kind} \"{type_name}\" is invalid because it does not define any fields.")]
    NoFieldDefinitions { kind: TypeKind, type_name: String },
    #[error(
        "The Input Object \"{type_name}\" is invalid because it does not define any input values."
    )]
    NoInputValueDefinitions { type_name: String },
    #[error(
        "The interface \"{type_name}\" is invalid because the following field definition{} declared \"@external\":\n \"{}\"\nInterface fields should not be declared \"@external\". This is because interface fields do not resolve directly, but the \"@external\" directive relates to whether a field instance can be resolved by the subgraph in which it is defined.",
        is_or_are(.field_names.len()),
        join_quoted(.field_names)
    )]
    ExternalInterfaceFields {
        type_name: String,
        field_names: Vec<String>,
    },
    #[error(
        "The maximum number of OR scopes that can be defined by @requiresScopes on a single field is {max_or_scopes}. However, the following coordinates attempt to define more:\n \"{}\"\nIf you require more, please contact support.",
        join_quoted(.coords)
    )]
    OrScopesLimit {
        max_or_scopes: usize,
        coords: Vec<String>,
    },
    #[error(
        " When merging types, expected \"{type_name}\" to be type \"{expected}\" but received \"{actual}\"."
    )]
    IncompatibleParentKind {
        type_name: String,
        expected: TypeKind,
        actual: TypeKind,
    },
    #[error(
        "Incompatible types when merging two instances of {} \"{coords}\":\n Expected type \"{expected}\" but received \"{actual}\".",
        argument_or(.is_argument, "field argument", "field")
    )]
    IncompatibleMergedTypes {
        coords: String,
        expected: String,
        actual: String,
        is_argument: bool,
    },
    #[error(
        " The type defined at path \"{coords}\" has more than {max_nesting} layers of nesting, or there is a cyclical error."
    )]
    MaximumTypeNestingExceeded { coords: String, max_nesting: usize },
    #[error(
        "Expected the {prefix} defined on path \"{coords}\" to define the default value \"{expected}\".\nHowever, the default value \"{actual}\" is defined in the following subgraph{}:\n \"{}\"\nIf an instance defines a default value, that default value must be consistently defined across all subgraphs.",
        plural_s(.subgraph_names.len()),
        join_quoted(.subgraph_names)
    )]
    IncompatibleInputValueDefaultValues {
        prefix: String,
        coords: String,
        subgraph_names: Vec<String>,
        expected: String,
        actual: String,
    },
    #[error("{}", invalid_field_shareability_message(.type_name, .violations))]
    InvalidFieldShareability {
        type_name: String,
        violations: Vec<ShareabilityViolation>,
    },
    #[error("{}", all_external_field_instances_message(.type_name, .subgraph_names_by_field_name))]
    AllExternalFieldInstances {
        type_name: String,
        subgraph_names_by_field_name: IndexMap<String, Vec<String>>,
    },
    #[error("{}", invalid_interface_implementation_message(.kind, .type_name, .errors_by_interface_name))]
    InvalidInterfaceImplementation {
        kind: TypeKind,
        type_name: String,
        errors_by_interface_name: IndexMap<String, ImplementationErrors>,
    },
    #[error("{}", semantic_non_null_inconsistent_levels_message(.coords, .levels_by_subgraph_name))]
    SemanticNonNullInconsistentLevels {
        coords: String,
        levels_by_subgraph_name: IndexMap<String, Vec<i32>>,
    },
    #[error(
        "The {kind} \"{type_name}\" is an extension, but no base {kind} definition of \"{type_name}\" is defined in any subgraph."
    )]
    NoBaseDefinitionForExtension { kind: TypeKind, type_name: String },
    #[error(
        "Enum \"{type_name}\" was used as both an input and output but was inconsistently defined across inclusive subgraphs."
    )]
    IncompatibleSharedEnum { type_name: String },
    #[error("{}", invalid_required_input_value_message(.type_string, .coords, .errors, .is_argument))]
    InvalidRequiredInputValue {
        type_string: String,
        coords: String,
        errors: Vec<InvalidRequiredInputValueData>,
        is_argument: bool,
    },
    #[error(
        "The {} \"{name}\" defined at coordinates \"{coords}\" is declared \"@inaccessible\";  however, it is a required {} \"{parent_coords}\".",
        argument_or(.is_argument, "argument", "Input field"),
        argument_or(.is_argument, "argument of field", "field of Input Object")
    )]
    InaccessibleRequiredInputValue {
        name: String,
        coords: String,
        parent_coords: String,
        is_argument: bool,
    },
    #[error(
        "The {kind} \"{type_name}\" is invalid because all its {child_type} definitions are declared \"@inaccessible\"."
    )]
    AllChildDefinitionsAreInaccessible {
        kind: TypeKind,
        type_name: String,
        child_type: String,
    },
    #[error(
        "The {kind} \"{type_name}\" is declared \"@inaccessible\"; however, the {kind} is still referenced at the following paths:\n \"{}\"\n",
        join_quoted(.paths)
    )]
    InvalidReferencesOfInaccessibleType {
        kind: TypeKind,
        type_name: String,
        paths: Vec<String>,
    },
    #[error(
        "The root query type \"Query\" must be present in the client schema; consequently, it must not be declared \"@inaccessible\"."
    )]
    InaccessibleQueryRootType,
    #[error(
        "The \"@openfed__configureDescription\" directive defined on {kind} \"{coords}\" is invalid because neither a description nor the \"descriptionOverride\" argument is defined."
    )]
    ConfigureDescriptionNoDescription { kind: String, coords: String },
    #[error(
        "The coordinates \"{coords}\" declare \"@openfed__configureDescription(propagate: true)\" in the following subgraphs:\n \"{}\"\nA federated graph only supports a single description; consequently, only one subgraph may define argument \"propagate\" as true (this is the default value).",
        join_quoted(.subgraph_names)
    )]
    ConfigureDescriptionPropagation {
        coords: String,
        subgraph_names: Vec<String>,
    },
    #[error("{}", undefined_entity_interface_implementations_message(.interfaces))]
    UndefinedEntityInterfaceImplementations {
        interfaces: Vec<UndefinedEntityInterfaceImplementations>,
    },
    #[error(
        "The subgraph that defines an entity Interface Object (using \"@interfaceObject\") must not define any  implementation types of that interface. However, the subgraph \"{subgraph_name}\" defines the entity Interface \"{type_name}\" as an Interface Object alongside the following implementation type{} of \"{type_name}\":\n \"{}\"",
        plural_s(.implementation_type_names.len()),
        join_quoted(.implementation_type_names)
    )]
    InvalidInterfaceObjectImplementationDefinitions {
        type_name: String,
        subgraph_name: String,
        implementation_type_names: Vec<String>,
    },
    #[error(
        "The {} schema does not define at least one accessible query root type field after federation was completed, which is necessary for a federated graph to be valid.\n For example:\n  type Query {{\n    dummy: String\n  }}",
        argument_or(.is_router_schema, "router", "client")
    )]
    NoQueryRootType { is_router_schema: bool },
}

impl CompositionError {
    /// A stable, machine readable identifier such as `INVALID_FIELD_SHAREABILITY`.
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

fn plural_s(count: usize) -> &'static str {
    if count > 1 { "s" } else { "" }
}

fn join_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().join("\n")
}

fn argument_or(flag: &bool, if_true: &'static str, if_false: &'static str) -> &'static str {
    if *flag { if_true } else { if_false }
}

fn invalid_subgraph_names_message(duplicate_names: &[String], empty_name_indices: &[usize]) -> String {
    let mut message = "Subgraphs to be federated must each have a unique, non-empty name.".to_owned();
    if !duplicate_names.is_empty() {
        let _ = write!(
            message,
            "\n The following subgraph names are not unique:\n  \"{}\"",
            join_quoted(duplicate_names)
        );
    }
    for index in empty_name_indices {
        let _ = write!(
            message,
            "\n The {} subgraph in the array did not define a name.",
            crate::utils::human_readable::ordinal(index + 1)
        );
    }
    message
}

fn invalid_field_shareability_message(type_name: &str, violations: &[ShareabilityViolation]) -> String {
    let messages = violations.iter().map(|violation| {
        if violation.shareable_subgraphs.is_empty() {
            format!(
                "\n The field \"{}\" is defined in the following subgraphs: \"{}\".\n However, it is not declared \"@shareable\" in any of them.",
                violation.field_name,
                join_quoted(&violation.non_shareable_subgraphs)
            )
        } else {
            format!(
                "\n The field \"{}\" is defined and declared \"@shareable\" in the following {}: \"{}\".\n However, it is not declared \"@shareable\" in the following {}: \"{}\".",
                violation.field_name,
                pluralize("subgraph", violation.shareable_subgraphs.len()),
                join_quoted(&violation.shareable_subgraphs),
                pluralize("subgraph", violation.non_shareable_subgraphs.len()),
                join_quoted(&violation.non_shareable_subgraphs)
            )
        }
    });
    format!(
        "The Object \"{type_name}\" defines the same fields in multiple subgraphs without the \"@shareable\" directive:{}",
        messages.format("\n")
    )
}

fn all_external_field_instances_message(
    type_name: &str,
    subgraph_names_by_field_name: &IndexMap<String, Vec<String>>,
) -> String {
    let mut message = format!(
        "The Object \"{type_name}\" is invalid because the following field definition{} declared \"@external\" on all instances of that field:\n",
        is_or_are(subgraph_names_by_field_name.len())
    );
    for (field_name, subgraph_names) in subgraph_names_by_field_name {
        let _ = writeln!(
            message,
            " \"{field_name}\" in {} \"{}\"",
            pluralize("subgraph", subgraph_names.len()),
            join_quoted(subgraph_names)
        );
    }
    message.push_str(
        "At least one instance of a field definition must always be resolvable (and therefore not declared \"@external\").",
    );
    message
}

fn invalid_interface_implementation_message(
    kind: &TypeKind,
    type_name: &str,
    errors_by_interface_name: &IndexMap<String, ImplementationErrors>,
) -> String {
    let messages = errors_by_interface_name
        .iter()
        .map(|(interface_name, errors)| {
            let mut message = format!(
                " The implementation of Interface \"{interface_name}\" by \"{type_name}\" is invalid because:\n"
            );
            if !errors.unimplemented_fields.is_empty() {
                let _ = writeln!(
                    message,
                    "  The following field{} not implemented: \"{}\"",
                    is_or_are(errors.unimplemented_fields.len()),
                    join_quoted(&errors.unimplemented_fields)
                );
            }
            for (field_name, field) in &errors.invalid_field_implementations {
                let _ = writeln!(message, "  The field \"{field_name}\" is invalid because:");
                if !field.unimplemented_arguments.is_empty() {
                    let _ = writeln!(
                        message,
                        "   The following argument{} not implemented: \"{}\"",
                        is_or_are(field.unimplemented_arguments.len()),
                        join_quoted(&field.unimplemented_arguments)
                    );
                }
                if !field.invalid_implemented_arguments.is_empty() {
                    let _ = writeln!(
                        message,
                        "   The following implemented argument{} invalid:",
                        is_or_are(field.invalid_implemented_arguments.len())
                    );
                    for argument in &field.invalid_implemented_arguments {
                        let _ = writeln!(
                            message,
                            "    The argument \"{}\" must define type \"{}\" and not \"{}\"",
                            argument.argument_name, argument.expected_type, argument.actual_type
                        );
                    }
                }
                if !field.invalid_additional_arguments.is_empty() {
                    message.push_str(
                        "   If a field from an Interface is implemented, any additional Arguments that were not defined on the original Interface field must be optional (nullable).\n",
                    );
                    let _ = writeln!(
                        message,
                        "    The following additional argument{} not defined as optional: \"{}\"",
                        is_or_are(field.invalid_additional_arguments.len()),
                        join_quoted(&field.invalid_additional_arguments)
                    );
                }
                if let Some((implemented, original)) = &field.invalid_response_type {
                    let _ = writeln!(
                        message,
                        "   The implemented response type \"{implemented}\" is not a valid subtype (equally or more restrictive) of the response type \"{original}\" for \"{interface_name}.{field_name}\"."
                    );
                }
                if field.is_inaccessible {
                    message.push_str(
                        "   The field has been declared \"@inaccessible\"; however, the same field has not been declared \"@inaccessible\" on the Interface definition.\n   Consequently, the Interface implementation cannot be satisfied.\n",
                    );
                }
            }
            message
        });
    format!(
        "The {kind} \"{type_name}\" has the following Interface implementation errors:\n{}",
        messages.format("\n")
    )
}

fn semantic_non_null_inconsistent_levels_message(
    coords: &str,
    levels_by_subgraph_name: &IndexMap<String, Vec<i32>>,
) -> String {
    let mut message = format!(
        "The \"@semanticNonNull\" directive defined on field \"{coords}\" is invalid due to inconsistent values provided to the \"levels\" argument across the following subgraphs:\n"
    );
    for (subgraph_name, levels) in levels_by_subgraph_name {
        let _ = writeln!(
            message,
            " Subgraph \"{subgraph_name}\" defines levels {}.",
            levels.iter().sorted().join(",")
        );
    }
    let _ = write!(
        message,
        "The list value provided to the \"levels\" argument must be consistently defined across all subgraphs that define \"@semanticNonNull\" on field \"{coords}\"."
    );
    message
}

fn invalid_required_input_value_message(
    type_string: &str,
    coords: &str,
    errors: &[InvalidRequiredInputValueData],
    is_argument: &bool,
) -> String {
    let input_value_type = if *is_argument { "argument" } else { "Input field" };
    let mut message = format!("The {type_string} \"{coords}\" could not be federated because:\n");
    for error in errors {
        let _ = write!(
            message,
            " The {input_value_type} \"{name}\" is required in the following {}: \"{}\"\n However, the {input_value_type} \"{name}\" is not defined in the following {}: \"{}\"\n If an {input_value_type} is required on a {type_string} in any one subgraph, it must be at least defined as optional on all other definitions of that {type_string} in all other subgraphs.\n",
            pluralize("subgraph", error.required_subgraphs.len()),
            join_quoted(&error.required_subgraphs),
            pluralize("subgraph", error.missing_subgraphs.len()),
            join_quoted(&error.missing_subgraphs),
            name = error.input_value_name,
        );
    }
    message
}

fn undefined_entity_interface_implementations_message(
    interfaces: &[UndefinedEntityInterfaceImplementations],
) -> String {
    let mut message = "Federation was unsuccessful because any one subgraph that defines a specific entity Interface must also define each and every entity Object that implements that entity Interface.\nEach entity Object must also explicitly define its implementation of the entity Interface.\n".to_owned();
    for interface in interfaces {
        let _ = write!(
            message,
            " Across all subgraphs, the entity interface \"{name}\" is implemented by the following entit{}:\n  \"{}\"\n However, the definition of at least one of these implementations is missing in a subgraph that defines the entity interface \"{name}\":\n",
            if interface.concrete_type_names.len() > 1 { "ies" } else { "y" },
            join_quoted(&interface.concrete_type_names),
            name = interface.interface_name,
        );
        for (subgraph_name, missing_type_names) in &interface.missing_type_names_by_subgraph_name {
            let _ = writeln!(
                message,
                "  Subgraph \"{subgraph_name}\" does not define the following implementations: \"{}\"",
                join_quoted(missing_type_names)
            );
        }
    }
    message
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display, strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    ExternalInterfaceFields,
    UnusedExternalField,
    InvalidOverrideTargetSubgraphName,
}

/// A non-fatal finding reported alongside both successful and failed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionWarning {
    pub code: WarningCode,
    /// The subgraph whose definitions caused the warning.
    pub subgraph: String,
    pub message: String,
}

impl std::fmt::Display for CompositionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.subgraph, self.message)
    }
}
