use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use indexmap::IndexMap;

use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;

/// Wrapping a named type in more than this many list and non-null layers is rejected.
pub(crate) const MAXIMUM_TYPE_NESTING: usize = 30;

/// The number of list wrappers around the named type.
pub(crate) fn list_depth(ty: &Type) -> usize {
    match ty {
        Type::Named(_) | Type::NonNullNamed(_) => 0,
        Type::List(inner) | Type::NonNullList(inner) => 1 + list_depth(inner),
    }
}

/// One entry per level of `ty`, outermost first: `true` when that level is non-null.
///
/// Levels are the indices addressed by `@semanticNonNull(levels:)`; `[Int!]` has level 0 (the
/// list) and level 1 (the item).
pub(crate) fn non_null_by_level(ty: &Type) -> Vec<bool> {
    let mut levels = Vec::new();
    let mut current = ty;
    loop {
        levels.push(current.is_non_null());
        match current {
            Type::Named(_) | Type::NonNullNamed(_) => return levels,
            Type::List(inner) | Type::NonNullList(inner) => current = inner,
        }
    }
}

/// Replaces every named type found in `renames` (used to map custom root type names).
pub(crate) fn rename_type(ty: &Type, renames: &IndexMap<Name, Name>) -> Type {
    let rename = |name: &Name| renames.get(name).unwrap_or(name).clone();
    match ty {
        Type::Named(name) => Type::Named(rename(name)),
        Type::NonNullNamed(name) => Type::NonNullNamed(rename(name)),
        Type::List(inner) => Type::List(Box::new(rename_type(inner, renames))),
        Type::NonNullList(inner) => Type::NonNullList(Box::new(rename_type(inner, renames))),
    }
}

/// Whether `implementation` is `interface_type` or one of its subtypes: it may add non-null
/// wrappers, and its named type may be an implementation or member of the interface's named type.
pub(crate) fn is_type_valid_implementation(
    interface_type: &Type,
    implementation: &Type,
    registry: &TypeRegistry,
) -> bool {
    match (interface_type, implementation) {
        (Type::NonNullNamed(expected), Type::NonNullNamed(actual))
        | (Type::Named(expected), Type::Named(actual) | Type::NonNullNamed(actual)) => {
            is_named_type_subtype(expected, actual, registry)
        }
        (Type::NonNullList(expected), Type::NonNullList(actual))
        | (Type::List(expected), Type::List(actual) | Type::NonNullList(actual)) => {
            is_type_valid_implementation(expected, actual, registry)
        }
        _ => false,
    }
}

fn is_named_type_subtype(expected: &Name, actual: &Name, registry: &TypeRegistry) -> bool {
    if expected == actual {
        return true;
    }
    match registry.get(expected) {
        Some(TypeDefinitionData::Interface(_)) => registry
            .get(actual)
            .and_then(TypeDefinitionData::as_composite)
            .is_some_and(|data| data.implements.contains(expected)),
        Some(TypeDefinitionData::Union(union)) => union.members.contains(actual),
        _ => false,
    }
}
