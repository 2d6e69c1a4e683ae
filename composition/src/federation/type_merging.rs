use apollo_compiler::Name;
use apollo_compiler::ast::Type;

use crate::schema::type_utils::MAXIMUM_TYPE_NESTING;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeMergeError {
    Incompatible,
    MaximumNestingExceeded,
}

/// Output positions (fields) keep the nullable side; input positions (arguments, input fields)
/// keep the non-null side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Output,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Level {
    is_list: bool,
    is_non_null: bool,
}

fn levels(ty: &Type) -> Result<(Vec<Level>, &Name), TypeMergeError> {
    let mut levels = Vec::new();
    let mut current = ty;
    let mut wrappers = 0;
    loop {
        let is_non_null = current.is_non_null();
        wrappers += usize::from(is_non_null);
        match current {
            Type::Named(name) | Type::NonNullNamed(name) => {
                levels.push(Level {
                    is_list: false,
                    is_non_null,
                });
                if wrappers > MAXIMUM_TYPE_NESTING {
                    return Err(TypeMergeError::MaximumNestingExceeded);
                }
                return Ok((levels, name));
            }
            Type::List(inner) | Type::NonNullList(inner) => {
                wrappers += 1;
                if wrappers > MAXIMUM_TYPE_NESTING {
                    return Err(TypeMergeError::MaximumNestingExceeded);
                }
                levels.push(Level {
                    is_list: true,
                    is_non_null,
                });
                current = inner;
            }
        }
    }
}

/// Merges two instances of the same type reference.
///
/// Both types are walked in lockstep. The first level at which the two sides disagree about
/// nullability decides which side wins; a later disagreement in the opposite direction, or any
/// difference in list shape or named type, is incompatible.
pub(crate) fn merge_types(
    existing: &Type,
    incoming: &Type,
    position: Position,
) -> Result<Type, TypeMergeError> {
    let (existing_levels, existing_name) = levels(existing)?;
    let (incoming_levels, incoming_name) = levels(incoming)?;
    if existing_name != incoming_name || existing_levels.len() != incoming_levels.len() {
        return Err(TypeMergeError::Incompatible);
    }
    // `Some(true)` once the incoming side has won.
    let mut incoming_wins = None;
    for (existing_level, incoming_level) in existing_levels.iter().zip(&incoming_levels) {
        if existing_level.is_list != incoming_level.is_list {
            return Err(TypeMergeError::Incompatible);
        }
        if existing_level.is_non_null == incoming_level.is_non_null {
            continue;
        }
        let level_winner_is_incoming = match position {
            Position::Output => !incoming_level.is_non_null,
            Position::Input => incoming_level.is_non_null,
        };
        match incoming_wins {
            None => incoming_wins = Some(level_winner_is_incoming),
            Some(winner) if winner != level_winner_is_incoming => {
                return Err(TypeMergeError::Incompatible);
            }
            Some(_) => {}
        }
    }
    Ok(if incoming_wins == Some(true) {
        incoming.clone()
    } else {
        existing.clone()
    })
}
