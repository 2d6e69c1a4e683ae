//! Validation of the `fields` argument of `@key`, `@provides` and `@requires`.

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::ast::Selection;
use indexmap::IndexSet;

use crate::schema::TypeDefinitionData;
use crate::schema::TypeKind;
use crate::schema::TypeRegistry;
use crate::schema::UnionDefinitionData;
use crate::schema::is_built_in_scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldSetKind {
    Key,
    Provides,
    Requires,
}

/// A field selected by a field set, as `(parent type name, field name)`.
pub(crate) type FieldSetReference = (Name, Name);

struct FieldSetWalker<'a> {
    kind: FieldSetKind,
    raw: &'a str,
    registry: &'a TypeRegistry,
    references: Vec<FieldSetReference>,
    messages: Vec<String>,
}

fn invalid_field_set_prefix(raw: &str) -> String {
    format!(" The following field set is invalid:\n  \"{raw}\"\n")
}

/// Parses `raw` as a selection set on `type_name` and returns every selected field.
///
/// Field sets may not contain fragments. Leaves may not define selections, and composite fields
/// must. Key field sets additionally reject fields with arguments and abstract return types.
pub(crate) fn validate_field_set(
    kind: FieldSetKind,
    raw: &str,
    type_name: &Name,
    registry: &TypeRegistry,
) -> Result<Vec<FieldSetReference>, Vec<String>> {
    let document = match ast::Document::parse(format!("{{{raw}}}"), "field_set.graphql") {
        Ok(document) => document,
        Err(with_errors) => {
            return Err(vec![format!(
                "{} The field set could not be parsed.\n The reason provided was: {}",
                invalid_field_set_prefix(raw),
                with_errors.errors
            )]);
        }
    };
    let Some(ast::Definition::OperationDefinition(operation)) = document.definitions.first() else {
        return Err(vec![format!(
            "{} The field set could not be parsed.",
            invalid_field_set_prefix(raw)
        )]);
    };
    let mut walker = FieldSetWalker {
        kind,
        raw,
        registry,
        references: Vec::new(),
        messages: Vec::new(),
    };
    walker.walk(&operation.selection_set, type_name, None);
    if walker.messages.is_empty() {
        Ok(walker.references)
    } else {
        Err(walker.messages)
    }
}

impl FieldSetWalker<'_> {
    fn walk(&mut self, selections: &[Selection], parent_type_name: &Name, parent_coords: Option<&str>) {
        if let Some(TypeDefinitionData::Union(union)) = self.registry.get(parent_type_name) {
            self.walk_union(selections, union, parent_coords);
            return;
        }
        let Some(parent) = self
            .registry
            .get(parent_type_name)
            .and_then(TypeDefinitionData::as_composite)
        else {
            self.messages.push(format!(
                " Expected an object/interface or object/interface extension named \"{parent_type_name}\" to exist."
            ));
            return;
        };
        let mut selected_field_names = IndexSet::new();
        for selection in selections {
            let field = match selection {
                Selection::Field(field) => field,
                Selection::FragmentSpread(_) | Selection::InlineFragment(_) => {
                    self.messages.push(
                        " Inline fragments are not currently supported within a field set argument."
                            .to_owned(),
                    );
                    continue;
                }
            };
            if field.name.as_str() == "__typename" {
                continue;
            }
            let coords = format!("{parent_type_name}.{}", field.name);
            let Some(field_data) = parent.fields.get(&field.name) else {
                self.messages.push(format!(
                    "{} This is because of the selection set corresponding to the field coordinates \"{coords}\".\n The type \"{parent_type_name}\" does not define a field named \"{}\".",
                    invalid_field_set_prefix(self.raw),
                    field.name
                ));
                continue;
            };
            if !selected_field_names.insert(field.name.clone()) {
                self.messages.push(format!(
                    "{} This is because \"{coords}\" was included in the field set more than once.",
                    invalid_field_set_prefix(self.raw)
                ));
                continue;
            }
            if self.kind == FieldSetKind::Key && !field_data.arguments.is_empty() {
                self.messages.push(format!(
                    "{} This is because \"{coords}\" defines arguments.\n Fields that define arguments cannot be included in the field set of @key directives.",
                    invalid_field_set_prefix(self.raw)
                ));
                continue;
            }
            for argument in &field.arguments {
                if !field_data.arguments.contains_key(&argument.name) {
                    self.messages.push(format!(
                        "{} This is because \"{coords}\" does not define an argument named \"{}\".",
                        invalid_field_set_prefix(self.raw),
                        argument.name
                    ));
                }
            }
            self.references
                .push((parent_type_name.clone(), field.name.clone()));
            let named_type_name = field_data.named_type_name();
            if is_built_in_scalar(named_type_name) {
                if !field.selection_set.is_empty() {
                    self.invalid_selection_set_definition(&coords, named_type_name, "Scalar");
                }
                continue;
            }
            let Some(named_type) = self.registry.get(named_type_name) else {
                self.messages.push(format!(
                    "{} This is because \"{coords}\" returns the unknown type \"{named_type_name}\".",
                    invalid_field_set_prefix(self.raw)
                ));
                continue;
            };
            match named_type {
                TypeDefinitionData::Enum(_) | TypeDefinitionData::Scalar(_) => {
                    if !field.selection_set.is_empty() {
                        self.invalid_selection_set_definition(
                            &coords,
                            named_type_name,
                            &named_type.kind().to_string(),
                        );
                    }
                }
                TypeDefinitionData::Interface(_) | TypeDefinitionData::Union(_)
                    if self.kind == FieldSetKind::Key =>
                {
                    self.messages.push(format!(
                        "{} This is because \"{coords}\" returns \"{named_type_name}\", which is type \"{}\".\n Fields that return abstract types (Interfaces and Unions) cannot be included in the field set of \"@key\" directives.",
                        invalid_field_set_prefix(self.raw),
                        named_type.kind()
                    ));
                }
                TypeDefinitionData::Interface(_)
                | TypeDefinitionData::Object(_)
                | TypeDefinitionData::Union(_) => {
                    if field.selection_set.is_empty() {
                        self.messages.push(format!(
                            "{} This is because of the selection set corresponding to the field coordinates \"{coords}\" that returns \"{named_type_name}\", which is type \"{}\".\n Composite types such as \"{}\" types must define a selection set with at least one field selection.",
                            invalid_field_set_prefix(self.raw),
                            named_type.kind(),
                            named_type.kind()
                        ));
                    } else {
                        self.walk(&field.selection_set, named_type_name, Some(&coords));
                    }
                }
                TypeDefinitionData::InputObject(_) => {
                    self.messages.push(format!(
                        "{} This is because \"{coords}\" returns the unknown type \"{named_type_name}\".",
                        invalid_field_set_prefix(self.raw)
                    ));
                }
            }
        }
        if selected_field_names.is_empty() && parent_coords.is_none() && self.messages.is_empty() {
            self.messages.push(format!(
                "{} The field set does not select any field.",
                invalid_field_set_prefix(self.raw)
            ));
        }
    }

    /// Union members may only be selected through inline fragments whose type condition is a
    /// member.
    fn walk_union(
        &mut self,
        selections: &[Selection],
        union: &UnionDefinitionData,
        parent_coords: Option<&str>,
    ) {
        let location = match parent_coords {
            Some(coords) => format!(
                "field coordinates \"{coords}\" that returns \"{}\", which is type \"{}\"",
                union.name,
                TypeKind::Union
            ),
            None => format!(
                "enclosing type name \"{}\", which is type \"{}\"",
                union.name,
                TypeKind::Union
            ),
        };
        for selection in selections {
            match selection {
                Selection::Field(field) if field.name.as_str() == "__typename" => {}
                Selection::Field(_) => {
                    self.messages.push(format!(
                        "{} This is because of the selection set corresponding to the {location}.\n Union types such as \"{}\" must define field selections (besides \"__typename\") on an inline fragment whose type condition corresponds to a constituent union member.",
                        invalid_field_set_prefix(self.raw),
                        union.name
                    ));
                    return;
                }
                Selection::InlineFragment(fragment) => {
                    let Some(type_condition) = &fragment.type_condition else {
                        self.messages.push(format!(
                            "{} This is because \"{}\" defines an inline fragment without a type condition.",
                            invalid_field_set_prefix(self.raw),
                            parent_coords.unwrap_or(union.name.as_str())
                        ));
                        return;
                    };
                    if !union.members.contains(type_condition) {
                        self.messages.push(format!(
                            "{} This is because an inline fragment with the type condition \"{type_condition}\" is defined on the selection set corresponding to the {location}.\n However, \"{type_condition}\" is not a member of \"{}\".",
                            invalid_field_set_prefix(self.raw),
                            union.name
                        ));
                        return;
                    }
                    self.walk(&fragment.selection_set, type_condition, parent_coords);
                }
                Selection::FragmentSpread(_) => {
                    self.messages.push(
                        " Fragment spreads are not currently supported within a field set argument."
                            .to_owned(),
                    );
                    return;
                }
            }
        }
    }

    fn invalid_selection_set_definition(&mut self, coords: &str, type_name: &Name, kind: &str) {
        self.messages.push(format!(
            "{} This is because of the selection set corresponding to the field coordinates \"{coords}\" that returns \"{type_name}\", which is type \"{kind}\".\n Non-composite types such as \"{kind}\" cannot define a selection set.",
            invalid_field_set_prefix(self.raw)
        ));
    }
}
