//! Authorization requirements declared with `@authenticated` and `@requiresScopes`.
//!
//! Scopes are kept as an OR-list of AND-sets: `[[a, b], [c]]` is satisfied by a token holding
//! both `a` and `b`, or by one holding `c`. Combining two requirements is a logical AND, which
//! is the cross product of both lists followed by [`minimize`].

use std::collections::BTreeSet;

use apollo_compiler::Name;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::error::CompositionError;
use crate::schema::TypeDefinitionData;
use crate::schema::TypeRegistry;

/// The maximum number of alternatives a single field may require after combination.
pub const MAX_OR_SCOPES: usize = 16;

pub type AndScopes = BTreeSet<String>;

/// Removes duplicates and every AND-set that is a superset of another one.
///
/// A token satisfying the smaller set of an overlapping pair always satisfies the larger one's
/// alternative too, so the larger set adds nothing. The relative order of the survivors is kept.
pub fn minimize(or_scopes: &[AndScopes]) -> Vec<AndScopes> {
    let mut minimized: Vec<AndScopes> = Vec::with_capacity(or_scopes.len());
    for (index, and_scopes) in or_scopes.iter().enumerate() {
        let is_redundant = or_scopes.iter().enumerate().any(|(other_index, other)| {
            other_index != index
                && other.is_subset(and_scopes)
                && (other.len() < and_scopes.len() || other_index < index)
        });
        if !is_redundant {
            minimized.push(and_scopes.clone());
        }
    }
    minimized
}

/// The logical AND of two OR-lists. An empty list requires nothing and is the identity.
pub fn cross_product(left: &[AndScopes], right: &[AndScopes]) -> Vec<AndScopes> {
    if left.is_empty() {
        return minimize(right);
    }
    if right.is_empty() {
        return minimize(left);
    }
    let product = left
        .iter()
        .cartesian_product(right)
        .map(|(left, right)| left.union(right).cloned().collect::<AndScopes>())
        .collect_vec();
    minimize(&product)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequirements {
    pub requires_authentication: bool,
    pub required_scopes: Vec<AndScopes>,
    /// Like `required_scopes`, except that the declarations of different subgraphs are
    /// alternatives rather than all being required.
    pub required_scopes_by_or: Vec<AndScopes>,
}

impl AuthorizationRequirements {
    pub fn new(requires_authentication: bool, required_scopes: Vec<AndScopes>) -> Self {
        let required_scopes = minimize(&required_scopes);
        Self {
            requires_authentication,
            required_scopes_by_or: required_scopes.clone(),
            required_scopes,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.requires_authentication && self.required_scopes.is_empty()
    }

    /// Tightens `self` so that `other` must also be satisfied.
    pub fn and(&mut self, other: &AuthorizationRequirements) {
        self.requires_authentication |= other.requires_authentication;
        self.required_scopes = cross_product(&self.required_scopes, &other.required_scopes);
        self.required_scopes_by_or =
            cross_product(&self.required_scopes_by_or, &other.required_scopes_by_or);
    }

    /// Combines the declarations of the same element in two subgraphs.
    pub(crate) fn and_across_subgraphs(&mut self, other: &AuthorizationRequirements) {
        let by_or = self
            .required_scopes_by_or
            .iter()
            .chain(&other.required_scopes_by_or)
            .cloned()
            .collect_vec();
        self.requires_authentication |= other.requires_authentication;
        self.required_scopes = cross_product(&self.required_scopes, &other.required_scopes);
        self.required_scopes_by_or = minimize(&by_or);
    }

    pub fn exceeds_or_scopes_limit(&self) -> bool {
        self.required_scopes.len() > MAX_OR_SCOPES
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAuthorizationData {
    pub field_name: String,
    /// What the field itself declares.
    pub original_data: AuthorizationRequirements,
    /// The field's requirements combined with those of its parent and return types.
    pub inherited_data: AuthorizationRequirements,
}

/// Authorization collected for one named type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    pub type_name: String,
    /// Requirements declared on the type itself.
    pub requirements: AuthorizationRequirements,
    pub field_authorization_data_by_field_name: IndexMap<String, FieldAuthorizationData>,
    pub has_parent_level_authorization: bool,
}

impl AuthorizationData {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_owned(),
            ..Default::default()
        }
    }

    pub(crate) fn field_mut(&mut self, field_name: &str) -> &mut FieldAuthorizationData {
        self.field_authorization_data_by_field_name
            .entry(field_name.to_owned())
            .or_insert_with(|| FieldAuthorizationData {
                field_name: field_name.to_owned(),
                ..Default::default()
            })
    }

    pub(crate) fn add_type_requirements(&mut self, requirements: &AuthorizationRequirements) {
        self.requirements.and(requirements);
        self.has_parent_level_authorization = true;
    }

    /// Combines the data of the same type from another subgraph. Returns the coordinates whose
    /// combined scopes exceed [`MAX_OR_SCOPES`].
    pub(crate) fn merge(&mut self, incoming: &AuthorizationData) -> Vec<String> {
        let mut overflowing_coords = Vec::new();
        if incoming.has_parent_level_authorization {
            self.requirements.and_across_subgraphs(&incoming.requirements);
            self.has_parent_level_authorization = true;
            if self.requirements.exceeds_or_scopes_limit() {
                overflowing_coords.push(self.type_name.clone());
            }
        }
        for (field_name, field) in &incoming.field_authorization_data_by_field_name {
            let existing = self.field_mut(field_name);
            existing
                .original_data
                .and_across_subgraphs(&field.original_data);
            if existing.original_data.exceeds_or_scopes_limit() {
                overflowing_coords.push(format!("{}.{field_name}", incoming.type_name));
            }
        }
        overflowing_coords
    }
}

pub type AuthorizationDataByTypeName = IndexMap<String, AuthorizationData>;

/// Per field metadata handed to the router alongside the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfiguration {
    pub type_name: String,
    pub field_name: String,
    pub argument_names: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_authentication: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_scopes: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_scopes_by_or: Vec<Vec<String>>,
}

fn to_lists(or_scopes: &[AndScopes]) -> Vec<Vec<String>> {
    or_scopes
        .iter()
        .map(|and_scopes| and_scopes.iter().cloned().collect())
        .collect()
}

/// Computes the inherited requirements of every field and the resulting field configurations.
///
/// Types are visited in `traversal_order` and fields in the order they were first declared. A
/// field inherits the type-level requirements of its enclosing type and of its named return type.
pub(crate) fn propagate(
    registry: &TypeRegistry,
    traversal_order: &[Name],
    authorization_data_by_type_name: &mut AuthorizationDataByTypeName,
) -> Result<Vec<FieldConfiguration>, CompositionError> {
    let type_requirements: IndexMap<String, AuthorizationRequirements> =
        authorization_data_by_type_name
            .iter()
            .filter(|(_, data)| data.has_parent_level_authorization)
            .map(|(type_name, data)| (type_name.clone(), data.requirements.clone()))
            .collect();
    let mut field_configurations = Vec::new();
    let mut overflowing_coords = Vec::new();
    let composites = traversal_order
        .iter()
        .filter_map(|type_name| registry.get(type_name))
        .filter_map(TypeDefinitionData::as_composite);
    for composite in composites {
        let type_name = composite.name.as_str();
        for field in composite.fields.values() {
            let field_name = field.name.as_str();
            let original_data = authorization_data_by_type_name
                .get(type_name)
                .and_then(|data| data.field_authorization_data_by_field_name.get(field_name))
                .map(|data| data.original_data.clone())
                .unwrap_or_default();
            let mut inherited_data = original_data.clone();
            if let Some(requirements) = type_requirements.get(type_name) {
                inherited_data.and(requirements);
            }
            if let Some(requirements) = type_requirements.get(field.named_type_name().as_str()) {
                inherited_data.and(requirements);
            }
            if inherited_data.exceeds_or_scopes_limit() {
                overflowing_coords.push(field.coords());
                continue;
            }
            if !inherited_data.is_empty() {
                authorization_data_by_type_name
                    .entry(type_name.to_owned())
                    .or_insert_with(|| AuthorizationData::new(type_name))
                    .field_mut(field_name)
                    .inherited_data = inherited_data.clone();
            }
            if field.arguments.is_empty() && inherited_data.is_empty() {
                continue;
            }
            field_configurations.push(FieldConfiguration {
                type_name: type_name.to_owned(),
                field_name: field_name.to_owned(),
                argument_names: field
                    .arguments
                    .keys()
                    .sorted()
                    .map(ToString::to_string)
                    .collect(),
                requires_authentication: inherited_data.requires_authentication,
                required_scopes: to_lists(&inherited_data.required_scopes),
                required_scopes_by_or: to_lists(&inherited_data.required_scopes_by_or),
            });
        }
    }
    if !overflowing_coords.is_empty() {
        return Err(CompositionError::OrScopesLimit {
            max_or_scopes: MAX_OR_SCOPES,
            coords: overflowing_coords,
        });
    }
    Ok(field_configurations)
}
