use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

/// The composition rule set a run follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompatibilityVersion {
    #[default]
    #[serde(rename = "1")]
    V1,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositionOptions {
    pub compatibility_version: CompatibilityVersion,
}

/// Selects the elements a contract keeps.
///
/// Excluding and including are mutually exclusive; when both sets are populated the exclusion
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractTagOptions {
    pub tag_names_to_exclude: BTreeSet<String>,
    pub tag_names_to_include: BTreeSet<String>,
}

impl ContractTagOptions {
    pub fn exclude<I, T>(tag_names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ContractTagOptions {
            tag_names_to_exclude: tag_names.into_iter().map(Into::into).collect(),
            tag_names_to_include: BTreeSet::new(),
        }
    }

    pub fn include<I, T>(tag_names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ContractTagOptions {
            tag_names_to_exclude: BTreeSet::new(),
            tag_names_to_include: tag_names.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CompositionOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.compatibility_version, CompatibilityVersion::V1);
        let options: CompositionOptions =
            serde_json::from_str(r#"{"compatibilityVersion":"1"}"#).unwrap();
        assert_eq!(options, CompositionOptions::default());
        assert!(serde_json::from_str::<CompositionOptions>(r#"{"compatibilityVersion":"2"}"#).is_err());
    }

    #[test]
    fn contract_options_deserialize() {
        let options: ContractTagOptions =
            serde_json::from_str(r#"{"tagNamesToExclude":["internal"]}"#).unwrap();
        assert_eq!(options, ContractTagOptions::exclude(["internal"]));
    }
}
