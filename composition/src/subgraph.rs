use apollo_compiler::ast;

use crate::error::CompositionError;

/// One independently authored schema that takes part in composition.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub name: String,
    pub url: String,
    pub document: ast::Document,
}

impl Subgraph {
    pub fn new(name: &str, url: &str, document: ast::Document) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            document,
        }
    }

    /// Parses `sdl`; syntax errors are reported as [`CompositionError::InvalidGraphQL`].
    pub fn parse(name: &str, url: &str, sdl: &str) -> Result<Self, CompositionError> {
        let document = ast::Document::parse(sdl, format!("{name}.graphql")).map_err(|err| {
            CompositionError::InvalidGraphQL {
                subgraph: name.to_owned(),
                message: err.errors.to_string(),
            }
        })?;
        Ok(Self::new(name, url, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_name_the_subgraph() {
        let Err(error) = Subgraph::parse("products", "", "type Query {") else {
            panic!("expected a syntax error");
        };
        assert_eq!(error.code(), "INVALID_GRAPHQL");
        assert!(error.to_string().starts_with("The subgraph \"products\""));
    }

    #[test]
    fn parses_valid_documents() {
        let subgraph = Subgraph::parse("products", "http://products", "type Query { a: Int }")
            .unwrap();
        assert_eq!(subgraph.document.definitions.len(), 1);
        assert_eq!(subgraph.url, "http://products");
    }
}
