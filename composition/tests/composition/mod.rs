mod authorization;
mod contracts;
mod descriptions;
mod entity_interfaces;
mod inaccessible;
mod merging;
mod shareability;

pub(crate) mod test_helpers {
    use apollo_compiler::ast;
    use federation_composition::CompositionOptions;
    use federation_composition::FederationFailure;
    use federation_composition::FederationResult;
    use federation_composition::FederationSuccess;
    use federation_composition::Subgraph;
    use federation_composition::federate_subgraphs;

    pub(crate) struct ServiceDefinition<'a> {
        pub(crate) name: &'a str,
        pub(crate) type_defs: &'a str,
    }

    pub(crate) fn parse_subgraphs(service_list: &[ServiceDefinition<'_>]) -> Vec<Subgraph> {
        service_list
            .iter()
            .map(|service| {
                Subgraph::parse(
                    service.name,
                    &format!("http://{}", service.name),
                    service.type_defs,
                )
                .expect("valid subgraph SDL")
            })
            .collect()
    }

    pub(crate) fn compose(service_list: &[ServiceDefinition<'_>]) -> FederationResult {
        federate_subgraphs(
            &parse_subgraphs(service_list),
            &CompositionOptions::default(),
        )
    }

    pub(crate) fn compose_successfully(service_list: &[ServiceDefinition<'_>]) -> FederationSuccess {
        match compose(service_list) {
            Ok(success) => success,
            Err(failure) => panic!(
                "Expected composition to succeed, got:\n{}",
                failure
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    pub(crate) fn compose_with_failure(service_list: &[ServiceDefinition<'_>]) -> FederationFailure {
        match compose(service_list) {
            Ok(success) => panic!(
                "Expected composition to fail, got:\n{}",
                success.federated_graph_sdl
            ),
            Err(failure) => failure,
        }
    }

    pub(crate) fn error_codes(failure: &FederationFailure) -> Vec<&'static str> {
        failure.errors.iter().map(|error| error.code()).collect()
    }

    /// Normalizes `sdl` through a parse and print so that it can be compared with printed
    /// schemas regardless of whitespace.
    pub(crate) fn normalized_sdl(sdl: &str) -> String {
        ast::Document::parse(sdl, "expected.graphql")
            .expect("valid expected SDL")
            .to_string()
    }

    /// Field names of an object type in a printed document.
    pub(crate) fn field_names(document: &ast::Document, type_name: &str) -> Vec<String> {
        document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                ast::Definition::ObjectTypeDefinition(object) if object.name.as_str() == type_name => {
                    Some(
                        object
                            .fields
                            .iter()
                            .map(|field| field.name.to_string())
                            .collect(),
                    )
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    pub(crate) fn has_type(document: &ast::Document, type_name: &str) -> bool {
        document
            .definitions
            .iter()
            .any(|definition| definition.name().is_some_and(|name| name.as_str() == type_name))
    }
}

pub(crate) use test_helpers::ServiceDefinition;
pub(crate) use test_helpers::compose_successfully;
pub(crate) use test_helpers::compose_with_failure;
pub(crate) use test_helpers::error_codes;
pub(crate) use test_helpers::field_names;
pub(crate) use test_helpers::has_type;
pub(crate) use test_helpers::normalized_sdl;
pub(crate) use test_helpers::parse_subgraphs;
