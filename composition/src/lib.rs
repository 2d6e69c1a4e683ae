//! ## Usage
//!
//! This crate composes independently authored GraphQL subgraph schemas into one federated graph.
//!
//! [`federate_subgraphs`] normalizes every subgraph, merges them, validates the result and
//! returns the router schema, the client schema and the field configurations the router needs
//! for authorization. [`federate_subgraphs_with_contracts`] additionally derives filtered
//! variants of the graph from `@tag` annotations.
//!
//! ```
//! use federation_composition::CompositionOptions;
//! use federation_composition::Subgraph;
//! use federation_composition::federate_subgraphs;
//!
//! let subgraphs = [
//!     Subgraph::parse("users", "http://users", "type Query { me: String }").unwrap(),
//!     Subgraph::parse("posts", "http://posts", "type Query { posts: [String] }").unwrap(),
//! ];
//! let success = federate_subgraphs(&subgraphs, &CompositionOptions::default()).unwrap();
//! assert!(success.federated_graph_client_sdl.contains("posts: [String]"));
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod authorization;
mod client_schema;
mod contracts;
pub mod directives;
pub mod error;
mod federation;
mod normalization;
pub mod options;
mod printer;
pub mod schema;
mod subgraph;
mod utils;

pub use crate::contracts::federate_subgraphs_contract;
pub use crate::contracts::federate_subgraphs_with_contracts;
pub use crate::error::CompositionError;
pub use crate::error::CompositionWarning;
pub use crate::error::WarningCode;
pub use crate::federation::EntityInterfaceData;
pub use crate::federation::FederationFailure;
pub use crate::federation::FederationResult;
pub use crate::federation::FederationResultWithContracts;
pub use crate::federation::FederationSuccess;
pub use crate::federation::federate_subgraphs;
pub use crate::normalization::NormalizationFailure;
pub use crate::normalization::NormalizationResult;
pub use crate::normalization::NormalizationSuccess;
pub use crate::normalization::normalize_subgraph;
pub use crate::options::CompatibilityVersion;
pub use crate::options::CompositionOptions;
pub use crate::options::ContractTagOptions;
pub use crate::subgraph::Subgraph;
