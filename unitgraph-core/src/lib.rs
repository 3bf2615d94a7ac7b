//! unitgraph core library: dependency graph store, blast radius, centrality,
//! and structural analysis over indexed code units.
//!
//! The main entry point is [`store::DependencyGraph`]. Extractors feed it
//! [`types::Unit`]s via [`store::DependencyGraph::register`]; once built, the
//! graph is frozen behind a [`store::GraphHandle`] and queried concurrently.

pub mod analyze;
pub mod config;
pub mod error;
pub mod query;
pub mod store;
pub mod types;

pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use store::{DependencyGraph, GraphHandle};
pub use types::{Dependency, Edge, Unit, UnitKind, UnitNode};
