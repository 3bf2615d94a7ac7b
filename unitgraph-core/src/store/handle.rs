// Build-once, serve-many handle around a frozen graph.
//
// Readers take an `Arc` of the current graph and keep a consistent view for
// as long as they hold it. A rebuilt graph is installed with `replace`;
// nothing mutates a graph that has been published.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::DependencyGraph;

#[derive(Debug)]
pub struct GraphHandle {
    current: RwLock<Arc<DependencyGraph>>,
}

impl GraphHandle {
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
        }
    }

    /// The graph currently being served.
    pub fn current(&self) -> Arc<DependencyGraph> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Publish a rebuilt graph, returning the one it replaces.
    pub fn replace(&self, graph: DependencyGraph) -> Arc<DependencyGraph> {
        let next = Arc::new(graph);
        let nodes = next.node_count();
        let edges = next.edge_count();
        let previous = {
            let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, next)
        };
        info!(nodes, edges, "Swapped in rebuilt graph");
        previous
    }
}

impl Default for GraphHandle {
    fn default() -> Self {
        Self::new(DependencyGraph::new())
    }
}

impl From<DependencyGraph> for GraphHandle {
    fn from(graph: DependencyGraph) -> Self {
        Self::new(graph)
    }
}
