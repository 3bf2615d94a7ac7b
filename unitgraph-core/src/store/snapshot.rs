// Persisted graph format.
//
// JSON written once per extraction run and read back by the next run or by
// serving processes:
//
//   { "nodes": {id: {"type", "file_path"}}, "edges": {id: [target, ...]},
//     "stats": {"node_count", "edge_count"}, "pagerank": {id: score}?,
//     "edge_meta": {id: {target: {"kind", "via"}}}? }

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::types::{Dependency, Unit, UnitKind};

use super::DependencyGraph;

/// Serializable form of a [`DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: BTreeMap<String, NodeRecord>,
    pub edges: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SnapshotStats>,
    /// Precomputed scores for serving processes; ignored on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagerank: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub edge_meta: BTreeMap<String, BTreeMap<String, EdgeMeta>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMeta {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

/// Kind recorded for edges loaded without metadata.
const UNKNOWN_EDGE_KIND: &str = "unknown";

impl DependencyGraph {
    pub fn to_snapshot(&self, include_pagerank: bool) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|(id, node)| {
                (
                    id.to_string(),
                    NodeRecord {
                        kind: node.kind.clone(),
                        file_path: node.file_path.clone(),
                    },
                )
            })
            .collect();

        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut edge_meta: BTreeMap<String, BTreeMap<String, EdgeMeta>> = BTreeMap::new();
        for (source, edge) in self.edges() {
            edges
                .entry(source.to_string())
                .or_default()
                .push(edge.target.clone());
            edge_meta.entry(source.to_string()).or_default().insert(
                edge.target.clone(),
                EdgeMeta {
                    kind: edge.kind.clone(),
                    via: edge.via.clone(),
                },
            );
        }

        GraphSnapshot {
            nodes,
            edges,
            stats: Some(SnapshotStats {
                node_count: self.node_count(),
                edge_count: self.edge_count(),
            }),
            pagerank: include_pagerank.then(|| self.pagerank().clone()),
            edge_meta,
        }
    }

    /// Rebuild a graph from a snapshot, failing on any inconsistency.
    pub fn from_snapshot(snapshot: GraphSnapshot, config: GraphConfig) -> Result<Self> {
        let GraphSnapshot {
            mut nodes,
            mut edges,
            stats,
            pagerank: _,
            mut edge_meta,
        } = snapshot;

        if let Some(source) = edges.keys().find(|s| !nodes.contains_key(*s)) {
            return Err(GraphError::MalformedSnapshot(format!(
                "edge list for {source} has no matching node"
            )));
        }
        if let Some(source) = edge_meta.keys().find(|s| !edges.contains_key(*s)) {
            return Err(GraphError::MalformedSnapshot(format!(
                "edge metadata for {source} has no matching edge list"
            )));
        }

        let mut graph = Self::with_config(config)?;
        let ids: Vec<String> = nodes.keys().cloned().collect();
        for id in ids {
            let Some(record) = nodes.remove(&id) else {
                continue;
            };
            let targets = edges.remove(&id).unwrap_or_default();
            let mut meta = edge_meta.remove(&id).unwrap_or_default();

            let dependencies = targets
                .into_iter()
                .map(|target| {
                    let EdgeMeta { kind, via } = meta.remove(&target).unwrap_or_else(|| EdgeMeta {
                        kind: UNKNOWN_EDGE_KIND.to_string(),
                        via: None,
                    });
                    Dependency { kind, target, via }
                })
                .collect();

            graph
                .register(Unit {
                    identifier: id,
                    kind: record.kind,
                    file_path: record.file_path,
                    dependencies,
                })
                .map_err(|e| GraphError::MalformedSnapshot(e.to_string()))?;
        }

        if let Some(expected) = stats {
            let actual = SnapshotStats {
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
            };
            if expected != actual {
                return Err(GraphError::MalformedSnapshot(format!(
                    "stats disagree with contents: recorded {expected:?}, found {actual:?}"
                )));
            }
        }

        Ok(graph)
    }

    pub fn to_value(&self, include_pagerank: bool) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_snapshot(include_pagerank))?)
    }

    /// Decode an already-parsed JSON document.
    pub fn from_value(value: serde_json::Value, config: GraphConfig) -> Result<Self> {
        let snapshot: GraphSnapshot = serde_json::from_value(value)
            .map_err(|e| GraphError::MalformedSnapshot(e.to_string()))?;
        Self::from_snapshot(snapshot, config)
    }

    pub fn to_json(&self, include_pagerank: bool) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot(include_pagerank))?)
    }

    pub fn from_json(text: &str, config: GraphConfig) -> Result<Self> {
        let snapshot: GraphSnapshot = serde_json::from_str(text)
            .map_err(|e| GraphError::MalformedSnapshot(e.to_string()))?;
        Self::from_snapshot(snapshot, config)
    }

    /// Write the snapshot atomically: readers of `path` see either the old
    /// file or the complete new one.
    pub fn save(&self, path: &Path, include_pagerank: bool) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let json = self.to_json(include_pagerank)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| GraphError::Io(e.error))?;

        info!(
            path = %path.display(),
            nodes = self.node_count(),
            edges = self.edge_count(),
            "Saved graph snapshot"
        );
        Ok(())
    }

    pub fn load(path: &Path, config: GraphConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let graph = Self::from_json(&text, config)?;
        info!(
            path = %path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Loaded graph snapshot"
        );
        Ok(graph)
    }
}

// ── Tests ──────────────────────────────────────────────────────────
