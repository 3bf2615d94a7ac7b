// Centrality analysis: PageRank over the resolved dependency graph.
//
// Rank flows along forward edges, from dependents to their dependencies.
// Units with no resolved outgoing edge spread their score uniformly over
// every unit each iteration, so total mass stays at 1.0.
#![allow(clippy::cast_precision_loss)]

use std::time::Instant;

use tracing::info;

use crate::config::validate_damping;
use crate::error::{GraphError, Result};
use crate::store::{DependencyGraph, RankScores, ResolvedGraph};

impl DependencyGraph {
    /// `PageRank` with the graph's configured damping and iteration count.
    ///
    /// Computed on first call and cached until the next `register`.
    /// Concurrent first callers block on a single computation.
    pub fn pagerank(&self) -> &RankScores {
        self.rank_cache().get_or_init(|| {
            let params = &self.config().pagerank;
            self.compute_scores(params.damping, params.iterations, params.tolerance)
        })
    }

    /// Uncached `PageRank` with explicit parameters.
    pub fn pagerank_with(&self, damping: f64, iterations: u32) -> Result<RankScores> {
        validate_damping(damping).map_err(GraphError::InvalidInput)?;
        if iterations == 0 {
            return Err(GraphError::InvalidInput(
                "pagerank iterations must be at least 1".into(),
            ));
        }
        Ok(self.compute_scores(damping, iterations, None))
    }

    /// The `n` highest-ranked units, ties broken by identifier.
    pub fn top_ranked(&self, n: usize) -> Vec<(&str, f64)> {
        top_ranked(self.pagerank(), n)
    }

    fn compute_scores(&self, damping: f64, iterations: u32, tolerance: Option<f64>) -> RankScores {
        let start = Instant::now();
        let resolved = self.resolved();
        let scores = compute_pagerank(&resolved, damping, iterations, tolerance);

        info!(
            nodes = resolved.len(),
            edges = resolved.edge_count(),
            damping,
            iterations,
            duration = ?start.elapsed(),
            "Computed PageRank"
        );

        resolved
            .ids
            .iter()
            .zip(scores)
            .map(|(id, score)| ((*id).to_string(), score))
            .collect()
    }
}

/// Sort scores descending and keep the first `n`.
pub fn top_ranked(scores: &RankScores, n: usize) -> Vec<(&str, f64)> {
    let mut ranked: Vec<(&str, f64)> = scores.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(n);
    ranked
}

/// Power iteration. Returns one score per index of `graph`.
fn compute_pagerank(
    graph: &ResolvedGraph<'_>,
    damping: f64,
    iterations: u32,
    tolerance: Option<f64>,
) -> Vec<f64> {
    let n = graph.len();
    if n == 0 {
        return vec![];
    }

    let nf = n as f64;
    let mut scores = vec![1.0 / nf; n];

    for _ in 0..iterations {
        let dangling_mass: f64 = graph
            .out
            .iter()
            .zip(&scores)
            .filter(|(targets, _)| targets.is_empty())
            .map(|(_, s)| s)
            .sum();

        let base = (1.0 - damping) / nf + damping * dangling_mass / nf;
        let mut next = vec![base; n];

        for (u, targets) in graph.out.iter().enumerate() {
            if targets.is_empty() {
                continue;
            }
            let share = damping * scores[u] / targets.len() as f64;
            for &v in targets {
                next[v] += share;
            }
        }

        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;

        if tolerance.is_some_and(|tol| delta < tol) {
            break;
        }
    }

    scores
}

// ── Tests ──────────────────────────────────────────────────────────
