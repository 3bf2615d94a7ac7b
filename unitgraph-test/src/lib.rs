// Integration test utilities and fixtures for unitgraph.

use std::path::{Path, PathBuf};
use std::sync::Once;

use unitgraph_core::{DependencyGraph, GraphConfig, Unit, UnitKind};

/// A directory holding persisted graph files for one test.
#[derive(Debug)]
pub struct TestWorkspace {
    pub dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn graph_path(&self) -> PathBuf {
        self.dir.path().join("dependency_graph.json")
    }

    /// Write a raw snapshot file, bypassing the graph writer.
    pub fn write_snapshot(&self, value: &serde_json::Value) -> PathBuf {
        let path = self.graph_path();
        let text = serde_json::to_string_pretty(value).expect("serialize snapshot");
        std::fs::write(&path, text).expect("write snapshot");
        path
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("unitgraph_core=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ── Fixtures ───────────────────────────────────────────────────────

/// Units of a small storefront application.
///
/// ```text
/// UsersController -> UserService -> User <- Order -> Product
///                                    ^                  ^
///                    WelcomeMailer --+     CartService -+
/// ```
///
/// Every model also inherits from `ApplicationRecord`, which is never
/// registered. `Product` declares `Searchable`, which is a registered concern.
pub fn storefront_units() -> Vec<Unit> {
    vec![
        Unit::new("ApplicationRecord::Searchable", UnitKind::Concern)
            .file("app/models/concerns/searchable.rb"),
        Unit::new("User", UnitKind::Model)
            .file("app/models/user.rb")
            .depends_on("inheritance", "ApplicationRecord"),
        Unit::new("Product", UnitKind::Model)
            .file("app/models/product.rb")
            .depends_on("inheritance", "ApplicationRecord")
            .depends_on("include", "ApplicationRecord::Searchable"),
        Unit::new("Order", UnitKind::Model)
            .file("app/models/order.rb")
            .depends_on("inheritance", "ApplicationRecord")
            .depends_on("association", "User")
            .depends_on("association", "Product"),
        Unit::new("UserService", UnitKind::Service)
            .file("app/services/user_service.rb")
            .depends_on("method_call", "User"),
        Unit::new("CartService", UnitKind::Service)
            .file("app/services/cart_service.rb")
            .depends_on("method_call", "Product")
            .depends_on("method_call", "Order"),
        Unit::new("UsersController", UnitKind::Controller)
            .file("app/controllers/users_controller.rb")
            .depends_on("method_call", "UserService"),
        Unit::new("WelcomeMailer", UnitKind::Mailer)
            .file("app/mailers/welcome_mailer.rb")
            .depends_on("constant", "User"),
    ]
}

pub fn storefront_graph() -> DependencyGraph {
    build_graph(storefront_units(), GraphConfig::default())
}

/// Register `units` into a fresh graph, panicking on invalid input.
pub fn build_graph(units: Vec<Unit>, config: GraphConfig) -> DependencyGraph {
    let mut graph = DependencyGraph::with_config(config).expect("valid config");
    graph.register_all(units).expect("register fixture units");
    graph
}

/// Deterministic sparse graph of `unit_count` models.
///
/// Unit `i` references `(i * prime + 1) % unit_count` for a few primes.
pub fn synthetic_units(unit_count: usize) -> Vec<Unit> {
    let primes = [7, 13, 31];
    (0..unit_count)
        .map(|i| {
            primes
                .iter()
                .map(|prime| (i.wrapping_mul(*prime).wrapping_add(1)) % unit_count)
                .filter(|target| *target != i)
                .fold(
                    Unit::new(format!("Unit{i}"), UnitKind::Model)
                        .file(format!("app/models/unit_{i}.rb")),
                    |unit, target| unit.depends_on("method_call", format!("Unit{target}")),
                )
        })
        .collect()
}

/// Sorted identifiers, for comparing result sets.
pub fn ids<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = items.into_iter().map(str::to_string).collect();
    out.sort();
    out
}

/// Load a graph and attach the path to any error.
pub fn load_graph(path: &Path) -> anyhow::Result<DependencyGraph> {
    use anyhow::Context;
    DependencyGraph::load(path, GraphConfig::default())
        .with_context(|| format!("loading {}", path.display()))
}
