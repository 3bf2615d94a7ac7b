use serde::{Deserialize, Serialize};

// ── Unit kinds ─────────────────────────────────────────────────────

/// Category tag of an indexed unit.
///
/// The engine treats this as opaque: it is only used for grouping and
/// filtering. Unknown tags round-trip through [`UnitKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnitKind {
    Model,
    Controller,
    Service,
    Job,
    Concern,
    Mailer,
    Helper,
    Other(String),
}

impl UnitKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Model => "model",
            Self::Controller => "controller",
            Self::Service => "service",
            Self::Job => "job",
            Self::Concern => "concern",
            Self::Mailer => "mailer",
            Self::Helper => "helper",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for UnitKind {
    fn from(tag: &str) -> Self {
        match tag {
            "model" => Self::Model,
            "controller" => Self::Controller,
            "service" => Self::Service,
            "job" => Self::Job,
            "concern" => Self::Concern,
            "mailer" => Self::Mailer,
            "helper" => Self::Helper,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for UnitKind {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<UnitKind> for String {
    fn from(kind: UnitKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Extractor input ────────────────────────────────────────────────

/// One dependency descriptor emitted by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Free-form relationship label ("association", "inheritance", ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    /// How the reference was discovered (method name, macro, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl Dependency {
    pub fn new(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            via: None,
        }
    }

    #[must_use]
    pub fn via(mut self, via: impl Into<String>) -> Self {
        self.via = Some(via.into());
        self
    }
}

/// A discovered code unit, as handed to [`DependencyGraph::register`](crate::store::DependencyGraph::register).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub identifier: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Unit {
    pub fn new(identifier: impl Into<String>, kind: impl Into<UnitKind>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: kind.into(),
            file_path: None,
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn depends_on(mut self, kind: impl Into<String>, target: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::new(kind, target));
        self
    }

    #[must_use]
    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

// ── Stored graph records ───────────────────────────────────────────

/// Node attributes held by the store, keyed by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNode {
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub file_path: Option<String>,
}

/// A forward edge from the owning unit to `target`.
///
/// `kind` and `via` are diagnostics only; every algorithm treats edges as
/// unweighted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub target: String,
    pub kind: String,
    pub via: Option<String>,
}
