use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine configuration, matching a `unitgraph.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub pagerank: PageRankConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Probability of following an edge rather than teleporting.
    pub damping: f64,
    pub iterations: u32,
    /// Stop early once the L1 change between iterations drops below this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            iterations: 20,
            tolerance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// A unit is a hub when its dependent count exceeds this value.
    pub hub_threshold: usize,
    pub hub_sample_size: usize,
    pub max_hubs: usize,
    pub max_cycles: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hub_threshold: 5,
            hub_sample_size: 5,
            max_hubs: 20,
            max_cycles: 50,
        }
    }
}

impl GraphConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Invalid(format!("cannot read {}: {e}", path.display())),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_damping(self.pagerank.damping).map_err(ConfigError::Invalid)?;
        if self.pagerank.iterations == 0 {
            return Err(ConfigError::Invalid(
                "pagerank.iterations must be at least 1".into(),
            ));
        }
        if let Some(tol) = self.pagerank.tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "pagerank.tolerance must be a non-negative finite number, got {tol}"
                )));
            }
        }
        Ok(())
    }
}

/// Damping must be finite and a probability.
pub(crate) fn validate_damping(damping: f64) -> Result<(), String> {
    if !damping.is_finite() {
        return Err(format!("damping factor must be finite, got {damping}"));
    }
    if !(0.0..=1.0).contains(&damping) {
        return Err(format!("damping factor must be within [0, 1], got {damping}"));
    }
    Ok(())
}
