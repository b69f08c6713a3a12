use crate::error::ScanError;
use crate::score::AggregateWeights;
use crate::supply_chain::GraphOptions;
use crate::vuln::{ResolverOptions, RiskWeights};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "riskscope.toml";

/// Batch parameters for the vulnerability resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub parallelism: usize,
    pub batch_delay_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            parallelism: 5,
            batch_delay_ms: 100,
        }
    }
}

/// Expansion parameters for the supply-chain graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub max_depth: usize,
    pub parallelism: usize,
    pub level_delay_ms: u64,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            parallelism: 3,
            level_delay_ms: 100,
            cache_capacity: 512,
            cache_ttl_secs: 600,
        }
    }
}

/// Top-level configuration, loaded from `riskscope.toml` when present.
/// Every field defaults to the built-in heuristics, so an absent or empty
/// file changes nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskScopeConfig {
    pub resolver: ResolverConfig,
    pub graph: GraphConfig,
    pub risk_weights: RiskWeights,
    pub aggregate_weights: AggregateWeights,
}

impl RiskScopeConfig {
    /// Load from an explicit path, or from `riskscope.toml` under `root`
    /// when it exists, or fall back to defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ScanError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.is_file() {
                    debug!("no {} found, using defaults", CONFIG_FILE);
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| ScanError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            parallelism: self.resolver.parallelism,
            batch_delay: Duration::from_millis(self.resolver.batch_delay_ms),
        }
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            max_depth: self.graph.max_depth,
            parallelism: self.graph.parallelism,
            level_delay: Duration::from_millis(self.graph.level_delay_ms),
        }
    }
}
