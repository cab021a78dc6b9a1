//! Runtime configuration for discovery and reconciliation.
//!
//! Every field has a default matching the two-player co-op setup, so an
//! empty JSON object is a valid configuration.

use crate::error::{compile_pattern, SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the sync engine and orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemshareConfig {
    /// Period of the discovery scan (ms).
    pub discovery_period_ms: u64,
    /// Period of the reconciliation cycle (ms).
    pub reconcile_period_ms: u64,
    /// Number of labels handed out by index inference (P1..Pn).
    pub max_players: usize,
    /// How many ancestors to climb when resolving an object to its root.
    pub resolve_depth: usize,
    /// Structural name markers in the host graph.
    pub markers: MarkerConfig,
    /// Member name patterns used by the prober and index inference.
    pub probe: ProbeConfig,
}

impl Default for GemshareConfig {
    fn default() -> Self {
        Self {
            discovery_period_ms: 2_000,
            reconcile_period_ms: 1_000,
            max_players: 2,
            resolve_depth: 10,
            markers: MarkerConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl GemshareConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and compiles every pattern once.
    pub fn validate(&self) -> SyncResult<()> {
        if self.discovery_period_ms == 0 || self.reconcile_period_ms == 0 {
            return Err(SyncError::Config("periods must be non-zero".to_string()));
        }
        if self.max_players == 0 || self.max_players > u8::MAX as usize {
            return Err(SyncError::Config(format!(
                "max_players must be in 1..=255, got {}",
                self.max_players
            )));
        }
        if self.resolve_depth == 0 {
            return Err(SyncError::Config("resolve_depth must be non-zero".to_string()));
        }
        compile_pattern(&self.probe.level_pattern)?;
        compile_pattern(&self.probe.ceiling_pattern)?;
        compile_pattern(&self.probe.index_pattern)?;
        Ok(())
    }

    pub fn discovery_period(&self) -> Duration {
        Duration::from_millis(self.discovery_period_ms)
    }

    pub fn reconcile_period(&self) -> Duration {
        Duration::from_millis(self.reconcile_period_ms)
    }
}

/// Names that mark structure in the host graph. Matching is a
/// case-insensitive substring test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Parent name marking the character instantiation boundary.
    pub boundary: String,
    /// Direct child name that makes a candidate a player root.
    pub player_indicator: String,
    /// Looser indicator name used when reading the label off the indicator.
    pub indicator_fallback: String,
    /// Capability type names containing this are probed first.
    pub health_type: String,
    /// Capability full names containing this are probed second.
    pub player_namespace: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            boundary: "Instantiate Parent".to_string(),
            player_indicator: "Player Number Indicator".to_string(),
            indicator_fallback: "Player Number".to_string(),
            health_type: "Health".to_string(),
            player_namespace: ".Player".to_string(),
        }
    }
}

/// Member name patterns (case-insensitive regular expressions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Current resource level.
    pub level_pattern: String,
    /// Resource ceiling.
    pub ceiling_pattern: String,
    /// Player slot / index members.
    pub index_pattern: String,
    /// Method-name verbs for the zero-argument method fallback.
    pub method_verbs: Vec<String>,
    /// Resource words for the method fallback.
    pub resource_words: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            level_pattern: "(health|hp|life)".to_string(),
            ceiling_pattern: "(max.*(health|hp|life)|(health|hp|life).*max)".to_string(),
            index_pattern: "(player(index|id)|slot|index)$".to_string(),
            method_verbs: vec!["get".into(), "current".into(), "calc".into()],
            resource_words: vec!["health".into(), "hp".into(), "life".into()],
        }
    }
}
