//! Analytics configuration
//!
//! Loaded from YAML; every section and field is optional and falls back to its
//! default. Environment variables override the file for the values operators
//! tune most often.
//!
//! ```yaml
//! pagerank:
//!   damping_factor: 0.85
//!   iterations: 20
//! community:
//!   iterations: 10
//! bottleneck:
//!   threshold: 0.5
//!   bridge_cap: 5
//!   weights: { betweenness: 0.4, pagerank: 0.3, bridge: 0.3 }
//! pipeline:
//!   lock_poll_interval_ms: 5
//! ```

use crate::error::{AnalyticsError, AnalyticsResult};
use chokepoint_algorithms::{BottleneckConfig, LabelPropagationConfig, PageRankConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Slack on the weight sum so that 0.4 + 0.3 + 0.3 passes
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// How often a queued run re-checks the write lease
    pub lock_poll_interval_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lock_poll_interval_ms: 5,
        }
    }
}

impl PipelineSettings {
    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub pagerank: PageRankConfig,
    pub community: LabelPropagationConfig,
    pub bottleneck: BottleneckConfig,
    pub pipeline: PipelineSettings,
}

impl AnalyticsConfig {
    pub fn from_yaml_str(yaml: &str) -> AnalyticsResult<Self> {
        let config: AnalyticsConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AnalyticsResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::info!("Loaded analytics config from {}", path.display());
        Ok(config)
    }

    /// Load from an optional YAML file, then apply environment overrides.
    ///
    /// Priority: env var > YAML > default
    pub fn from_yaml_and_env(path: Option<&Path>) -> AnalyticsResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AnalyticsResult<()> {
        fn parse<T: std::str::FromStr>(name: &str, raw: String) -> AnalyticsResult<T> {
            raw.trim()
                .parse()
                .map_err(|_| AnalyticsError::InvalidConfig(format!("{}={} is not valid", name, raw)))
        }

        if let Some(raw) = lookup("CHOKEPOINT_BOTTLENECK_THRESHOLD") {
            self.bottleneck.threshold = parse("CHOKEPOINT_BOTTLENECK_THRESHOLD", raw)?;
        }
        if let Some(raw) = lookup("CHOKEPOINT_PAGERANK_ITERATIONS") {
            self.pagerank.iterations = parse("CHOKEPOINT_PAGERANK_ITERATIONS", raw)?;
        }
        if let Some(raw) = lookup("CHOKEPOINT_COMMUNITY_ITERATIONS") {
            self.community.iterations = parse("CHOKEPOINT_COMMUNITY_ITERATIONS", raw)?;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> AnalyticsResult<()> {
        let invalid = |msg: String| Err(AnalyticsError::InvalidConfig(msg));

        let damping = self.pagerank.damping_factor;
        if !(0.0..=1.0).contains(&damping) {
            return invalid(format!("pagerank.damping_factor must be in [0, 1], got {}", damping));
        }
        if self.pagerank.iterations == 0 {
            return invalid("pagerank.iterations must be at least 1".to_string());
        }
        if self.community.iterations == 0 {
            return invalid("community.iterations must be at least 1".to_string());
        }

        let bottleneck = &self.bottleneck;
        if !(0.0..=1.0).contains(&bottleneck.threshold) {
            return invalid(format!(
                "bottleneck.threshold must be in [0, 1], got {}",
                bottleneck.threshold
            ));
        }
        if bottleneck.bridge_cap == 0 {
            return invalid("bottleneck.bridge_cap must be at least 1".to_string());
        }
        let weights = [
            ("betweenness", bottleneck.weights.betweenness),
            ("pagerank", bottleneck.weights.pagerank),
            ("bridge", bottleneck.weights.bridge),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return invalid(format!("bottleneck.weights.{} must be finite and >= 0", name));
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if sum > 1.0 + WEIGHT_SUM_EPSILON {
            return invalid(format!("bottleneck weights must sum to at most 1, got {}", sum));
        }
        Ok(())
    }
}
