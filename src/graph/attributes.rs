//! Computed per-account attributes
//!
//! Every field is unset until the stage that produces it has committed at
//! least once. `community_id` is the exception: it starts as the account's own
//! handle, the singleton community.

use super::types::NodeId;
use crate::error::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};

/// Slack allowed on the upper bound of unit-interval scores
const UNIT_EPSILON: f64 = 1e-9;

/// Attribute bag written by the analytics stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub out_degree: Option<u64>,
    pub in_degree: Option<u64>,
    pub degree_centrality: Option<f64>,
    pub pagerank: Option<f64>,
    pub betweenness_centrality: Option<f64>,
    pub community_id: Option<NodeId>,
    pub bridge_score: Option<f64>,
    pub bottleneck_score: Option<f64>,
    pub is_bottleneck: Option<bool>,
}

impl NodeAttributes {
    /// Fresh attributes for a newly added account
    pub fn for_account(id: NodeId) -> Self {
        NodeAttributes {
            community_id: Some(id),
            ..Default::default()
        }
    }

    /// Numeric value of a metric, if set
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::OutDegree => self.out_degree.map(|v| v as f64),
            Metric::InDegree => self.in_degree.map(|v| v as f64),
            Metric::DegreeCentrality => self.degree_centrality,
            Metric::PageRank => self.pagerank,
            Metric::Betweenness => self.betweenness_centrality,
            Metric::BridgeScore => self.bridge_score,
            Metric::BottleneckScore => self.bottleneck_score,
        }
    }

    /// Drop the bottleneck outputs; they were derived from superseded inputs
    pub(crate) fn clear_bottleneck_outputs(&mut self) {
        self.bridge_score = None;
        self.bottleneck_score = None;
        self.is_bottleneck = None;
    }

    pub(crate) fn clear_degree(&mut self) {
        self.out_degree = None;
        self.in_degree = None;
        self.degree_centrality = None;
    }
}

/// Numeric attributes that can be filtered and ordered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    OutDegree,
    InDegree,
    DegreeCentrality,
    #[serde(rename = "pagerank")]
    PageRank,
    #[serde(rename = "betweenness_centrality", alias = "betweenness")]
    Betweenness,
    BridgeScore,
    BottleneckScore,
}

/// Partial update of an account's attributes
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributePatch {
    pub out_degree: Option<u64>,
    pub in_degree: Option<u64>,
    pub degree_centrality: Option<f64>,
    pub pagerank: Option<f64>,
    pub betweenness_centrality: Option<f64>,
    pub community_id: Option<NodeId>,
    pub bridge_score: Option<f64>,
    pub bottleneck_score: Option<f64>,
    pub is_bottleneck: Option<bool>,
}

fn check(account: &str, field: &'static str, value: Option<f64>, upper: Option<f64>) -> AnalyticsResult<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let invalid = |reason: String| AnalyticsError::InvalidAttribute {
        account: account.to_string(),
        field,
        reason,
    };
    if !value.is_finite() {
        return Err(invalid(format!("{} is not finite", value)));
    }
    if value < 0.0 {
        return Err(invalid(format!("{} is negative", value)));
    }
    if let Some(upper) = upper {
        if value > upper + UNIT_EPSILON {
            return Err(invalid(format!("{} exceeds {}", value, upper)));
        }
    }
    Ok(())
}

impl AttributePatch {
    /// Check value ranges. Community labels are checked by the store, which
    /// knows which accounts are live.
    pub fn validate(&self, account: &str) -> AnalyticsResult<()> {
        check(account, "degree_centrality", self.degree_centrality, None)?;
        check(account, "pagerank", self.pagerank, None)?;
        check(account, "betweenness_centrality", self.betweenness_centrality, Some(1.0))?;
        check(account, "bridge_score", self.bridge_score, Some(1.0))?;
        check(account, "bottleneck_score", self.bottleneck_score, Some(1.0))?;
        Ok(())
    }

    /// Apply the set fields onto `attributes`
    pub fn apply(&self, attributes: &mut NodeAttributes) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    attributes.$field = Some(value);
                })*
            };
        }
        merge!(
            out_degree,
            in_degree,
            degree_centrality,
            pagerank,
            betweenness_centrality,
            community_id,
            bridge_score,
            bottleneck_score,
            is_bottleneck
        );
    }

    pub(crate) fn touches_bottleneck_outputs(&self) -> bool {
        self.bridge_score.is_some() || self.bottleneck_score.is_some() || self.is_bottleneck.is_some()
    }
}
