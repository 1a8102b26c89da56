//! Graph algorithms module
//!
//! Algorithms are implemented in the `chokepoint-algorithms` crate over dense
//! views. This module provides the adapter layer: it checks a stage's
//! preconditions against a snapshot, runs the kernel and turns the dense
//! result into per-account attribute patches plus a summary.

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::graph::{AttributePatch, GraphSnapshot, NodeId};
use crate::pipeline::Stage;
use chokepoint_algorithms::{
    approximate_betweenness, bottleneck_scores, degree_centrality, label_propagation, page_rank,
    ScoreInput,
};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Result of computing one stage, ready to commit
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub patches: Vec<(NodeId, AttributePatch)>,
    pub summary: Map<String, Value>,
}

impl StageOutput {
    pub fn nodes_processed(&self) -> usize {
        self.patches.len()
    }
}

fn mean_and_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (count, sum, max) = values.fold((0usize, 0.0, 0.0f64), |(count, sum, max), v| {
        (count + 1, sum + v, max.max(v))
    });
    if count == 0 {
        (0.0, 0.0)
    } else {
        (sum / count as f64, max)
    }
}

fn summary(entries: Value) -> Map<String, Value> {
    match entries {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Verify that everything `stage` reads is present and current.
///
/// Nothing is written when this fails.
pub fn check_dependencies(stage: Stage, snapshot: &GraphSnapshot) -> AnalyticsResult<()> {
    for &required in stage.dependencies() {
        let missing = |reason: String| AnalyticsError::MissingDependency {
            stage,
            missing: required,
            reason,
        };

        match snapshot.ledger.last(required) {
            None => return Err(missing("it has never been run".to_string())),
            Some(record) if record.topology_version != snapshot.topology_version => {
                return Err(missing(format!(
                    "its output predates a graph change (topology version {} vs {})",
                    record.topology_version, snapshot.topology_version
                )))
            }
            Some(_) => {}
        }

        let absent = snapshot.attributes.iter().position(|attrs| match required {
            Stage::PageRank => attrs.pagerank.is_none(),
            Stage::Betweenness => attrs.betweenness_centrality.is_none(),
            _ => false,
        });
        if let Some(idx) = absent {
            return Err(missing(format!("no value for account {}", snapshot.keys[idx])));
        }
    }
    Ok(())
}

/// Run one stage over a snapshot
pub fn compute_stage(
    stage: Stage,
    snapshot: &GraphSnapshot,
    config: &AnalyticsConfig,
) -> AnalyticsResult<StageOutput> {
    check_dependencies(stage, snapshot)?;
    let output = match stage {
        Stage::Degree => degree_stage(snapshot),
        Stage::PageRank => pagerank_stage(snapshot, config),
        Stage::Betweenness => betweenness_stage(snapshot),
        Stage::Community => community_stage(snapshot, config),
        Stage::Bottleneck => bottleneck_stage(snapshot, config)?,
    };
    debug!(stage = %stage, nodes = output.nodes_processed(), "stage computed");
    Ok(output)
}

fn degree_stage(snapshot: &GraphSnapshot) -> StageOutput {
    let degrees = degree_centrality(&snapshot.view);
    let (avg, max) = mean_and_max(degrees.iter().map(|d| d.centrality));

    let patches = degrees
        .iter()
        .enumerate()
        .map(|(idx, d)| {
            let patch = AttributePatch {
                out_degree: Some(d.out_degree),
                in_degree: Some(d.in_degree),
                degree_centrality: Some(d.centrality),
                ..Default::default()
            };
            (snapshot.node_id(idx), patch)
        })
        .collect();

    StageOutput {
        patches,
        summary: summary(json!({ "avg_degree": avg, "max_degree": max })),
    }
}

fn pagerank_stage(snapshot: &GraphSnapshot, config: &AnalyticsConfig) -> StageOutput {
    let ranks = page_rank(&snapshot.view, &config.pagerank);
    let (avg, max) = mean_and_max(ranks.iter().copied());

    let patches = ranks
        .into_iter()
        .enumerate()
        .map(|(idx, rank)| {
            let patch = AttributePatch {
                pagerank: Some(rank),
                ..Default::default()
            };
            (snapshot.node_id(idx), patch)
        })
        .collect();

    StageOutput {
        patches,
        summary: summary(json!({
            "avg_score": avg,
            "max_score": max,
            "iterations": config.pagerank.iterations,
            "damping_factor": config.pagerank.damping_factor,
        })),
    }
}

fn betweenness_stage(snapshot: &GraphSnapshot) -> StageOutput {
    let scores = approximate_betweenness(&snapshot.view);
    let (avg, max) = mean_and_max(scores.iter().copied());

    let patches = scores
        .into_iter()
        .enumerate()
        .map(|(idx, score)| {
            let patch = AttributePatch {
                betweenness_centrality: Some(score),
                ..Default::default()
            };
            (snapshot.node_id(idx), patch)
        })
        .collect();

    StageOutput {
        patches,
        summary: summary(json!({ "avg_score": avg, "max_score": max })),
    }
}

fn community_stage(snapshot: &GraphSnapshot, config: &AnalyticsConfig) -> StageOutput {
    let result = label_propagation(&snapshot.view, &config.community);
    let communities = result.communities();
    let found = communities.len();
    let max_size = communities.values().map(Vec::len).max().unwrap_or(0);
    let avg_size = if found == 0 {
        0.0
    } else {
        snapshot.node_count() as f64 / found as f64
    };
    if result.changed_last_iteration > 0 {
        debug!(
            unsettled = result.changed_last_iteration,
            "label propagation stopped before settling"
        );
    }

    let patches = result
        .labels
        .iter()
        .enumerate()
        .map(|(idx, &label)| {
            let patch = AttributePatch {
                community_id: Some(snapshot.node_id(label)),
                ..Default::default()
            };
            (snapshot.node_id(idx), patch)
        })
        .collect();

    StageOutput {
        patches,
        summary: summary(json!({
            "communities_found": found,
            "avg_community_size": avg_size,
            "max_community_size": max_size,
            "iterations": result.iterations,
            "unsettled_accounts": result.changed_last_iteration,
        })),
    }
}

fn bottleneck_stage(snapshot: &GraphSnapshot, config: &AnalyticsConfig) -> AnalyticsResult<StageOutput> {
    let communities_fresh = snapshot
        .ledger
        .is_fresh(Stage::Community, snapshot.topology_version);
    if !communities_fresh {
        warn!("community detection is not current; scoring every account as its own community");
    }

    let mut inputs = Vec::with_capacity(snapshot.node_count());
    for (idx, attrs) in snapshot.attributes.iter().enumerate() {
        let own = snapshot.node_id(idx);
        let (Some(pagerank), Some(betweenness)) = (attrs.pagerank, attrs.betweenness_centrality) else {
            return Err(AnalyticsError::GraphCorrupted(format!(
                "scores for account {} vanished after the dependency check",
                snapshot.keys[idx]
            )));
        };
        let community = if communities_fresh {
            attrs.community_id.unwrap_or(own)
        } else {
            own
        };
        inputs.push(ScoreInput {
            pagerank,
            betweenness,
            community: community.as_u64(),
        });
    }

    let scores = bottleneck_scores(&snapshot.view, &inputs, &config.bottleneck)?;
    let (avg, _) = mean_and_max(scores.iter().map(|s| s.bottleneck_score));
    let bottleneck_count = scores.iter().filter(|s| s.is_bottleneck).count();

    let patches = scores
        .iter()
        .enumerate()
        .map(|(idx, score)| {
            let patch = AttributePatch {
                bridge_score: Some(score.bridge_score),
                bottleneck_score: Some(score.bottleneck_score),
                is_bottleneck: Some(score.is_bottleneck),
                ..Default::default()
            };
            (snapshot.node_id(idx), patch)
        })
        .collect();

    Ok(StageOutput {
        patches,
        summary: summary(json!({
            "avg_bottleneck_score": avg,
            "bottleneck_count": bottleneck_count,
            "threshold": config.bottleneck.threshold,
            "communities_current": communities_fresh,
        })),
    })
}
