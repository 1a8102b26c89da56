//! Analysis reports over committed attributes
//!
//! Graph overview, bottleneck listings and summaries, community breakdowns and
//! per-account neighbourhood views.

use super::{community_key, AccountSnapshot};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::graph::{Account, AccountId, Direction, GraphStore, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Number of members listed per community
const TOP_MEMBERS: usize = 5;

/// Deepest neighbourhood an ego network walks
pub const MAX_EGO_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub account_count: usize,
    pub follow_count: usize,
    pub community_count: usize,
    pub bottleneck_count: usize,
    pub avg_followers: f64,
    pub avg_following: f64,
    /// `E / (N * (N - 1))`
    pub density: f64,
}

pub fn graph_stats(store: &GraphStore) -> GraphStats {
    let n = store.account_count();
    let e = store.follow_count();
    let communities: FxHashSet<NodeId> = store.accounts().map(Account::community).collect();
    let bottleneck_count = store
        .accounts()
        .filter(|a| a.attributes.is_bottleneck == Some(true))
        .count();
    let avg = if n == 0 { 0.0 } else { e as f64 / n as f64 };
    let density = if n < 2 {
        0.0
    } else {
        e as f64 / (n as f64 * (n - 1) as f64)
    };

    GraphStats {
        account_count: n,
        follow_count: e,
        community_count: communities.len(),
        bottleneck_count,
        avg_followers: avg,
        avg_following: avg,
        density,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckSummary {
    pub total_analyzed: usize,
    pub bottleneck_count: usize,
    pub avg_bottleneck_score: Option<f64>,
    pub max_bottleneck_score: Option<f64>,
    pub min_bottleneck_score: Option<f64>,
    /// Sample standard deviation
    pub score_std_dev: Option<f64>,
}

pub fn bottleneck_summary(store: &GraphStore) -> BottleneckSummary {
    let scores: Vec<f64> = store
        .accounts()
        .filter_map(|a| a.attributes.bottleneck_score)
        .collect();
    let bottleneck_count = store
        .accounts()
        .filter(|a| a.attributes.bottleneck_score.is_some() && a.attributes.is_bottleneck == Some(true))
        .count();

    if scores.is_empty() {
        return BottleneckSummary {
            total_analyzed: 0,
            bottleneck_count: 0,
            avg_bottleneck_score: None,
            max_bottleneck_score: None,
            min_bottleneck_score: None,
            score_std_dev: None,
        };
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let std_dev = if scores.len() < 2 {
        0.0
    } else {
        (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    };

    BottleneckSummary {
        total_analyzed: scores.len(),
        bottleneck_count,
        avg_bottleneck_score: Some(mean),
        max_bottleneck_score: scores.iter().copied().reduce(f64::max),
        min_bottleneck_score: scores.iter().copied().reduce(f64::min),
        score_std_dev: Some(std_dev),
    }
}

/// Higher bottleneck score first, unscored last, then handle order
fn by_score_desc(a: &Account, b: &Account) -> Ordering {
    let score = |acc: &Account| acc.attributes.bottleneck_score.unwrap_or(f64::NEG_INFINITY);
    score(b).total_cmp(&score(a)).then(a.id.cmp(&b.id))
}

/// Distinct community keys among an account's neighbours, in handle order of
/// the labels. `foreign_only` drops the account's own community.
fn neighbour_communities(store: &GraphStore, account: &Account, foreign_only: bool) -> Vec<AccountId> {
    let own = account.community();
    let mut labels: Vec<NodeId> = store
        .neighbor_ids(account.id, Direction::Both)
        .filter_map(|n| store.account_by_id(n))
        .map(Account::community)
        .filter(|label| !foreign_only || *label != own)
        .collect();
    labels.sort_unstable();
    labels.dedup();
    labels
        .into_iter()
        .filter_map(|label| store.account_by_id(label).map(|a| a.key.clone()))
        .collect()
}

/// Distinct accounts reachable within `depth` undirected hops, with the
/// distance at which each was first reached. The start is included at 0.
fn within_hops(store: &GraphStore, start: NodeId, depth: usize) -> Vec<(NodeId, usize)> {
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back((start, 0));

    while let Some((id, dist)) = queue.pop_front() {
        order.push((id, dist));
        if dist == depth {
            continue;
        }
        for next in store.neighbor_ids(id, Direction::Both) {
            if seen.insert(next) {
                queue.push_back((next, dist + 1));
            }
        }
    }
    order
}

/// Distinct accounts within two undirected hops, excluding the account itself
pub fn influence_radius(store: &GraphStore, id: NodeId) -> usize {
    within_hops(store, id, 2).len().saturating_sub(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckDetail {
    pub account: AccountSnapshot,
    pub connected_communities: Vec<AccountId>,
    pub influence_radius: usize,
}

/// Scored accounts at or above `min_score`, optionally restricted to one
/// community, highest score first
pub fn bottlenecks(
    store: &GraphStore,
    min_score: f64,
    community: Option<&str>,
    limit: usize,
) -> Vec<BottleneckDetail> {
    let community = match community {
        Some(key) => match store.account(key) {
            Some(label) => Some(label.id),
            None => return Vec::new(),
        },
        None => None,
    };

    let mut candidates: Vec<&Account> = store
        .accounts()
        .filter(|a| a.attributes.bottleneck_score.map(|s| s >= min_score).unwrap_or(false))
        .filter(|a| community.map(|c| a.community() == c).unwrap_or(true))
        .collect();
    candidates.sort_by(|a, b| by_score_desc(a, b));

    candidates
        .into_iter()
        .take(limit)
        .map(|account| BottleneckDetail {
            account: AccountSnapshot::of(store, account),
            connected_communities: neighbour_communities(store, account, false),
            influence_radius: influence_radius(store, account.id),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityBridge {
    pub account: AccountSnapshot,
    pub bridged_communities: Vec<AccountId>,
    pub bridge_count: usize,
}

/// Accounts adjacent to at least two foreign communities
pub fn community_bridges(store: &GraphStore, limit: usize) -> Vec<CommunityBridge> {
    let mut bridges: Vec<(&Account, Vec<AccountId>)> = store
        .accounts()
        .map(|a| (a, neighbour_communities(store, a, true)))
        .filter(|(_, bridged)| bridged.len() >= 2)
        .collect();
    bridges.sort_by(|(a, ba), (b, bb)| bb.len().cmp(&ba.len()).then_with(|| by_score_desc(a, b)));

    bridges
        .into_iter()
        .take(limit)
        .map(|(account, bridged)| CommunityBridge {
            account: AccountSnapshot::of(store, account),
            bridge_count: bridged.len(),
            bridged_communities: bridged,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityReport {
    pub community: AccountId,
    pub member_count: usize,
    /// Follows with both endpoints in the community
    pub internal_edges: usize,
    /// Follows with exactly one endpoint in the community
    pub external_edges: usize,
    /// `internal / (m * (m - 1))`
    pub internal_density: f64,
    pub avg_bottleneck_score: Option<f64>,
    pub top_members: Vec<AccountSnapshot>,
}

/// Communities with at least `min_size` members, largest first
pub fn communities(store: &GraphStore, min_size: usize, limit: usize) -> Vec<CommunityReport> {
    let mut members: FxHashMap<NodeId, Vec<&Account>> = FxHashMap::default();
    for account in store.accounts() {
        members.entry(account.community()).or_default().push(account);
    }

    let mut internal: FxHashMap<NodeId, usize> = FxHashMap::default();
    let mut external: FxHashMap<NodeId, usize> = FxHashMap::default();
    for follow in store.follows() {
        let (Some(source), Some(target)) = (
            store.account_by_id(follow.source),
            store.account_by_id(follow.target),
        ) else {
            continue;
        };
        let (cs, ct) = (source.community(), target.community());
        if cs == ct {
            *internal.entry(cs).or_default() += 1;
        } else {
            *external.entry(cs).or_default() += 1;
            *external.entry(ct).or_default() += 1;
        }
    }

    let mut groups: Vec<(NodeId, Vec<&Account>)> = members
        .into_iter()
        .filter(|(_, m)| m.len() >= min_size)
        .collect();
    groups.sort_by(|(la, ma), (lb, mb)| mb.len().cmp(&ma.len()).then(la.cmp(lb)));

    groups
        .into_iter()
        .take(limit)
        .map(|(label, mut accounts)| {
            let m = accounts.len();
            let internal_edges = internal.get(&label).copied().unwrap_or(0);
            let scores: Vec<f64> = accounts
                .iter()
                .filter_map(|a| a.attributes.bottleneck_score)
                .collect();
            accounts.sort_by(|a, b| by_score_desc(a, b));

            CommunityReport {
                community: store
                    .account_by_id(label)
                    .map(|a| a.key.clone())
                    .unwrap_or_else(|| community_key(store, accounts[0])),
                member_count: m,
                internal_edges,
                external_edges: external.get(&label).copied().unwrap_or(0),
                internal_density: if m < 2 {
                    0.0
                } else {
                    internal_edges as f64 / (m * (m - 1)) as f64
                },
                avg_bottleneck_score: if scores.is_empty() {
                    None
                } else {
                    Some(scores.iter().sum::<f64>() / scores.len() as f64)
                },
                top_members: accounts
                    .iter()
                    .take(TOP_MEMBERS)
                    .map(|a| AccountSnapshot::of(store, a))
                    .collect(),
            }
        })
        .collect()
}

/// Follows from one community into another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityConnection {
    pub source: AccountId,
    pub target: AccountId,
    pub weight: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityConnections {
    /// Communities touching at least one connection, by label
    pub communities: Vec<AccountId>,
    pub connections: Vec<CommunityConnection>,
    pub total_inter_community_edges: usize,
}

/// Directed follow counts between distinct communities, heaviest first
pub fn community_connections(store: &GraphStore) -> CommunityConnections {
    let mut weights: FxHashMap<(NodeId, NodeId), usize> = FxHashMap::default();
    let mut names: FxHashMap<NodeId, AccountId> = FxHashMap::default();
    for follow in store.follows() {
        let (Some(source), Some(target)) = (
            store.account_by_id(follow.source),
            store.account_by_id(follow.target),
        ) else {
            continue;
        };
        let (cs, ct) = (source.community(), target.community());
        if cs == ct {
            continue;
        }
        *weights.entry((cs, ct)).or_default() += 1;
        names.entry(cs).or_insert_with(|| community_key(store, source));
        names.entry(ct).or_insert_with(|| community_key(store, target));
    }

    let mut pairs: Vec<((NodeId, NodeId), usize)> = weights.into_iter().collect();
    pairs.sort_by(|(ka, wa), (kb, wb)| wb.cmp(wa).then(ka.cmp(kb)));

    let mut labels: Vec<NodeId> = names.keys().copied().collect();
    labels.sort();

    CommunityConnections {
        communities: labels.iter().map(|label| names[label].clone()).collect(),
        total_inter_community_edges: pairs.iter().map(|(_, w)| w).sum(),
        connections: pairs
            .into_iter()
            .map(|((cs, ct), weight)| CommunityConnection {
                source: names[&cs].clone(),
                target: names[&ct].clone(),
                weight,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub fn from_paths(paths: u64) -> Self {
        match paths {
            p if p > 100 => ImpactLevel::Critical,
            p if p > 50 => ImpactLevel::High,
            p if p > 20 => ImpactLevel::Medium,
            _ => ImpactLevel::Low,
        }
    }
}

/// Estimate of what removing an account would cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckImpact {
    pub key: AccountId,
    pub username: String,
    pub bottleneck_score: Option<f64>,
    pub direct_connections: usize,
    /// Neighbour pairs whose two-hop path runs through the account
    pub paths_through_node: u64,
    pub communities_connected: usize,
    pub estimated_impact: ImpactLevel,
}

pub fn bottleneck_impact(store: &GraphStore, key: &str) -> AnalyticsResult<BottleneckImpact> {
    let id = store.resolve(key)?;
    let account = store
        .account_by_id(id)
        .ok_or_else(|| AnalyticsError::InvalidReference(key.to_string()))?;

    let direct = store.neighbor_ids(id, Direction::Both).count() as u64;
    let paths = direct * direct.saturating_sub(1) / 2;

    Ok(BottleneckImpact {
        key: account.key.clone(),
        username: account.username().to_string(),
        bottleneck_score: account.attributes.bottleneck_score,
        direct_connections: direct as usize,
        paths_through_node: paths,
        communities_connected: neighbour_communities(store, account, true).len(),
        estimated_impact: ImpactLevel::from_paths(paths),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    pub key: AccountId,
    pub followers: Vec<AccountSnapshot>,
    pub following: Vec<AccountSnapshot>,
    pub follower_count: usize,
    pub following_count: usize,
}

pub fn connections(store: &GraphStore, key: &str) -> AnalyticsResult<Connections> {
    let id = store.resolve(key)?;
    let collect = |direction: Direction| -> Vec<AccountSnapshot> {
        store
            .neighbor_ids(id, direction)
            .filter_map(|n| store.account_by_id(n))
            .map(|a| AccountSnapshot::of(store, a))
            .collect()
    };
    let followers = collect(Direction::In);
    let following = collect(Direction::Out);

    Ok(Connections {
        key: AccountId::from(key),
        follower_count: followers.len(),
        following_count: following.len(),
        followers,
        following,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgoNetwork {
    pub center: AccountId,
    pub depth: usize,
    pub accounts: Vec<AccountSnapshot>,
    /// Follows with both endpoints inside the network, as `(follower, followed)`
    pub follows: Vec<(AccountId, AccountId)>,
}

/// Accounts within `depth` undirected hops of `key` (capped at
/// [`MAX_EGO_DEPTH`]) and the follows among them
pub fn ego_network(store: &GraphStore, key: &str, depth: usize) -> AnalyticsResult<EgoNetwork> {
    let center = store.resolve(key)?;
    let depth = depth.min(MAX_EGO_DEPTH);
    let reached = within_hops(store, center, depth);
    let inside: FxHashSet<NodeId> = reached.iter().map(|(id, _)| *id).collect();

    let accounts: Vec<&Account> = reached
        .iter()
        .filter_map(|(id, _)| store.account_by_id(*id))
        .collect();
    let mut follows = Vec::new();
    for account in &accounts {
        for target in store.neighbor_ids(account.id, Direction::Out) {
            if !inside.contains(&target) {
                continue;
            }
            if let Some(followed) = store.account_by_id(target) {
                follows.push((account.key.clone(), followed.key.clone()));
            }
        }
    }

    Ok(EgoNetwork {
        center: AccountId::from(key),
        depth,
        accounts: accounts.iter().map(|a| AccountSnapshot::of(store, a)).collect(),
        follows,
    })
}
