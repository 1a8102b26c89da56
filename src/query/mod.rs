//! Read path
//!
//! Declarative attribute queries and analysis reports over committed
//! attributes. Everything here takes `&GraphStore`, so callers hold only the
//! graph's read lock; a running pipeline never blocks readers except for the
//! instant of a stage commit, and readers never see a half-committed stage.

pub mod analysis;

pub use analysis::{
    bottleneck_impact, bottleneck_summary, bottlenecks, communities, community_bridges, community_connections,
    connections, ego_network, graph_stats, influence_radius, BottleneckDetail, BottleneckImpact,
    BottleneckSummary, CommunityBridge, CommunityConnection, CommunityConnections, CommunityReport, Connections,
    EgoNetwork, GraphStats, ImpactLevel, MAX_EGO_DEPTH,
};

use crate::error::AnalyticsResult;
use crate::graph::{
    Account, AccountId, GraphStore, Metric, NodeAttributes, NodeId, PropertyMap, PropertyValue, SharedGraph,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One predicate of a [`NodeQuery`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// Metric set and `>= value`
    Min { metric: Metric, value: f64 },
    /// Metric set and `<= value`
    Max { metric: Metric, value: f64 },
    /// Member of the community labelled by this account
    Community { community: AccountId },
    IsBottleneck { value: bool },
    /// Metric set at all
    Has { metric: Metric },
    /// Profile entry equal to `value`
    Profile { field: String, value: PropertyValue },
}

impl Filter {
    fn matches(&self, store: &GraphStore, account: &Account) -> bool {
        let attrs = &account.attributes;
        match self {
            Filter::Min { metric, value } => attrs.metric(*metric).map(|v| v >= *value).unwrap_or(false),
            Filter::Max { metric, value } => attrs.metric(*metric).map(|v| v <= *value).unwrap_or(false),
            Filter::Community { community } => store
                .account(community.as_str())
                .map(|label| account.community() == label.id)
                .unwrap_or(false),
            Filter::IsBottleneck { value } => attrs.is_bottleneck == Some(*value),
            Filter::Has { metric } => attrs.metric(*metric).is_some(),
            Filter::Profile { field, value } => account.get_property(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub metric: Metric,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Declarative attribute query
///
/// This is the shape an external natural-language front end produces; it
/// deserialises from JSON such as
/// `{"filters": [{"op": "min", "metric": "pagerank", "value": 1.0}],
///   "order_by": {"metric": "bottleneck_score"}, "limit": 10}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl NodeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest bottleneck scores first
    pub fn top_bottlenecks(n: usize) -> Self {
        NodeQuery::new().order_by(Metric::BottleneckScore, SortDirection::Desc).limit(n)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, metric: Metric, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy { metric, direction });
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate against a store
    ///
    /// Accounts without the ordering metric are excluded; equal values keep
    /// handle order.
    pub fn execute(&self, store: &GraphStore) -> Vec<AccountSnapshot> {
        let mut matched: Vec<(&Account, Option<f64>)> = store
            .accounts()
            .filter(|account| self.filters.iter().all(|f| f.matches(store, account)))
            .map(|account| (account, self.order_by.and_then(|o| account.attributes.metric(o.metric))))
            .collect();

        if let Some(order) = self.order_by {
            matched.retain(|(_, value)| value.is_some());
            matched.sort_by(|(a, va), (b, vb)| {
                let by_value = match (va, vb) {
                    (Some(x), Some(y)) => x.total_cmp(y),
                    _ => Ordering::Equal,
                };
                let by_value = match order.direction {
                    SortDirection::Asc => by_value,
                    SortDirection::Desc => by_value.reverse(),
                };
                by_value.then(a.id.cmp(&b.id))
            });
        }

        matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|(account, _)| AccountSnapshot::of(store, account))
            .collect()
    }

    /// Evaluate under the shared graph's read lock
    pub fn run(&self, graph: &SharedGraph) -> AnalyticsResult<Vec<AccountSnapshot>> {
        Ok(self.execute(&*graph.read()?))
    }
}

/// Point-in-time copy of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: NodeId,
    pub key: AccountId,
    pub username: String,
    /// Key of the account whose label names this account's community
    pub community: AccountId,
    pub follower_count: usize,
    pub following_count: usize,
    pub attributes: NodeAttributes,
    pub profile: PropertyMap,
}

impl AccountSnapshot {
    pub fn of(store: &GraphStore, account: &Account) -> Self {
        AccountSnapshot {
            id: account.id,
            key: account.key.clone(),
            username: account.username().to_string(),
            community: community_key(store, account),
            follower_count: store.in_degree(account.id),
            following_count: store.out_degree(account.id),
            attributes: account.attributes.clone(),
            profile: account.profile.clone(),
        }
    }
}

/// Key naming an account's community
pub(crate) fn community_key(store: &GraphStore, account: &Account) -> AccountId {
    store
        .account_by_id(account.community())
        .map(|label| label.key.clone())
        .unwrap_or_else(|| account.key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AttributePatch;

    fn scored_store() -> GraphStore {
        let mut store = GraphStore::new();
        for key in ["a", "b", "c", "d"] {
            store.add_account(key, PropertyMap::new()).unwrap();
        }
        let scores = [("a", Some(0.2)), ("b", Some(0.7)), ("c", None), ("d", Some(0.7))];
        for (key, score) in scores {
            let patch = AttributePatch {
                bottleneck_score: score,
                is_bottleneck: score.map(|s| s > 0.5),
                ..Default::default()
            };
            store.write_attributes(key, &patch).unwrap();
        }
        store
    }

    fn keys(result: &[AccountSnapshot]) -> Vec<&str> {
        result.iter().map(|s| s.key.as_str()).collect()
    }

    #[test]
    fn test_top_bottlenecks_orders_and_excludes_unscored() {
        let store = scored_store();
        let result = NodeQuery::top_bottlenecks(10).execute(&store);
        assert_eq!(keys(&result), vec!["b", "d", "a"]);

        let result = NodeQuery::top_bottlenecks(1).execute(&store);
        assert_eq!(keys(&result), vec!["b"]);
    }

    #[test]
    fn test_filters() {
        let store = scored_store();
        let query = NodeQuery::new().filter(Filter::IsBottleneck { value: true });
        assert_eq!(keys(&query.execute(&store)), vec!["b", "d"]);

        let query = NodeQuery::new().filter(Filter::Max {
            metric: Metric::BottleneckScore,
            value: 0.5,
        });
        assert_eq!(keys(&query.execute(&store)), vec!["a"]);

        let query = NodeQuery::new().filter(Filter::Community {
            community: AccountId::from("c"),
        });
        assert_eq!(keys(&query.execute(&store)), vec!["c"]);
    }

    #[test]
    fn test_profile_filter() {
        let mut store = scored_store();
        let mut profile = PropertyMap::new();
        profile.insert("verified".to_string(), PropertyValue::Boolean(true));
        store.add_account("e", profile).unwrap();

        let query: NodeQuery = serde_json::from_str(
            r#"{"filters": [{"op": "profile", "field": "verified", "value": true}]}"#,
        )
        .unwrap();
        assert_eq!(keys(&query.execute(&store)), vec!["e"]);

        let query = NodeQuery::new().filter(Filter::Profile {
            field: "verified".to_string(),
            value: PropertyValue::Boolean(false),
        });
        assert!(query.execute(&store).is_empty());
    }

    #[test]
    fn test_ascending_with_skip() {
        let store = scored_store();
        let query = NodeQuery::new()
            .order_by(Metric::BottleneckScore, SortDirection::Asc)
            .skip(1);
        assert_eq!(keys(&query.execute(&store)), vec!["b", "d"]);
    }

    #[test]
    fn test_query_from_json() {
        let query: NodeQuery = serde_json::from_str(
            r#"{"filters": [{"op": "has", "metric": "bottleneck_score"}],
                "order_by": {"metric": "bottleneck_score"},
                "limit": 2}"#,
        )
        .unwrap();
        assert_eq!(query.order_by.map(|o| o.direction), Some(SortDirection::Desc));
        let store = scored_store();
        assert_eq!(keys(&query.execute(&store)), vec!["b", "d"]);
    }
}
