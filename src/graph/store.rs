//! In-memory follow graph storage
//!
//! Accounts live in an arena indexed by their `NodeId`; removed accounts leave
//! a tombstone so handles are never reused. Adjacency is kept in both
//! directions as insertion-ordered handle sets, which gives set semantics for
//! follows and cheap follower/following walks without node-to-node pointers.

use super::attributes::{AttributePatch, NodeAttributes};
use super::edge::Follows;
use super::ledger::StageLedger;
use super::node::Account;
use super::property::PropertyMap;
use super::shared::WriteLease;
use super::types::{AccountId, Direction, NodeId};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::pipeline::Stage;
use chokepoint_algorithms::GraphView;
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Topology shared by every snapshot taken between two structural mutations
#[derive(Debug)]
struct CachedTopology {
    view: Arc<GraphView>,
    keys: Arc<Vec<AccountId>>,
}

/// Read-only view of the graph handed to a stage
///
/// Dense index `i` of `view` is the account `keys[i]` with attributes
/// `attributes[i]`. Dense indices follow handle order.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub view: Arc<GraphView>,
    pub keys: Arc<Vec<AccountId>>,
    pub attributes: Vec<NodeAttributes>,
    pub topology_version: u64,
    pub ledger: StageLedger,
}

impl GraphSnapshot {
    pub fn node_count(&self) -> usize {
        self.view.node_count
    }

    /// Arena handle of a dense index
    pub fn node_id(&self, idx: usize) -> NodeId {
        NodeId::new(self.view.index_to_node[idx])
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveLease {
    pub(crate) id: u64,
    pub(crate) holder: String,
    pub(crate) acquired_at: i64,
}

/// In-memory graph storage
#[derive(Debug)]
pub struct GraphStore {
    /// Account arena; `None` marks a removed account
    accounts: Vec<Option<Account>>,

    /// Accounts each account follows
    outgoing: Vec<IndexSet<NodeId>>,

    /// Followers of each account
    incoming: Vec<IndexSet<NodeId>>,

    /// External key -> handle
    key_index: FxHashMap<AccountId, NodeId>,

    live_accounts: usize,
    follow_count: usize,

    /// Bumped on every structural mutation
    topology_version: u64,

    /// Dense view of the current topology, built on first snapshot
    topology_cache: OnceLock<CachedTopology>,

    /// Whether any account currently carries bottleneck outputs
    bottleneck_outputs_present: bool,

    ledger: StageLedger,

    active_lease: Option<ActiveLease>,
    next_lease_id: u64,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            accounts: Vec::with_capacity(1024),
            outgoing: Vec::with_capacity(1024),
            incoming: Vec::with_capacity(1024),
            key_index: FxHashMap::default(),
            live_accounts: 0,
            follow_count: 0,
            topology_version: 0,
            topology_cache: OnceLock::new(),
            bottleneck_outputs_present: false,
            ledger: StageLedger::new(),
            active_lease: None,
            next_lease_id: 1,
        }
    }

    fn ensure_unlocked(&self, operation: &str) -> AnalyticsResult<()> {
        match &self.active_lease {
            Some(lease) => Err(AnalyticsError::GraphLocked(format!(
                "cannot {} while {} holds the write lease",
                operation, lease.holder
            ))),
            None => Ok(()),
        }
    }

    /// Resolve an external key to its handle
    pub fn resolve(&self, key: &str) -> AnalyticsResult<NodeId> {
        self.key_index
            .get(key)
            .copied()
            .ok_or_else(|| AnalyticsError::InvalidReference(key.to_string()))
    }

    /// Add an account
    pub fn add_account(
        &mut self,
        key: impl Into<AccountId>,
        profile: PropertyMap,
    ) -> AnalyticsResult<NodeId> {
        let key = key.into();
        self.ensure_unlocked("add an account")?;
        if self.key_index.contains_key(&key) {
            return Err(AnalyticsError::DuplicateAccount(key.to_string()));
        }

        let id = NodeId::new(self.accounts.len() as u64);
        self.key_index.insert(key.clone(), id);
        self.accounts.push(Some(Account::with_profile(id, key, profile)));
        self.outgoing.push(IndexSet::new());
        self.incoming.push(IndexSet::new());
        self.live_accounts += 1;
        self.topology_changed(&[]);
        Ok(id)
    }

    /// Return the handle for `key`, adding a bare account on first sight
    pub fn ensure_account(&mut self, key: &str) -> AnalyticsResult<NodeId> {
        match self.key_index.get(key) {
            Some(&id) => Ok(id),
            None => self.add_account(key, PropertyMap::new()),
        }
    }

    /// Add a follow. Returns `false` if it already existed.
    pub fn add_follow(&mut self, source: &str, target: &str) -> AnalyticsResult<bool> {
        self.ensure_unlocked("add a follow")?;
        let source_id = self.resolve(source)?;
        let target_id = self.resolve(target)?;
        if source_id == target_id {
            return Err(AnalyticsError::SelfLoop(source.to_string()));
        }

        if !self.outgoing[source_id.index()].insert(target_id) {
            return Ok(false);
        }
        self.incoming[target_id.index()].insert(source_id);
        self.follow_count += 1;
        self.topology_changed(&[source_id, target_id]);
        Ok(true)
    }

    /// Remove a follow. Returns `false` if there was none.
    pub fn remove_follow(&mut self, source: &str, target: &str) -> AnalyticsResult<bool> {
        self.ensure_unlocked("remove a follow")?;
        let source_id = self.resolve(source)?;
        let target_id = self.resolve(target)?;

        if !self.outgoing[source_id.index()].shift_remove(&target_id) {
            return Ok(false);
        }
        self.incoming[target_id.index()].shift_remove(&source_id);
        self.follow_count -= 1;
        self.topology_changed(&[source_id, target_id]);
        Ok(true)
    }

    /// Remove an account and every follow touching it
    pub fn remove_account(&mut self, key: &str) -> AnalyticsResult<Account> {
        self.ensure_unlocked("remove an account")?;
        let id = self.resolve(key)?;
        let account = self.accounts[id.index()]
            .take()
            .ok_or_else(|| AnalyticsError::GraphCorrupted(format!("{} indexed but removed", key)))?;
        self.key_index.remove(key);
        self.live_accounts -= 1;

        let following = std::mem::take(&mut self.outgoing[id.index()]);
        let followers = std::mem::take(&mut self.incoming[id.index()]);
        for target in &following {
            self.incoming[target.index()].shift_remove(&id);
        }
        for source in &followers {
            self.outgoing[source.index()].shift_remove(&id);
        }
        self.follow_count -= following.len() + followers.len();

        // Labels naming the removed account fall back to singletons
        for other in self.accounts.iter_mut().flatten() {
            if other.attributes.community_id == Some(id) {
                other.attributes.community_id = Some(other.id);
            }
        }

        let touched: Vec<NodeId> = following.into_iter().chain(followers).collect();
        self.topology_changed(&touched);
        debug!(account = %key, "removed account");
        Ok(account)
    }

    /// Bookkeeping shared by every structural mutation
    fn topology_changed(&mut self, touched: &[NodeId]) {
        self.topology_version += 1;
        self.topology_cache = OnceLock::new();

        for id in touched {
            if let Some(account) = self.accounts[id.index()].as_mut() {
                account.attributes.clear_degree();
            }
        }
        if self.bottleneck_outputs_present {
            self.clear_bottleneck_outputs();
        }
    }

    fn clear_bottleneck_outputs(&mut self) {
        for account in self.accounts.iter_mut().flatten() {
            account.attributes.clear_bottleneck_outputs();
        }
        self.bottleneck_outputs_present = false;
        self.ledger.forget(Stage::Bottleneck);
    }

    pub fn account(&self, key: &str) -> Option<&Account> {
        self.key_index.get(key).and_then(|id| self.account_by_id(*id))
    }

    pub fn account_by_id(&self, id: NodeId) -> Option<&Account> {
        self.accounts.get(id.index()).and_then(Option::as_ref)
    }

    pub fn has_account(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    /// Live accounts in handle order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.iter().flatten()
    }

    /// Every follow, grouped by follower in handle order
    pub fn follows(&self) -> impl Iterator<Item = Follows> + '_ {
        self.outgoing.iter().enumerate().flat_map(|(idx, targets)| {
            let source = NodeId::new(idx as u64);
            targets.iter().map(move |&target| Follows::new(source, target))
        })
    }

    pub fn has_follow(&self, source: &str, target: &str) -> bool {
        match (self.key_index.get(source), self.key_index.get(target)) {
            (Some(s), Some(t)) => self.outgoing[s.index()].contains(t),
            _ => false,
        }
    }

    pub fn account_count(&self) -> usize {
        self.live_accounts
    }

    pub fn follow_count(&self) -> usize {
        self.follow_count
    }

    /// Number of accounts `id` follows
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.outgoing.get(id.index()).map(IndexSet::len).unwrap_or(0)
    }

    /// Number of followers of `id`
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.incoming.get(id.index()).map(IndexSet::len).unwrap_or(0)
    }

    /// Distinct neighbour handles of `id`; empty for unknown handles
    pub fn neighbor_ids(&self, id: NodeId, direction: Direction) -> Box<dyn Iterator<Item = NodeId> + '_> {
        let (Some(out), Some(inc)) = (self.outgoing.get(id.index()), self.incoming.get(id.index())) else {
            return Box::new(std::iter::empty());
        };
        match direction {
            Direction::Out => Box::new(out.iter().copied()),
            Direction::In => Box::new(inc.iter().copied()),
            Direction::Both => Box::new(
                out.iter()
                    .copied()
                    .chain(inc.iter().copied().filter(move |n| !out.contains(n))),
            ),
        }
    }

    /// Distinct neighbour keys of an account
    pub fn neighbors(
        &self,
        key: &str,
        direction: Direction,
    ) -> AnalyticsResult<impl Iterator<Item = &AccountId> + '_> {
        let id = self.resolve(key)?;
        Ok(self
            .neighbor_ids(id, direction)
            .filter_map(move |n| self.account_by_id(n).map(|a| &a.key)))
    }

    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    pub fn ledger(&self) -> &StageLedger {
        &self.ledger
    }

    /// Whether a pipeline run currently holds the write lease
    pub fn is_locked(&self) -> bool {
        self.active_lease.is_some()
    }

    /// Name of the current lease holder, if any
    pub fn lease_holder(&self) -> Option<&str> {
        self.active_lease.as_ref().map(|lease| lease.holder.as_str())
    }

    fn build_topology(&self) -> AnalyticsResult<CachedTopology> {
        let live: Vec<&Account> = self.accounts().collect();
        let index_to_node: Vec<u64> = live.iter().map(|a| a.id.as_u64()).collect();
        let keys: Vec<AccountId> = live.iter().map(|a| a.key.clone()).collect();

        let mut dense = vec![usize::MAX; self.accounts.len()];
        for (idx, account) in live.iter().enumerate() {
            dense[account.id.index()] = idx;
        }

        let mut outgoing = Vec::with_capacity(live.len());
        for account in &live {
            let mut targets = Vec::with_capacity(self.outgoing[account.id.index()].len());
            for target in &self.outgoing[account.id.index()] {
                match dense.get(target.index()) {
                    Some(&idx) if idx != usize::MAX => targets.push(idx),
                    _ => {
                        return Err(AnalyticsError::GraphCorrupted(format!(
                            "follow {} -> {} references a missing account",
                            account.key, target
                        )))
                    }
                }
            }
            outgoing.push(targets);
        }

        let view = GraphView::from_adjacency_list(index_to_node, outgoing)?;
        Ok(CachedTopology {
            view: Arc::new(view),
            keys: Arc::new(keys),
        })
    }

    /// Take a read-only snapshot of topology and attributes
    ///
    /// The topology part is shared between snapshots until the next
    /// structural mutation.
    pub fn snapshot(&self) -> AnalyticsResult<GraphSnapshot> {
        let (view, keys) = match self.topology_cache.get() {
            Some(cached) => (Arc::clone(&cached.view), Arc::clone(&cached.keys)),
            None => {
                let built = self.build_topology()?;
                let pair = (Arc::clone(&built.view), Arc::clone(&built.keys));
                // A concurrent reader may have won the race; either copy is identical
                let _ = self.topology_cache.set(built);
                pair
            }
        };

        Ok(GraphSnapshot {
            view,
            keys,
            attributes: self.accounts().map(|a| a.attributes.clone()).collect(),
            topology_version: self.topology_version,
            ledger: self.ledger.clone(),
        })
    }

    fn check_community_label(&self, key: &str, patch: &AttributePatch) -> AnalyticsResult<()> {
        match patch.community_id {
            Some(label) if self.account_by_id(label).is_none() => Err(AnalyticsError::InvalidAttribute {
                account: key.to_string(),
                field: "community_id",
                reason: format!("{} is not a live account", label),
            }),
            _ => Ok(()),
        }
    }

    /// Apply a validated partial update to one account
    ///
    /// Every bottleneck score depends on the global PageRank and betweenness
    /// maxima and on neighbouring communities, so changing any of those
    /// inputs drops the bottleneck outputs of all accounts.
    pub fn write_attributes(&mut self, key: &str, patch: &AttributePatch) -> AnalyticsResult<()> {
        self.ensure_unlocked("write attributes")?;
        let id = self.resolve(key)?;
        patch.validate(key)?;
        self.check_community_label(key, patch)?;

        let now = chrono::Utc::now().timestamp_millis();
        let account = self.accounts[id.index()]
            .as_mut()
            .ok_or_else(|| AnalyticsError::GraphCorrupted(format!("{} indexed but removed", key)))?;
        patch.apply(&mut account.attributes);
        account.touch(now);

        if patch.pagerank.is_some() || patch.betweenness_centrality.is_some() || patch.community_id.is_some() {
            self.clear_bottleneck_outputs();
        } else if patch.touches_bottleneck_outputs() {
            self.bottleneck_outputs_present = true;
        }
        Ok(())
    }

    pub(crate) fn acquire_lease(&mut self, holder: &str) -> AnalyticsResult<u64> {
        if let Some(active) = &self.active_lease {
            return Err(AnalyticsError::PipelineBusy(format!(
                "{} holds the write lease since {}",
                active.holder, active.acquired_at
            )));
        }
        let id = self.next_lease_id;
        self.next_lease_id += 1;
        self.active_lease = Some(ActiveLease {
            id,
            holder: holder.to_string(),
            acquired_at: chrono::Utc::now().timestamp_millis(),
        });
        debug!(lease = id, holder, "write lease acquired");
        Ok(id)
    }

    pub(crate) fn release_lease(&mut self, id: u64) {
        if self.active_lease.as_ref().map(|lease| lease.id) == Some(id) {
            self.active_lease = None;
            debug!(lease = id, "write lease released");
        }
    }

    /// Commit one stage's output atomically
    ///
    /// The whole batch is checked before anything is applied, so a rejected
    /// commit leaves every account untouched. `topology_version` is the
    /// version of the snapshot the values were computed from.
    pub fn commit_stage(
        &mut self,
        lease: &WriteLease,
        stage: Stage,
        patches: Vec<(NodeId, AttributePatch)>,
        topology_version: u64,
    ) -> AnalyticsResult<usize> {
        match &self.active_lease {
            Some(active) if active.id == lease.id() => {}
            _ => {
                return Err(AnalyticsError::GraphLocked(format!(
                    "{} commit requires the active write lease",
                    stage
                )))
            }
        }
        if topology_version != self.topology_version {
            return Err(AnalyticsError::GraphCorrupted(format!(
                "{} computed from topology version {} but graph is at {}",
                stage, topology_version, self.topology_version
            )));
        }

        for (id, patch) in &patches {
            let account = self.account_by_id(*id).ok_or_else(|| {
                AnalyticsError::GraphCorrupted(format!("{} output references missing account {}", stage, id))
            })?;
            patch.validate(account.key.as_str())?;
            self.check_community_label(account.key.as_str(), patch)?;
        }

        if stage.invalidates_bottleneck() && self.bottleneck_outputs_present {
            self.clear_bottleneck_outputs();
        }

        let now = chrono::Utc::now().timestamp_millis();
        let written = patches.len();
        for (id, patch) in patches {
            if let Some(account) = self.accounts[id.index()].as_mut() {
                patch.apply(&mut account.attributes);
                account.touch(now);
            }
        }
        if stage == Stage::Bottleneck {
            self.bottleneck_outputs_present = written > 0;
        }
        self.ledger.record(stage, topology_version, now);
        debug!(stage = %stage, written, topology_version, "stage committed");
        Ok(written)
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SharedGraph;

    fn store_with(keys: &[&str], follows: &[(&str, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        for key in keys {
            store.add_account(*key, PropertyMap::new()).unwrap();
        }
        for (s, t) in follows {
            store.add_follow(s, t).unwrap();
        }
        store
    }

    #[test]
    fn test_add_and_get_account() {
        let mut store = GraphStore::new();
        let id = store.add_account("alice", PropertyMap::new()).unwrap();
        assert_eq!(store.account_count(), 1);
        assert_eq!(store.resolve("alice").unwrap(), id);
        assert_eq!(store.account("alice").unwrap().id, id);
        assert_eq!(store.account("alice").unwrap().attributes.community_id, Some(id));
    }

    #[test]
    fn test_duplicate_account() {
        let mut store = store_with(&["a"], &[]);
        let err = store.add_account("a", PropertyMap::new()).unwrap_err();
        assert_eq!(err, AnalyticsError::DuplicateAccount("a".to_string()));
    }

    #[test]
    fn test_follow_validation() {
        let mut store = store_with(&["a", "b"], &[]);
        assert_eq!(
            store.add_follow("a", "zed").unwrap_err(),
            AnalyticsError::InvalidReference("zed".to_string())
        );
        assert_eq!(
            store.add_follow("a", "a").unwrap_err(),
            AnalyticsError::SelfLoop("a".to_string())
        );
        assert_eq!(store.follow_count(), 0);
    }

    #[test]
    fn test_duplicate_follows_collapse() {
        let mut store = store_with(&["a", "b"], &[]);
        assert!(store.add_follow("a", "b").unwrap());
        assert!(!store.add_follow("a", "b").unwrap());
        assert!(store.add_follow("b", "a").unwrap());
        assert_eq!(store.follow_count(), 2);
        assert!(store.has_follow("a", "b"));
    }

    #[test]
    fn test_neighbors_by_direction() {
        let store = store_with(&["a", "b", "c"], &[("a", "b"), ("c", "a"), ("b", "a")]);

        let out: Vec<&str> = store.neighbors("a", Direction::Out).unwrap().map(|k| k.as_str()).collect();
        assert_eq!(out, vec!["b"]);
        let inc: Vec<&str> = store.neighbors("a", Direction::In).unwrap().map(|k| k.as_str()).collect();
        assert_eq!(inc, vec!["c", "b"]);
        let both: Vec<&str> = store.neighbors("a", Direction::Both).unwrap().map(|k| k.as_str()).collect();
        assert_eq!(both, vec!["b", "c"]);

        assert!(store.neighbors("nobody", Direction::Both).is_err());
    }

    #[test]
    fn test_remove_follow_and_account() {
        let mut store = store_with(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
        assert!(store.remove_follow("a", "b").unwrap());
        assert!(!store.remove_follow("a", "b").unwrap());
        assert_eq!(store.follow_count(), 2);

        let removed = store.remove_account("b").unwrap();
        assert_eq!(removed.key.as_str(), "b");
        assert_eq!(store.account_count(), 2);
        assert_eq!(store.follow_count(), 0);
        assert!(store.account("b").is_none());
        assert_eq!(store.in_degree(store.resolve("c").unwrap()), 0);

        // Handles are not reused
        let d = store.add_account("d", PropertyMap::new()).unwrap();
        assert_eq!(d, NodeId::new(3));
    }

    #[test]
    fn test_removed_community_label_falls_back() {
        let mut store = store_with(&["a", "b"], &[("a", "b")]);
        let a = store.resolve("a").unwrap();
        let patch = AttributePatch {
            community_id: Some(a),
            ..Default::default()
        };
        store.write_attributes("b", &patch).unwrap();
        store.remove_account("a").unwrap();
        let b = store.account("b").unwrap();
        assert_eq!(b.attributes.community_id, Some(b.id));
    }

    #[test]
    fn test_snapshot_view_is_dense_and_shared() {
        let mut store = store_with(&["a", "b", "c"], &[("a", "b"), ("c", "b")]);
        store.remove_account("a").unwrap();

        let first = store.snapshot().unwrap();
        assert_eq!(first.node_count(), 2);
        assert_eq!(first.keys.as_slice(), &[AccountId::from("b"), AccountId::from("c")]);
        assert_eq!(first.view.in_degree(0), 1);
        assert_eq!(first.node_id(1), NodeId::new(2));

        let second = store.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first.view, &second.view));

        store.add_follow("b", "c").unwrap();
        let third = store.snapshot().unwrap();
        assert!(!Arc::ptr_eq(&first.view, &third.view));
        assert_eq!(third.topology_version, first.topology_version + 1);
    }

    #[test]
    fn test_write_attributes_validates() {
        let mut store = store_with(&["a"], &[]);
        let bad = AttributePatch {
            bottleneck_score: Some(3.0),
            ..Default::default()
        };
        assert_eq!(store.write_attributes("a", &bad).unwrap_err().kind(), "invalid_attribute");

        let dangling = AttributePatch {
            community_id: Some(NodeId::new(99)),
            ..Default::default()
        };
        assert!(store.write_attributes("a", &dangling).is_err());

        let good = AttributePatch {
            pagerank: Some(0.3),
            ..Default::default()
        };
        store.write_attributes("a", &good).unwrap();
        assert_eq!(store.account("a").unwrap().attributes.pagerank, Some(0.3));
    }

    #[test]
    fn test_structural_mutation_clears_bottleneck_outputs() {
        let mut store = store_with(&["a", "b"], &[("a", "b")]);
        let patch = AttributePatch {
            out_degree: Some(1),
            bottleneck_score: Some(0.6),
            bridge_score: Some(0.2),
            is_bottleneck: Some(true),
            ..Default::default()
        };
        store.write_attributes("a", &patch).unwrap();

        store.add_follow("b", "a").unwrap();
        let attrs = &store.account("a").unwrap().attributes;
        assert_eq!(attrs.bottleneck_score, None);
        assert_eq!(attrs.is_bottleneck, None);
        // Degree cache of the endpoints is invalidated too
        assert_eq!(attrs.out_degree, None);
    }

    #[test]
    fn test_score_input_write_clears_every_bottleneck_output() {
        use crate::pipeline::{PipelineOrchestrator, RunOptions};
        use crate::AnalyticsConfig;

        let graph = SharedGraph::new(store_with(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]));
        let orchestrator = PipelineOrchestrator::new(graph.clone(), AnalyticsConfig::default()).unwrap();
        assert!(orchestrator.run_all(&RunOptions::default()).is_completed());

        let mut store = graph.write().unwrap();
        assert!(store.accounts().all(|a| a.attributes.bottleneck_score.is_some()));
        assert!(store.ledger().last(Stage::Bottleneck).is_some());

        let patch = AttributePatch {
            pagerank: Some(1000.0),
            ..Default::default()
        };
        store.write_attributes("a", &patch).unwrap();

        for account in store.accounts() {
            assert_eq!(account.attributes.bottleneck_score, None, "{}", account.key);
            assert_eq!(account.attributes.bridge_score, None, "{}", account.key);
            assert_eq!(account.attributes.is_bottleneck, None, "{}", account.key);
        }
        assert!(store.ledger().last(Stage::Bottleneck).is_none());
        // Upstream stages stay fresh
        assert!(store.ledger().last(Stage::PageRank).is_some());
    }

    #[test]
    fn test_lease_blocks_mutation_and_commit_is_atomic() {
        let graph = SharedGraph::new(store_with(&["a", "b"], &[("a", "b")]));
        let lease = graph.try_lease("test").unwrap();

        {
            let mut store = graph.write().unwrap();
            assert!(matches!(store.add_follow("b", "a"), Err(AnalyticsError::GraphLocked(_))));
            assert!(matches!(
                store.write_attributes("a", &AttributePatch::default()),
                Err(AnalyticsError::GraphLocked(_))
            ));

            let version = store.topology_version();
            let a = store.resolve("a").unwrap();
            let patches = vec![
                (
                    a,
                    AttributePatch {
                        pagerank: Some(0.2),
                        ..Default::default()
                    },
                ),
                (
                    NodeId::new(42),
                    AttributePatch {
                        pagerank: Some(0.2),
                        ..Default::default()
                    },
                ),
            ];
            let err = store.commit_stage(&lease, Stage::PageRank, patches, version).unwrap_err();
            assert_eq!(err.kind(), "graph_corrupted");
            assert_eq!(store.account("a").unwrap().attributes.pagerank, None);
            assert!(store.ledger().last(Stage::PageRank).is_none());

            let ok = vec![(
                a,
                AttributePatch {
                    pagerank: Some(0.2),
                    ..Default::default()
                },
            )];
            assert_eq!(store.commit_stage(&lease, Stage::PageRank, ok, version).unwrap(), 1);
            assert!(store.ledger().is_fresh(Stage::PageRank, version));
        }

        drop(lease);
        assert!(!graph.read().unwrap().is_locked());
        assert!(graph.write().unwrap().add_follow("b", "a").unwrap());
    }
}
