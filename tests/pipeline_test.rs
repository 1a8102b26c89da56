use chokepoint::{
    AnalyticsConfig, AnalyticsError, GraphStore, Metric, NodeQuery, PipelineOrchestrator, PipelineState,
    PropertyMap, RunOptions, RunStatus, SharedGraph, Stage,
};
use std::collections::HashMap;

/// Three mutual triangles joined by one-way follows into b1:
/// a3 -> b1 <- c1
fn three_clusters() -> GraphStore {
    let mut store = GraphStore::new();
    let clusters = [["a1", "a2", "a3"], ["b1", "b2", "b3"], ["c1", "c2", "c3"]];
    for cluster in &clusters {
        for key in cluster {
            store.add_account(*key, PropertyMap::new()).unwrap();
        }
    }
    for cluster in &clusters {
        for source in cluster {
            for target in cluster {
                if source != target {
                    store.add_follow(source, target).unwrap();
                }
            }
        }
    }
    store.add_follow("a3", "b1").unwrap();
    store.add_follow("c1", "b1").unwrap();
    store
}

/// Two mutual triangles and a mutual pair joined in a chain:
/// a3 -> b1 -> c1
fn chain_of_clusters() -> GraphStore {
    let mut store = GraphStore::new();
    for key in ["a1", "a2", "a3", "b1", "b2", "b3", "c1", "c2"] {
        store.add_account(key, PropertyMap::new()).unwrap();
    }
    let groups: [&[&str]; 3] = [&["a1", "a2", "a3"], &["b1", "b2", "b3"], &["c1", "c2"]];
    for group in groups {
        for source in group {
            for target in group {
                if source != target {
                    store.add_follow(source, target).unwrap();
                }
            }
        }
    }
    store.add_follow("a3", "b1").unwrap();
    store.add_follow("b1", "c1").unwrap();
    store
}

fn orchestrator(store: GraphStore) -> PipelineOrchestrator {
    PipelineOrchestrator::new(SharedGraph::new(store), AnalyticsConfig::default()).unwrap()
}

fn metric_by_key(orchestrator: &PipelineOrchestrator, metric: Metric) -> HashMap<String, Option<f64>> {
    let store = orchestrator.graph().read().unwrap();
    store
        .accounts()
        .map(|a| (a.key.to_string(), a.attributes.metric(metric)))
        .collect()
}

#[test]
fn test_full_pipeline_finds_the_bridge() {
    let orchestrator = orchestrator(three_clusters());
    let report = orchestrator.run_all(&RunOptions::default());

    assert!(report.is_completed(), "{}", report.message);
    assert_eq!(report.completed, vec!["degree", "pagerank", "betweenness", "louvain", "bottleneck"]);
    assert_eq!(report.stages.len(), 5);
    assert!(report.stages.iter().all(|s| s.nodes_processed == 9));
    assert_eq!(orchestrator.state(), PipelineState::Idle);

    let community = report.stage(Stage::Community).unwrap();
    assert_eq!(community.summary["communities_found"], 3);

    let store = orchestrator.graph().read().unwrap();
    for (member, label) in [("a2", "a1"), ("a3", "a1"), ("b3", "b1"), ("c1", "c1"), ("c3", "c1")] {
        let member = store.account(member).unwrap();
        assert_eq!(member.community(), store.resolve(label).unwrap());
    }

    let bridge = |key: &str| store.account(key).unwrap().attributes.bridge_score.unwrap();
    assert_eq!(bridge("b1"), 0.4);
    assert_eq!(bridge("a3"), 0.2);
    assert_eq!(bridge("c1"), 0.2);
    for key in ["a1", "a2", "b2", "b3", "c2", "c3"] {
        assert_eq!(bridge(key), 0.0);
    }

    let b1 = &store.account("b1").unwrap().attributes;
    assert_eq!(b1.out_degree, Some(2));
    assert_eq!(b1.in_degree, Some(4));
    assert_eq!(b1.is_bottleneck, Some(true));
    drop(store);

    let top = NodeQuery::top_bottlenecks(1).run(orchestrator.graph()).unwrap();
    assert_eq!(top[0].key.as_str(), "b1");
    assert_eq!(top[0].community.as_str(), "b1");
}

#[test]
fn test_chain_of_clusters_scores_the_links() {
    let orchestrator = orchestrator(chain_of_clusters());
    let report = orchestrator.run_all(&RunOptions::default());
    assert!(report.is_completed(), "{}", report.message);
    assert_eq!(report.stage(Stage::Community).unwrap().summary["communities_found"], 3);

    let store = orchestrator.graph().read().unwrap();
    for (member, label) in [("a3", "a1"), ("b2", "b1"), ("b3", "b1"), ("c2", "c1")] {
        assert_eq!(store.account(member).unwrap().community(), store.resolve(label).unwrap());
    }
    assert_ne!(store.account("b1").unwrap().community(), store.account("c1").unwrap().community());
    drop(store);

    let bridges = metric_by_key(&orchestrator, Metric::BridgeScore);
    assert_eq!(bridges["b1"], Some(0.4));
    assert_eq!(bridges["a3"], Some(0.2));
    assert_eq!(bridges["c1"], Some(0.2));
    for key in ["a1", "a2", "b2", "b3", "c2"] {
        assert_eq!(bridges[key], Some(0.0), "{}", key);
    }
}

#[test]
fn test_scores_are_bounded() {
    let orchestrator = orchestrator(three_clusters());
    assert!(orchestrator.run_all(&RunOptions::default()).is_completed());

    let store = orchestrator.graph().read().unwrap();
    for account in store.accounts() {
        let attrs = &account.attributes;
        let score = attrs.bottleneck_score.unwrap();
        assert!((0.0..=1.0 + 1e-9).contains(&score), "{}: {}", account.key, score);
        assert!(attrs.pagerank.unwrap() >= 0.15 - 1e-12);
        assert!(attrs.betweenness_centrality.unwrap() <= 0.25);
        assert_eq!(attrs.is_bottleneck, Some(score > 0.5));
    }
}

#[test]
fn test_rerun_is_deterministic() {
    let first = orchestrator(three_clusters());
    let second = orchestrator(three_clusters());
    assert!(first.run_all(&RunOptions::default()).is_completed());
    assert!(second.run_all(&RunOptions::default()).is_completed());

    for metric in [Metric::PageRank, Metric::Betweenness, Metric::BottleneckScore] {
        assert_eq!(metric_by_key(&first, metric), metric_by_key(&second, metric));
    }

    // Running again over an unchanged graph reproduces the same values
    let before = metric_by_key(&first, Metric::BottleneckScore);
    assert!(first.run_all(&RunOptions::default()).is_completed());
    assert_eq!(metric_by_key(&first, Metric::BottleneckScore), before);
}

#[test]
fn test_bottleneck_without_dependencies_writes_nothing() {
    let orchestrator = orchestrator(three_clusters());
    let report = orchestrator.run_algorithm("bottleneck", &RunOptions::default());

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.error_kind, Some("missing_dependency"));
    assert!(!report.retryable);
    assert!(matches!(
        report.error,
        Some(AnalyticsError::MissingDependency {
            stage: Stage::Bottleneck,
            ..
        })
    ));
    assert!(matches!(
        orchestrator.state(),
        PipelineState::Failed {
            stage: Stage::Bottleneck,
            ..
        }
    ));

    let scores = metric_by_key(&orchestrator, Metric::BottleneckScore);
    assert!(scores.values().all(Option::is_none));
    assert!(!orchestrator.graph().read().unwrap().is_locked());
}

#[test]
fn test_bottleneck_needs_betweenness_too() {
    let orchestrator = orchestrator(three_clusters());
    assert!(orchestrator.run_algorithm("pagerank", &RunOptions::default()).is_completed());

    let report = orchestrator.run_algorithm("bottleneck", &RunOptions::default());
    match report.error {
        Some(AnalyticsError::MissingDependency { missing, .. }) => assert_eq!(missing, Stage::Betweenness),
        other => panic!("expected missing betweenness, got {:?}", other),
    }

    assert!(orchestrator.run_algorithm("betweenness", &RunOptions::default()).is_completed());
    let report = orchestrator.run_algorithm("bottleneck", &RunOptions::default());
    assert!(report.is_completed(), "{}", report.message);
    // Communities never ran, so every account is its own community
    assert_eq!(report.summary["communities_current"], false);
}

#[test]
fn test_topology_change_makes_inputs_stale() {
    let graph = SharedGraph::new(three_clusters());
    let orchestrator = PipelineOrchestrator::new(graph.clone(), AnalyticsConfig::default()).unwrap();
    assert!(orchestrator.run_all(&RunOptions::default()).is_completed());

    graph.write().unwrap().add_follow("a1", "c2").unwrap();
    {
        let store = graph.read().unwrap();
        assert!(store.accounts().all(|a| a.attributes.bottleneck_score.is_none()));
        assert!(store.accounts().all(|a| a.attributes.is_bottleneck.is_none()));
    }

    let report = orchestrator.run_algorithm("bottleneck", &RunOptions::default());
    assert_eq!(report.error_kind, Some("missing_dependency"));

    assert!(orchestrator.run_all(&RunOptions::default()).is_completed());
    let store = graph.read().unwrap();
    assert!(store.accounts().all(|a| a.attributes.bottleneck_score.is_some()));
}

#[test]
fn test_unknown_algorithm() {
    let orchestrator = orchestrator(three_clusters());
    let report = orchestrator.run_algorithm("eigenvector", &RunOptions::default());

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.algorithm, "eigenvector");
    assert_eq!(report.error_kind, Some("unknown_algorithm"));
    assert_eq!(report.nodes_processed, 0);
    assert_eq!(orchestrator.state(), PipelineState::Idle);
}

#[test]
fn test_algorithm_names_are_case_insensitive() {
    let orchestrator = orchestrator(three_clusters());
    for name in ["PageRank", " degree ", "Louvain", "community"] {
        let report = orchestrator.run_algorithm(name, &RunOptions::default());
        assert!(report.is_completed(), "{}: {}", name, report.message);
    }
}

#[test]
fn test_failure_keeps_earlier_stages() {
    let orchestrator = orchestrator(three_clusters());
    let options = RunOptions::new().with_damping(1.5);

    // Invalid overrides are rejected before any stage runs
    let report = orchestrator.run_all(&options);
    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.completed.is_empty());
    assert!(metric_by_key(&orchestrator, Metric::PageRank).values().all(Option::is_none));

    assert!(orchestrator.run_algorithm("degree", &RunOptions::default()).is_completed());
    let report = orchestrator.run_algorithm("bottleneck", &RunOptions::default());
    assert!(!report.is_completed());

    // The failed bottleneck run left the earlier degree output in place
    let degrees = metric_by_key(&orchestrator, Metric::DegreeCentrality);
    assert!(degrees.values().all(Option::is_some));
}

#[test]
fn test_iteration_override() {
    let orchestrator = orchestrator(three_clusters());
    let report = orchestrator.run_algorithm("pagerank", &RunOptions::new().with_iterations(3));
    assert!(report.is_completed());
    assert_eq!(report.summary["iterations"], 3);

    let report = orchestrator.run_algorithm("louvain", &RunOptions::new().with_iterations(1));
    assert_eq!(report.summary["iterations"], 1);
}

#[test]
fn test_threshold_override_changes_flags_only() {
    let strict = orchestrator(three_clusters());
    let lenient = orchestrator(three_clusters());
    assert!(strict.run_all(&RunOptions::new().with_threshold(0.99)).is_completed());
    assert!(lenient.run_all(&RunOptions::new().with_threshold(0.0)).is_completed());

    assert_eq!(
        metric_by_key(&strict, Metric::BottleneckScore),
        metric_by_key(&lenient, Metric::BottleneckScore)
    );
    let flagged = |o: &PipelineOrchestrator| {
        let store = o.graph().read().unwrap();
        store.accounts().filter(|a| a.attributes.is_bottleneck == Some(true)).count()
    };
    assert_eq!(flagged(&strict), 0);
    assert_eq!(flagged(&lenient), 9);
}

#[test]
fn test_empty_graph() {
    let orchestrator = orchestrator(GraphStore::new());
    let report = orchestrator.run_all(&RunOptions::default());
    assert!(report.is_completed(), "{}", report.message);
    assert!(report.stages.iter().all(|s| s.nodes_processed == 0));
}

#[test]
fn test_isolated_accounts() {
    let mut store = GraphStore::new();
    store.add_account("loner", PropertyMap::new()).unwrap();
    store.add_account("hermit", PropertyMap::new()).unwrap();
    let orchestrator = orchestrator(store);
    assert!(orchestrator.run_all(&RunOptions::default()).is_completed());

    let store = orchestrator.graph().read().unwrap();
    for account in store.accounts() {
        let attrs = &account.attributes;
        assert_eq!(attrs.betweenness_centrality, Some(0.0));
        assert_eq!(attrs.bridge_score, Some(0.0));
        assert_eq!(attrs.community_id, Some(account.id));
        assert!((attrs.pagerank.unwrap() - 0.15).abs() < 1e-12);
    }
}

#[tokio::test]
async fn test_invalidation_events_follow_commits() {
    let (orchestrator, mut rx) = PipelineOrchestrator::new(SharedGraph::new(three_clusters()), AnalyticsConfig::default())
        .unwrap()
        .with_invalidation_channel();
    let orchestrator = std::sync::Arc::new(orchestrator);

    let report = std::sync::Arc::clone(&orchestrator)
        .spawn_run_all(RunOptions::default())
        .await;
    assert!(report.is_completed());

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event.algorithm);
    }
    assert_eq!(seen, Stage::ALL.to_vec());
}
