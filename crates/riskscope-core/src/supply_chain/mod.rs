pub mod depsdev;

use crate::error::ScanError;
use crate::extractor::{Dependency, Ecosystem};
use async_trait::async_trait;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::warn;

/// Identity key for a graph node.
pub fn node_key(ecosystem: Ecosystem, name: &str, version: &str) -> String {
    format!("{}:{}@{}", ecosystem, name, version)
}

/// A package in the transitive dependency graph. Created once per unique
/// key during expansion; later discoveries of the same key are dropped.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyNode {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
    /// 0 = direct dependency of the scanned repository.
    pub depth: usize,
    /// Ordered package names from a root dependency to this node.
    pub path: Vec<String>,
    /// Written back externally by the owner, never by the builder.
    pub is_vulnerable: Option<bool>,
    pub vulnerability_count: Option<usize>,
    pub risk_score: Option<f64>,
}

impl DependencyNode {
    pub fn key(&self) -> String {
        node_key(self.ecosystem, &self.name, &self.version)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GraphStats {
    pub total_deps: usize,
    pub direct_deps: usize,
    pub transitive_deps: usize,
    pub max_depth: usize,
    pub vulnerable_count: usize,
    pub avg_risk_score: f64,
}

/// The expanded supply-chain graph: a directed graph keyed by
/// `ecosystem:name@version` with derived stats.
#[derive(Debug, Clone)]
pub struct SupplyChainGraph {
    pub root: String,
    pub graph: DiGraph<DependencyNode, ()>,
    pub node_map: HashMap<String, NodeIndex>,
    pub stats: GraphStats,
}

impl SupplyChainGraph {
    fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            stats: GraphStats::default(),
        }
    }

    fn insert_node(&mut self, node: DependencyNode) -> NodeIndex {
        let key = node.key();
        let idx = self.graph.add_node(node);
        self.node_map.insert(key, idx);
        idx
    }

    fn add_edge(&mut self, from_key: &str, to_key: &str) {
        if let (Some(&from), Some(&to)) =
            (self.node_map.get(from_key), self.node_map.get(to_key))
        {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.node_map.contains_key(key)
    }

    pub fn node(&self, key: &str) -> Option<&DependencyNode> {
        self.node_map.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.graph.node_weights()
    }

    /// Edges as (from key, to key) pairs, in insertion order.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((self.graph[from].key(), self.graph[to].key()))
            })
            .collect()
    }

    /// External write-back of resolver output onto one node. Returns false
    /// when the key is not in the graph.
    pub fn mark_vulnerability(&mut self, key: &str, count: usize, risk_score: f64) -> bool {
        let Some(&idx) = self.node_map.get(key) else {
            return false;
        };
        let node = &mut self.graph[idx];
        node.is_vulnerable = Some(count > 0);
        node.vulnerability_count = Some(count);
        node.risk_score = Some(risk_score);
        true
    }

    /// Read-only serializable view for collaborators.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            root: self.root.clone(),
            nodes: self.nodes().cloned().collect(),
            edges: self.edges(),
            stats: self.stats,
        }
    }

    /// Re-derive stats from the current node set. Called by the builder
    /// after expansion and by owners after vulnerability write-backs.
    pub fn recompute_stats(&mut self) {
        let total_deps = self.graph.node_count();
        let direct_deps = self.nodes().filter(|n| n.depth == 0).count();
        let max_depth = self.nodes().map(|n| n.depth).max().unwrap_or(0);

        let vulnerable: Vec<&DependencyNode> = self
            .nodes()
            .filter(|n| n.is_vulnerable == Some(true))
            .collect();
        let avg_risk_score = if vulnerable.is_empty() {
            0.0
        } else {
            vulnerable
                .iter()
                .map(|n| n.risk_score.unwrap_or(0.0))
                .sum::<f64>()
                / vulnerable.len() as f64
        };

        self.stats = GraphStats {
            total_deps,
            direct_deps,
            transitive_deps: total_deps - direct_deps,
            max_depth,
            vulnerable_count: vulnerable.len(),
            avg_risk_score,
        };
    }
}

/// Flattened, serializable form of a [`SupplyChainGraph`].
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub root: String,
    pub nodes: Vec<DependencyNode>,
    pub edges: Vec<(String, String)>,
    pub stats: GraphStats,
}

/// A package reference returned by the metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
}

/// External package-metadata seam: the direct children of one package
/// version.
#[async_trait]
pub trait PackageMetadataProvider: Send + Sync {
    async fn direct_dependencies(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        version: &str,
    ) -> Result<Vec<PackageRef>, ScanError>;
}

#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub max_depth: usize,
    /// Queue items expanded concurrently per level batch.
    pub parallelism: usize,
    /// Pause between level batches, as rate-limit courtesy.
    pub level_delay: Duration,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            parallelism: 3,
            level_delay: Duration::from_millis(100),
        }
    }
}

/// Expands direct dependencies into a depth-bounded transitive graph.
pub struct GraphBuilder<P> {
    provider: P,
    options: GraphOptions,
}

impl<P: PackageMetadataProvider> GraphBuilder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: GraphOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    /// Level-batched breadth-first expansion.
    ///
    /// Each iteration drains up to `parallelism` queue items, fetches their
    /// children concurrently, and merges after the whole batch settles. A
    /// key seen twice gets the extra edge but keeps the node and depth of
    /// its first discovery; that is the cycle and diamond guard. A failed
    /// metadata fetch contributes no children and is not retried.
    pub async fn build(&self, root: &str, direct: &[Dependency]) -> SupplyChainGraph {
        let mut graph = SupplyChainGraph::new(root);
        let mut queue: VecDeque<String> = VecDeque::new();

        for dep in direct {
            let key = node_key(dep.ecosystem, &dep.name, &dep.version);
            if graph.contains(&key) {
                continue;
            }
            graph.insert_node(DependencyNode {
                name: dep.name.clone(),
                version: dep.version.clone(),
                ecosystem: dep.ecosystem,
                depth: 0,
                path: vec![dep.name.clone()],
                is_vulnerable: None,
                vulnerability_count: None,
                risk_score: None,
            });
            queue.push_back(key);
        }

        let mut depth = 0;
        let mut first_batch = true;
        while !queue.is_empty() && depth < self.options.max_depth {
            depth += 1;
            if !first_batch {
                tokio::time::sleep(self.options.level_delay).await;
            }
            first_batch = false;

            let batch: Vec<DependencyNode> = (0..self.options.parallelism.max(1))
                .map_while(|_| queue.pop_front())
                .filter_map(|key| graph.node(&key).cloned())
                .collect();

            let settled = futures::future::join_all(batch.iter().map(|parent| {
                self.provider
                    .direct_dependencies(parent.ecosystem, &parent.name, &parent.version)
            }))
            .await;

            for (parent, result) in batch.iter().zip(settled) {
                let children = match result {
                    Ok(children) => children,
                    Err(e) => {
                        warn!("metadata fetch failed for {}: {}", parent.key(), e);
                        continue;
                    }
                };
                let parent_key = parent.key();
                for child in children {
                    let child_key = node_key(child.ecosystem, &child.name, &child.version);
                    if !graph.contains(&child_key) {
                        let mut path = parent.path.clone();
                        path.push(child.name.clone());
                        graph.insert_node(DependencyNode {
                            name: child.name,
                            version: child.version,
                            ecosystem: child.ecosystem,
                            depth,
                            path,
                            is_vulnerable: None,
                            vulnerability_count: None,
                            risk_score: None,
                        });
                        if depth < self.options.max_depth {
                            queue.push_back(child_key.clone());
                        }
                    }
                    graph.add_edge(&parent_key, &child_key);
                }
            }
        }

        graph.recompute_stats();
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stub provider backed by a fixed child table.
    struct StubMetadata {
        children: HashMap<String, Vec<PackageRef>>,
        fail_for: Option<String>,
    }

    impl StubMetadata {
        fn new(table: &[(&str, &[(&str, &str)])]) -> Self {
            let mut children = HashMap::new();
            for (parent, kids) in table {
                children.insert(
                    parent.to_string(),
                    kids.iter()
                        .map(|(name, version)| PackageRef {
                            name: name.to_string(),
                            version: version.to_string(),
                            ecosystem: Ecosystem::Npm,
                        })
                        .collect(),
                );
            }
            Self {
                children,
                fail_for: None,
            }
        }
    }

    #[async_trait]
    impl PackageMetadataProvider for StubMetadata {
        async fn direct_dependencies(
            &self,
            _ecosystem: Ecosystem,
            name: &str,
            _version: &str,
        ) -> Result<Vec<PackageRef>, ScanError> {
            if self.fail_for.as_deref() == Some(name) {
                return Err(ScanError::Api {
                    service: "stub",
                    status: 500,
                });
            }
            Ok(self.children.get(name).cloned().unwrap_or_default())
        }
    }

    fn direct(name: &str) -> Dependency {
        Dependency {
            name: name.into(),
            version: "1.0.0".into(),
            ecosystem: Ecosystem::Npm,
            is_dev: false,
            source: "package.json".into(),
        }
    }

    fn fast_options(max_depth: usize) -> GraphOptions {
        GraphOptions {
            max_depth,
            parallelism: 3,
            level_delay: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn test_chain_expansion_depths() {
        let stub = StubMetadata::new(&[
            ("a", &[("b", "1.0.0")]),
            ("b", &[("c", "1.0.0")]),
        ]);
        let builder = GraphBuilder::new(stub).with_options(fast_options(3));
        let graph = builder.build("repo", &[direct("a")]).await;

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node("npm:a@1.0.0").unwrap().depth, 0);
        assert_eq!(graph.node("npm:b@1.0.0").unwrap().depth, 1);
        let c = graph.node("npm:c@1.0.0").unwrap();
        assert_eq!(c.depth, 2);
        assert_eq!(c.path, vec!["a", "b", "c"]);
        assert_eq!(graph.stats.total_deps, 3);
        assert_eq!(graph.stats.direct_deps, 1);
        assert_eq!(graph.stats.transitive_deps, 2);
        assert_eq!(graph.stats.max_depth, 2);
    }

    #[tokio::test]
    async fn test_depth_cap_links_but_does_not_expand() {
        let stub = StubMetadata::new(&[
            ("a", &[("b", "1.0.0")]),
            ("b", &[("c", "1.0.0")]),
            ("c", &[("d", "1.0.0")]),
        ]);
        let builder = GraphBuilder::new(stub).with_options(fast_options(2));
        let graph = builder.build("repo", &[direct("a")]).await;

        // c enters at the cap and is linked, d is never fetched.
        assert!(graph.contains("npm:c@1.0.0"));
        assert!(!graph.contains("npm:d@1.0.0"));
        assert!(graph.nodes().all(|n| n.depth <= 2));
    }

    #[tokio::test]
    async fn test_diamond_yields_one_node_two_edges() {
        let stub = StubMetadata::new(&[
            ("left", &[("shared", "1.0.0")]),
            ("right", &[("shared", "1.0.0")]),
        ]);
        let builder = GraphBuilder::new(stub).with_options(fast_options(3));
        let graph = builder
            .build("repo", &[direct("left"), direct("right")])
            .await;

        assert_eq!(graph.node_count(), 3);
        let shared_edges = graph
            .edges()
            .iter()
            .filter(|(_, to)| to == "npm:shared@1.0.0")
            .count();
        assert_eq!(shared_edges, 2);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let stub = StubMetadata::new(&[
            ("a", &[("b", "1.0.0")]),
            ("b", &[("a", "1.0.0")]),
        ]);
        let builder = GraphBuilder::new(stub).with_options(fast_options(5));
        let graph = builder.build("repo", &[direct("a")]).await;

        assert_eq!(graph.node_count(), 2);
        // Back edge recorded, node not re-inserted.
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node("npm:a@1.0.0").unwrap().depth, 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_contributes_no_children() {
        let mut stub = StubMetadata::new(&[("a", &[("b", "1.0.0")])]);
        stub.fail_for = Some("a".to_string());
        let builder = GraphBuilder::new(stub).with_options(fast_options(3));
        let graph = builder.build("repo", &[direct("a")]).await;

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_deterministic_given_stable_responses() {
        let table: &[(&str, &[(&str, &str)])] = &[
            ("a", &[("b", "1.0.0"), ("c", "1.0.0")]),
            ("b", &[("c", "1.0.0")]),
        ];
        let first = GraphBuilder::new(StubMetadata::new(table))
            .with_options(fast_options(3))
            .build("repo", &[direct("a")])
            .await;
        let second = GraphBuilder::new(StubMetadata::new(table))
            .with_options(fast_options(3))
            .build("repo", &[direct("a")])
            .await;

        assert_eq!(first.node_count(), second.node_count());
        assert_eq!(first.edges(), second.edges());
    }

    #[tokio::test]
    async fn test_edge_endpoints_always_present() {
        let stub = StubMetadata::new(&[
            ("a", &[("b", "1.0.0")]),
            ("b", &[("c", "1.0.0")]),
            ("c", &[("a", "1.0.0")]),
        ]);
        let builder = GraphBuilder::new(stub).with_options(fast_options(2));
        let graph = builder.build("repo", &[direct("a")]).await;

        for (from, to) in graph.edges() {
            assert!(graph.contains(&from));
            assert!(graph.contains(&to));
        }
        assert_eq!(graph.node_count(), graph.stats.total_deps);
    }

    #[tokio::test]
    async fn test_mark_vulnerability_and_stats() {
        let stub = StubMetadata::new(&[("a", &[("b", "1.0.0")])]);
        let builder = GraphBuilder::new(stub).with_options(fast_options(2));
        let mut graph = builder.build("repo", &[direct("a")]).await;

        assert!(graph.mark_vulnerability("npm:b@1.0.0", 2, 60.0));
        assert!(!graph.mark_vulnerability("npm:ghost@0.0.0", 1, 10.0));
        graph.recompute_stats();

        assert_eq!(graph.stats.vulnerable_count, 1);
        assert_eq!(graph.stats.avg_risk_score, 60.0);
        let b = graph.node("npm:b@1.0.0").unwrap();
        assert_eq!(b.is_vulnerable, Some(true));
        assert_eq!(b.vulnerability_count, Some(2));
    }
}
