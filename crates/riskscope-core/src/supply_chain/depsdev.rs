use super::{PackageMetadataProvider, PackageRef};
use crate::error::ScanError;
use crate::extractor::Ecosystem;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.deps.dev/v3";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded lookup cache for package metadata: entries expire after `ttl`
/// and the oldest entry is evicted once `capacity` is reached.
pub struct MetadataCache {
    entries: HashMap<String, (Instant, Vec<PackageRef>)>,
    order: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn get(&mut self, key: &str) -> Option<Vec<PackageRef>> {
        let expired = {
            let (fetched_at, _) = self.entries.get(key)?;
            fetched_at.elapsed() > self.ttl
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(_, children)| children.clone())
    }

    fn insert(&mut self, key: String, children: Vec<PackageRef>) {
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, (Instant::now(), children));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Client for the deps.dev package-metadata service.
pub struct DepsDevClient {
    client: reqwest::Client,
    base_url: String,
    cache: Mutex<MetadataCache>,
}

impl DepsDevClient {
    pub fn new() -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("riskscope/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: Mutex::new(MetadataCache::new(512, Duration::from_secs(600))),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.cache = Mutex::new(MetadataCache::new(capacity, ttl));
        self
    }

    async fn fetch_direct(
        &self,
        system: &str,
        name: &str,
        version: &str,
    ) -> Result<Vec<PackageRef>, ScanError> {
        let url = format!(
            "{}/systems/{}/packages/{}/versions/{}:dependencies",
            self.base_url,
            system,
            encode_segment(name),
            encode_segment(version)
        );
        debug!("querying deps.dev: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ScanError::Api {
                service: "deps.dev",
                status: response.status().as_u16(),
            });
        }
        let body: DependenciesResponse = response.json().await?;

        // Node 0 is the queried package itself; its outgoing edges are the
        // DIRECT relations.
        let children = body
            .edges
            .iter()
            .filter(|edge| edge.from_node == 0)
            .filter_map(|edge| body.nodes.get(edge.to_node))
            .filter_map(|node| {
                let ecosystem = Ecosystem::from_depsdev_system(&node.version_key.system)?;
                Some(PackageRef {
                    name: node.version_key.name.clone(),
                    version: node.version_key.version.clone(),
                    ecosystem,
                })
            })
            .collect();
        Ok(children)
    }
}

#[async_trait]
impl PackageMetadataProvider for DepsDevClient {
    async fn direct_dependencies(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        version: &str,
    ) -> Result<Vec<PackageRef>, ScanError> {
        // Ecosystems the service does not cover expand to leaves.
        let Some(system) = ecosystem.depsdev_system() else {
            return Ok(Vec::new());
        };

        let cache_key = format!("{}:{}@{}", system, name, version);
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&cache_key) {
                return Ok(hit);
            }
        }

        let children = self.fetch_direct(system, name, version).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(cache_key, children.clone());
        }
        Ok(children)
    }
}

/// Percent-encode a URL path segment.
fn encode_segment(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

// Wire types, contract-relevant fields only.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependenciesResponse {
    #[serde(default)]
    nodes: Vec<DependencyNodeEntry>,
    #[serde(default)]
    edges: Vec<DependencyEdgeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyNodeEntry {
    version_key: VersionKey,
    #[serde(default)]
    #[allow(dead_code)]
    relation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyEdgeEntry {
    #[serde(default)]
    from_node: usize,
    #[serde(default)]
    to_node: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionKey {
    system: String,
    name: String,
    version: String,
}
