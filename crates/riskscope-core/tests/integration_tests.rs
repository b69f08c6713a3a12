use async_trait::async_trait;
use riskscope_core::discovery;
use riskscope_core::error::ScanError;
use riskscope_core::extractor::{self, Dependency, Ecosystem};
use riskscope_core::secrets::{scan, ScanMetadata};
use riskscope_core::supply_chain::{
    GraphBuilder, GraphOptions, PackageMetadataProvider, PackageRef,
};
use riskscope_core::vuln::{
    Resolver, ResolverOptions, VulnSeverity, Vulnerability, VulnerabilityProvider,
};
use riskscope_core::{ScanReport, ScanSession};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Workspace root is two levels up from the core crate's manifest dir.
fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .parent()
        .unwrap() // crates/
        .parent()
        .unwrap() // workspace root
        .join("tests/fixtures")
}

fn manifest_fixture(name: &str) -> (String, String) {
    let path = fixtures_dir().join("manifests").join(name);
    let content = std::fs::read_to_string(&path).unwrap();
    (name.to_string(), content)
}

fn content_fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join("content").join(name)).unwrap()
}

// ─── Dependency extraction ───

#[test]
fn test_extract_npm_fixture() {
    let (name, content) = manifest_fixture("package.json");
    let parsed = extractor::extract(&name, &content).unwrap();
    assert_eq!(parsed.ecosystem, Ecosystem::Npm);
    assert_eq!(parsed.dependencies.len(), 5);

    let lodash = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "lodash")
        .unwrap();
    assert_eq!(lodash.version, "4.17.15");
    assert!(!lodash.is_dev);

    let jest = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "jest")
        .unwrap();
    assert!(jest.is_dev);
}

#[test]
fn test_extract_pip_fixture() {
    let (name, content) = manifest_fixture("requirements-dev.txt");
    let parsed = extractor::extract(&name, &content).unwrap();
    assert_eq!(parsed.ecosystem, Ecosystem::PyPi);
    assert_eq!(parsed.dependencies.len(), 4);
    assert!(parsed.dependencies.iter().all(|d| d.is_dev));

    let flask = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "flask")
        .unwrap();
    assert_eq!(flask.version, "2.0.1");
    let black = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "black")
        .unwrap();
    assert_eq!(black.version, "*");
}

#[test]
fn test_extract_go_fixture() {
    let (name, content) = manifest_fixture("go.mod");
    let parsed = extractor::extract(&name, &content).unwrap();
    assert_eq!(parsed.dependencies.len(), 3);
    let mux = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "github.com/gorilla/mux")
        .unwrap();
    assert_eq!(mux.version, "1.8.1");
}

#[test]
fn test_extract_cargo_fixture() {
    let (name, content) = manifest_fixture("Cargo.toml");
    let parsed = extractor::extract(&name, &content).unwrap();
    assert_eq!(parsed.dependencies.len(), 4);
    let tempfile = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "tempfile")
        .unwrap();
    assert!(tempfile.is_dev);
    let serde = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "serde")
        .unwrap();
    assert_eq!(serde.version, "1.0.190");
}

#[test]
fn test_extract_gemfile_fixture() {
    let (name, content) = manifest_fixture("Gemfile");
    let parsed = extractor::extract(&name, &content).unwrap();
    assert_eq!(parsed.dependencies.len(), 4);
    let rspec = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "rspec-rails")
        .unwrap();
    assert!(rspec.is_dev);
    let puma = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "puma")
        .unwrap();
    assert_eq!(puma.version, "*");
}

#[test]
fn test_extract_maven_fixture() {
    let (name, content) = manifest_fixture("pom.xml");
    let parsed = extractor::extract(&name, &content).unwrap();
    assert_eq!(parsed.dependencies.len(), 3);
    let spring = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "org.springframework:spring-core")
        .unwrap();
    assert_eq!(spring.version, "5.3.30");
    let jackson = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "com.fasterxml.jackson.core:jackson-databind")
        .unwrap();
    assert_eq!(jackson.version, "*");
    let junit = parsed
        .dependencies
        .iter()
        .find(|d| d.name == "junit:junit")
        .unwrap();
    assert!(junit.is_dev);
}

// ─── Discovery ───

#[test]
fn test_discover_fixture_tree() {
    let found = discovery::discover(&fixtures_dir()).unwrap();
    assert_eq!(found.manifests.len(), 6);
    assert!(found
        .content_files
        .iter()
        .any(|p| p.ends_with("app_config.js")));
}

// ─── Secret scanning ───

#[test]
fn test_scan_config_fixture() {
    let content = content_fixture("app_config.js");
    let metadata = ScanMetadata {
        file: "app_config.js".into(),
        commit: "4f2a91c".into(),
        author: "dev".into(),
        date: "2024-04-02T10:00:00Z".into(),
    };
    let findings = scan(&content, &metadata);

    assert!(findings.iter().any(|f| f.pattern_id == "aws-access-key"));
    assert!(findings.iter().any(|f| f.pattern_id == "slack-webhook"));
    // The vendor-docs sample key is a placeholder and must not appear.
    assert!(!findings.iter().any(|f| f.pattern_id == "openai-api-key"));
}

#[test]
fn test_scan_clean_fixture() {
    let findings = scan(&content_fixture("clean.py"), &ScanMetadata::default());
    assert!(findings.is_empty());
}

// ─── End-to-end against stub providers ───

struct StubVulnDb {
    vulnerable: HashMap<String, Vulnerability>,
}

impl StubVulnDb {
    fn with(name: &str, severity: VulnSeverity, cvss: Option<f64>) -> Self {
        let mut vulnerable = HashMap::new();
        vulnerable.insert(
            name.to_string(),
            Vulnerability {
                id: format!("STUB-{}", name),
                aliases: Vec::new(),
                summary: format!("stub finding in {}", name),
                details: None,
                severity,
                cvss,
                published: None,
                modified: None,
                references: Vec::new(),
                affected: Vec::new(),
                exploit_available: None,
                cisa_kev: None,
            },
        );
        Self { vulnerable }
    }
}

#[async_trait]
impl VulnerabilityProvider for StubVulnDb {
    async fn query(&self, dependency: &Dependency) -> Result<Vec<Vulnerability>, ScanError> {
        Ok(self
            .vulnerable
            .get(&dependency.name)
            .cloned()
            .into_iter()
            .collect())
    }
}

struct StubMetadata {
    children: HashMap<String, Vec<PackageRef>>,
}

#[async_trait]
impl PackageMetadataProvider for StubMetadata {
    async fn direct_dependencies(
        &self,
        _ecosystem: Ecosystem,
        name: &str,
        _version: &str,
    ) -> Result<Vec<PackageRef>, ScanError> {
        Ok(self.children.get(name).cloned().unwrap_or_default())
    }
}

fn fast_resolver_options() -> ResolverOptions {
    ResolverOptions {
        parallelism: 5,
        batch_delay: Duration::from_millis(0),
    }
}

#[tokio::test]
async fn test_full_pipeline_with_stubs() {
    // Parse the npm fixture, flag lodash as vulnerable, and scan the
    // config fixture, then fold everything through a session.
    let (name, content) = manifest_fixture("package.json");
    let deps = extractor::extract(&name, &content).unwrap().dependencies;

    let resolver = Resolver::new(StubVulnDb::with(
        "lodash",
        VulnSeverity::High,
        Some(7.5),
    ))
    .with_options(fast_resolver_options());
    let outcome = resolver.batch_resolve(&deps).await;
    assert_eq!(outcome.results.len(), deps.len());
    assert_eq!(outcome.failed_lookups, 0);

    let mut session = ScanSession::default();
    session.record_secrets(scan(
        &content_fixture("app_config.js"),
        &ScanMetadata::default(),
    ));
    session.record_resolution(outcome);

    // Secrets: one critical AWS key (25) + one high Slack webhook (15).
    // lodash risk: 25 + 7.5*2 = 40, halved into the aggregate => 20.
    assert_eq!(session.aggregate_score(), 60);

    let report = ScanReport::from_session("fixture-repo", 1, deps.len(), &session);
    assert_eq!(report.vulnerable_dependency_count, 1);
    assert_eq!(report.total_vulnerabilities(), 1);
    assert_eq!(report.aggregate_score, 60);
}

#[tokio::test]
async fn test_graph_annotation_via_session() {
    let direct = vec![Dependency {
        name: "lodash".into(),
        version: "4.17.15".into(),
        ecosystem: Ecosystem::Npm,
        is_dev: false,
        source: "package.json".into(),
    }];

    let mut children = HashMap::new();
    children.insert(
        "lodash".to_string(),
        vec![PackageRef {
            name: "helper".into(),
            version: "1.0.0".into(),
            ecosystem: Ecosystem::Npm,
        }],
    );
    let graph = GraphBuilder::new(StubMetadata { children })
        .with_options(GraphOptions {
            max_depth: 2,
            parallelism: 3,
            level_delay: Duration::from_millis(0),
        })
        .build("fixture-repo", &direct)
        .await;
    assert_eq!(graph.stats.total_deps, 2);
    assert_eq!(graph.stats.vulnerable_count, 0);

    let resolver = Resolver::new(StubVulnDb::with(
        "lodash",
        VulnSeverity::Critical,
        Some(9.8),
    ))
    .with_options(fast_resolver_options());
    let outcome = resolver.batch_resolve(&direct).await;

    let mut session = ScanSession::default();
    session.attach_graph(graph);
    session.record_resolution(outcome);
    session.annotate_graph();

    let annotated = session.graph().unwrap();
    assert_eq!(annotated.stats.vulnerable_count, 1);
    let node = annotated.node("npm:lodash@4.17.15").unwrap();
    assert_eq!(node.is_vulnerable, Some(true));
    assert!(node.risk_score.unwrap() > 0.0);
}
