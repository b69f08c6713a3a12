use super::{
    AffectedPackage, VersionRange, VulnSeverity, Vulnerability, VulnerabilityProvider,
};
use crate::error::ScanError;
use crate::extractor::{Dependency, Ecosystem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.osv.dev/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for an OSV-style vulnerability database.
pub struct OsvClient {
    client: reqwest::Client,
    base_url: String,
}

impl OsvClient {
    pub fn new() -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("riskscope/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query known vulnerabilities for one package version.
    pub async fn query_package(
        &self,
        name: &str,
        version: &str,
        ecosystem: Ecosystem,
    ) -> Result<Vec<Vulnerability>, ScanError> {
        debug!("querying osv for {}@{} ({})", name, version, ecosystem);
        let request = OsvQuery {
            package: OsvPackage {
                name: name.to_string(),
                ecosystem: ecosystem.osv_name().to_string(),
            },
            version: version.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScanError::Api {
                service: "osv.dev",
                status: response.status().as_u16(),
            });
        }

        let body: OsvQueryResponse = response.json().await?;
        Ok(body.vulns.into_iter().map(convert_vulnerability).collect())
    }

    /// Secondary lookup by identifier, used to backfill descriptive fields
    /// when a query response omits them. Missing ids are not an error.
    pub async fn vulnerability_details(
        &self,
        id: &str,
    ) -> Result<Option<Vulnerability>, ScanError> {
        let response = self
            .client
            .get(format!("{}/vulns/{}", self.base_url, id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ScanError::Api {
                service: "osv.dev",
                status: response.status().as_u16(),
            });
        }
        let body: OsvVulnerability = response.json().await?;
        Ok(Some(convert_vulnerability(body)))
    }
}

#[async_trait]
impl VulnerabilityProvider for OsvClient {
    async fn query(&self, dependency: &Dependency) -> Result<Vec<Vulnerability>, ScanError> {
        self.query_package(&dependency.name, &dependency.version, dependency.ecosystem)
            .await
    }
}

fn convert_vulnerability(osv: OsvVulnerability) -> Vulnerability {
    let cvss = osv
        .severity
        .iter()
        .find_map(|s| s.score.parse::<f64>().ok());

    let label = osv
        .database_specific
        .as_ref()
        .and_then(|d| d.get("severity"))
        .and_then(|v| v.as_str());

    let severity = match (cvss, label) {
        (Some(score), _) => VulnSeverity::from_cvss(score),
        (None, Some(label)) => VulnSeverity::from_label(label),
        (None, None) => VulnSeverity::Unknown,
    };

    let exploit_available = osv
        .database_specific
        .as_ref()
        .and_then(|d| d.get("exploit_available"))
        .and_then(|v| v.as_bool());
    let cisa_kev = osv
        .database_specific
        .as_ref()
        .and_then(|d| d.get("cisa_kev"))
        .and_then(|v| v.as_bool());

    let affected = osv
        .affected
        .into_iter()
        .map(|a| AffectedPackage {
            package: a.package.name,
            ecosystem: a.package.ecosystem,
            versions: a.versions,
            ranges: a.ranges.into_iter().flat_map(convert_ranges).collect(),
        })
        .collect();

    Vulnerability {
        id: osv.id,
        aliases: osv.aliases,
        summary: osv
            .summary
            .unwrap_or_else(|| "No summary available".to_string()),
        details: osv.details,
        severity,
        cvss,
        published: osv.published.as_deref().and_then(parse_timestamp),
        modified: osv.modified.as_deref().and_then(parse_timestamp),
        references: osv.references.into_iter().map(|r| r.url).collect(),
        affected,
        exploit_available,
        cisa_kev,
    }
}

/// Fold an OSV event sequence into introduced/fixed pairs: each
/// `introduced` opens a range, a following `fixed` closes it.
fn convert_ranges(range: OsvRange) -> Vec<VersionRange> {
    let mut ranges = Vec::new();
    for event in range.events {
        if event.introduced.is_some() {
            ranges.push(VersionRange {
                introduced: event.introduced,
                fixed: None,
            });
        } else if event.fixed.is_some() {
            match ranges.last_mut() {
                Some(open) if open.fixed.is_none() => open.fixed = event.fixed,
                _ => ranges.push(VersionRange {
                    introduced: None,
                    fixed: event.fixed,
                }),
            }
        }
    }
    ranges
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// Wire types, contract-relevant fields only.

#[derive(Debug, Serialize)]
struct OsvQuery {
    package: OsvPackage,
    version: String,
}

#[derive(Debug, Serialize)]
struct OsvPackage {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvQueryResponse {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    aliases: Vec<String>,
    summary: Option<String>,
    details: Option<String>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
    #[serde(default)]
    references: Vec<OsvReference>,
    published: Option<String>,
    modified: Option<String>,
    database_specific: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OsvSeverity {
    #[serde(default)]
    score: String,
}

#[derive(Debug, Deserialize)]
struct OsvAffected {
    package: OsvAffectedPackage,
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    ranges: Vec<OsvRange>,
}

#[derive(Debug, Deserialize)]
struct OsvAffectedPackage {
    name: String,
    #[serde(default)]
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvRange {
    #[serde(default)]
    events: Vec<OsvEvent>,
}

#[derive(Debug, Deserialize)]
struct OsvEvent {
    introduced: Option<String>,
    fixed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvReference {
    url: String,
}
