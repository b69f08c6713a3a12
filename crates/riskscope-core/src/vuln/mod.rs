pub mod osv;

use crate::error::ScanError;
use crate::extractor::Dependency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Severity of a known vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VulnSeverity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl VulnSeverity {
    /// Map a CVSS v3 base score through the fixed thresholds.
    pub fn from_cvss(score: f64) -> Self {
        if score >= 9.0 {
            VulnSeverity::Critical
        } else if score >= 7.0 {
            VulnSeverity::High
        } else if score >= 4.0 {
            VulnSeverity::Medium
        } else if score > 0.0 {
            VulnSeverity::Low
        } else {
            VulnSeverity::Unknown
        }
    }

    /// Interpret a database-provided severity label.
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "CRITICAL" => VulnSeverity::Critical,
            "HIGH" => VulnSeverity::High,
            "MEDIUM" | "MODERATE" => VulnSeverity::Medium,
            "LOW" => VulnSeverity::Low,
            _ => VulnSeverity::Unknown,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            VulnSeverity::Critical => "CRITICAL",
            VulnSeverity::High => "HIGH",
            VulnSeverity::Medium => "MEDIUM",
            VulnSeverity::Low => "LOW",
            VulnSeverity::Unknown => "UNKNOWN",
        }
    }
}

/// A half-open affected version range, as the database reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionRange {
    pub introduced: Option<String>,
    pub fixed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedPackage {
    pub package: String,
    pub ecosystem: String,
    pub versions: Vec<String>,
    pub ranges: Vec<VersionRange>,
}

/// One vulnerability record, immutable after construction from the
/// database response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub aliases: Vec<String>,
    pub summary: String,
    pub details: Option<String>,
    pub severity: VulnSeverity,
    pub cvss: Option<f64>,
    pub published: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub references: Vec<String>,
    pub affected: Vec<AffectedPackage>,
    pub exploit_available: Option<bool>,
    pub cisa_kev: Option<bool>,
}

/// Resolver output for one queried dependency.
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityResult {
    pub dependency: Dependency,
    pub vulnerabilities: Vec<Vulnerability>,
    /// Derived 0-100 risk score.
    pub risk_score: f64,
}

/// Point values for the per-dependency risk formula. The defaults are the
/// tuned heuristics; all of them can be overridden from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    pub unknown: f64,
    pub cvss_factor: f64,
    pub kev_bonus: f64,
    pub exploit_bonus: f64,
    pub max_score: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            critical: 40.0,
            high: 25.0,
            medium: 10.0,
            low: 3.0,
            unknown: 5.0,
            cvss_factor: 2.0,
            kev_bonus: 20.0,
            exploit_bonus: 15.0,
            max_score: 100.0,
        }
    }
}

/// Score a dependency's vulnerability list: severity base points, plus
/// CVSS-proportional points, plus bonuses for confirmed exploitation
/// signals, clamped to `max_score`. Not rounded; rounding happens only at
/// the aggregate level.
pub fn calculate_risk_score(vulnerabilities: &[Vulnerability], weights: &RiskWeights) -> f64 {
    if vulnerabilities.is_empty() {
        return 0.0;
    }
    let mut score = 0.0;
    for vuln in vulnerabilities {
        score += match vuln.severity {
            VulnSeverity::Critical => weights.critical,
            VulnSeverity::High => weights.high,
            VulnSeverity::Medium => weights.medium,
            VulnSeverity::Low => weights.low,
            VulnSeverity::Unknown => weights.unknown,
        };
        if let Some(cvss) = vuln.cvss {
            score += cvss * weights.cvss_factor;
        }
        if vuln.cisa_kev == Some(true) {
            score += weights.kev_bonus;
        }
        if vuln.exploit_available == Some(true) {
            score += weights.exploit_bonus;
        }
    }
    score.min(weights.max_score)
}

/// External vulnerability database seam; the engine only sees this trait.
#[async_trait]
pub trait VulnerabilityProvider: Send + Sync {
    async fn query(&self, dependency: &Dependency) -> Result<Vec<Vulnerability>, ScanError>;
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Queries issued concurrently per batch.
    pub parallelism: usize,
    /// Pause between batches, as rate-limit courtesy to the database.
    pub batch_delay: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            parallelism: 5,
            batch_delay: Duration::from_millis(100),
        }
    }
}

/// Outcome of a batch resolve: one result per input dependency, plus the
/// count of lookups that degraded to empty on failure.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<VulnerabilityResult>,
    pub failed_lookups: usize,
}

/// Resolves dependencies against a [`VulnerabilityProvider`] in bounded
/// concurrent batches.
pub struct Resolver<P> {
    provider: P,
    options: ResolverOptions,
    weights: RiskWeights,
}

impl<P: VulnerabilityProvider> Resolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: ResolverOptions::default(),
            weights: RiskWeights::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    /// One external query for one dependency.
    pub async fn resolve(&self, dependency: &Dependency) -> Result<Vec<Vulnerability>, ScanError> {
        self.provider.query(dependency).await
    }

    /// Resolve a dependency list in fixed-size batches.
    ///
    /// Queries within a batch run concurrently and merge only after the
    /// whole batch settles. A failed lookup degrades to an empty
    /// vulnerability list for that one dependency; the batch never fails.
    pub async fn batch_resolve(&self, dependencies: &[Dependency]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let batch_size = self.options.parallelism.max(1);

        for (index, batch) in dependencies.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.options.batch_delay).await;
            }
            let settled =
                futures::future::join_all(batch.iter().map(|dep| self.provider.query(dep))).await;

            for (dep, result) in batch.iter().zip(settled) {
                let vulnerabilities = match result {
                    Ok(vulns) => vulns,
                    Err(e) => {
                        warn!("vulnerability lookup failed for {}: {}", dep.name, e);
                        outcome.failed_lookups += 1;
                        Vec::new()
                    }
                };
                let risk_score = calculate_risk_score(&vulnerabilities, &self.weights);
                outcome.results.push(VulnerabilityResult {
                    dependency: dep.clone(),
                    vulnerabilities,
                    risk_score,
                });
            }
        }
        outcome
    }
}
