pub mod config;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod report;
pub mod score;
pub mod secrets;
pub mod session;
pub mod supply_chain;
pub mod vuln;

pub use config::RiskScopeConfig;
pub use error::ScanError;
pub use extractor::{Dependency, Ecosystem, ParsedDependencies};
pub use report::ScanReport;
pub use score::{aggregate, AggregateWeights, RiskGrade};
pub use secrets::{scan, DetectedSecret, ScanMetadata, Severity};
pub use session::ScanSession;
pub use supply_chain::{GraphBuilder, GraphOptions, SupplyChainGraph};
pub use vuln::{Resolver, ResolverOptions, RiskWeights, VulnSeverity, Vulnerability, VulnerabilityResult};
