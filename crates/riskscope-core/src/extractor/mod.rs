pub mod cargo;
pub mod gemfile;
pub mod gomod;
pub mod maven;
pub mod npm;
pub mod pip;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A package-manager namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    PyPi,
    Go,
    Cargo,
    RubyGems,
    Maven,
}

impl Ecosystem {
    pub fn label(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPi => "pypi",
            Ecosystem::Go => "go",
            Ecosystem::Cargo => "cargo",
            Ecosystem::RubyGems => "rubygems",
            Ecosystem::Maven => "maven",
        }
    }

    /// Ecosystem name as the OSV vulnerability database spells it.
    pub fn osv_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPi => "PyPI",
            Ecosystem::Go => "Go",
            Ecosystem::Cargo => "crates.io",
            Ecosystem::RubyGems => "RubyGems",
            Ecosystem::Maven => "Maven",
        }
    }

    /// System identifier on the deps.dev metadata API. RubyGems is not
    /// served there, so graph expansion treats those packages as leaves.
    pub fn depsdev_system(&self) -> Option<&'static str> {
        match self {
            Ecosystem::Npm => Some("NPM"),
            Ecosystem::PyPi => Some("PYPI"),
            Ecosystem::Go => Some("GO"),
            Ecosystem::Cargo => Some("CARGO"),
            Ecosystem::Maven => Some("MAVEN"),
            Ecosystem::RubyGems => None,
        }
    }

    pub fn from_depsdev_system(system: &str) -> Option<Self> {
        match system.to_uppercase().as_str() {
            "NPM" => Some(Ecosystem::Npm),
            "PYPI" => Some(Ecosystem::PyPi),
            "GO" => Some(Ecosystem::Go),
            "CARGO" => Some(Ecosystem::Cargo),
            "MAVEN" => Some(Ecosystem::Maven),
            _ => None,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single declared dependency, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Free-form version string, not necessarily semver.
    pub version: String,
    pub ecosystem: Ecosystem,
    pub is_dev: bool,
    /// Originating manifest filename.
    pub source: String,
}

/// The parse result for one manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDependencies {
    pub source_file: String,
    pub ecosystem: Ecosystem,
    pub dependencies: Vec<Dependency>,
}

/// Map a manifest filename to its ecosystem, by exact basename or suffix.
pub fn ecosystem_for(filename: &str) -> Option<Ecosystem> {
    let base = basename(filename);
    match base {
        "package.json" => Some(Ecosystem::Npm),
        "go.mod" => Some(Ecosystem::Go),
        "Cargo.toml" => Some(Ecosystem::Cargo),
        "Gemfile" => Some(Ecosystem::RubyGems),
        "pom.xml" => Some(Ecosystem::Maven),
        _ if base.contains("requirements") && base.ends_with(".txt") => Some(Ecosystem::PyPi),
        _ => None,
    }
}

/// Parse manifest content into typed dependency records.
///
/// Unrecognized filenames yield `None`. Malformed content never errors:
/// the affected parser returns an empty list so one broken manifest cannot
/// abort analysis of the rest of the repository.
pub fn extract(filename: &str, content: &str) -> Option<ParsedDependencies> {
    let ecosystem = ecosystem_for(filename)?;
    let dependencies = match ecosystem {
        Ecosystem::Npm => npm::parse(filename, content),
        Ecosystem::PyPi => pip::parse(filename, content),
        Ecosystem::Go => gomod::parse(filename, content),
        Ecosystem::Cargo => cargo::parse(filename, content),
        Ecosystem::RubyGems => gemfile::parse(filename, content),
        Ecosystem::Maven => maven::parse(filename, content),
    };
    Some(ParsedDependencies {
        source_file: filename.to_string(),
        ecosystem,
        dependencies,
    })
}

fn basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecosystem_by_basename() {
        assert_eq!(ecosystem_for("package.json"), Some(Ecosystem::Npm));
        assert_eq!(ecosystem_for("backend/go.mod"), Some(Ecosystem::Go));
        assert_eq!(ecosystem_for("rust/Cargo.toml"), Some(Ecosystem::Cargo));
        assert_eq!(ecosystem_for("Gemfile"), Some(Ecosystem::RubyGems));
        assert_eq!(ecosystem_for("service/pom.xml"), Some(Ecosystem::Maven));
        assert_eq!(
            ecosystem_for("requirements-dev.txt"),
            Some(Ecosystem::PyPi)
        );
        assert_eq!(ecosystem_for("README.md"), None);
        assert_eq!(ecosystem_for("Gemfile.lock"), None);
    }

    #[test]
    fn test_extract_unrecognized_is_none() {
        assert!(extract("notes.txt", "whatever").is_none());
    }

    #[test]
    fn test_extract_malformed_is_empty_not_error() {
        let parsed = extract("package.json", "{ not json").unwrap();
        assert_eq!(parsed.ecosystem, Ecosystem::Npm);
        assert!(parsed.dependencies.is_empty());
    }

    #[test]
    fn test_osv_name_table() {
        assert_eq!(Ecosystem::Cargo.osv_name(), "crates.io");
        assert_eq!(Ecosystem::PyPi.osv_name(), "PyPI");
        assert_eq!(Ecosystem::RubyGems.osv_name(), "RubyGems");
    }
}
