use super::{Dependency, Ecosystem};
use tracing::debug;

const SECTIONS: &[(&str, bool)] = &[
    ("dependencies", false),
    ("devDependencies", true),
    ("peerDependencies", false),
];

/// Parse a `package.json` manifest.
pub fn parse(filename: &str, content: &str) -> Vec<Dependency> {
    let json: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            debug!("skipping unparsable npm manifest {}: {}", filename, e);
            return Vec::new();
        }
    };

    let mut deps = Vec::new();
    for (section, is_dev) in SECTIONS {
        let Some(map) = json.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        for (name, version) in map {
            if let Some(raw) = version.as_str() {
                deps.push(Dependency {
                    name: name.clone(),
                    version: normalize_version(raw),
                    ecosystem: Ecosystem::Npm,
                    is_dev: *is_dev,
                    source: filename.to_string(),
                });
            }
        }
    }
    deps
}

/// Strip a single leading range operator and truncate at the first space.
fn normalize_version(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = match trimmed.chars().next() {
        Some('^' | '~' | '>' | '=' | '<') => &trimmed[1..],
        _ => trimmed,
    };
    stripped
        .split(' ')
        .next()
        .unwrap_or(stripped)
        .to_string()
}
