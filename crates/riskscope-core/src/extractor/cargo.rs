use super::{Dependency, Ecosystem};

#[derive(PartialEq)]
enum Section {
    Dependencies,
    DevDependencies,
    Other,
}

/// Parse a `Cargo.toml` manifest by line-based section tracking.
///
/// Supports the `name = "version"` and `name = { version = "...", ... }`
/// forms inside `[dependencies]` and `[dev-dependencies]`; any other
/// `[section]` header resets tracking.
pub fn parse(filename: &str, content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut section = Section::Other;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            section = match line {
                "[dependencies]" => Section::Dependencies,
                "[dev-dependencies]" => Section::DevDependencies,
                _ => Section::Other,
            };
            continue;
        }
        if section == Section::Other {
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let name = name.trim().trim_matches('"');
        let Some(version) = parse_version_value(value.trim()) else {
            continue;
        };

        deps.push(Dependency {
            name: name.to_string(),
            version,
            ecosystem: Ecosystem::Cargo,
            is_dev: section == Section::DevDependencies,
            source: filename.to_string(),
        });
    }
    deps
}

fn parse_version_value(value: &str) -> Option<String> {
    if let Some(rest) = value.strip_prefix('"') {
        // name = "version"
        return rest.split('"').next().map(str::to_string);
    }
    if value.starts_with('{') {
        // name = { version = "...", ... }
        let after = value.split_once("version")?.1;
        let after = after.trim_start().strip_prefix('=')?.trim_start();
        let rest = after.strip_prefix('"')?;
        return rest.split('"').next().map(str::to_string);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_table_forms() {
        let content = r#"
[package]
name = "demo"
version = "0.1.0"

[dependencies]
serde = { version = "1.0.190", features = ["derive"] }
regex = "1.10"

[dev-dependencies]
tempfile = "3"
"#;
        let deps = parse("Cargo.toml", content);
        assert_eq!(deps.len(), 3);
        let serde = deps.iter().find(|d| d.name == "serde").unwrap();
        assert_eq!(serde.version, "1.0.190");
        assert!(!serde.is_dev);
        let tempfile = deps.iter().find(|d| d.name == "tempfile").unwrap();
        assert_eq!(tempfile.version, "3");
        assert!(tempfile.is_dev);
    }

    #[test]
    fn test_other_section_resets() {
        let content = "[dependencies]\nserde = \"1\"\n[features]\ndefault = []\n";
        let deps = parse("Cargo.toml", content);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "serde");
    }

    #[test]
    fn test_package_section_not_parsed() {
        let content = "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n";
        assert!(parse("Cargo.toml", content).is_empty());
    }

    #[test]
    fn test_entry_without_version_skipped() {
        let content = "[dependencies]\nlocal-helper = { path = \"../helper\" }\n";
        assert!(parse("Cargo.toml", content).is_empty());
    }
}
