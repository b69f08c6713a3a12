use super::{Dependency, Ecosystem};

/// Parse a pip `requirements*.txt` file, one dependency per line.
///
/// Comment lines (`#`) and pip option lines (`-r`, `--index-url`, ...) are
/// skipped. Dev status is inferred from the filename: requirements files
/// named with `dev` or `test` hold development dependencies.
pub fn parse(filename: &str, content: &str) -> Vec<Dependency> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_lowercase();
    let is_dev = base.contains("dev") || base.contains("test");

    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                return None;
            }
            let (name, version) = split_requirement(line);
            if name.is_empty() {
                return None;
            }
            Some(Dependency {
                name: name.to_string(),
                version,
                ecosystem: Ecosystem::PyPi,
                is_dev,
                source: filename.to_string(),
            })
        })
        .collect()
}

/// Split `name[comparator]version` into its parts; missing version => `*`.
fn split_requirement(line: &str) -> (&str, String) {
    let name_end = line
        .find(|c: char| matches!(c, '=' | '>' | '<' | '~' | '!' | '[' | ' ' | ';'))
        .unwrap_or(line.len());
    let name = line[..name_end].trim();

    let mut rest = &line[name_end..];
    // Skip an extras group like `[security]` before the comparator.
    if let Some(stripped) = rest.strip_prefix('[') {
        rest = stripped
            .split_once(']')
            .map(|(_, after)| after)
            .unwrap_or("");
    }
    let version = rest
        .trim_start_matches(|c: char| matches!(c, '=' | '>' | '<' | '~' | '!' | ' '))
        .split([',', ' ', ';', '#'])
        .next()
        .unwrap_or("")
        .trim();

    let version = if version.is_empty() { "*" } else { version };
    (name, version.to_string())
}
