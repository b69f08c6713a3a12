use super::{Dependency, Ecosystem};

/// Parse a `go.mod` module file.
///
/// Handles both single-line `require` statements and `require ( ... )`
/// blocks. Versions lose their leading `v`; trailing `// indirect` style
/// comments are ignored.
pub fn parse(filename: &str, content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let line = line.trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            push_require(line, filename, &mut deps);
        } else if line == "require (" || line.starts_with("require (") {
            in_block = true;
        } else if let Some(rest) = line.strip_prefix("require ") {
            push_require(rest.trim(), filename, &mut deps);
        }
    }
    deps
}

fn push_require(line: &str, filename: &str, deps: &mut Vec<Dependency>) {
    if line.is_empty() || line.starts_with("//") {
        return;
    }
    let mut tokens = line.split_whitespace();
    let Some(name) = tokens.next() else {
        return;
    };
    let version = tokens
        .next()
        .filter(|tok| !tok.starts_with("//"))
        .map(|tok| tok.strip_prefix('v').unwrap_or(tok))
        .unwrap_or("*");

    deps.push(Dependency {
        name: name.to_string(),
        version: version.to_string(),
        ecosystem: Ecosystem::Go,
        is_dev: false,
        source: filename.to_string(),
    });
}
