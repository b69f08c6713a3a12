use super::{Dependency, Ecosystem};

/// Parse a `Gemfile`.
///
/// `gem 'name', 'version'` calls become dependencies with `*` when no
/// version argument is present. A `group :development do` / `group :test do`
/// block marks everything inside it as dev, tracked until the matching
/// `end` (nested `do` blocks are counted).
pub fn parse(filename: &str, content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut group_depth: usize = 0;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if group_depth == 0 && is_dev_group_start(line) {
            group_depth = 1;
            continue;
        }
        if group_depth > 0 {
            if line == "end" {
                group_depth -= 1;
                continue;
            }
            if line.ends_with(" do") || line == "do" {
                group_depth += 1;
            }
        }

        if let Some(rest) = line.strip_prefix("gem ") {
            let mut quoted = quoted_args(rest);
            let Some(name) = quoted.next() else {
                continue;
            };
            let version = quoted.next().unwrap_or("*");
            deps.push(Dependency {
                name: name.to_string(),
                version: version.to_string(),
                ecosystem: Ecosystem::RubyGems,
                is_dev: group_depth > 0,
                source: filename.to_string(),
            });
        }
    }
    deps
}

fn is_dev_group_start(line: &str) -> bool {
    line.starts_with("group")
        && (line.contains(":development") || line.contains(":test"))
        && line.ends_with("do")
}

/// Iterate the leading quoted arguments of a gem call, stopping at the
/// first keyword option (`require: false` and friends carry no version).
fn quoted_args(args: &str) -> impl Iterator<Item = &str> {
    args.split(',').map_while(|arg| {
        let arg = arg.trim();
        let first = arg.chars().next()?;
        if first != '\'' && first != '"' {
            return None;
        }
        arg.get(1..)?.split(first).next()
    })
}
