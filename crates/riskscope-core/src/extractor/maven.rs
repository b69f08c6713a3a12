use super::{Dependency, Ecosystem};

/// Parse a Maven `pom.xml` by sequential structural scanning.
///
/// This deliberately walks `<dependency>` blocks with string search rather
/// than a full XML parse: the tuples it needs are flat, and a malformed
/// document then degrades to fewer results instead of an error.
pub fn parse(filename: &str, content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut cursor = 0;

    while let Some(start) = content[cursor..].find("<dependency>") {
        let block_start = cursor + start;
        let Some(end) = content[block_start..].find("</dependency>") else {
            break;
        };
        let block = &content[block_start..block_start + end];
        cursor = block_start + end + "</dependency>".len();

        let Some(group) = tag_text(block, "groupId") else {
            continue;
        };
        let Some(artifact) = tag_text(block, "artifactId") else {
            continue;
        };
        let version = tag_text(block, "version").unwrap_or("*");
        let is_dev = tag_text(block, "scope") == Some("test");

        deps.push(Dependency {
            name: format!("{}:{}", group, artifact),
            version: version.to_string(),
            ecosystem: Ecosystem::Maven,
            is_dev,
            source: filename.to_string(),
        });
    }
    deps
}

fn tag_text<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close)? + start;
    Some(block[start..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_tuple() {
        let content = r#"
<project>
  <dependencies>
    <dependency>
      <groupId>org.springframework</groupId>
      <artifactId>spring-core</artifactId>
      <version>5.3.30</version>
    </dependency>
  </dependencies>
</project>
"#;
        let deps = parse("pom.xml", content);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "org.springframework:spring-core");
        assert_eq!(deps[0].version, "5.3.30");
        assert_eq!(deps[0].ecosystem, Ecosystem::Maven);
    }

    #[test]
    fn test_missing_version_is_star() {
        let content = "<dependency><groupId>g</groupId><artifactId>a</artifactId></dependency>";
        let deps = parse("pom.xml", content);
        assert_eq!(deps[0].version, "*");
    }

    #[test]
    fn test_test_scope_marks_dev() {
        let content = r#"
<dependency>
  <groupId>junit</groupId>
  <artifactId>junit</artifactId>
  <version>4.13.2</version>
  <scope>test</scope>
</dependency>
"#;
        assert!(parse("pom.xml", content)[0].is_dev);
    }

    #[test]
    fn test_block_without_artifact_skipped() {
        let content = "<dependency><groupId>only-group</groupId></dependency>";
        assert!(parse("pom.xml", content).is_empty());
    }

    #[test]
    fn test_unclosed_block_stops_cleanly() {
        let content = "<dependency><groupId>g</groupId><artifactId>a</artifactId>";
        assert!(parse("pom.xml", content).is_empty());
    }
}
