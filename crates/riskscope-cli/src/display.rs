use colored::*;
use riskscope_core::secrets::{DetectedSecret, Severity};
use riskscope_core::supply_chain::SupplyChainGraph;
use riskscope_core::{Dependency, RiskGrade, ScanReport};

/// Print a full scan report to the terminal.
pub fn print_scan_report(report: &ScanReport, offline: bool) {
    println!();
    println!(
        "{}",
        format!(
            " RiskScope v{} — {}",
            env!("CARGO_PKG_VERSION"),
            report.repository
        )
        .bold()
    );
    println!();

    println!(" {}", "Inputs".bold().underline());
    println!(
        " {} {} manifests, {} dependencies",
        "|-".dimmed(),
        report.manifest_count,
        report.dependency_count
    );
    if offline {
        println!(
            " {} Vulnerability lookups skipped ({})",
            "|-".dimmed(),
            "--offline".cyan()
        );
    }
    println!();
    println!(" {}", "=".repeat(60).dimmed());
    println!();

    println!(" {}", "Secrets".bold().underline());
    if report.secrets.is_empty() {
        println!(" {} No hardcoded secrets detected", "OK".green().bold());
    } else {
        for secret in &report.secrets {
            print_secret(secret);
        }
        println!(
            " {} {} critical, {} high, {} medium, {} low",
            "|-".dimmed(),
            count_colored(report.secret_counts.critical, Color::Red),
            count_colored(report.secret_counts.high, Color::Yellow),
            report.secret_counts.medium,
            report.secret_counts.low
        );
    }
    println!();

    println!(" {}", "Dependency Vulnerabilities".bold().underline());
    if report.vulnerability_results.is_empty() {
        println!(" {} no dependencies resolved", "|-".dimmed());
    } else {
        for result in report
            .vulnerability_results
            .iter()
            .filter(|r| !r.vulnerabilities.is_empty())
        {
            println!(
                " {} {}@{} — {} ({} risk {:.1})",
                "|-".dimmed(),
                result.dependency.name.bold(),
                result.dependency.version,
                format!("{} vulnerabilities", result.vulnerabilities.len()).red(),
                result.dependency.ecosystem,
                result.risk_score
            );
            for vuln in &result.vulnerabilities {
                println!(
                    "    {} [{}] {}",
                    vuln.severity.symbol().yellow(),
                    vuln.id,
                    vuln.summary
                );
            }
        }
        println!(
            " {} {} of {} dependencies vulnerable",
            "|-".dimmed(),
            count_colored(report.vulnerable_dependency_count, Color::Red),
            report.vulnerability_results.len()
        );
    }
    if report.failed_lookups > 0 {
        println!(
            " {} {} lookups failed and were counted as clean",
            "|-".dimmed(),
            report.failed_lookups.to_string().yellow()
        );
    }
    println!();

    if let Some(stats) = &report.graph_stats {
        println!(" {}", "Supply Chain".bold().underline());
        println!(
            " {} {} packages ({} direct, {} transitive), depth {}",
            "|-".dimmed(),
            stats.total_deps,
            stats.direct_deps,
            stats.transitive_deps,
            stats.max_depth
        );
        println!();
    }

    println!(" {}", "=".repeat(60).dimmed());
    println!();
    print_score(report.aggregate_score, report.grade);
    println!();
}

/// Print a secrets-only listing.
pub fn print_secrets(secrets: &[DetectedSecret], scanned_files: usize) {
    println!();
    println!(
        "{}",
        format!(" Scanned {} files for hardcoded secrets", scanned_files).bold()
    );
    println!();
    if secrets.is_empty() {
        println!(" {} Nothing detected", "OK".green().bold());
        println!();
        return;
    }
    for secret in secrets {
        print_secret(secret);
    }
    println!();
    println!(" {} findings", secrets.len().to_string().bold());
}

fn print_secret(secret: &DetectedSecret) {
    let severity = match secret.severity {
        Severity::Critical => secret.severity.symbol().red().bold(),
        Severity::High => secret.severity.symbol().yellow().bold(),
        Severity::Medium => secret.severity.symbol().yellow(),
        Severity::Low => secret.severity.symbol().blue(),
    };
    println!(
        " {} {} {}:{}:{} {}",
        "|-".dimmed(),
        severity,
        secret.file,
        secret.line,
        secret.column,
        secret.redacted.dimmed()
    );
    println!(
        "    {} {}",
        secret.pattern_name,
        format!("[{}]", secret.pattern_id).dimmed()
    );
}

/// Print the parsed dependency listing.
pub fn print_dependencies(dependencies: &[Dependency], manifest_count: usize) {
    println!();
    println!(
        "{}",
        format!(
            " {} dependencies from {} manifests",
            dependencies.len(),
            manifest_count
        )
        .bold()
    );
    println!();
    for dep in dependencies {
        let dev = if dep.is_dev {
            " (dev)".dimmed()
        } else {
            "".normal()
        };
        println!(
            " {} {} {}@{}{}  {}",
            "|-".dimmed(),
            format!("[{}]", dep.ecosystem).cyan(),
            dep.name,
            dep.version,
            dev,
            dep.source.dimmed()
        );
    }
    println!();
}

/// Print graph shape and per-level nodes.
pub fn print_graph(graph: &SupplyChainGraph) {
    let stats = &graph.stats;
    println!();
    println!("{}", format!(" Supply chain of {}", graph.root).bold());
    println!();
    println!(
        " {} {} packages: {} direct, {} transitive",
        "|-".dimmed(),
        stats.total_deps,
        stats.direct_deps,
        stats.transitive_deps
    );
    println!(
        " {} {} edges, max depth {}",
        "|-".dimmed(),
        graph.edge_count(),
        stats.max_depth
    );
    if stats.vulnerable_count > 0 {
        println!(
            " {} {} vulnerable packages, avg risk {:.1}",
            "|-".dimmed(),
            stats.vulnerable_count.to_string().red().bold(),
            stats.avg_risk_score
        );
    }
    println!();

    for depth in 0..=stats.max_depth {
        let mut at_level: Vec<_> = graph.nodes().filter(|n| n.depth == depth).collect();
        if at_level.is_empty() {
            continue;
        }
        at_level.sort_by(|a, b| a.name.cmp(&b.name));
        println!(" {}", format!("Depth {}", depth).bold());
        for node in at_level {
            let marker = match node.is_vulnerable {
                Some(true) => "!".red().bold().to_string(),
                _ => "-".dimmed().to_string(),
            };
            println!(
                "   {} {}@{} {}",
                marker,
                node.name,
                node.version,
                format!("({})", node.ecosystem).dimmed()
            );
        }
    }
    println!();
}

fn print_score(score: u8, grade: RiskGrade) {
    let rendered = format!(" Aggregate risk: {}/100 ({})", score, grade.label());
    let line = match grade {
        RiskGrade::Severe | RiskGrade::High => rendered.red().bold(),
        RiskGrade::Elevated => rendered.yellow().bold(),
        RiskGrade::Guarded => rendered.yellow(),
        RiskGrade::Low => rendered.green().bold(),
    };
    println!("{}", line);
}

fn count_colored(count: usize, color: Color) -> String {
    if count > 0 {
        count.to_string().color(color).bold().to_string()
    } else {
        "0".to_string()
    }
}
