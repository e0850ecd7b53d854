//! Report command - print the participation and consistency report.

use std::path::PathBuf;

use colored::Colorize;
use welzijn::output::{write_report_json, write_report_text};
use welzijn::{Severity, Stability, render_text};

use super::{build_pipeline, ensure_exists};

pub fn run(
    file: PathBuf,
    json_output: bool,
    output: Option<PathBuf>,
    codebook: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_exists(&file)?;

    let pipeline = build_pipeline(codebook.as_deref(), config.as_deref())?;
    let result = pipeline.run(&file)?;
    let report = &result.report;

    if let Some(path) = output {
        if json_output {
            write_report_json(&path, report)?;
        } else {
            write_report_text(&path, report)?;
        }
        println!(
            "{} {}",
            "Saved to".green().bold(),
            path.display().to_string().white()
        );
        return Ok(());
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    print!("{}", render_text(report));

    // Colored recap of what needs attention
    println!();
    let c = &report.issue_counts;
    println!(
        "{} ({} errors, {} warnings, {} info)",
        "Issues".yellow().bold(),
        c.error.to_string().red(),
        c.warning.to_string().yellow(),
        c.info.to_string().blue()
    );
    for issue in report.issues.iter().filter(|i| i.severity == Severity::Error) {
        println!("  {} {}", "✗".red(), issue.description);
    }

    let unstable: Vec<_> = report
        .comparisons
        .iter()
        .filter(|cmp| cmp.stability == Stability::Unstable)
        .collect();
    if unstable.is_empty() {
        println!("{}", "No unstable variables.".green());
    } else {
        for cmp in unstable {
            println!(
                "  {} {} ({:.1}% identical)",
                "!".yellow(),
                cmp.variable_name,
                cmp.percent_identical.unwrap_or_default()
            );
        }
    }

    Ok(())
}
