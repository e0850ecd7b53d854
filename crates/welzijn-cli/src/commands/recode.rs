//! Recode command - recode a survey export and write the recoded dataset.

use std::path::PathBuf;

use colored::Colorize;
use welzijn::Severity;

use super::{build_pipeline, ensure_exists};

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    codebook: Option<PathBuf>,
    config: Option<PathBuf>,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_exists(&file)?;

    println!(
        "{} {}",
        "Recoding".cyan().bold(),
        file.display().to_string().white()
    );

    let pipeline = build_pipeline(codebook.as_deref(), config.as_deref())?;
    let result = pipeline.run(&file)?;

    if verbose > 0 {
        println!();
        println!("{}", "Variables:".yellow().bold());
        for column in &result.typed.columns {
            println!(
                "  {:24} <- {}",
                column.name,
                column.raw_name().unwrap_or("composite")
            );
        }
        println!();
    }

    let diagnostics = &result.typed.diagnostics;
    println!(
        "Recoded {} variables for {} participants ({} unmapped values, {} declared missing)",
        diagnostics.variables.len().to_string().white().bold(),
        result.source().row_count.to_string().white().bold(),
        diagnostics.total_unmapped().to_string().yellow(),
        diagnostics.total_declared_missing().to_string().blue()
    );
    if !diagnostics.missing_inputs.is_empty() {
        println!(
            "{} {} codebook variables not in the data",
            "Skipped".yellow(),
            diagnostics.missing_inputs.len()
        );
    }
    for scale in &result.report.scales {
        println!(
            "Scale {}: {} scored, mean {}",
            scale.scale.white(),
            scale.scored,
            scale
                .mean
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    let dir = output.unwrap_or_else(|| {
        file.parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let today = chrono::Local::now().date_naive();
    let written = result.write_recoded(&dir, today)?;

    println!();
    println!(
        "{} {}",
        "Saved to".green().bold(),
        written.display().to_string().white()
    );

    let errors = result
        .issues()
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    if errors > 0 {
        println!(
            "{} {} data errors found. Run {} for details.",
            "Warning:".yellow().bold(),
            errors.to_string().red(),
            format!("welzijn report {}", file.display()).cyan()
        );
    }

    Ok(())
}
