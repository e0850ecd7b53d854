//! Codebook command - dump the built-in codebook as JSON.

use std::path::PathBuf;

use colored::Colorize;
use welzijn::Codebook;

pub fn run(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let codebook = Codebook::corona_welzijn();

    match output {
        Some(path) => {
            codebook.save(&path)?;
            println!(
                "{} {} ({} variables, {} scales)",
                "Saved to".green().bold(),
                path.display().to_string().white(),
                codebook.len(),
                codebook.scales().len()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&codebook)?),
    }

    Ok(())
}
