//! Analyze command - explain how a pattern would be prefiltered.

use crate::OutputFormat;
use sift_core::{search::analyze_with, Config};

/// Run the analyze command.
pub fn run(
    config: Config,
    pattern: &str,
    options: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let search_config = config.search_config();
    let analysis = analyze_with(pattern, options, &search_config);

    match output {
        OutputFormat::Text => {
            println!("Pattern:     {}", analysis.pattern);
            println!(
                "Complexity:  {} (max {})",
                analysis.complexity, search_config.max_pattern_complexity
            );
            if analysis.literals.is_empty() {
                println!("Literals:    (none)");
            } else {
                println!("Literals:    {}", analysis.literals.join(", "));
            }
            println!("Trigrams:    {}", analysis.trigrams.len());
            if !analysis.trigrams.is_empty() {
                println!("             {}", analysis.trigrams.join(" "));
            }

            println!();
            match (&analysis.reason, search_config.enable_bloom_filter) {
                (_, false) => println!("Prefilter disabled by configuration."),
                (Some(reason), true) => println!("Not suitable: {}.", reason),
                (None, true) => println!("Suitable for prefiltering."),
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(())
}
