//! `memoforge pack`: fit a text file into a token budget.

use memoforge_pipeline::PipelineSettings;
use std::path::Path;

use super::classify::source_id;
use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    file: &Path,
    max_tokens: Option<usize>,
    reserve: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let settings = PipelineSettings::from_config(&config);
    let mut budget = settings.budget;
    if let Some(max) = max_tokens {
        budget.max_tokens = max;
    }
    if let Some(reserve) = reserve {
        budget.reserve = reserve;
    }

    let fragments = settings.classifier.sections(&text, &source_id(file));
    let report = settings.packer.pack_with_report(&fragments, budget);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.text);
    eprintln!();
    eprintln!(
        "  Budget {} (reserve {}): {} fragment(s), ~{} tokens packed",
        budget.max_tokens,
        budget.reserve,
        fragments.len(),
        report.estimated_tokens
    );
    if report.trimmed {
        eprintln!(
            "  Trimmed: {} whole, {} summarized, {} dropped",
            report.whole_count(),
            report.summarized_count(),
            report.dropped_count()
        );
    }
    Ok(())
}
