//! `memoforge classify`: show how a text file splits into fragments.

use memoforge_core::Fragment;
use memoforge_pipeline::PipelineSettings;
use std::path::Path;

use super::load_config;

const PREVIEW_CHARS: usize = 60;

pub async fn run(
    config_path: Option<&Path>,
    file: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let settings = PipelineSettings::from_config(&config);
    let fragments = settings.classifier.split(&text, &source_id(file));

    if json {
        println!("{}", serde_json::to_string_pretty(&fragments)?);
        return Ok(());
    }

    if fragments.is_empty() {
        println!(
            "No fragments (every paragraph is shorter than {} chars).",
            config.packer.min_fragment_chars
        );
        return Ok(());
    }

    println!("{:>4}  {:<17} {:>3} {:>7}  PREVIEW", "#", "CATEGORY", "PRI", "TOKENS");
    for (idx, fragment) in fragments.iter().enumerate() {
        println!(
            "{:>4}  {:<17} {:>3} {:>7}  {}",
            idx,
            fragment.category.as_str(),
            fragment.priority,
            fragment.estimated_tokens,
            preview(fragment)
        );
    }
    let total: usize = fragments.iter().map(|f| f.estimated_tokens).sum();
    println!();
    println!("{} fragment(s), ~{total} tokens", fragments.len());
    Ok(())
}

pub(crate) fn source_id(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

fn preview(fragment: &Fragment) -> String {
    let flat = fragment.text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoforge_core::Category;

    #[test]
    fn preview_flattens_and_truncates() {
        let fragment = Fragment {
            text: format!("Line one\n\nline   two {}", "x".repeat(100)),
            category: Category::General,
            priority: 1,
            estimated_tokens: 30,
            source_id: "f".into(),
        };
        let p = preview(&fragment);
        assert!(p.starts_with("Line one line two x"));
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn source_id_is_the_file_name() {
        assert_eq!(source_id(Path::new("/tmp/deal/notes.txt")), "notes.txt");
    }
}
