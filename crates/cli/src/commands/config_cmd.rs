//! `memoforge config`: configuration management commands.

use memoforge_config::AppConfig;
use std::path::Path;

use super::{config_path, load_config};

const REDACTED: &str = "***";

pub async fn init(explicit: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    if path.exists() && !force {
        return Err(format!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub async fn validate(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}...", config_path(explicit).display());

    let config = match load_config(explicit) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed and validated");

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No LLM API key set (set MEMOFORGE_API_KEY or OPENAI_API_KEY)");
    }
    if config.profile.api_key.is_none() && !config.profile.public_page_fallback {
        warnings.push("Profile lookups will always fail: no profile.api_key and page fallback disabled");
    }
    if config.extractors.ocr.is_none() {
        warnings.push("No OCR command configured; image uploads will be skipped");
    }
    for w in &warnings {
        println!("   warning: {w}");
    }

    println!();
    println!("   Model:       {}", config.llm.model);
    println!("   Moderation:  {}", config.moderation.provider);
    println!(
        "   Budget:      {} tokens (reserve {})",
        config.packer.max_tokens, config.packer.reserve
    );
    println!(
        "   Market:      {}",
        if config.market_analysis.is_some() { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn show(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

pub async fn path(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path(explicit).display());
    Ok(())
}

fn redacted(mut config: AppConfig) -> AppConfig {
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some(REDACTED.into());
    }
    if config.profile.api_key.is_some() {
        config.profile.api_key = Some(REDACTED.into());
    }
    config
}
