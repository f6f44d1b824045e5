//! `memoforge run`: run the pipeline for a request file and export the memo.

use memoforge_core::{EventBus, ExportFormat, PipelineEvent};
use memoforge_export::{export, write_document};
use memoforge_memory::SessionMemory;
use memoforge_pipeline::{Pipeline, PipelineReport, PipelineSettings, RunOutcome};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::load_config;
use crate::request;

const PROGRESS_DRAIN: Duration = Duration::from_secs(1);

pub async fn run(
    config_path: Option<&Path>,
    request_path: &Path,
    format: ExportFormat,
    output_dir: &Path,
    print_report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set MEMOFORGE_API_KEY (or OPENAI_API_KEY), or add llm.api_key to:");
        eprintln!("    {}", super::config_path(config_path).display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let loaded = request::load(request_path)?;
    let collaborators = memoforge_providers::build_from_config(&config)?;
    let memory = Arc::new(SessionMemory::new(config.memory.max_entries_per_session));
    let events = Arc::new(EventBus::default());
    let progress = tokio::spawn(print_progress(events.subscribe()));

    eprintln!();
    eprintln!(
        "  memoforge: {} document(s), {} enrichment target(s)",
        loaded.request.sources.len(),
        loaded.request.targets.len()
    );

    let pipeline = Pipeline::new(collaborators, memory, PipelineSettings::from_config(&config))
        .with_events(events);
    let report = pipeline.run(loaded.request).await;
    // Dropping the pipeline closes the event bus and ends the progress task.
    drop(pipeline);
    if tokio::time::timeout(PROGRESS_DRAIN, progress).await.is_err() {
        tracing::debug!("Progress printer still subscribed after the run; detaching");
    }

    if print_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    print_summary(&report);

    match &report.outcome {
        RunOutcome::Done(artifact) => {
            let document = export(artifact, format, &loaded.title)?;
            let path = write_document(&document, output_dir)?;
            eprintln!("  Memo written to {}", path.display());
            eprintln!();
            Ok(())
        }
        RunOutcome::Aborted(e) => {
            eprintln!("  Aborted [{}]: {e}", e.code());
            eprintln!();
            Err(e.clone().into())
        }
    }
}

async fn print_progress(mut rx: broadcast::Receiver<Arc<PipelineEvent>>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.as_ref() {
                PipelineEvent::StateChanged { to, .. } => eprintln!("  -> {to}"),
                PipelineEvent::EnrichmentItem {
                    identifier, success, ..
                } => {
                    let mark = if *success { "ok" } else { "failed" };
                    eprintln!("     {identifier} ({mark})");
                }
                PipelineEvent::StageFinished { .. } => {}
            },
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(report: &PipelineReport) {
    eprintln!();
    eprintln!("  Trace:       {}", report.trace_id);
    eprintln!("  Session:     {}", report.session_id);
    let extracted = report
        .sources
        .iter()
        .filter(|s| matches!(s.status, memoforge_pipeline::SourceStatus::Extracted { .. }))
        .count();
    eprintln!("  Sources:     {extracted}/{} extracted", report.sources.len());
    let enriched = report.enrichments.iter().filter(|e| e.is_success()).count();
    eprintln!("  Enrichment:  {enriched}/{} fetched", report.enrichments.len());
    if let Some(pack) = &report.pack {
        eprintln!(
            "  Compaction:  {} whole, {} summarized, {} dropped (~{} tokens)",
            pack.whole_count(),
            pack.summarized_count(),
            pack.dropped_count(),
            pack.estimated_tokens
        );
    }
    if let Some(opportunity) = &report.market_opportunity {
        eprintln!("  Market:      {opportunity}");
    }
}
