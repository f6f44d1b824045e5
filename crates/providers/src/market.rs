//! Market analysis subprocess.
//!
//! The analysis is a long-running external program invoked as
//! `<program> <args...> <market opportunity> <trace id>`. It may print
//! progress freely; the last JSON object on stdout is the result.

use memoforge_config::CommandConfig;
use memoforge_core::MarketAnalysis;
use memoforge_core::error::GenerationError;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the configured analysis program.
///
/// The child is killed when the returned future is dropped, so abandoning the
/// call on timeout also terminates the process.
#[derive(Debug, Clone)]
pub struct MarketAnalysisCommand {
    command: CommandConfig,
}

impl MarketAnalysisCommand {
    pub fn new(command: CommandConfig) -> Self {
        Self { command }
    }

    pub async fn run(&self, opportunity: &str, trace_id: &str) -> Result<MarketAnalysis, GenerationError> {
        debug!(program = %self.command.program, trace_id, "Starting market analysis");

        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(opportunity)
            .arg(trace_id)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                GenerationError::Process(format!("failed to start {}: {e}", self.command.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "Market analysis exited with failure");
            return Err(GenerationError::Process(format!(
                "{} exited with {}: {}",
                self.command.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_analysis_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse the last JSON object printed by the analysis.
///
/// Output with no parsable object yields a placeholder analysis carrying the
/// raw output.
pub fn parse_analysis_output(stdout: &str) -> MarketAnalysis {
    match last_json_object(stdout) {
        Some(Value::Object(map)) => {
            let field = |name: &str| map.get(name).and_then(value_to_text);
            MarketAnalysis {
                industry_analysis: field("industry_analysis"),
                market_analysis: field("market_analysis"),
                competitor_analysis: field("competitor_analysis"),
                timing_analysis: field("timing_analysis"),
                regional_analysis: field("regional_analysis"),
                decision: field("decision"),
                error: field("error"),
                raw_output: None,
            }
        }
        _ => {
            warn!("No JSON object found in market analysis output");
            MarketAnalysis {
                industry_analysis: Some("Analysis incomplete - output parsing failed".into()),
                market_analysis: Some("Market analysis unavailable".into()),
                error: Some("Failed to parse analysis output".into()),
                raw_output: Some(stdout.to_string()),
                ..MarketAnalysis::default()
            }
        }
    }
}

/// Parse attempts made before giving up on the output.
const MAX_JSON_ATTEMPTS: usize = 256;

/// The object ending at the last `}` that starts at the latest `{` which
/// parses through to it. Each attempt stops at the end of its first value.
fn last_json_object(text: &str) -> Option<Value> {
    let end = text.rfind('}')? + 1;
    text[..end]
        .rmatch_indices('{')
        .take(MAX_JSON_ATTEMPTS)
        .find_map(|(start, _)| {
            let mut values =
                serde_json::Deserializer::from_str(&text[start..end]).into_iter::<Value>();
            match values.next() {
                Some(Ok(value)) if value.is_object() && start + values.byte_offset() == end => {
                    Some(value)
                }
                _ => None,
            }
        })
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_last_object_after_progress_output() {
        let stdout = "Analyzing market opportunity: rockets\n{\"progress\": 1}\nDone.\n\
            {\"industry_analysis\": \"Space\", \"decision\": {\"score\": 4}, \"timing_analysis\": null}\n";
        let analysis = parse_analysis_output(stdout);
        assert_eq!(analysis.industry_analysis.as_deref(), Some("Space"));
        assert_eq!(analysis.decision.as_deref(), Some(r#"{"score":4}"#));
        assert!(analysis.timing_analysis.is_none());
        assert!(analysis.raw_output.is_none());
    }

    #[test]
    fn nested_objects_are_handled() {
        let stdout = r#"log {"market_analysis": "big", "extra": {"a": 1}}"#;
        assert_eq!(parse_analysis_output(stdout).market_analysis.as_deref(), Some("big"));
    }

    #[test]
    fn brace_heavy_progress_output_is_skipped() {
        let mut stdout = "step {tick} done\n".repeat(5_000);
        stdout.push_str(r#"{"industry_analysis": "Retail", "extra": {"a": {"b": 1}}}"#);
        stdout.push_str("\n");
        assert_eq!(parse_analysis_output(&stdout).industry_analysis.as_deref(), Some("Retail"));
    }

    #[test]
    fn gives_up_on_endless_open_objects() {
        let stdout = format!("{}}}", r#"{"a": "#.repeat(10_000));
        let analysis = parse_analysis_output(&stdout);
        assert_eq!(analysis.error.as_deref(), Some("Failed to parse analysis output"));
    }

    #[test]
    fn unparsable_output_yields_placeholder() {
        let analysis = parse_analysis_output("no json here");
        assert_eq!(analysis.error.as_deref(), Some("Failed to parse analysis output"));
        assert_eq!(analysis.raw_output.as_deref(), Some("no json here"));
        assert!(analysis.industry_analysis.is_some());
    }

    #[tokio::test]
    async fn runs_program_with_opportunity_and_trace() {
        let command = MarketAnalysisCommand::new(CommandConfig {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                r#"echo "working on $1"; printf '{"industry_analysis": "%s", "decision": "%s"}' "$1" "$2""#.into(),
                "analysis".into(),
            ],
        });
        let analysis = command.run("AI budgeting for CFOs", "trace-1").await.unwrap();
        assert_eq!(analysis.industry_analysis.as_deref(), Some("AI budgeting for CFOs"));
        assert_eq!(analysis.decision.as_deref(), Some("trace-1"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let command = MarketAnalysisCommand::new(CommandConfig {
            program: "sh".into(),
            args: vec!["-c".into(), "echo boom >&2; exit 3".into(), "analysis".into()],
        });
        let err = command.run("x", "t").await.unwrap_err();
        assert!(matches!(err, GenerationError::Process(msg) if msg.contains("boom")));
    }
}
