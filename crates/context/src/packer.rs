//! Budget packer: fits classified fragments into a token budget.
//!
//! Below budget, fragments are joined in their original order, short ones
//! included. Once trimming is required, sections under `min_fragment_chars`
//! are dropped as noise and the rest are re-ordered by `(priority desc, length desc)` and
//! admitted greedily: whole if they fit under the whole-fragment ceiling,
//! otherwise as a `[SUMMARIZED]` extract if that fits under the summary
//! ceiling, otherwise dropped. Packing never fails.
//!
//! # Determinism
//!
//! Identical inputs always produce identical output. The sort is stable, so
//! fragments equal in priority and length keep their input order.

use memoforge_core::{Budget, Category, Fragment};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{DEFAULT_MIN_FRAGMENT_CHARS, is_noise};
use crate::summarize::summarize;
use crate::token::TokenEstimator;

/// Default headroom below `max_tokens` for whole fragments.
pub const DEFAULT_WHOLE_BUFFER: usize = 1000;
/// Default headroom below `max_tokens` for summaries.
pub const DEFAULT_SUMMARY_BUFFER: usize = 500;

/// Prefix marking a fragment that was replaced by its summary.
pub const SUMMARY_TAG: &str = "[SUMMARIZED]";

const SEPARATOR: &str = "\n\n";
const SEPARATOR_TOKENS: usize = 1;

// ── Report types ──────────────────────────────────────────────────────────

/// What happened to one fragment during packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackAction {
    Whole,
    Summarized,
    /// Fit neither whole nor as a summary.
    DroppedNoRoom,
    /// A higher-priority fragment was already dropped.
    DroppedPrecedence,
    /// Too short to be worth keeping once trimming is required.
    DroppedNoise,
}

impl PackAction {
    pub fn is_dropped(self) -> bool {
        matches!(
            self,
            Self::DroppedNoRoom | Self::DroppedPrecedence | Self::DroppedNoise
        )
    }
}

/// Per-fragment packing decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDecision {
    pub source_id: String,
    pub category: Category,
    pub priority: u8,
    /// Tokens of the fragment as classified.
    pub fragment_tokens: usize,
    /// Tokens actually spent (0 when dropped).
    pub spent_tokens: usize,
    pub action: PackAction,
}

/// Packed text plus an account of every decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackReport {
    pub text: String,
    /// Estimated tokens of `text`.
    pub estimated_tokens: usize,
    /// Whether the fragments exceeded the budget and had to be trimmed.
    pub trimmed: bool,
    /// Decisions in packing order (input order when not trimmed).
    pub decisions: Vec<PackDecision>,
}

impl PackReport {
    fn count(&self, pred: impl Fn(PackAction) -> bool) -> usize {
        self.decisions.iter().filter(|d| pred(d.action)).count()
    }

    pub fn whole_count(&self) -> usize {
        self.count(|a| a == PackAction::Whole)
    }

    pub fn summarized_count(&self) -> usize {
        self.count(|a| a == PackAction::Summarized)
    }

    pub fn dropped_count(&self) -> usize {
        self.count(PackAction::is_dropped)
    }
}

// ── Packer ────────────────────────────────────────────────────────────────

/// The budget packer. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct Packer {
    whole_buffer: usize,
    summary_buffer: usize,
    min_fragment_chars: usize,
    estimator: TokenEstimator,
}

impl Packer {
    pub fn new(whole_buffer: usize, summary_buffer: usize, estimator: TokenEstimator) -> Self {
        Self {
            whole_buffer,
            summary_buffer,
            min_fragment_chars: DEFAULT_MIN_FRAGMENT_CHARS,
            estimator,
        }
    }

    /// Sections shorter than this are dropped when trimming.
    pub fn with_min_fragment_chars(mut self, min_fragment_chars: usize) -> Self {
        self.min_fragment_chars = min_fragment_chars;
        self
    }

    /// Pack fragments and return only the text.
    pub fn pack(&self, fragments: &[Fragment], budget: Budget) -> String {
        self.pack_with_report(fragments, budget).text
    }

    /// Pack fragments and report what was kept, summarized and dropped.
    pub fn pack_with_report(&self, fragments: &[Fragment], budget: Budget) -> PackReport {
        let available = budget.available();
        let total = fragments.iter().map(|f| f.estimated_tokens).sum::<usize>()
            + fragments.len().saturating_sub(1) * SEPARATOR_TOKENS;

        if total <= available {
            let text = fragments
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(SEPARATOR);
            let decisions = fragments
                .iter()
                .map(|f| decision(f, f.estimated_tokens, PackAction::Whole))
                .collect();
            return PackReport {
                estimated_tokens: self.estimator.estimate(&text),
                text,
                trimmed: false,
                decisions,
            };
        }

        let whole_ceiling = budget
            .max_tokens
            .saturating_sub(self.whole_buffer.max(budget.reserve));
        let summary_ceiling = budget
            .max_tokens
            .saturating_sub(self.summary_buffer.max(budget.reserve));

        let mut ordered: Vec<&Fragment> = fragments.iter().collect();
        ordered.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.char_len().cmp(&a.char_len()))
        });

        let mut pieces: Vec<String> = Vec::new();
        let mut decisions = Vec::with_capacity(ordered.len());
        let mut running = 0usize;
        let mut dropped_floor: Option<u8> = None;

        for fragment in ordered {
            if is_noise(fragment, self.min_fragment_chars) {
                decisions.push(decision(fragment, 0, PackAction::DroppedNoise));
                continue;
            }
            if dropped_floor.is_some_and(|floor| fragment.priority < floor) {
                decisions.push(decision(fragment, 0, PackAction::DroppedPrecedence));
                continue;
            }

            let separator = if pieces.is_empty() { 0 } else { SEPARATOR_TOKENS };

            if running + separator + fragment.estimated_tokens <= whole_ceiling {
                running += separator + fragment.estimated_tokens;
                pieces.push(fragment.text.clone());
                decisions.push(decision(fragment, fragment.estimated_tokens, PackAction::Whole));
                continue;
            }

            let summarized = summarize(fragment).map(|s| format!("{SUMMARY_TAG} {s}"));
            if let Some(summary) = summarized {
                let tokens = self.estimator.estimate(&summary);
                if running + separator + tokens <= summary_ceiling {
                    running += separator + tokens;
                    pieces.push(summary);
                    decisions.push(decision(fragment, tokens, PackAction::Summarized));
                    continue;
                }
            }

            debug!(
                source_id = %fragment.source_id,
                category = %fragment.category,
                tokens = fragment.estimated_tokens,
                "Fragment dropped: no room whole or summarized"
            );
            decisions.push(decision(fragment, 0, PackAction::DroppedNoRoom));
            dropped_floor.get_or_insert(fragment.priority);
        }

        let text = pieces.join(SEPARATOR);
        let report = PackReport {
            estimated_tokens: self.estimator.estimate(&text),
            text,
            trimmed: true,
            decisions,
        };
        debug!(
            budget = budget.max_tokens,
            reserve = budget.reserve,
            input_tokens = total,
            output_tokens = report.estimated_tokens,
            whole = report.whole_count(),
            summarized = report.summarized_count(),
            dropped = report.dropped_count(),
            "Fragments packed"
        );
        report
    }
}

impl Default for Packer {
    fn default() -> Self {
        Self::new(
            DEFAULT_WHOLE_BUFFER,
            DEFAULT_SUMMARY_BUFFER,
            TokenEstimator::default(),
        )
    }
}

fn decision(fragment: &Fragment, spent_tokens: usize, action: PackAction) -> PackDecision {
    PackDecision {
        source_id: fragment.source_id.clone(),
        category: fragment.category,
        priority: fragment.priority,
        fragment_tokens: fragment.estimated_tokens,
        spent_tokens,
        action,
    }
}
