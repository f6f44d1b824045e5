//! Context compaction for memoforge: split extracted material into
//! classified fragments and pack them into a token budget.

pub mod classifier;
pub mod packer;
pub mod summarize;
pub mod token;

pub use classifier::{Classifier, DEFAULT_MIN_FRAGMENT_CHARS, categorize, is_noise};
pub use packer::{PackAction, PackDecision, PackReport, Packer, SUMMARY_TAG};
pub use summarize::{key_phrases, summarize};
pub use token::TokenEstimator;
