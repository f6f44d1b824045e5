//! Session memory for memoforge.

pub mod session;

pub use session::{
    DEFAULT_CAPACITY, EntryMetadata, KIND_EXTRACTED_SOURCE, KIND_FULL_CONTENT,
    KIND_FULL_CONTENT_STORED, SessionEntry, SessionMemory,
};
