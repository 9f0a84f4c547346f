//! # reflex-extraction
//!
//! Pure text analysis: keyword-based domain classification and
//! template-driven extraction of forward-looking statements from
//! assistant output. No I/O, no retries, fully deterministic.

pub mod classifier;
pub mod extractor;
pub mod templates;

pub use classifier::classify;
pub use extractor::{extract, ExtractedPrediction};
