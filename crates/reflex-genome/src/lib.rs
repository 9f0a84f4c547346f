//! Failure-pattern mining and gene governance: recurring wrong
//! predictions become patterns, patterns cross a frequency threshold
//! and promote into strength-scored behavioral genes.

mod genome;
mod miner;
mod signature;

pub use genome::{CreateGeneRequest, Genome};
pub use miner::{MiningResult, PatternMiner};
pub use signature::{failure_signature, is_capability_reducing, FALLBACK_SIGNATURE};
