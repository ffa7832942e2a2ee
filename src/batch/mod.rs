//! Batch orchestration: concurrent page fetches fanning out into photo downloads.

mod orchestrator;
mod stats;

pub use orchestrator::{BatchConfig, BatchError, BatchOrchestrator};
pub use stats::{BatchReport, BatchStats};
