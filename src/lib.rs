// src/lib.rs — Library root for draftsmith

pub mod core;
pub mod evaluator;
pub mod generator;
pub mod infra;
pub mod merger;
pub mod oracle;
pub mod provider;
pub mod util;

pub use crate::core::engine::EvolutionEngine;
pub use crate::core::types::{
    EvolutionConfig, EvolutionInput, EvolutionOutcome, Evidence, ProgressEvent,
    SectionRequirements, TerminationReason,
};
pub use crate::infra::config::Config;
pub use crate::infra::errors::EvolveError;
pub use crate::merger::MergeStrategy;
