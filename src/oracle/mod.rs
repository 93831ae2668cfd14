// src/oracle/mod.rs — Generation and judging capabilities the engine depends on
//
// The engine never produces prose or judges it itself. Both jobs go through
// these two traits; either may fail and every failure is tolerated upstream.

pub mod llm;

use async_trait::async_trait;

use crate::core::types::{DimensionScores, Evidence, SectionRequirements};
use crate::evaluator::rubric::Rubric;
use crate::infra::errors::EvolveError;

/// Everything a generation oracle needs to produce one rewrite.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub base_content: &'a str,
    pub evidence_summary: &'a str,
    pub strategy: &'a str,
    /// Strategy-specific rewrite instructions, one per line.
    pub guidance: &'a str,
    pub requirements: &'a SectionRequirements,
}

/// A rewrite and the oracle's explanation of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub content: String,
    pub rationale: String,
}

impl Transformation {
    pub fn new(content: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rationale: rationale.into(),
        }
    }
}

#[async_trait]
pub trait GenerationOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Transformation, EvolveError>;
}

/// Everything a judging oracle needs to score one variant.
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub content: &'a str,
    pub requirements: &'a SectionRequirements,
    pub evidence: &'a [Evidence],
    pub rubric: &'a Rubric,
}

#[async_trait]
pub trait JudgeOracle: Send + Sync {
    fn name(&self) -> &str;

    /// Score the content. Dimensions left out are treated as neutral.
    async fn judge(&self, request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError>;
}
