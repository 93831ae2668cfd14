// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::infra::errors::EvolveError;
use crate::merger::MergeStrategy;

/// Score assumed for a dimension the judge could not score.
pub const NEUTRAL_SCORE: f64 = 3.0;

/// Scores at or above this mark a dimension (or variant) as high quality.
pub const HIGH_QUALITY_SCORE: f64 = 4.0;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

/// Per-dimension scores on the 1–5 scale.
pub type DimensionScores = BTreeMap<Dimension, f64>;

/// A quality dimension the judge scores every variant on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Accuracy,
    Completeness,
    Coherence,
    Originality,
    EvidenceQuality,
    LogicalFlow,
    CriticalThinking,
    SynthesisQuality,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::Accuracy,
        Dimension::Completeness,
        Dimension::Coherence,
        Dimension::Originality,
        Dimension::EvidenceQuality,
        Dimension::LogicalFlow,
        Dimension::CriticalThinking,
        Dimension::SynthesisQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Accuracy => "accuracy",
            Dimension::Completeness => "completeness",
            Dimension::Coherence => "coherence",
            Dimension::Originality => "originality",
            Dimension::EvidenceQuality => "evidence_quality",
            Dimension::LogicalFlow => "logical_flow",
            Dimension::CriticalThinking => "critical_thinking",
            Dimension::SynthesisQuality => "synthesis_quality",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = EvolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| EvolveError::InvalidInput(format!("unknown dimension '{}'", s)))
    }
}

/// One piece of supporting evidence gathered upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub title: String,
    pub body: String,
    /// Source quality in [0, 1].
    pub quality_score: f64,
    /// Relevance to the section in [0, 1].
    pub relevance_score: f64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
}

impl Evidence {
    pub fn new(title: impl Into<String>, body: impl Into<String>, quality: f64, relevance: f64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            quality_score: quality,
            relevance_score: relevance,
            url: None,
            source_type: None,
        }
    }
}

/// What the section being evolved must cover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionRequirements {
    #[serde(default)]
    pub required_elements: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub evidence_types: Vec<String>,
}

impl SectionRequirements {
    pub fn new(required_elements: Vec<String>) -> Self {
        Self {
            required_elements,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required_elements.iter().all(|e| e.trim().is_empty())
            && self.key_concepts.iter().all(|c| c.trim().is_empty())
    }
}

/// Where a variant's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantOrigin {
    Oracle,
    Fallback,
}

impl std::fmt::Display for VariantOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantOrigin::Oracle => write!(f, "oracle"),
            VariantOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// One alternative rendering produced by a single strategy within one iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentVariant {
    pub id: String,
    pub strategy: String,
    pub content: String,
    pub origin: VariantOrigin,
    pub base_fingerprint: String,
    pub quality_scores: DimensionScores,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
    pub word_count: usize,
}

impl ContentVariant {
    pub fn new(
        strategy: impl Into<String>,
        content: impl Into<String>,
        rationale: impl Into<String>,
        base_content: &str,
    ) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            strategy: strategy.into(),
            word_count: crate::util::word_count(&content),
            content,
            origin: VariantOrigin::Oracle,
            base_fingerprint: crate::util::fingerprint(base_content),
            quality_scores: DimensionScores::new(),
            rationale: rationale.into(),
            created_at: Utc::now(),
        }
    }

    /// A stand-in for a failed generation: the base content with neutral scores.
    pub fn fallback(strategy: impl Into<String>, base_content: &str, reason: &str) -> Self {
        let mut variant = Self::new(
            strategy,
            base_content,
            format!("fallback: {}", reason),
            base_content,
        );
        variant.origin = VariantOrigin::Fallback;
        variant.quality_scores = Dimension::ALL.iter().map(|d| (*d, NEUTRAL_SCORE)).collect();
        variant
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == VariantOrigin::Fallback
    }

    /// Attach judged scores. Consumes the variant so a recorded one is never touched again.
    pub fn with_scores(mut self, scores: DimensionScores) -> Self {
        self.quality_scores = scores;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiquePoint {
    pub id: String,
    pub dimension: Dimension,
    /// 1–5, higher is worse.
    pub severity: u8,
    pub issue: String,
    pub suggested_improvement: String,
    pub evidence_required: Vec<String>,
    pub priority: u8,
}

/// The structured, multi-dimensional assessment of a single variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveCritique {
    pub id: String,
    pub target_variant_id: String,
    pub overall_score: f64,
    pub dimension_scores: DimensionScores,
    pub critique_points: Vec<CritiquePoint>,
    pub improvement_priorities: Vec<String>,
    pub strengths_identified: Vec<String>,
    pub revision_recommendations: Vec<String>,
    /// False when the judge fell back to the neutral critique.
    pub judged: bool,
    pub created_at: DateTime<Utc>,
}

/// Score statistics for the variants of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMetrics {
    pub score_variance: f64,
    pub max_score: f64,
    pub avg_score: f64,
    pub score_range: f64,
    pub high_quality_count: usize,
}

impl ConvergenceMetrics {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let max = scores.iter().copied().fold(f64::MIN, f64::max);
        let min = scores.iter().copied().fold(f64::MAX, f64::min);
        Self {
            score_variance: variance(scores),
            max_score: max,
            avg_score: mean(scores),
            score_range: max - min,
            high_quality_count: scores.iter().filter(|s| **s >= HIGH_QUALITY_SCORE).count(),
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; zero for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Audit record of one generate→judge→merge pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionIteration {
    pub id: String,
    pub iteration: u32,
    pub base_fingerprint: String,
    pub variants: Vec<ContentVariant>,
    pub critiques: Vec<ComprehensiveCritique>,
    pub merged_content: String,
    /// Highest overall score among this iteration's critiques.
    pub iteration_best: f64,
    /// `iteration_best` minus the best score going into the iteration.
    pub quality_improvement: f64,
    pub metrics: ConvergenceMetrics,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
}

impl EvolutionIteration {
    pub fn fallback_count(&self) -> usize {
        self.variants.iter().filter(|v| v.is_fallback()).count()
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxIterations,
    Converged,
    Plateaued,
    Cancelled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::MaxIterations => write!(f, "max_iterations"),
            TerminationReason::Converged => write!(f, "converged"),
            TerminationReason::Plateaued => write!(f, "plateaued"),
            TerminationReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Input consumed from the surrounding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionInput {
    pub base_content: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub requirements: SectionRequirements,
}

impl EvolutionInput {
    pub fn new(
        base_content: impl Into<String>,
        evidence: Vec<Evidence>,
        requirements: SectionRequirements,
    ) -> Self {
        Self {
            base_content: base_content.into(),
            evidence,
            requirements,
        }
    }

    /// Reject inputs no iteration could make sense of.
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.base_content.trim().is_empty() {
            return Err(EvolveError::InvalidInput("base content is empty".into()));
        }
        if self.requirements.is_empty() {
            return Err(EvolveError::InvalidInput(
                "section requirements are empty".into(),
            ));
        }
        Ok(())
    }
}

/// Final result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionOutcome {
    pub run_id: String,
    pub final_content: String,
    pub final_score: f64,
    pub iterations_completed: u32,
    pub score_history: Vec<f64>,
    pub iterations: Vec<EvolutionIteration>,
    pub termination: TerminationReason,
    pub summary: super::summary::EvolutionSummary,
}

/// Lifecycle notifications for callers that want live feedback.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        max_iterations: u32,
        strategies: usize,
    },
    IterationStart {
        iteration: u32,
        max_iterations: u32,
    },
    VariantFallback {
        iteration: u32,
        strategy: String,
        reason: String,
    },
    IterationEnd {
        iteration: u32,
        iteration_best: f64,
        best_score: f64,
    },
    Complete {
        iterations: u32,
        final_score: f64,
        termination: TerminationReason,
    },
}

/// Configuration for the evolution engine.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub max_iterations: u32,
    pub convergence_threshold: f64,
    pub plateau_window: usize,
    pub quality_improvement_threshold: f64,
    pub merge_strategy: MergeStrategy,
    pub generation_timeout: Duration,
    pub judge_timeout: Duration,
    /// How long in-flight calls may finish after cancellation.
    pub grace_period: Duration,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
    pub evidence_summary_chars: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            convergence_threshold: 4.0,
            plateau_window: 3,
            quality_improvement_threshold: 0.1,
            merge_strategy: MergeStrategy::BestSections,
            generation_timeout: Duration::from_secs(30),
            judge_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(2),
            deadline: None,
            evidence_summary_chars: 1200,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.max_iterations == 0 {
            return Err(EvolveError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.plateau_window == 0 {
            return Err(EvolveError::InvalidConfig(
                "plateau_window must be at least 1".into(),
            ));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.convergence_threshold) {
            return Err(EvolveError::InvalidConfig(format!(
                "convergence_threshold {} outside [1, 5]",
                self.convergence_threshold
            )));
        }
        if self.quality_improvement_threshold < 0.0 {
            return Err(EvolveError::InvalidConfig(
                "quality_improvement_threshold must be non-negative".into(),
            ));
        }
        if self.generation_timeout.is_zero() || self.judge_timeout.is_zero() {
            return Err(EvolveError::InvalidConfig("oracle timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

impl TryFrom<&crate::infra::config::Config> for EvolutionConfig {
    type Error = EvolveError;

    fn try_from(cfg: &crate::infra::config::Config) -> Result<Self, Self::Error> {
        let config = Self {
            max_iterations: cfg.evolution.max_iterations,
            convergence_threshold: cfg.evolution.convergence_threshold,
            plateau_window: cfg.evolution.plateau_window,
            quality_improvement_threshold: cfg.evolution.quality_improvement_threshold,
            merge_strategy: cfg.evolution.merge_strategy.parse()?,
            generation_timeout: Duration::from_millis(cfg.generation.timeout_ms),
            judge_timeout: Duration::from_millis(cfg.judge.timeout_ms),
            grace_period: Duration::from_millis(cfg.cancellation.grace_period_ms),
            deadline: cfg.evolution.deadline_seconds.map(Duration::from_secs),
            evidence_summary_chars: cfg.generation.evidence_summary_chars,
        };
        config.validate()?;
        Ok(config)
    }
}
