// src/evaluator/rubric.rs — Declarative, validated scoring rubric

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::types::{
    Dimension, DimensionScores, Evidence, SectionRequirements, MAX_SCORE, MIN_SCORE,
};
use crate::infra::errors::EvolveError;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// What a per-dimension scoring function gets to look at.
pub struct ScoringContext<'a> {
    pub dimension: Dimension,
    /// Raw scores returned by the judging oracle.
    pub oracle_scores: &'a DimensionScores,
    pub content: &'a str,
    pub requirements: &'a SectionRequirements,
    pub evidence: &'a [Evidence],
}

/// Turns oracle output (and anything else in the context) into one dimension score.
/// `None` means "no opinion" and is scored neutral.
pub type ScoringFn = Arc<dyn Fn(&ScoringContext<'_>) -> Option<f64> + Send + Sync>;

/// The default scorer: take whatever the oracle said for this dimension.
pub fn oracle_scorer() -> ScoringFn {
    Arc::new(|ctx: &ScoringContext<'_>| ctx.oracle_scores.get(&ctx.dimension).copied())
}

/// Share of required elements mentioned in the content, mapped onto 1–5.
pub fn coverage_scorer() -> ScoringFn {
    Arc::new(|ctx: &ScoringContext<'_>| {
        let required: Vec<&String> = ctx
            .requirements
            .required_elements
            .iter()
            .filter(|e| !e.trim().is_empty())
            .collect();
        if required.is_empty() {
            return ctx.oracle_scores.get(&ctx.dimension).copied();
        }
        let lower = ctx.content.to_lowercase();
        let covered = required
            .iter()
            .filter(|e| lower.contains(&e.to_lowercase()))
            .count();
        Some(MIN_SCORE + (covered as f64 / required.len() as f64) * (MAX_SCORE - MIN_SCORE))
    })
}

#[derive(Clone)]
pub struct RubricEntry {
    pub dimension: Dimension,
    pub weight: f64,
    pub scorer: ScoringFn,
}

impl std::fmt::Debug for RubricEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RubricEntry")
            .field("dimension", &self.dimension)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Ordered list of `(dimension, weight, scorer)`; weights always sum to 1.0.
#[derive(Debug, Clone)]
pub struct Rubric {
    entries: Vec<RubricEntry>,
}

impl Default for Rubric {
    fn default() -> Self {
        Self::standard()
    }
}

impl Rubric {
    /// The eight-dimension research rubric, every dimension scored by the oracle.
    pub fn standard() -> Self {
        let weights = [
            (Dimension::Accuracy, 0.20),
            (Dimension::Completeness, 0.15),
            (Dimension::Coherence, 0.15),
            (Dimension::Originality, 0.10),
            (Dimension::EvidenceQuality, 0.15),
            (Dimension::LogicalFlow, 0.10),
            (Dimension::CriticalThinking, 0.10),
            (Dimension::SynthesisQuality, 0.05),
        ];
        Self {
            entries: weights
                .into_iter()
                .map(|(dimension, weight)| RubricEntry {
                    dimension,
                    weight,
                    scorer: oracle_scorer(),
                })
                .collect(),
        }
    }

    /// Build a rubric from explicit entries, rejecting bad weight tables.
    pub fn new(entries: Vec<RubricEntry>) -> Result<Self, EvolveError> {
        let rubric = Self { entries };
        rubric.validate()?;
        Ok(rubric)
    }

    /// Replace weights by dimension name. Dimensions not named keep their weight.
    pub fn with_weights(mut self, overrides: &BTreeMap<String, f64>) -> Result<Self, EvolveError> {
        for (name, weight) in overrides {
            let dimension: Dimension = name.parse()?;
            let entry = self
                .entries
                .iter_mut()
                .find(|e| e.dimension == dimension)
                .ok_or_else(|| {
                    EvolveError::InvalidConfig(format!("dimension '{}' not in rubric", name))
                })?;
            entry.weight = *weight;
        }
        self.validate()?;
        Ok(self)
    }

    /// Swap the scoring function for one dimension.
    pub fn with_scorer(mut self, dimension: Dimension, scorer: ScoringFn) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.dimension == dimension) {
            entry.scorer = scorer;
        }
        self
    }

    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.entries.is_empty() {
            return Err(EvolveError::InvalidConfig("rubric has no dimensions".into()));
        }
        if let Some(bad) = self.entries.iter().find(|e| e.weight.is_nan() || e.weight < 0.0) {
            return Err(EvolveError::InvalidConfig(format!(
                "weight for '{}' must be non-negative",
                bad.dimension
            )));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|e| e.dimension == entry.dimension) {
                return Err(EvolveError::InvalidConfig(format!(
                    "dimension '{}' listed twice",
                    entry.dimension
                )));
            }
        }
        let sum = self.total_weight();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EvolveError::RubricWeights { sum });
        }
        Ok(())
    }

    pub fn entries(&self) -> &[RubricEntry] {
        &self.entries
    }

    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.entries.iter().map(|e| e.dimension)
    }

    pub fn weight(&self, dimension: Dimension) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.dimension == dimension)
            .map(|e| e.weight)
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// `Σ score × weight`, with missing dimensions neutral and the result clamped to 1–5.
    pub fn overall_score(&self, scores: &DimensionScores) -> f64 {
        let total: f64 = self
            .entries
            .iter()
            .map(|e| {
                let score = scores
                    .get(&e.dimension)
                    .copied()
                    .unwrap_or(crate::core::types::NEUTRAL_SCORE);
                clamp_score(score) * e.weight
            })
            .sum();
        clamp_score(total)
    }
}

/// Clamp into the 1–5 scale; NaN becomes neutral.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return crate::core::types::NEUTRAL_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

impl Dimension {
    pub fn description(&self) -> &'static str {
        match self {
            Dimension::Accuracy => "Factual correctness and evidence alignment",
            Dimension::Completeness => "Coverage of required topics and aspects",
            Dimension::Coherence => "Logical flow and structural organization",
            Dimension::Originality => "Novel insights and creative analysis",
            Dimension::EvidenceQuality => "Quality and integration of supporting evidence",
            Dimension::LogicalFlow => "Reasoning quality and argumentative structure",
            Dimension::CriticalThinking => "Critical analysis and evaluation depth",
            Dimension::SynthesisQuality => "Integration of multiple perspectives and sources",
        }
    }

    /// Anchor text for the top (5) and bottom (1) of the scale.
    pub fn anchors(&self) -> (&'static str, &'static str) {
        match self {
            Dimension::Accuracy => (
                "All facts accurate, evidence properly cited",
                "Significant inaccuracies or misleading information",
            ),
            Dimension::Completeness => (
                "Comprehensive coverage of all required aspects",
                "Major aspects missing or superficial treatment",
            ),
            Dimension::Coherence => (
                "Excellent logical flow with clear connections",
                "Incoherent structure and illogical progression",
            ),
            Dimension::Originality => (
                "Highly original insights and creative synthesis",
                "No original thinking, entirely conventional",
            ),
            Dimension::EvidenceQuality => (
                "High-quality evidence expertly integrated",
                "Insufficient or irrelevant evidence",
            ),
            Dimension::LogicalFlow => (
                "Exceptional reasoning with strong arguments",
                "Poor reasoning with major logical errors",
            ),
            Dimension::CriticalThinking => (
                "Exceptional critical analysis and evaluation",
                "Lacks critical analysis or evaluation",
            ),
            Dimension::SynthesisQuality => (
                "Masterful synthesis of diverse perspectives",
                "No meaningful synthesis or integration",
            ),
        }
    }

    pub fn improvement_suggestion(&self) -> &'static str {
        match self {
            Dimension::Accuracy => "Strengthen factual claims with additional evidence and citations",
            Dimension::Completeness => "Address missing required elements and expand coverage",
            Dimension::Coherence => "Improve logical flow and paragraph transitions",
            Dimension::Originality => "Add unique insights and creative analytical perspectives",
            Dimension::EvidenceQuality => "Integrate higher-quality sources and evidence",
            Dimension::LogicalFlow => "Strengthen reasoning and argumentative structure",
            Dimension::CriticalThinking => "Add critical evaluation and alternative perspectives",
            Dimension::SynthesisQuality => "Better integrate multiple sources and viewpoints",
        }
    }

    /// Kinds of evidence that would fix a low score on this dimension.
    pub fn evidence_requirements(&self) -> &'static [&'static str] {
        match self {
            Dimension::Accuracy => &["peer-reviewed sources", "recent data", "authoritative references"],
            Dimension::Completeness => &[
                "comprehensive coverage",
                "additional perspectives",
                "missing elements",
            ],
            Dimension::Coherence => &["clear transitions", "logical structure", "topic sentences"],
            Dimension::Originality => &["novel case studies", "cross-domain comparisons"],
            Dimension::EvidenceQuality => &["high-impact sources", "primary research", "expert opinions"],
            Dimension::LogicalFlow => &["causal evidence", "stepwise argumentation"],
            Dimension::CriticalThinking => &["counterarguments", "limitations analysis", "contrasting studies"],
            Dimension::SynthesisQuality => &["multiple independent sources", "comparative reviews"],
        }
    }
}
