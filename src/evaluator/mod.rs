// src/evaluator/mod.rs — Quality judge: scores variants against the rubric

pub mod critique;
pub mod parser;
pub mod rubric;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::core::types::{
    ComprehensiveCritique, ContentVariant, DimensionScores, Evidence, SectionRequirements,
};
use crate::infra::errors::EvolveError;
use crate::oracle::{JudgeOracle, JudgeRequest};
use rubric::{clamp_score, Rubric, ScoringContext};

/// Scores variants through a judging oracle and turns the scores into critiques.
///
/// Never fails: an oracle error or timeout yields the neutral critique.
pub struct QualityJudge {
    oracle: Arc<dyn JudgeOracle>,
    rubric: Rubric,
    timeout: Duration,
}

impl QualityJudge {
    pub fn new(oracle: Arc<dyn JudgeOracle>, rubric: Rubric, timeout: Duration) -> Result<Self, EvolveError> {
        rubric.validate()?;
        Ok(Self {
            oracle,
            rubric,
            timeout,
        })
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Judge one variant.
    pub async fn evaluate(
        &self,
        variant: &ContentVariant,
        requirements: &SectionRequirements,
        evidence: &[Evidence],
    ) -> ComprehensiveCritique {
        match self.score(&variant.content, requirements, evidence).await {
            Ok(scores) => {
                let critique = critique::build_critique(&variant.id, scores, &self.rubric);
                tracing::debug!(
                    strategy = %variant.strategy,
                    score = critique.overall_score,
                    points = critique.critique_points.len(),
                    "Variant judged"
                );
                critique
            }
            Err(e) => {
                tracing::warn!(
                    strategy = %variant.strategy,
                    judge = self.oracle.name(),
                    "Judging failed, using neutral critique: {}",
                    e
                );
                critique::neutral_critique(&variant.id, &self.rubric, &e.to_string())
            }
        }
    }

    /// Judge all variants concurrently. Each variant comes back with its scores
    /// attached, paired with its critique, in input order.
    pub async fn evaluate_all(
        &self,
        variants: Vec<ContentVariant>,
        requirements: &SectionRequirements,
        evidence: &[Evidence],
    ) -> Vec<(ContentVariant, ComprehensiveCritique)> {
        let critiques = join_all(
            variants
                .iter()
                .map(|v| self.evaluate(v, requirements, evidence)),
        )
        .await;

        variants
            .into_iter()
            .zip(critiques)
            .map(|(variant, critique)| {
                let scored = variant.with_scores(critique.dimension_scores.clone());
                (scored, critique)
            })
            .collect()
    }

    /// Ask the oracle, then run every rubric entry's scorer over its answer.
    async fn score(
        &self,
        content: &str,
        requirements: &SectionRequirements,
        evidence: &[Evidence],
    ) -> Result<DimensionScores, EvolveError> {
        let request = JudgeRequest {
            content,
            requirements,
            evidence,
            rubric: &self.rubric,
        };
        let oracle_scores = tokio::time::timeout(self.timeout, self.oracle.judge(request))
            .await
            .map_err(|_| EvolveError::OracleTimeout {
                oracle: self.oracle.name().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        Ok(self
            .rubric
            .entries()
            .iter()
            .map(|entry| {
                let ctx = ScoringContext {
                    dimension: entry.dimension,
                    oracle_scores: &oracle_scores,
                    content,
                    requirements,
                    evidence,
                };
                let score = (entry.scorer)(&ctx)
                    .map(clamp_score)
                    .unwrap_or(crate::core::types::NEUTRAL_SCORE);
                (entry.dimension, score)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Dimension;
    use async_trait::async_trait;

    struct FixedJudge(DimensionScores);

    #[async_trait]
    impl JudgeOracle for FixedJudge {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn judge(&self, _request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
            Ok(self.0.clone())
        }
    }

    struct FailingJudge;

    #[async_trait]
    impl JudgeOracle for FailingJudge {
        fn name(&self) -> &str {
            "failing"
        }
        async fn judge(&self, _request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
            Err(EvolveError::oracle("failing", "boom"))
        }
    }

    struct SlowJudge;

    #[async_trait]
    impl JudgeOracle for SlowJudge {
        fn name(&self) -> &str {
            "slow"
        }
        async fn judge(&self, _request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(DimensionScores::new())
        }
    }

    fn judge(oracle: impl JudgeOracle + 'static) -> QualityJudge {
        QualityJudge::new(Arc::new(oracle), Rubric::standard(), Duration::from_millis(50)).unwrap()
    }

    fn reqs() -> SectionRequirements {
        SectionRequirements::new(vec!["X".into()])
    }

    #[tokio::test]
    async fn test_evaluate_partial_scores_default_neutral() {
        let mut scores = DimensionScores::new();
        scores.insert(Dimension::Accuracy, 5.0);
        let j = judge(FixedJudge(scores));
        let v = ContentVariant::new("s", "X improves Y.", "", "base");
        let c = j.evaluate(&v, &reqs(), &[]).await;
        assert_eq!(c.dimension_scores.len(), 8);
        assert_eq!(c.dimension_scores[&Dimension::Coherence], 3.0);
        // 0.2 × 5 + 0.8 × 3
        assert!((c.overall_score - 3.4).abs() < 1e-9);
        assert_eq!(c.target_variant_id, v.id);
    }

    #[tokio::test]
    async fn test_evaluate_clamps_oracle_scores() {
        let scores: DimensionScores = Dimension::ALL.iter().map(|d| (*d, 9.0)).collect();
        let j = judge(FixedJudge(scores));
        let v = ContentVariant::new("s", "text", "", "base");
        let c = j.evaluate(&v, &reqs(), &[]).await;
        assert!(c.dimension_scores.values().all(|s| *s == 5.0));
        assert!((c.overall_score - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_evaluate_oracle_failure_is_neutral() {
        let j = judge(FailingJudge);
        let v = ContentVariant::new("s", "text", "", "base");
        let c = j.evaluate(&v, &reqs(), &[]).await;
        assert!(!c.judged);
        assert_eq!(c.overall_score, 3.0);
    }

    #[tokio::test]
    async fn test_evaluate_timeout_is_neutral() {
        let j = judge(SlowJudge);
        let v = ContentVariant::new("s", "text", "", "base");
        let c = j.evaluate(&v, &reqs(), &[]).await;
        assert!(!c.judged);
        assert_eq!(c.overall_score, 3.0);
    }

    #[tokio::test]
    async fn test_evaluate_all_attaches_scores_in_order() {
        let scores: DimensionScores = Dimension::ALL.iter().map(|d| (*d, 4.0)).collect();
        let j = judge(FixedJudge(scores));
        let variants = vec![
            ContentVariant::new("a", "one", "", "base"),
            ContentVariant::new("b", "two", "", "base"),
        ];
        let ids: Vec<String> = variants.iter().map(|v| v.id.clone()).collect();
        let judged = j.evaluate_all(variants, &reqs(), &[]).await;
        assert_eq!(judged.len(), 2);
        for ((variant, critique), id) in judged.iter().zip(ids) {
            assert_eq!(variant.id, id);
            assert_eq!(critique.target_variant_id, id);
            assert_eq!(variant.quality_scores.len(), 8);
        }
    }

    #[tokio::test]
    async fn test_custom_scorer_overrides_oracle() {
        let j = QualityJudge::new(
            Arc::new(FixedJudge(DimensionScores::new())),
            Rubric::standard().with_scorer(Dimension::Completeness, rubric::coverage_scorer()),
            Duration::from_secs(1),
        )
        .unwrap();
        let requirements = SectionRequirements::new(vec!["alpha".into(), "beta".into()]);
        let v = ContentVariant::new("s", "Alpha and beta both appear.", "", "base");
        let c = j.evaluate(&v, &requirements, &[]).await;
        assert_eq!(c.dimension_scores[&Dimension::Completeness], 5.0);
    }
}
