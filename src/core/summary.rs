// src/core/summary.rs — End-of-run analysis of an evolution trajectory

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{variance, EvolutionIteration, TerminationReason};

const STABLE_VARIANCE: f64 = 0.1;
const STABILITY_WINDOW: usize = 3;
const LOW_IMPROVEMENT_RATE: f64 = 0.1;
const HIGH_IMPROVEMENT_RATE: f64 = 0.3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSummary {
    pub total_variants: usize,
    pub variants_per_strategy: BTreeMap<String, usize>,
    pub fallbacks_per_strategy: BTreeMap<String, usize>,
    /// Last running-best score minus the first.
    pub total_improvement: f64,
    /// Step between consecutive running-best scores.
    pub improvement_per_iteration: Vec<f64>,
    pub peak_score: f64,
    pub convergence_achieved: bool,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl EvolutionSummary {
    pub fn compile(
        iterations: &[EvolutionIteration],
        score_history: &[f64],
        termination: TerminationReason,
        max_iterations: u32,
    ) -> Self {
        let mut variants_per_strategy = BTreeMap::new();
        let mut fallbacks_per_strategy = BTreeMap::new();
        for variant in iterations.iter().flat_map(|it| &it.variants) {
            *variants_per_strategy.entry(variant.strategy.clone()).or_insert(0) += 1;
            if variant.is_fallback() {
                *fallbacks_per_strategy.entry(variant.strategy.clone()).or_insert(0) += 1;
            }
        }
        let total_variants = variants_per_strategy.values().sum();

        let improvement_per_iteration: Vec<f64> =
            score_history.windows(2).map(|w| w[1] - w[0]).collect();
        let total_improvement = match (score_history.first(), score_history.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        let peak_score = score_history.iter().copied().fold(0.0, f64::max);

        let mut summary = Self {
            total_variants,
            variants_per_strategy,
            fallbacks_per_strategy,
            total_improvement,
            improvement_per_iteration,
            peak_score,
            convergence_achieved: termination == TerminationReason::Converged,
            insights: Vec::new(),
            recommendations: Vec::new(),
        };
        summary.insights = summary.derive_insights(score_history);
        summary.recommendations = summary.derive_recommendations(score_history, max_iterations);
        summary
    }

    pub fn total_fallbacks(&self) -> usize {
        self.fallbacks_per_strategy.values().sum()
    }

    fn derive_insights(&self, history: &[f64]) -> Vec<String> {
        let mut insights = Vec::new();

        if history.len() >= 2 {
            if self.total_improvement > 0.0 {
                insights.push(format!(
                    "Quality improved by {:.2} points through evolution",
                    self.total_improvement
                ));
            }
            let best_step = self
                .improvement_per_iteration
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                    Some((_, b)) if *d <= b => best,
                    _ => Some((i, *d)),
                });
            if let Some((i, delta)) = best_step {
                if delta > 0.0 {
                    // windows index 0 is the step into iteration 2
                    insights.push(format!("Greatest improvement occurred in iteration {}", i + 2));
                }
            }
        }

        let fallbacks = self.total_fallbacks();
        if fallbacks > 0 {
            insights.push(format!(
                "{} of {} variants fell back to the base content",
                fallbacks, self.total_variants
            ));
        }

        if history.len() >= STABILITY_WINDOW {
            let recent = &history[history.len() - STABILITY_WINDOW..];
            if variance(recent) < STABLE_VARIANCE {
                insights.push("Evolution converged to stable quality level".into());
            } else {
                insights.push("Quality continued to vary in recent iterations".into());
            }
        }

        insights
    }

    fn derive_recommendations(&self, history: &[f64], max_iterations: u32) -> Vec<String> {
        let mut recommendations = Vec::new();
        let final_score = history.last().copied().unwrap_or(0.0);

        if final_score < 3.5 {
            recommendations
                .push("Consider additional iterations with focus on accuracy and completeness".into());
        } else if final_score < 4.0 {
            recommendations.push("Focus on coherence and evidence quality improvements".into());
        } else {
            recommendations.push("Excellent quality achieved - consider finalizing content".into());
        }

        if history.len() >= max_iterations as usize {
            recommendations.push(
                "Maximum iterations reached - consider increasing iteration limit if more improvement needed"
                    .into(),
            );
        }

        if history.len() >= 2 {
            let rate = self.total_improvement / history.len() as f64;
            if rate < LOW_IMPROVEMENT_RATE {
                recommendations
                    .push("Low improvement rate - consider adjusting generation strategies".into());
            } else if rate > HIGH_IMPROVEMENT_RATE {
                recommendations.push("High improvement rate - current strategies are effective".into());
            }
        }

        recommendations
    }
}
