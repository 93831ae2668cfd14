// src/evaluator/critique.rs — Turn dimension scores into a structured critique

use chrono::Utc;

use super::rubric::Rubric;
use crate::core::types::{
    ComprehensiveCritique, CritiquePoint, Dimension, DimensionScores, HIGH_QUALITY_SCORE,
    NEUTRAL_SCORE,
};

/// Dimensions below this get a critique point.
const CRITIQUE_THRESHOLD: f64 = 3.0;
/// Dimensions below this are candidates for the improvement priority list.
const PRIORITY_THRESHOLD: f64 = 3.5;
const MAX_PRIORITIES: usize = 3;
const HIGH_PRIORITY: u8 = 4;
const MEDIUM_PRIORITY: u8 = 3;
const MAX_MEDIUM_RECOMMENDATIONS: usize = 2;

/// Build the critique for one variant from its (already clamped) dimension scores.
pub fn build_critique(
    variant_id: &str,
    scores: DimensionScores,
    rubric: &Rubric,
) -> ComprehensiveCritique {
    let overall_score = rubric.overall_score(&scores);
    let critique_points = critique_points(&scores, rubric);
    let revision_recommendations = revision_recommendations(&critique_points);

    ComprehensiveCritique {
        id: uuid::Uuid::new_v4().to_string(),
        target_variant_id: variant_id.to_string(),
        overall_score,
        improvement_priorities: improvement_priorities(&scores),
        strengths_identified: strengths(&scores),
        dimension_scores: scores,
        critique_points,
        revision_recommendations,
        judged: true,
        created_at: Utc::now(),
    }
}

/// The critique used when the judge could not score a variant.
pub fn neutral_critique(variant_id: &str, rubric: &Rubric, reason: &str) -> ComprehensiveCritique {
    let scores: DimensionScores = rubric.dimensions().map(|d| (d, NEUTRAL_SCORE)).collect();
    let dimension = rubric.dimensions().next().unwrap_or(Dimension::Accuracy);

    ComprehensiveCritique {
        id: uuid::Uuid::new_v4().to_string(),
        target_variant_id: variant_id.to_string(),
        overall_score: NEUTRAL_SCORE,
        dimension_scores: scores,
        critique_points: vec![CritiquePoint {
            id: uuid::Uuid::new_v4().to_string(),
            dimension,
            severity: 1,
            issue: format!("Variant could not be judged ({})", reason),
            suggested_improvement: "Re-evaluate once the judge is available".into(),
            evidence_required: Vec::new(),
            priority: 1,
        }],
        improvement_priorities: Vec::new(),
        strengths_identified: Vec::new(),
        revision_recommendations: Vec::new(),
        judged: false,
        created_at: Utc::now(),
    }
}

/// `round(4 − score)` clamped to 1–5: a 2.9 is severity 1, a 1.0 is severity 3.
pub fn severity_for(score: f64) -> u8 {
    (4.0 - score).round().clamp(1.0, 5.0) as u8
}

fn critique_points(scores: &DimensionScores, rubric: &Rubric) -> Vec<CritiquePoint> {
    rubric
        .dimensions()
        .filter_map(|dimension| {
            let score = scores.get(&dimension).copied().unwrap_or(NEUTRAL_SCORE);
            if score >= CRITIQUE_THRESHOLD {
                return None;
            }
            let severity = severity_for(score);
            Some(CritiquePoint {
                id: uuid::Uuid::new_v4().to_string(),
                dimension,
                severity,
                issue: format!(
                    "{} below standard ({:.1}/5): {}",
                    dimension,
                    score,
                    dimension.description().to_lowercase()
                ),
                suggested_improvement: dimension.improvement_suggestion().to_string(),
                evidence_required: dimension
                    .evidence_requirements()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                priority: severity,
            })
        })
        .collect()
}

/// Up to three weakest dimensions under 3.5, weakest first.
fn improvement_priorities(scores: &DimensionScores) -> Vec<String> {
    let mut weak: Vec<(Dimension, f64)> = scores
        .iter()
        .filter(|(_, s)| **s < PRIORITY_THRESHOLD)
        .map(|(d, s)| (*d, *s))
        .collect();
    weak.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    weak.into_iter()
        .take(MAX_PRIORITIES)
        .map(|(d, _)| d.to_string())
        .collect()
}

fn strengths(scores: &DimensionScores) -> Vec<String> {
    scores
        .iter()
        .filter(|(_, s)| **s >= HIGH_QUALITY_SCORE)
        .map(|(d, _)| d.to_string())
        .collect()
}

fn revision_recommendations(points: &[CritiquePoint]) -> Vec<String> {
    let high = points
        .iter()
        .filter(|p| p.priority >= HIGH_PRIORITY)
        .map(|p| format!("HIGH PRIORITY: {}", p.suggested_improvement));
    let medium = points
        .iter()
        .filter(|p| p.priority == MEDIUM_PRIORITY)
        .take(MAX_MEDIUM_RECOMMENDATIONS)
        .map(|p| format!("MEDIUM PRIORITY: {}", p.suggested_improvement));
    high.chain(medium).collect()
}
