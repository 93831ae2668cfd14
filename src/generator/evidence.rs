// src/generator/evidence.rs — Condense research evidence for generation prompts

use crate::core::types::Evidence;
use crate::util::truncate_str;

pub const NO_EVIDENCE: &str = "No additional research evidence available.";

const HIGH_QUALITY_MIN: f64 = 0.7;
const MEDIUM_QUALITY_MIN: f64 = 0.4;
const HIGH_QUALITY_ITEMS: usize = 3;
const MEDIUM_QUALITY_ITEMS: usize = 2;
const HIGH_QUALITY_BODY_CHARS: usize = 200;
const MEDIUM_QUALITY_BODY_CHARS: usize = 150;

/// Summarize evidence, best sources first, in at most `max_chars` bytes.
///
/// High-quality items (quality > 0.7) come first, then supporting items
/// (0.4 ≤ quality ≤ 0.7). Anything weaker is left out.
pub fn summarize_evidence(evidence: &[Evidence], max_chars: usize) -> String {
    let mut ranked: Vec<&Evidence> = evidence.iter().collect();
    ranked.sort_by(|a, b| {
        b.quality_score
            .partial_cmp(&a.quality_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let high: Vec<&Evidence> = ranked
        .iter()
        .copied()
        .filter(|e| e.quality_score > HIGH_QUALITY_MIN)
        .take(HIGH_QUALITY_ITEMS)
        .collect();
    let medium: Vec<&Evidence> = ranked
        .iter()
        .copied()
        .filter(|e| (MEDIUM_QUALITY_MIN..=HIGH_QUALITY_MIN).contains(&e.quality_score))
        .take(MEDIUM_QUALITY_ITEMS)
        .collect();

    if high.is_empty() && medium.is_empty() {
        return NO_EVIDENCE.to_string();
    }

    let mut parts = Vec::new();
    if !high.is_empty() {
        parts.push("High-Quality Evidence:".to_string());
        parts.extend(high.iter().map(|e| bullet(e, HIGH_QUALITY_BODY_CHARS)));
    }
    if !medium.is_empty() {
        if !parts.is_empty() {
            parts.push(String::new());
        }
        parts.push("Supporting Evidence:".to_string());
        parts.extend(medium.iter().map(|e| bullet(e, MEDIUM_QUALITY_BODY_CHARS)));
    }

    let summary = parts.join("\n");
    truncate_str(&summary, max_chars).to_string()
}

fn bullet(evidence: &Evidence, body_chars: usize) -> String {
    let body = evidence.body.trim();
    let cut = truncate_str(body, body_chars);
    let ellipsis = if cut.len() < body.len() { "..." } else { "" };
    format!("- {}: {}{}", evidence.title.trim(), cut, ellipsis)
}
