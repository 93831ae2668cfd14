// src/evaluator/parser.rs — Parse judge responses into dimension scores

use crate::core::types::{Dimension, DimensionScores};
use crate::infra::errors::EvolveError;

/// Parsed judge output.
#[derive(Debug, Default)]
pub struct ParsedJudgement {
    pub scores: DimensionScores,
    /// Free-text notes the judge attached, kept for logging.
    pub notes: Vec<String>,
}

/// Parse a judge response into per-dimension scores.
///
/// Expected format:
/// ```text
/// SCORES:
/// accuracy: 4.5
/// evidence quality: 3
/// ...
/// NOTES:
/// - anything the judge wants to add
/// ```
///
/// A response without a `SCORES:` header is scanned line by line. Lines that
/// don't name a known dimension or don't carry a number are skipped. Scores
/// outside 1–5 are kept as given; the judge clamps them. A
/// response with no usable score at all is an error, so the caller can fall
/// back to the neutral critique.
pub fn parse_judge_response(response: &str) -> Result<ParsedJudgement, EvolveError> {
    let mut parsed = ParsedJudgement::default();
    let has_header = response
        .lines()
        .any(|l| is_scores_header(l.trim()));
    let mut section = if has_header { Section::None } else { Section::Scores };

    for line in response.lines() {
        let trimmed = line.trim();

        if is_scores_header(trimmed) {
            section = Section::Scores;
            continue;
        }
        if trimmed.starts_with("NOTES:") || trimmed.starts_with("## Notes") {
            section = Section::Notes;
            let rest = trimmed
                .strip_prefix("NOTES:")
                .unwrap_or("")
                .trim();
            if !rest.is_empty() {
                parsed.notes.push(rest.to_string());
            }
            continue;
        }

        match section {
            Section::Scores => {
                if let Some((name, score)) = parse_score_line(trimmed) {
                    if let Ok(dimension) = name.parse::<Dimension>() {
                        parsed.scores.insert(dimension, score);
                    }
                }
            }
            Section::Notes => {
                let note = trimmed.trim_start_matches('-').trim();
                if !note.is_empty() {
                    parsed.notes.push(note.to_string());
                }
            }
            Section::None => {}
        }
    }

    if parsed.scores.is_empty() {
        return Err(EvolveError::oracle(
            "judge",
            "response contained no dimension scores",
        ));
    }
    Ok(parsed)
}

enum Section {
    None,
    Scores,
    Notes,
}

fn is_scores_header(line: &str) -> bool {
    line.starts_with("SCORES:") || line.starts_with("## Scores")
}

/// Parse a line like "accuracy: 4.5", "- accuracy: 4" or "Accuracy: 4/5".
pub(crate) fn parse_score_line(line: &str) -> Option<(String, f64)> {
    let line = line.trim_start_matches(['-', '*']).trim();
    let (name, score_str) = line.split_once(':')?;
    let name = name.trim().trim_matches('*').trim().to_string();
    if name.is_empty() {
        return None;
    }
    let score_str = score_str.trim();
    let score_str = score_str.strip_suffix("/5").unwrap_or(score_str).trim();
    let score: f64 = score_str.parse().ok()?;
    Some((name, score))
}
