// src/merger/mod.rs — Combine judged variants into one candidate

pub mod text;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::types::{ComprehensiveCritique, ContentVariant, NEUTRAL_SCORE};
use crate::infra::errors::EvolveError;

/// Share of variants a term must appear in to count as consensus.
const CONSENSUS_SHARE: f64 = 0.6;
const CONSENSUS_MAX_TERMS: usize = 5;
const CONSENSUS_SENTENCES_PER_TERM: usize = 2;
/// Variants at or below this share of the total score are left out of a synthesis.
const SYNTHESIS_MIN_WEIGHT: f64 = 0.3;
const KEY_SENTENCES_PER_VARIANT: usize = 5;
const SYNTHESIS_GROUP_SIZE: usize = 3;
const FOLDED_SENTENCES_PER_VARIANT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    #[default]
    BestSections,
    WeightedSynthesis,
    ConsensusBuilding,
    HierarchicalIntegration,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 4] = [
        MergeStrategy::BestSections,
        MergeStrategy::WeightedSynthesis,
        MergeStrategy::ConsensusBuilding,
        MergeStrategy::HierarchicalIntegration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::BestSections => "best_sections",
            MergeStrategy::WeightedSynthesis => "weighted_synthesis",
            MergeStrategy::ConsensusBuilding => "consensus_building",
            MergeStrategy::HierarchicalIntegration => "hierarchical_integration",
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = EvolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        MergeStrategy::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| EvolveError::UnknownMergeStrategy(s.to_string()))
    }
}

/// Stateless merger. Never fails: a strategy error or empty result falls back
/// to the best single variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantMerger;

impl VariantMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(
        &self,
        variants: &[ContentVariant],
        critiques: &[ComprehensiveCritique],
        strategy: MergeStrategy,
    ) -> String {
        match variants {
            [] => return String::new(),
            [only] => return only.content.clone(),
            _ => {}
        }

        let scores = ScoreTable::new(critiques);
        let merged = match strategy {
            MergeStrategy::BestSections => best_sections(variants, &scores),
            MergeStrategy::WeightedSynthesis => weighted_synthesis(variants, &scores),
            MergeStrategy::ConsensusBuilding => consensus_building(variants),
            MergeStrategy::HierarchicalIntegration => hierarchical_integration(variants, &scores),
        };

        match merged {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                tracing::warn!(strategy = %strategy, "Merge produced no content, using best variant");
                best_variant(variants, critiques, &scores).to_string()
            }
            Err(e) => {
                tracing::warn!(strategy = %strategy, "Merge failed, using best variant: {}", e);
                best_variant(variants, critiques, &scores).to_string()
            }
        }
    }
}

/// Overall score per variant id; variants without a critique count as neutral.
struct ScoreTable<'a> {
    by_variant: HashMap<&'a str, f64>,
}

impl<'a> ScoreTable<'a> {
    fn new(critiques: &'a [ComprehensiveCritique]) -> Self {
        Self {
            by_variant: critiques
                .iter()
                .map(|c| (c.target_variant_id.as_str(), c.overall_score))
                .collect(),
        }
    }

    fn score(&self, variant: &ContentVariant) -> f64 {
        self.by_variant
            .get(variant.id.as_str())
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }
}

/// Highest-scoring variant, first one on ties; the first variant when nothing was judged.
fn best_variant<'v>(
    variants: &'v [ContentVariant],
    critiques: &[ComprehensiveCritique],
    scores: &ScoreTable<'_>,
) -> &'v str {
    if critiques.is_empty() {
        return variants.first().map(|v| v.content.as_str()).unwrap_or("");
    }
    let mut best: Option<(&ContentVariant, f64)> = None;
    for v in variants {
        let s = scores.score(v);
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((v, s));
        }
    }
    best.map(|(v, _)| v.content.as_str()).unwrap_or("")
}

fn best_sections(variants: &[ContentVariant], scores: &ScoreTable<'_>) -> Result<String, EvolveError> {
    let sectioned: Vec<(Vec<&str>, f64)> = variants
        .iter()
        .map(|v| (text::split_sections(&v.content), scores.score(v)))
        .collect();
    let max_sections = sectioned.iter().map(|(s, _)| s.len()).max().unwrap_or(0);

    let mut merged = Vec::with_capacity(max_sections);
    for idx in 0..max_sections {
        let mut pick: Option<(&str, f64)> = None;
        for (sections, score) in &sectioned {
            if let Some(section) = sections.get(idx) {
                if pick.map_or(true, |(_, best)| *score > best) {
                    pick = Some((*section, *score));
                }
            }
        }
        if let Some((section, _)) = pick {
            merged.push(section);
        }
    }
    Ok(merged.join(text::SECTION_DELIMITER))
}

fn weighted_synthesis(variants: &[ContentVariant], scores: &ScoreTable<'_>) -> Result<String, EvolveError> {
    let total: f64 = variants.iter().map(|v| scores.score(v)).sum();
    if total <= 0.0 {
        return Err(EvolveError::Merge("total variant score is zero".into()));
    }

    let mut parts: Vec<String> = Vec::new();
    for variant in variants {
        let weight = scores.score(variant) / total;
        if weight <= SYNTHESIS_MIN_WEIGHT {
            continue;
        }
        let keys = text::key_sentences(&variant.content, KEY_SENTENCES_PER_VARIANT);
        let take = (keys.len() as f64 * weight).ceil() as usize;
        for sentence in keys.into_iter().take(take) {
            if !parts.contains(&sentence) {
                parts.push(sentence);
            }
        }
    }

    if parts.is_empty() {
        return Err(EvolveError::Merge("no salient sentences to synthesize".into()));
    }
    Ok(organize_synthesis(&parts))
}

fn organize_synthesis(parts: &[String]) -> String {
    let headers = ["Synthesized Analysis:", "Key Findings:"];
    let mut blocks: Vec<String> = Vec::new();
    for (i, group) in parts.chunks(SYNTHESIS_GROUP_SIZE).enumerate() {
        match headers.get(i) {
            Some(header) => blocks.push(format!("{}\n{}", header, group.join("\n"))),
            None => {
                let rest = &parts[SYNTHESIS_GROUP_SIZE * headers.len()..];
                blocks.push(format!("Additional Insights:\n{}", rest.join("\n")));
                break;
            }
        }
    }
    blocks.join("\n\n")
}

fn consensus_building(variants: &[ContentVariant]) -> Result<String, EvolveError> {
    let required = CONSENSUS_SHARE * variants.len() as f64;

    // term -> (documents containing it, total occurrences)
    let mut stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for variant in variants {
        for term in text::term_set(&variant.content) {
            stats.entry(term).or_default().0 += 1;
        }
        for term in text::terms(&variant.content) {
            stats.entry(term).or_default().1 += 1;
        }
    }

    let mut common: Vec<(String, usize, usize)> = stats
        .into_iter()
        .filter(|(_, (docs, _))| *docs as f64 >= required)
        .map(|(term, (docs, total))| (term, docs, total))
        .collect();
    // Most frequent first; BTreeMap order breaks ties alphabetically.
    common.sort_by(|a, b| b.2.cmp(&a.2).then(b.1.cmp(&a.1)));

    let statements: Vec<String> = common
        .into_iter()
        .take(CONSENSUS_MAX_TERMS)
        .filter_map(|(term, _, _)| {
            let supporting: Vec<&ContentVariant> = variants
                .iter()
                .filter(|v| v.content.to_lowercase().contains(&term))
                .collect();
            if (supporting.len() as f64) < required {
                return None;
            }
            Some(synthesize_theme(&term, &supporting))
        })
        .collect();

    Ok(statements.join(text::SECTION_DELIMITER))
}

fn synthesize_theme(term: &str, supporting: &[&ContentVariant]) -> String {
    let mut picked: Vec<String> = Vec::new();
    for variant in supporting {
        for sentence in text::split_sentences(&variant.content) {
            if picked.len() == CONSENSUS_SENTENCES_PER_TERM {
                break;
            }
            if sentence.to_lowercase().contains(term) && !picked.contains(&sentence) {
                picked.push(sentence);
            }
        }
    }
    if picked.is_empty() {
        format!("Common theme identified: {}", term)
    } else {
        format!("Regarding {}: {}", term, picked.join(" "))
    }
}

fn hierarchical_integration(
    variants: &[ContentVariant],
    scores: &ScoreTable<'_>,
) -> Result<String, EvolveError> {
    let mut ranked: Vec<&ContentVariant> = variants.iter().collect();
    // Stable sort keeps input order among equal scores.
    ranked.sort_by(|a, b| {
        scores
            .score(b)
            .partial_cmp(&scores.score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (top, rest) = ranked
        .split_first()
        .ok_or_else(|| EvolveError::Merge("no variants to integrate".into()))?;
    let mut merged = top.content.clone();

    for variant in rest {
        let mut existing = text::split_sentences(&merged);
        let mut additions: Vec<String> = Vec::new();
        for sentence in text::split_sentences(&variant.content) {
            if additions.len() == FOLDED_SENTENCES_PER_VARIANT {
                break;
            }
            if text::has_signal(&sentence) && !text::is_near_duplicate(&sentence, &existing) {
                existing.push(sentence.clone());
                additions.push(sentence);
            }
        }
        if !additions.is_empty() {
            merged.push_str(text::SECTION_DELIMITER);
            merged.push_str(&additions.join(" "));
        }
    }
    Ok(merged)
}
