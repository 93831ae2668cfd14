// src/generator/strategy.rs — Variant strategies and the strategy registry

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::types::SectionRequirements;
use crate::infra::errors::EvolveError;
use crate::oracle::{GenerationOracle, GenerationRequest, Transformation};

/// What a strategy works from: the current best content and its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub base_content: &'a str,
    pub evidence_summary: &'a str,
    pub requirements: &'a SectionRequirements,
}

/// One way of rewriting a section. New strategies plug into the registry
/// without touching the generator.
#[async_trait]
pub trait TransformStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn transform(&self, ctx: &TransformContext<'_>) -> Result<Transformation, EvolveError>;
}

/// The six built-in rewriting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    PerspectiveShift,
    StructureReorganization,
    DepthEnhancement,
    BreadthExpansion,
    CriticalAnalysis,
    SynthesisIntegration,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::PerspectiveShift,
        StrategyKind::StructureReorganization,
        StrategyKind::DepthEnhancement,
        StrategyKind::BreadthExpansion,
        StrategyKind::CriticalAnalysis,
        StrategyKind::SynthesisIntegration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::PerspectiveShift => "perspective_shift",
            StrategyKind::StructureReorganization => "structure_reorganization",
            StrategyKind::DepthEnhancement => "depth_enhancement",
            StrategyKind::BreadthExpansion => "breadth_expansion",
            StrategyKind::CriticalAnalysis => "critical_analysis",
            StrategyKind::SynthesisIntegration => "synthesis_integration",
        }
    }

    /// One-line instruction that opens the rewrite request.
    pub fn directive(&self) -> &'static str {
        match self {
            StrategyKind::PerspectiveShift => {
                "Rewrite the following content from a different analytical perspective."
            }
            StrategyKind::StructureReorganization => {
                "Restructure the following content for improved logical flow."
            }
            StrategyKind::DepthEnhancement => {
                "Enhance the depth and analytical rigor of this content."
            }
            StrategyKind::BreadthExpansion => "Expand the breadth and scope of this content.",
            StrategyKind::CriticalAnalysis => {
                "Generate a critically analytical version of this content."
            }
            StrategyKind::SynthesisIntegration => {
                "Create a synthesized version integrating multiple perspectives."
            }
        }
    }

    pub fn instructions(&self) -> &'static [&'static str] {
        match self {
            StrategyKind::PerspectiveShift => &[
                "Maintain factual accuracy while shifting analytical lens",
                "Consider alternative interpretations of evidence",
                "Explore different stakeholder viewpoints",
                "Preserve key insights while changing presentation angle",
            ],
            StrategyKind::StructureReorganization => &[
                "Reorganize information for maximum clarity",
                "Create stronger logical progression",
                "Improve paragraph transitions and connections",
                "Enhance overall coherence and readability",
            ],
            StrategyKind::DepthEnhancement => &[
                "Add deeper technical analysis where appropriate",
                "Include more nuanced interpretations",
                "Strengthen causal reasoning and implications",
                "Provide more detailed explanations of complex concepts",
            ],
            StrategyKind::BreadthExpansion => &[
                "Include broader contextual information",
                "Add relevant parallel examples or cases",
                "Expand to related domains or applications",
                "Include interdisciplinary perspectives",
            ],
            StrategyKind::CriticalAnalysis => &[
                "Apply critical evaluation to all claims",
                "Identify potential limitations or weaknesses",
                "Address counterarguments and alternative views",
                "Strengthen evidence-based reasoning",
            ],
            StrategyKind::SynthesisIntegration => &[
                "Integrate insights from multiple sources",
                "Synthesize different viewpoints into coherent narrative",
                "Create novel connections between concepts",
                "Develop unified understanding from diverse evidence",
            ],
        }
    }

    /// Directive followed by the instruction bullets.
    pub fn guidance(&self) -> String {
        let mut out = String::from(self.directive());
        for line in self.instructions() {
            out.push_str("\n- ");
            out.push_str(line);
        }
        out
    }

    /// Used when the oracle returns content but no rationale.
    pub fn default_rationale(&self) -> &'static str {
        match self {
            StrategyKind::PerspectiveShift => {
                "Shifted analytical perspective to provide alternative interpretation"
            }
            StrategyKind::StructureReorganization => {
                "Reorganized content structure for improved logical flow"
            }
            StrategyKind::DepthEnhancement => "Enhanced analytical depth and technical detail",
            StrategyKind::BreadthExpansion => "Expanded scope with broader context and examples",
            StrategyKind::CriticalAnalysis => "Applied critical evaluation to claims and evidence",
            StrategyKind::SynthesisIntegration => {
                "Integrated multiple perspectives into a unified narrative"
            }
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = EvolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| EvolveError::UnknownStrategy(s.to_string()))
    }
}

/// A built-in strategy that delegates the rewrite to a generation oracle.
pub struct OracleStrategy {
    kind: StrategyKind,
    oracle: Arc<dyn GenerationOracle>,
    guidance: String,
}

impl OracleStrategy {
    pub fn new(kind: StrategyKind, oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            kind,
            oracle,
            guidance: kind.guidance(),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }
}

#[async_trait]
impl TransformStrategy for OracleStrategy {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn transform(&self, ctx: &TransformContext<'_>) -> Result<Transformation, EvolveError> {
        let request = GenerationRequest {
            base_content: ctx.base_content,
            evidence_summary: ctx.evidence_summary,
            strategy: self.kind.as_str(),
            guidance: &self.guidance,
            requirements: ctx.requirements,
        };
        let mut out = self.oracle.generate(request).await?;
        if out.rationale.trim().is_empty() {
            out.rationale = self.kind.default_rationale().to_string();
        }
        Ok(out)
    }
}

/// Ordered set of strategies, one variant per strategy per iteration.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn TransformStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry (for custom strategy sets and tests).
    pub fn empty() -> Self {
        Self::default()
    }

    /// All six built-in strategies backed by the same oracle.
    pub fn builtin(oracle: Arc<dyn GenerationOracle>) -> Self {
        let mut registry = Self::empty();
        for kind in StrategyKind::ALL {
            registry.register(Arc::new(OracleStrategy::new(kind, oracle.clone())));
        }
        registry
    }

    /// Add a strategy, replacing any existing one with the same name.
    pub fn register(&mut self, strategy: Arc<dyn TransformStrategy>) {
        if let Some(slot) = self
            .strategies
            .iter_mut()
            .find(|s| s.name() == strategy.name())
        {
            *slot = strategy;
        } else {
            self.strategies.push(strategy);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TransformStrategy>> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn all(&self) -> &[Arc<dyn TransformStrategy>] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Look up a strategy by exact name, then by built-in kind spelling
    /// ("Critical Analysis", "depth-enhancement").
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn TransformStrategy>> {
        let name = name.trim();
        self.get(name).or_else(|| {
            name.parse::<StrategyKind>()
                .ok()
                .and_then(|kind| self.get(kind.as_str()))
        })
    }

    /// Narrow to the named strategies, in the order given.
    pub fn select(&self, names: &[String]) -> Result<Self, EvolveError> {
        let mut selected = Self::empty();
        for name in names {
            let strategy = self
                .resolve(name)
                .ok_or_else(|| EvolveError::UnknownStrategy(name.clone()))?;
            selected.register(strategy.clone());
        }
        if selected.is_empty() {
            return Err(EvolveError::NoStrategies);
        }
        Ok(selected)
    }
}
