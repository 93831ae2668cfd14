// src/generator/mod.rs — Variant generator: one rewrite per strategy, never fails

pub mod evidence;
pub mod strategy;

use std::time::Duration;

use futures::future::join_all;

use crate::core::types::{ContentVariant, Evidence, SectionRequirements};
use crate::infra::errors::EvolveError;
use strategy::{StrategyRegistry, TransformContext, TransformStrategy};

pub struct VariantGenerator {
    registry: StrategyRegistry,
    timeout: Duration,
    evidence_chars: usize,
}

impl VariantGenerator {
    pub fn new(
        registry: StrategyRegistry,
        timeout: Duration,
        evidence_chars: usize,
    ) -> Result<Self, EvolveError> {
        if registry.is_empty() {
            return Err(EvolveError::NoStrategies);
        }
        Ok(Self {
            registry,
            timeout,
            evidence_chars,
        })
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn strategy_count(&self) -> usize {
        self.registry.len()
    }

    /// Produce one variant with the named strategy.
    ///
    /// Errors, timeouts, empty output and unknown strategy names all yield a
    /// fallback variant carrying the base content.
    pub async fn generate(
        &self,
        base_content: &str,
        evidence: &[Evidence],
        requirements: &SectionRequirements,
        strategy: &str,
    ) -> ContentVariant {
        let Some(strategy) = self.registry.resolve(strategy) else {
            tracing::warn!(strategy, "Unknown strategy, using fallback variant");
            return ContentVariant::fallback(strategy, base_content, "unknown strategy");
        };
        let summary = evidence::summarize_evidence(evidence, self.evidence_chars);
        let ctx = TransformContext {
            base_content,
            evidence_summary: &summary,
            requirements,
        };
        self.run(strategy.as_ref(), &ctx).await
    }

    /// One variant per registered strategy, generated concurrently, in registry order.
    pub async fn generate_all(
        &self,
        base_content: &str,
        evidence: &[Evidence],
        requirements: &SectionRequirements,
    ) -> Vec<ContentVariant> {
        let summary = evidence::summarize_evidence(evidence, self.evidence_chars);
        let ctx = TransformContext {
            base_content,
            evidence_summary: &summary,
            requirements,
        };
        join_all(self.registry.all().iter().map(|s| self.run(s.as_ref(), &ctx))).await
    }

    async fn run(&self, strategy: &dyn TransformStrategy, ctx: &TransformContext<'_>) -> ContentVariant {
        let name = strategy.name();
        let result = tokio::time::timeout(self.timeout, strategy.transform(ctx)).await;

        let reason = match result {
            Ok(Ok(out)) if !out.content.trim().is_empty() => {
                tracing::debug!(strategy = name, words = crate::util::word_count(&out.content), "Variant generated");
                return ContentVariant::new(name, out.content, out.rationale, ctx.base_content);
            }
            Ok(Ok(_)) => "empty output".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}ms", self.timeout.as_millis()),
        };

        tracing::warn!(strategy = name, "Generation failed, using fallback variant: {}", reason);
        ContentVariant::fallback(name, ctx.base_content, &reason)
    }
}
