// src/core/engine.rs — Evolution engine: generate → judge → merge → decide

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::state::{advance, EvolutionState};
use super::summary::EvolutionSummary;
use super::types::*;
use crate::evaluator::rubric::Rubric;
use crate::evaluator::QualityJudge;
use crate::generator::strategy::StrategyRegistry;
use crate::generator::VariantGenerator;
use crate::infra::config::Config;
use crate::infra::errors::EvolveError;
use crate::merger::VariantMerger;
use crate::oracle::{GenerationOracle, JudgeOracle};

type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Drives the content-evolution loop for one section at a time.
pub struct EvolutionEngine {
    generator: VariantGenerator,
    judge: QualityJudge,
    merger: VariantMerger,
    config: EvolutionConfig,
    on_progress: Option<ProgressCallback>,
}

impl EvolutionEngine {
    pub fn new(
        generator: VariantGenerator,
        judge: QualityJudge,
        merger: VariantMerger,
        config: EvolutionConfig,
    ) -> Result<Self, EvolveError> {
        config.validate()?;
        Ok(Self {
            generator,
            judge,
            merger,
            config,
            on_progress: None,
        })
    }

    /// All six built-in strategies and the standard rubric over the given oracles.
    pub fn from_oracles(
        generation: Arc<dyn GenerationOracle>,
        judge: Arc<dyn JudgeOracle>,
        config: EvolutionConfig,
    ) -> Result<Self, EvolveError> {
        let generator = VariantGenerator::new(
            StrategyRegistry::builtin(generation),
            config.generation_timeout,
            config.evidence_summary_chars,
        )?;
        let judge = QualityJudge::new(judge, Rubric::standard(), config.judge_timeout)?;
        Self::new(generator, judge, VariantMerger::new(), config)
    }

    /// Build an engine from a loaded configuration file.
    pub fn from_config(
        cfg: &Config,
        generation: Arc<dyn GenerationOracle>,
        judge: Arc<dyn JudgeOracle>,
    ) -> Result<Self, EvolveError> {
        let config = EvolutionConfig::try_from(cfg)?;
        let registry = StrategyRegistry::builtin(generation).select(&cfg.generation.strategies)?;
        let generator = VariantGenerator::new(
            registry,
            config.generation_timeout,
            config.evidence_summary_chars,
        )?;
        let judge = QualityJudge::new(judge, cfg.rubric()?, config.judge_timeout)?;
        Self::new(generator, judge, VariantMerger::new(), config)
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Evolve the input until it converges, plateaus, or the budget runs out.
    pub async fn run(&self, input: EvolutionInput) -> Result<EvolutionOutcome, EvolveError> {
        self.run_with_cancel(input, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but stoppable through `cancel` (and the configured deadline).
    ///
    /// A stop request lets the in-flight iteration finish within the grace
    /// period. The best content so far is returned either way; only invalid
    /// input is an error.
    pub async fn run_with_cancel(
        &self,
        input: EvolutionInput,
        cancel: CancellationToken,
    ) -> Result<EvolutionOutcome, EvolveError> {
        input.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let deadline = self
            .config
            .deadline
            .map(|d| tokio::time::Instant::now() + d);
        let run_start = Instant::now();

        self.emit(ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            max_iterations: self.config.max_iterations,
            strategies: self.generator.strategy_count(),
        });
        tracing::info!(
            run_id = %run_id,
            max_iterations = self.config.max_iterations,
            strategies = self.generator.strategy_count(),
            merge = %self.config.merge_strategy,
            "Evolution run started"
        );

        let mut state = EvolutionState::initial(&input.base_content, &self.config);
        let mut iterations: Vec<EvolutionIteration> = Vec::new();

        let termination = loop {
            if stop_requested(&cancel, deadline) {
                tracing::info!(completed = state.completed(), "Stop requested before iteration");
                state = state.cancelled();
                break TerminationReason::Cancelled;
            }

            let iteration = state.completed() + 1;
            self.emit(ProgressEvent::IterationStart {
                iteration,
                max_iterations: self.config.max_iterations,
            });

            let (record, interrupted) = {
                let work = self.run_iteration(iteration, &state, &input);
                tokio::pin!(work);

                tokio::select! {
                    biased;
                    record = &mut work => (Some(record), false),
                    _ = wait_for_stop(&cancel, deadline) => {
                        tracing::info!(
                            iteration,
                            grace_ms = self.config.grace_period.as_millis() as u64,
                            "Stop requested mid-iteration, waiting for in-flight calls"
                        );
                        let record = tokio::time::timeout(self.config.grace_period, &mut work)
                            .await
                            .ok();
                        (record, true)
                    }
                }
            };

            let Some(record) = record else {
                tracing::warn!(iteration, "Iteration abandoned after grace period");
                state = state.cancelled();
                break TerminationReason::Cancelled;
            };

            state = advance(&state, record.iteration_best, &record.merged_content);
            self.emit(ProgressEvent::IterationEnd {
                iteration,
                iteration_best: record.iteration_best,
                best_score: state.best_score(),
            });
            tracing::info!(
                iteration,
                score = record.iteration_best,
                best = state.best_score(),
                improvement = record.quality_improvement,
                fallbacks = record.fallback_count(),
                duration_ms = record.duration.as_millis() as u64,
                "Iteration complete"
            );
            iterations.push(record);

            if let Some(reason) = state.termination() {
                break reason;
            }
            if interrupted {
                state = state.cancelled();
                break TerminationReason::Cancelled;
            }
        };

        let summary = EvolutionSummary::compile(
            &iterations,
            &state.progress.score_history,
            termination,
            self.config.max_iterations,
        );

        self.emit(ProgressEvent::Complete {
            iterations: state.completed(),
            final_score: state.best_score(),
            termination,
        });
        tracing::info!(
            run_id = %run_id,
            iterations = state.completed(),
            score = state.best_score(),
            termination = %termination,
            elapsed_ms = run_start.elapsed().as_millis() as u64,
            "Evolution run finished"
        );

        Ok(EvolutionOutcome {
            run_id,
            final_score: state.best_score(),
            iterations_completed: state.completed(),
            score_history: state.progress.score_history,
            final_content: state.best_content,
            iterations,
            termination,
            summary,
        })
    }

    /// One generate → judge → merge pass against the current best content.
    async fn run_iteration(
        &self,
        iteration: u32,
        state: &EvolutionState,
        input: &EvolutionInput,
    ) -> EvolutionIteration {
        let started_at = Utc::now();
        let start = Instant::now();
        let base = state.best_content.as_str();

        let variants = self
            .generator
            .generate_all(base, &input.evidence, &input.requirements)
            .await;
        for variant in variants.iter().filter(|v| v.is_fallback()) {
            self.emit(ProgressEvent::VariantFallback {
                iteration,
                strategy: variant.strategy.clone(),
                reason: variant
                    .rationale
                    .trim_start_matches("fallback: ")
                    .to_string(),
            });
        }

        let (variants, critiques): (Vec<ContentVariant>, Vec<ComprehensiveCritique>) = self
            .judge
            .evaluate_all(variants, &input.requirements, &input.evidence)
            .await
            .into_iter()
            .unzip();

        let merged_content = self
            .merger
            .merge(&variants, &critiques, self.config.merge_strategy);

        let scores: Vec<f64> = critiques.iter().map(|c| c.overall_score).collect();
        let iteration_best = scores.iter().copied().fold(0.0, f64::max);

        EvolutionIteration {
            id: uuid::Uuid::new_v4().to_string(),
            iteration,
            base_fingerprint: crate::util::fingerprint(base),
            quality_improvement: iteration_best - state.prior_best(),
            metrics: ConvergenceMetrics::from_scores(&scores),
            variants,
            critiques,
            merged_content,
            iteration_best,
            duration: start.elapsed(),
            started_at,
        }
    }
}

fn stop_requested(cancel: &CancellationToken, deadline: Option<tokio::time::Instant>) -> bool {
    cancel.is_cancelled() || deadline.is_some_and(|at| tokio::time::Instant::now() >= at)
}

/// Resolves once the token is cancelled or the deadline passes.
async fn wait_for_stop(cancel: &CancellationToken, deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(at) => {}
            }
        }
        None => cancel.cancelled().await,
    }
}
