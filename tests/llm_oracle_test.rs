// tests/llm_oracle_test.rs — Integration test: LLM-backed oracles over a mock provider

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use draftsmith::oracle::llm::{LlmGenerationOracle, LlmJudgeOracle, LlmOracleOptions};
use draftsmith::provider::retry::{RetryConfig, RetryProvider};
use draftsmith::provider::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
use draftsmith::{
    EvolutionConfig, EvolutionEngine, EvolutionInput, Evidence, EvolveError, SectionRequirements,
    TerminationReason,
};

const REWRITE: &str = "X improves Y through faster feedback.\n\nFurthermore, three trials confirm the effect.\nRATIONALE: grounded the claim in the trial evidence";

/// Answers generation and judge prompts; every `fail_every`-th call fails transiently.
struct ScriptedProvider {
    judge_reply: String,
    fail_every: usize,
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl ScriptedProvider {
    fn new(judge_reply: &str, fail_every: usize) -> Arc<Self> {
        Arc::new(Self {
            judge_reply: judge_reply.to_string(),
            fail_every,
            calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, EvolveError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(EvolveError::Provider {
                provider: "scripted".into(),
                message: "overloaded".into(),
                retriable: true,
            });
        }

        let is_judge = request
            .system
            .as_deref()
            .is_some_and(|s| s.contains("reviewer"));
        let content = if is_judge {
            self.judge_reply.clone()
        } else {
            REWRITE.to_string()
        };
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                input_tokens: 120,
                output_tokens: 40,
            },
            stop_reason: StopReason::EndTurn,
        })
    }
}

fn judge_reply(score: f64) -> String {
    let mut reply = String::from("SCORES:\n");
    for name in [
        "accuracy",
        "completeness",
        "coherence",
        "originality",
        "evidence_quality",
        "logical_flow",
        "critical_thinking",
        "synthesis_quality",
    ] {
        reply.push_str(&format!("{}: {}\n", name, score));
    }
    reply.push_str("NOTES:\n- solid evidence use\n");
    reply
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..Default::default()
    }
}

fn engine_over(provider: Arc<dyn ModelProvider>, max_iterations: u32) -> EvolutionEngine {
    let options = LlmOracleOptions::new("test-model");
    let generation = LlmGenerationOracle::new(provider.clone(), options.clone()).unwrap();
    let judge = LlmJudgeOracle::new(provider, options).unwrap();
    EvolutionEngine::from_oracles(
        Arc::new(generation),
        Arc::new(judge),
        EvolutionConfig {
            max_iterations,
            ..Default::default()
        },
    )
    .unwrap()
}

fn input() -> EvolutionInput {
    EvolutionInput::new(
        "X improves Y.",
        vec![Evidence::new("Trial", "Three trials show X improves Y.", 0.85, 0.9)],
        SectionRequirements::new(vec!["X".into(), "Y".into()]),
    )
}

#[tokio::test]
async fn test_llm_oracles_drive_a_run() {
    let provider = ScriptedProvider::new(&judge_reply(4.5), 0);
    let outcome = engine_over(provider.clone(), 3).run(input()).await.unwrap();

    assert_eq!(outcome.termination, TerminationReason::Converged);
    assert_eq!(outcome.iterations_completed, 1);
    assert!((outcome.final_score - 4.5).abs() < 1e-9);
    assert!(outcome.final_content.starts_with("X improves Y through faster feedback."));
    assert!(!outcome.final_content.contains("RATIONALE"));

    let variant = &outcome.iterations[0].variants[0];
    assert_eq!(variant.rationale, "grounded the claim in the trial evidence");
    assert!(outcome.iterations[0].critiques.iter().all(|c| c.judged));
    // six generation calls and six judge calls
    assert_eq!(provider.calls.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn test_transient_provider_errors_are_retried() {
    let flaky = ScriptedProvider::new(&judge_reply(3.6), 4);
    let provider: Arc<dyn ModelProvider> = Arc::new(RetryProvider::with_config(flaky.clone(), fast_retry()));
    let outcome = engine_over(provider, 2).run(input()).await.unwrap();

    assert!(flaky.failures.load(Ordering::SeqCst) > 0);
    for iteration in &outcome.iterations {
        assert_eq!(iteration.fallback_count(), 0);
        assert!(iteration.critiques.iter().all(|c| c.judged));
    }
    assert_eq!(outcome.iterations_completed, 2);
}

#[tokio::test]
async fn test_unparseable_judge_reply_scores_neutral() {
    let provider = ScriptedProvider::new("Looks great to me!", 0);
    let outcome = engine_over(provider, 1).run(input()).await.unwrap();

    assert!((outcome.final_score - 3.0).abs() < 1e-9);
    assert!(outcome.iterations[0].critiques.iter().all(|c| !c.judged));
}
