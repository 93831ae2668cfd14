// tests/evolution_test.rs — Integration test: full evolution runs with mock oracles

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use draftsmith::core::types::{Dimension, DimensionScores};
use draftsmith::oracle::{GenerationOracle, GenerationRequest, JudgeOracle, JudgeRequest, Transformation};
use draftsmith::{
    Config, EvolutionConfig, EvolutionEngine, EvolutionInput, Evidence, EvolveError, MergeStrategy,
    ProgressEvent, SectionRequirements, TerminationReason,
};

const BASE: &str = "X improves Y.";

/// Appends one evidence-flavoured paragraph per call.
struct ExpandingOracle;

#[async_trait]
impl GenerationOracle for ExpandingOracle {
    fn name(&self) -> &str {
        "expanding"
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Transformation, EvolveError> {
        Ok(Transformation::new(
            format!(
                "{}\n\nResearch indicates that {} sharpens the claim with evidence.",
                request.base_content, request.strategy
            ),
            "added supporting paragraph",
        ))
    }
}

/// Fails every call.
struct BrokenOracle {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationOracle for BrokenOracle {
    fn name(&self) -> &str {
        "broken"
    }

    async fn generate(&self, _request: GenerationRequest<'_>) -> Result<Transformation, EvolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EvolveError::oracle("broken", "backend unavailable"))
    }
}

/// Longer content scores higher, capped at 5.
struct LengthJudge;

#[async_trait]
impl JudgeOracle for LengthJudge {
    fn name(&self) -> &str {
        "length"
    }

    async fn judge(&self, request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
        let words = request.content.split_whitespace().count() as f64;
        let score = (2.5 + words * 0.05).min(5.0);
        Ok(uniform(score))
    }
}

/// Same score for every dimension of every variant.
struct ConstantJudge(f64);

#[async_trait]
impl JudgeOracle for ConstantJudge {
    fn name(&self) -> &str {
        "constant"
    }

    async fn judge(&self, _request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
        Ok(uniform(self.0))
    }
}

struct BrokenJudge;

#[async_trait]
impl JudgeOracle for BrokenJudge {
    fn name(&self) -> &str {
        "broken-judge"
    }

    async fn judge(&self, _request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
        Err(EvolveError::oracle("broken-judge", "no scores"))
    }
}

fn uniform(score: f64) -> DimensionScores {
    Dimension::ALL.iter().map(|d| (*d, score)).collect()
}

fn input() -> EvolutionInput {
    EvolutionInput::new(
        BASE,
        vec![
            Evidence::new("Controlled trial", "X raised Y by 12% across three sites.", 0.9, 0.9),
            Evidence::new("Survey", "Practitioners report X helps Y.", 0.5, 0.6),
        ],
        SectionRequirements::new(vec!["X".into(), "Y".into()]),
    )
}

fn config(max_iterations: u32) -> EvolutionConfig {
    EvolutionConfig {
        max_iterations,
        ..Default::default()
    }
}

fn assert_monotonic(history: &[f64]) {
    assert!(
        history.windows(2).all(|w| w[1] >= w[0]),
        "score history decreased: {:?}",
        history
    );
}

// ─── End-to-end ─────────────────────────────────────────────────

#[tokio::test]
async fn test_x_improves_y_two_iterations() {
    let engine = EvolutionEngine::from_oracles(Arc::new(ExpandingOracle), Arc::new(LengthJudge), config(2)).unwrap();
    let outcome = engine.run(input()).await.unwrap();

    assert!((1..=2).contains(&outcome.iterations_completed));
    assert_eq!(outcome.score_history.len(), outcome.iterations_completed as usize);
    assert_monotonic(&outcome.score_history);
    assert_eq!(Some(&outcome.final_score), outcome.score_history.last());
    assert!(outcome.final_content.contains(BASE));
    assert!(outcome.final_content.len() > BASE.len());

    for iteration in &outcome.iterations {
        assert_eq!(iteration.variants.len(), 6);
        assert_eq!(iteration.critiques.len(), 6);
        assert!(iteration.variants.iter().all(|v| !v.content.is_empty()));
        assert_eq!(iteration.fallback_count(), 0);
    }
    assert_eq!(outcome.summary.total_variants, 6 * outcome.iterations.len());
    assert!(!outcome.summary.recommendations.is_empty());
}

#[tokio::test]
async fn test_converges_on_first_high_score() {
    let engine =
        EvolutionEngine::from_oracles(Arc::new(ExpandingOracle), Arc::new(ConstantJudge(4.2)), config(5)).unwrap();
    let outcome = engine.run(input()).await.unwrap();

    assert_eq!(outcome.termination, TerminationReason::Converged);
    assert_eq!(outcome.iterations_completed, 1);
    assert!((outcome.final_score - 4.2).abs() < 1e-9);
    assert!(outcome.summary.convergence_achieved);
}

#[tokio::test]
async fn test_flat_scores_plateau() {
    let engine =
        EvolutionEngine::from_oracles(Arc::new(ExpandingOracle), Arc::new(ConstantJudge(3.4)), config(10)).unwrap();
    let outcome = engine.run(input()).await.unwrap();

    assert_eq!(outcome.termination, TerminationReason::Plateaued);
    assert_eq!(outcome.iterations_completed, 3);
    // Equal scores never replace the first accepted candidate
    assert_eq!(outcome.final_content, outcome.iterations[0].merged_content);
}

// ─── Failure tolerance ──────────────────────────────────────────

#[tokio::test]
async fn test_failing_generation_preserves_base_content() {
    let oracle = Arc::new(BrokenOracle {
        calls: AtomicUsize::new(0),
    });
    let fallbacks = Arc::new(AtomicUsize::new(0));
    let counter = fallbacks.clone();
    let engine = EvolutionEngine::from_oracles(oracle.clone(), Arc::new(ConstantJudge(3.3)), config(2))
        .unwrap()
        .with_progress(move |event| {
            if let ProgressEvent::VariantFallback { .. } = event {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
    let outcome = engine.run(input()).await.unwrap();

    assert_eq!(outcome.final_content, BASE);
    assert_eq!(outcome.iterations_completed, 2);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 12);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 12);
    assert_eq!(outcome.summary.total_fallbacks(), 12);
    for iteration in &outcome.iterations {
        assert!(iteration.variants.iter().all(|v| v.is_fallback() && v.content == BASE));
    }
}

#[tokio::test]
async fn test_failing_judge_scores_neutral() {
    let engine =
        EvolutionEngine::from_oracles(Arc::new(ExpandingOracle), Arc::new(BrokenJudge), config(5)).unwrap();
    let outcome = engine.run(input()).await.unwrap();

    assert!((outcome.final_score - 3.0).abs() < 1e-9);
    assert_eq!(outcome.termination, TerminationReason::Plateaued);
    let critique = &outcome.iterations[0].critiques[0];
    assert!(!critique.judged);
    assert_eq!(critique.critique_points.len(), 1);
}

// ─── Merge strategies ───────────────────────────────────────────

#[tokio::test]
async fn test_every_merge_strategy_produces_content() {
    for strategy in MergeStrategy::ALL {
        let cfg = EvolutionConfig {
            max_iterations: 2,
            merge_strategy: strategy,
            ..Default::default()
        };
        let engine = EvolutionEngine::from_oracles(Arc::new(ExpandingOracle), Arc::new(LengthJudge), cfg).unwrap();
        let outcome = engine.run(input()).await.unwrap();
        assert!(
            !outcome.final_content.trim().is_empty(),
            "{} produced empty content",
            strategy
        );
        assert_monotonic(&outcome.score_history);
    }
}

// ─── Validation ─────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_inputs_rejected_before_any_call() {
    let oracle = Arc::new(BrokenOracle {
        calls: AtomicUsize::new(0),
    });
    let engine = EvolutionEngine::from_oracles(oracle.clone(), Arc::new(LengthJudge), config(2)).unwrap();

    let empty_base = EvolutionInput::new("", vec![], SectionRequirements::new(vec!["X".into()]));
    assert!(matches!(engine.run(empty_base).await, Err(EvolveError::InvalidInput(_))));

    let no_requirements = EvolutionInput::new(BASE, vec![], SectionRequirements::default());
    assert!(matches!(
        engine.run(no_requirements).await,
        Err(EvolveError::InvalidInput(_))
    ));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

// ─── Config-driven construction ─────────────────────────────────

#[tokio::test]
async fn test_engine_from_toml_config() {
    let config = Config::from_toml_str(
        r#"
[evolution]
max_iterations = 2
merge_strategy = "hierarchical_integration"

[generation]
strategies = ["critical_analysis", "depth_enhancement"]

[judge.weights]
accuracy = 0.25
synthesis_quality = 0.0

[logging]
level = "debug"
"#,
    )
    .unwrap();
    draftsmith::infra::logger::init_logging(&config.logging.level);

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let log = draftsmith::core::progress::log_progress();
    let engine = EvolutionEngine::from_config(&config, Arc::new(ExpandingOracle), Arc::new(LengthJudge))
        .unwrap()
        .with_progress(move |event| {
            sink.lock().unwrap().push(draftsmith::core::progress::describe(&event));
            log(event);
        });
    assert_eq!(engine.config().merge_strategy, MergeStrategy::HierarchicalIntegration);

    let outcome = engine.run(input()).await.unwrap();
    assert_eq!(outcome.iterations[0].variants.len(), 2);
    let strategies: Vec<&str> = outcome.iterations[0]
        .variants
        .iter()
        .map(|v| v.strategy.as_str())
        .collect();
    assert_eq!(strategies, vec!["critical_analysis", "depth_enhancement"]);

    let events = events.lock().unwrap();
    assert!(events[0].contains("2 strategies"));
    assert!(events.last().unwrap().starts_with("[done]"));
}

#[tokio::test]
async fn test_engine_from_config_with_loose_strategy_names() {
    let config = Config::from_toml_str(
        "[evolution]\nmax_iterations = 1\n\n[generation]\nstrategies = [\"Critical Analysis\", \"depth-enhancement\"]\n",
    )
    .unwrap();
    let engine =
        EvolutionEngine::from_config(&config, Arc::new(ExpandingOracle), Arc::new(LengthJudge)).unwrap();

    let outcome = engine.run(input()).await.unwrap();
    let strategies: Vec<&str> = outcome.iterations[0]
        .variants
        .iter()
        .map(|v| v.strategy.as_str())
        .collect();
    assert_eq!(strategies, vec!["critical_analysis", "depth_enhancement"]);
    assert_eq!(outcome.iterations[0].fallback_count(), 0);
}

#[test]
fn test_bad_config_rejected() {
    let config = Config {
        generation: draftsmith::infra::config::GenerationSection {
            strategies: vec!["limerick".into()],
            ..Default::default()
        },
        ..Default::default()
    };
    let result = EvolutionEngine::from_config(&config, Arc::new(ExpandingOracle), Arc::new(LengthJudge));
    assert!(matches!(result, Err(EvolveError::UnknownStrategy(_))));
}
