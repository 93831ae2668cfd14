// src/core/progress.rs — Progress callbacks for evolution runs

use super::types::ProgressEvent;

/// One-line, human-readable rendering of a progress event.
pub fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RunStarted {
            run_id,
            max_iterations,
            strategies,
        } => format!(
            "[run {}] up to {} iteration(s), {} strateg{}",
            crate::util::truncate_str(run_id, 8),
            max_iterations,
            strategies,
            if *strategies == 1 { "y" } else { "ies" },
        ),
        ProgressEvent::IterationStart {
            iteration,
            max_iterations,
        } => format!("[iter {}/{}] generating variants...", iteration, max_iterations),
        ProgressEvent::VariantFallback {
            iteration,
            strategy,
            reason,
        } => format!("[iter {}]   fallback: {} ({})", iteration, strategy, reason),
        ProgressEvent::IterationEnd {
            iteration,
            iteration_best,
            best_score,
        } => format!(
            "[iter {}] iteration best={:.2} running best={:.2}",
            iteration, iteration_best, best_score
        ),
        ProgressEvent::Complete {
            iterations,
            final_score,
            termination,
        } => format!(
            "[done] score={:.2} iterations={} ({})",
            final_score, iterations, termination
        ),
    }
}

/// A progress callback that forwards every event to `tracing`.
///
/// Suitable for `EvolutionEngine::with_progress()`.
pub fn log_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| match &event {
        ProgressEvent::VariantFallback { .. } => tracing::warn!("{}", describe(&event)),
        ProgressEvent::RunStarted { .. } | ProgressEvent::Complete { .. } => {
            tracing::info!("{}", describe(&event))
        }
        _ => tracing::debug!("{}", describe(&event)),
    }
}
