// src/core/state.rs — Cross-iteration evolution state
//
// The state is a value: `advance()` takes the previous state plus one
// iteration's observations and returns the next state. Nothing else in the
// engine mutates progress, which keeps the loop replayable in tests.

use serde::{Deserialize, Serialize};

use super::types::{EvolutionConfig, TerminationReason};

/// Progress counters and the score series for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionProgress {
    pub total_iterations: u32,
    pub completed_iterations: u32,
    pub current_best_score: f64,
    /// Running best after each completed iteration (non-decreasing).
    pub score_history: Vec<f64>,
    pub convergence_threshold: f64,
    pub plateau_window: usize,
    pub quality_improvement_threshold: f64,
}

/// Where the run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    Init,
    Iterating,
    Terminated(TerminationReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionState {
    pub progress: EvolutionProgress,
    pub best_content: String,
    pub status: EngineStatus,
}

impl EvolutionState {
    pub fn initial(base_content: &str, config: &EvolutionConfig) -> Self {
        Self {
            progress: EvolutionProgress {
                total_iterations: config.max_iterations,
                completed_iterations: 0,
                current_best_score: 0.0,
                score_history: Vec::new(),
                convergence_threshold: config.convergence_threshold,
                plateau_window: config.plateau_window,
                quality_improvement_threshold: config.quality_improvement_threshold,
            },
            best_content: base_content.to_string(),
            status: EngineStatus::Init,
        }
    }

    pub fn best_score(&self) -> f64 {
        self.progress.current_best_score
    }

    pub fn completed(&self) -> u32 {
        self.progress.completed_iterations
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        match self.status {
            EngineStatus::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    /// Best score going into the next iteration, or the neutral baseline before the first.
    pub fn prior_best(&self) -> f64 {
        self.progress
            .score_history
            .last()
            .copied()
            .unwrap_or(super::types::NEUTRAL_SCORE)
    }

    /// Stop the run from outside the loop (cancellation, deadline).
    pub fn cancelled(&self) -> Self {
        Self {
            status: EngineStatus::Terminated(TerminationReason::Cancelled),
            ..self.clone()
        }
    }
}

/// Fold one iteration into the state.
///
/// The best content only moves on strict improvement, so the score series is
/// the running best and never decreases.
pub fn advance(state: &EvolutionState, iteration_best: f64, merged_content: &str) -> EvolutionState {
    let mut progress = state.progress.clone();
    let mut best_content = state.best_content.clone();

    if iteration_best > progress.current_best_score {
        progress.current_best_score = iteration_best;
        best_content = merged_content.to_string();
    }
    progress.completed_iterations += 1;
    progress.score_history.push(progress.current_best_score);

    let status = match check_termination(&progress) {
        Some(reason) => EngineStatus::Terminated(reason),
        None => EngineStatus::Iterating,
    };

    EvolutionState {
        progress,
        best_content,
        status,
    }
}

/// Termination checks in priority order: budget, convergence, plateau.
pub fn check_termination(progress: &EvolutionProgress) -> Option<TerminationReason> {
    if progress.completed_iterations >= progress.total_iterations {
        return Some(TerminationReason::MaxIterations);
    }
    if progress.current_best_score >= progress.convergence_threshold {
        return Some(TerminationReason::Converged);
    }
    if detect_plateau(
        &progress.score_history,
        progress.plateau_window,
        progress.quality_improvement_threshold,
    ) {
        return Some(TerminationReason::Plateaued);
    }
    None
}

/// True when the last `window` entries span less than `threshold`.
pub fn detect_plateau(history: &[f64], window: usize, threshold: f64) -> bool {
    if window == 0 || history.len() < window {
        return false;
    }
    let recent = &history[history.len() - window..];
    let max = recent.iter().copied().fold(f64::MIN, f64::max);
    let min = recent.iter().copied().fold(f64::MAX, f64::min);
    max - min < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_iterations: u32) -> EvolutionConfig {
        EvolutionConfig {
            max_iterations,
            ..Default::default()
        }
    }

    // ─── detect_plateau ─────────────────────────────────────────

    #[test]
    fn test_plateau_detected_small_spread() {
        assert!(detect_plateau(&[3.0, 3.05, 3.08], 3, 0.1));
    }

    #[test]
    fn test_plateau_not_detected_large_spread() {
        assert!(!detect_plateau(&[3.0, 3.5, 4.0], 3, 0.1));
    }

    #[test]
    fn test_plateau_needs_full_window() {
        assert!(!detect_plateau(&[3.0, 3.0], 3, 0.1));
    }

    #[test]
    fn test_plateau_uses_only_recent_window() {
        assert!(detect_plateau(&[1.0, 2.5, 3.0, 3.02, 3.04], 3, 0.1));
    }

    // ─── advance ────────────────────────────────────────────────

    #[test]
    fn test_advance_improvement_updates_best() {
        let s0 = EvolutionState::initial("base", &config(5));
        let s1 = advance(&s0, 3.2, "merged one");
        assert_eq!(s1.best_content, "merged one");
        assert!((s1.best_score() - 3.2).abs() < 1e-9);
        assert_eq!(s1.completed(), 1);
        assert_eq!(s1.progress.score_history, vec![3.2]);
        assert_eq!(s1.status, EngineStatus::Iterating);
        // Previous state untouched
        assert_eq!(s0.best_content, "base");
        assert_eq!(s0.completed(), 0);
    }

    #[test]
    fn test_advance_regression_keeps_best() {
        let s0 = EvolutionState::initial("base", &config(5));
        let s1 = advance(&s0, 3.5, "good");
        let s2 = advance(&s1, 3.1, "worse");
        assert_eq!(s2.best_content, "good");
        assert_eq!(s2.progress.score_history, vec![3.5, 3.5]);
    }

    #[test]
    fn test_advance_equal_score_keeps_best() {
        let s0 = EvolutionState::initial("base", &config(5));
        let s1 = advance(&s0, 3.5, "first");
        let s2 = advance(&s1, 3.5, "second");
        assert_eq!(s2.best_content, "first");
    }

    #[test]
    fn test_advance_converges_early() {
        let s0 = EvolutionState::initial("base", &config(5));
        let s1 = advance(&s0, 4.2, "great");
        assert_eq!(s1.termination(), Some(TerminationReason::Converged));
    }

    #[test]
    fn test_max_iterations_takes_priority_over_convergence() {
        let s0 = EvolutionState::initial("base", &config(1));
        let s1 = advance(&s0, 4.5, "great");
        assert_eq!(s1.termination(), Some(TerminationReason::MaxIterations));
    }

    #[test]
    fn test_plateau_terminates() {
        let mut s = EvolutionState::initial("base", &config(10));
        for score in [3.0, 3.05, 3.08] {
            s = advance(&s, score, "m");
        }
        assert_eq!(s.termination(), Some(TerminationReason::Plateaued));
        assert_eq!(s.completed(), 3);
    }

    #[test]
    fn test_history_monotonic() {
        let mut s = EvolutionState::initial("base", &config(10));
        for score in [2.0, 3.0, 2.5, 3.5, 1.0] {
            s = advance(&s, score, "m");
        }
        let h = &s.progress.score_history;
        assert!(h.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_prior_best_baseline() {
        let s0 = EvolutionState::initial("base", &config(3));
        assert!((s0.prior_best() - 3.0).abs() < 1e-9);
        let s1 = advance(&s0, 3.4, "m");
        assert!((s1.prior_best() - 3.4).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_preserves_best() {
        let s0 = EvolutionState::initial("base", &config(3));
        let s1 = advance(&s0, 3.4, "m");
        let c = s1.cancelled();
        assert_eq!(c.termination(), Some(TerminationReason::Cancelled));
        assert_eq!(c.best_content, "m");
    }
}
