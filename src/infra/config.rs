// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::types::EvolutionConfig;
use crate::evaluator::rubric::Rubric;
use crate::generator::strategy::StrategyKind;
use crate::infra::errors::EvolveError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub evolution: EvolutionSection,

    #[serde(default)]
    pub generation: GenerationSection,

    #[serde(default)]
    pub judge: JudgeSection,

    #[serde(default)]
    pub cancellation: CancellationSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSection {
    pub max_iterations: u32,
    pub convergence_threshold: f64,
    pub plateau_window: usize,
    pub quality_improvement_threshold: f64,
    pub merge_strategy: String,
    pub deadline_seconds: Option<u64>,
}

impl Default for EvolutionSection {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            convergence_threshold: 4.0,
            plateau_window: 3,
            quality_improvement_threshold: 0.1,
            merge_strategy: "best_sections".into(),
            deadline_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub timeout_ms: u64,
    pub evidence_summary_chars: usize,
    pub strategies: Vec<String>,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            evidence_summary_chars: 1200,
            strategies: StrategyKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSection {
    pub timeout_ms: u64,
    /// Per-dimension weight overrides, by dimension name.
    pub weights: BTreeMap<String, f64>,
}

impl Default for JudgeSection {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            weights: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CancellationSection {
    pub grace_period_ms: u64,
}

impl Default for CancellationSection {
    fn default() -> Self {
        Self {
            grace_period_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Config {
    /// Read and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, EvolveError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EvolveError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no run could start with.
    pub fn validate(&self) -> Result<(), EvolveError> {
        EvolutionConfig::try_from(self)?;
        self.rubric()?;
        if self.generation.strategies.is_empty() {
            return Err(EvolveError::NoStrategies);
        }
        for name in &self.generation.strategies {
            name.parse::<StrategyKind>()?;
        }
        Ok(())
    }

    /// The standard rubric with any configured weight overrides applied.
    pub fn rubric(&self) -> Result<Rubric, EvolveError> {
        if self.judge.weights.is_empty() {
            return Ok(Rubric::standard());
        }
        Rubric::standard().with_weights(&self.judge.weights)
    }
}
