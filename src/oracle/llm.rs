// src/oracle/llm.rs — Oracles backed by a chat model provider

use std::sync::Arc;

use async_trait::async_trait;
use minijinja::{context, Environment};

use super::{GenerationOracle, GenerationRequest, JudgeOracle, JudgeRequest, Transformation};
use crate::core::types::DimensionScores;
use crate::evaluator::parser::parse_judge_response;
use crate::infra::errors::EvolveError;
use crate::provider::{ChatRequest, ModelProvider, StopReason};

const GENERATION_SYSTEM: &str = "You are a research writing assistant. You rewrite report \
sections to improve them while keeping every factual claim supported by the evidence provided.";

const GENERATION_TEMPLATE: &str = r#"{{ guidance }}

Original Content:
{{ base_content }}

Research Evidence:
{{ evidence_summary }}
{%- if required_elements %}

The section must cover:
{%- for element in required_elements %}
- {{ element }}
{%- endfor %}
{%- endif %}
{%- if key_concepts %}

Key concepts to keep:
{%- for concept in key_concepts %}
- {{ concept }}
{%- endfor %}
{%- endif %}

Reply with the rewritten section only. Separate sections with a blank line.
On the final line, write "RATIONALE:" followed by one sentence explaining the change."#;

const JUDGE_SYSTEM: &str = "You are a strict reviewer of research writing. You score content \
against a rubric and reply in the exact format requested.";

const JUDGE_TEMPLATE: &str = r#"Score the content below on each dimension from 1 (worst) to 5 (best).

Dimensions:
{%- for d in dimensions %}
- {{ d.name }} (weight {{ d.weight }}): {{ d.description }}. 5 = {{ d.high }}; 1 = {{ d.low }}.
{%- endfor %}
{%- if required_elements %}

Required elements:
{%- for element in required_elements %}
- {{ element }}
{%- endfor %}
{%- endif %}
{%- if evidence %}

Available evidence:
{%- for title in evidence %}
- {{ title }}
{%- endfor %}
{%- endif %}

Content:
{{ content }}

Reply in this format and nothing else:
SCORES:
{%- for d in dimensions %}
{{ d.name }}: <score>
{%- endfor %}
NOTES:
- <optional short notes>"#;

const RATIONALE_MARKER: &str = "RATIONALE:";

/// Sampling knobs shared by both oracles.
#[derive(Debug, Clone)]
pub struct LlmOracleOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmOracleOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

fn environment() -> Result<Environment<'static>, EvolveError> {
    let mut env = Environment::new();
    env.add_template("generation", GENERATION_TEMPLATE)?;
    env.add_template("judge", JUDGE_TEMPLATE)?;
    Ok(env)
}

/// Generation oracle that prompts a chat model with the strategy's guidance.
pub struct LlmGenerationOracle {
    name: String,
    provider: Arc<dyn ModelProvider>,
    options: LlmOracleOptions,
    env: Environment<'static>,
}

impl LlmGenerationOracle {
    pub fn new(provider: Arc<dyn ModelProvider>, options: LlmOracleOptions) -> Result<Self, EvolveError> {
        Ok(Self {
            name: format!("llm-generation:{}", provider.id()),
            provider,
            options,
            env: environment()?,
        })
    }

    pub fn render_prompt(&self, request: &GenerationRequest<'_>) -> Result<String, EvolveError> {
        let rendered = self.env.get_template("generation")?.render(context! {
            guidance => request.guidance,
            base_content => request.base_content,
            evidence_summary => request.evidence_summary,
            required_elements => non_blank(&request.requirements.required_elements),
            key_concepts => non_blank(&request.requirements.key_concepts),
        })?;
        Ok(rendered)
    }
}

#[async_trait]
impl GenerationOracle for LlmGenerationOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Transformation, EvolveError> {
        let prompt = self.render_prompt(&request)?;
        let mut chat = ChatRequest::single_turn(&self.options.model, GENERATION_SYSTEM, prompt);
        chat.temperature = self.options.temperature;
        chat.max_tokens = self.options.max_tokens;

        let response = self.provider.chat(chat).await?;
        tracing::debug!(
            strategy = request.strategy,
            tokens = response.usage.total(),
            "Generation response received"
        );
        if response.stop_reason == StopReason::MaxTokens {
            tracing::warn!(strategy = request.strategy, "Generation reply hit max_tokens and may be truncated");
        }
        Ok(split_rationale(&response.content))
    }
}

/// Judge oracle that asks a chat model for `dimension: score` lines.
pub struct LlmJudgeOracle {
    name: String,
    provider: Arc<dyn ModelProvider>,
    options: LlmOracleOptions,
    env: Environment<'static>,
}

impl LlmJudgeOracle {
    pub fn new(provider: Arc<dyn ModelProvider>, options: LlmOracleOptions) -> Result<Self, EvolveError> {
        Ok(Self {
            name: format!("llm-judge:{}", provider.id()),
            provider,
            options,
            env: environment()?,
        })
    }

    pub fn render_prompt(&self, request: &JudgeRequest<'_>) -> Result<String, EvolveError> {
        let dimensions: Vec<_> = request
            .rubric
            .entries()
            .iter()
            .map(|entry| {
                let (high, low) = entry.dimension.anchors();
                context! {
                    name => entry.dimension.as_str(),
                    weight => format!("{:.2}", entry.weight),
                    description => entry.dimension.description(),
                    high => high,
                    low => low,
                }
            })
            .collect();
        let evidence: Vec<&str> = request.evidence.iter().map(|e| e.title.as_str()).collect();

        let rendered = self.env.get_template("judge")?.render(context! {
            dimensions => dimensions,
            required_elements => non_blank(&request.requirements.required_elements),
            evidence => evidence,
            content => request.content,
        })?;
        Ok(rendered)
    }
}

#[async_trait]
impl JudgeOracle for LlmJudgeOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn judge(&self, request: JudgeRequest<'_>) -> Result<DimensionScores, EvolveError> {
        let prompt = self.render_prompt(&request)?;
        let mut chat = ChatRequest::single_turn(&self.options.model, JUDGE_SYSTEM, prompt);
        chat.temperature = self.options.temperature;
        chat.max_tokens = self.options.max_tokens;

        let response = self.provider.chat(chat).await?;
        let parsed = parse_judge_response(&response.content).map_err(|e| match e {
            EvolveError::Oracle { message, .. } => EvolveError::oracle(self.name.clone(), message),
            other => other,
        })?;
        if !parsed.notes.is_empty() {
            tracing::debug!(notes = parsed.notes.len(), "Judge notes: {}", parsed.notes.join(" | "));
        }
        Ok(parsed.scores)
    }
}

fn non_blank(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a model reply into content and the trailing `RATIONALE:` line, if any.
pub fn split_rationale(reply: &str) -> Transformation {
    match reply.rfind(RATIONALE_MARKER) {
        Some(pos) => Transformation::new(
            reply[..pos].trim(),
            reply[pos + RATIONALE_MARKER.len()..].trim(),
        ),
        None => Transformation::new(reply.trim(), ""),
    }
}
