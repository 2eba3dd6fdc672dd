// 🔋 Power Estimator - AI first, rules when the AI can't help
//
// Pipeline:
// 1. Build a prompt and ask the text generator (retried on transient failures)
// 2. Cut the JSON object out of the reply and read power / difficulty_score
// 3. Any failure along the way → deterministic keyword/length heuristic
//
// The caller always gets a clamped PowerEstimate. `ai_generated` tells
// which path produced it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::lm_studio::{FailureKind, InferenceFailure, LmStudioClient, TextGenerator};
use crate::retry::RetryPolicy;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const BASE_POWER: i64 = 50;
pub const LENGTH_ADJUSTMENT: i64 = 10;
pub const KEYWORD_ADJUSTMENT: i64 = 15;

/// Names longer than this get a bonus
pub const LONG_NAME_CHARS: usize = 30;

/// Names shorter than this get a penalty
pub const SHORT_NAME_CHARS: usize = 10;

pub const COMPLEX_KEYWORDS: [&str; 10] = [
    "develop", "build", "create", "design", "implement",
    "research", "analyze", "optimize", "refactor", "project",
];

pub const SIMPLE_KEYWORDS: [&str; 8] = [
    "fix", "update", "check", "review", "call", "email", "buy", "clean",
];

pub const DEFAULT_PREFERRED_MODEL: &str = "gemma";

const FALLBACK_REASONING: &str =
    "Calculated using fallback rule-based system due to AI service unavailability";
const DEFAULT_AI_REASONING: &str = "AI calculated power based on task complexity";
const UNKNOWN_TIME: &str = "Unknown";

// ============================================================================
// REQUEST / RESULT TYPES
// ============================================================================

/// Difficulty hint passed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty '{}', expected easy|medium|hard", other)),
        }
    }
}

/// Body of the power calculation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerRequest {
    pub move_name: String,
    #[serde(default)]
    pub move_description: Option<String>,
    #[serde(default)]
    pub difficulty_level: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerEstimate {
    /// 1-100
    pub power: i64,
    /// 1-10
    pub difficulty_score: i64,
    pub reasoning: String,
    pub estimated_time: String,
    pub ai_generated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_model_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// PURE PIECES
// ============================================================================

pub fn clamp_power(power: i64) -> i64 {
    power.clamp(1, 100)
}

pub fn clamp_difficulty(score: i64) -> i64 {
    score.clamp(1, 10)
}

/// Time bucket for a power value (same bands as the prompt documents)
pub fn estimate_time_from_power(power: i64) -> &'static str {
    match power {
        p if p <= 20 => "< 30 minutes",
        p if p <= 40 => "30 minutes - 2 hours",
        p if p <= 60 => "2-6 hours",
        p if p <= 80 => "6+ hours",
        _ => "Multiple days",
    }
}

pub fn build_prompt(name: &str, description: Option<&str>, difficulty: Difficulty) -> String {
    let description_line = description
        .filter(|d| !d.is_empty())
        .map(|d| format!("\nDescription: {}", d))
        .unwrap_or_default();

    format!(
        r#"You are the assistant of a Pokemon-style TODO app. Rate the "power" of a task from its complexity, the time it needs, and its difficulty.

Task: {name}{description_line}
Difficulty Level: {difficulty}

Give a power rating from 1-100 using these bands:
- 1-20: Very simple tasks (< 30 minutes)
- 21-40: Simple tasks (30 minutes - 2 hours)
- 41-60: Moderate tasks (2-6 hours)
- 61-80: Complex tasks (6+ hours or multiple days)
- 81-100: Very complex tasks (major projects, weeks/months)

Reply with exactly this JSON and nothing else:
{{
  "power": [number between 1-100],
  "difficulty_score": [number between 1-10],
  "reasoning": "[short explanation of the rating]",
  "estimated_time": "[time estimate such as '2 hours' or '3 days']"
}}"#
    )
}

/// Read an integer out of a JSON number or a numeric string
fn numeric_field(object: &Value, key: &str) -> Result<i64, InferenceFailure> {
    let value = object
        .get(key)
        .ok_or_else(|| InferenceFailure::parse(format!("missing '{}'", key)))?;

    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        // Strings must hold a whole number
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    number.ok_or_else(|| InferenceFailure::parse(format!("'{}' is not numeric: {}", key, value)))
}

fn text_field(object: &Value, key: &str, default: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Parse the model's reply into a clamped estimate.
///
/// Takes everything from the first `{` to the last `}` as the JSON object.
pub fn parse_power_response(text: &str) -> Result<PowerEstimate, InferenceFailure> {
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(InferenceFailure::parse("no JSON object in response")),
    };

    let object: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| InferenceFailure::parse(e.to_string()))?;

    if !object.is_object() {
        return Err(InferenceFailure::parse("response JSON is not an object"));
    }

    let power = numeric_field(&object, "power")?;
    let difficulty_score = numeric_field(&object, "difficulty_score")?;

    Ok(PowerEstimate {
        power: clamp_power(power),
        difficulty_score: clamp_difficulty(difficulty_score),
        reasoning: text_field(&object, "reasoning", DEFAULT_AI_REASONING),
        estimated_time: text_field(&object, "estimated_time", UNKNOWN_TIME),
        ai_generated: true,
    })
}

/// Rule-based estimate used whenever the AI path fails
pub fn fallback_estimate(name: &str, description: Option<&str>) -> PowerEstimate {
    let mut power = BASE_POWER;

    let name_len = name.chars().count();
    if name_len > LONG_NAME_CHARS {
        power += LENGTH_ADJUSTMENT;
    } else if name_len < SHORT_NAME_CHARS {
        power -= LENGTH_ADJUSTMENT;
    }

    let text = format!("{} {}", name, description.unwrap_or("")).to_lowercase();

    // One bonus and one penalty at most, however many keywords match
    if COMPLEX_KEYWORDS.iter().any(|k| text.contains(k)) {
        power += KEYWORD_ADJUSTMENT;
    }
    if SIMPLE_KEYWORDS.iter().any(|k| text.contains(k)) {
        power -= KEYWORD_ADJUSTMENT;
    }

    let power = clamp_power(power);

    PowerEstimate {
        power,
        difficulty_score: clamp_difficulty(power / 10),
        reasoning: FALLBACK_REASONING.to_string(),
        estimated_time: estimate_time_from_power(power).to_string(),
        ai_generated: false,
    }
}

// ============================================================================
// ESTIMATOR SERVICE
// ============================================================================

/// Built once at startup and shared by handle with request handlers
#[derive(Clone)]
pub struct PowerEstimator {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    preferred_model: String,
}

impl PowerEstimator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        PowerEstimator {
            generator,
            retry: RetryPolicy::default(),
            preferred_model: DEFAULT_PREFERRED_MODEL.to_string(),
        }
    }

    /// LM Studio-backed estimator configured from settings
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = LmStudioClient::new(&settings.lm_studio_url, &settings.lm_studio_model)?
            .with_timeouts(settings.ai_timeout(), settings.ai_health_timeout());

        Ok(PowerEstimator::new(Arc::new(client)).with_preferred_model(&settings.preferred_model_hint))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_preferred_model(mut self, hint: &str) -> Self {
        self.preferred_model = hint.to_string();
        self
    }

    /// Ask the model once (with retries) and parse its reply
    pub async fn try_ai_estimate(
        &self,
        name: &str,
        description: Option<&str>,
        difficulty: Difficulty,
    ) -> Result<PowerEstimate, InferenceFailure> {
        let prompt = build_prompt(name, description, difficulty);

        let reply = self
            .retry
            .run(|_attempt| self.generator.complete(&prompt), InferenceFailure::is_transient)
            .await?;

        parse_power_response(&reply)
    }

    /// Never fails: falls back to the heuristic on any AI failure
    pub async fn estimate_power(
        &self,
        name: &str,
        description: Option<&str>,
        difficulty: Difficulty,
    ) -> PowerEstimate {
        match self.try_ai_estimate(name, description, difficulty).await {
            Ok(estimate) => {
                info!(move_name = name, power = estimate.power, "AI power estimate");
                estimate
            }
            Err(failure) => {
                match failure.kind {
                    FailureKind::Parse => warn!(move_name = name, error = %failure, "unusable AI reply, using fallback"),
                    _ => warn!(move_name = name, error = %failure, "AI service failed, using fallback"),
                }
                fallback_estimate(name, description)
            }
        }
    }

    /// Query the model listing. Failures are reported, not raised.
    pub async fn health_check(&self) -> HealthReport {
        match self.generator.list_models().await {
            Ok(models) => {
                let hint = self.preferred_model.to_lowercase();
                let preferred = models.iter().any(|id| id.to_lowercase().contains(&hint));

                HealthReport {
                    status: HealthStatus::Healthy,
                    available_models: Some(models),
                    preferred_model_available: Some(preferred),
                    error: None,
                }
            }
            Err(failure) => {
                let status = match failure.kind {
                    FailureKind::Status(_) => HealthStatus::Unhealthy,
                    _ => HealthStatus::Unreachable,
                };
                let error = match failure.kind {
                    FailureKind::Status(code) => format!("Status {}", code),
                    _ => failure.message,
                };

                HealthReport {
                    status,
                    available_models: None,
                    preferred_model_available: None,
                    error: Some(error),
                }
            }
        }
    }
}

impl fmt::Debug for PowerEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerEstimator")
            .field("retry", &self.retry)
            .field("preferred_model", &self.preferred_model)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
