//! Minimal OpenAI-compatible client for the four generation calls.
//!
//! We only call chat.completions and request either plain text (style
//! inference) or a strict JSON object (everything else). Calls are
//! instrumented and log model names, latencies, and response sizes, not
//! contents. On a malformed response the raw text is kept on the error and
//! logged truncated; the user only ever sees a generic message.
//!
//! No retries: a single failed attempt terminates the stage, and the workflow
//! decides whether the user may re-trigger it.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{
  ActiveSessionContext, AssessmentQuestion, Course, CourseParams, LearningStyle, SessionDetails,
  StyleInference, MIND_MAP_DEPTH_CAP,
};
use crate::error::GenerationError;
use crate::schema;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

/// Wire shape of the assessment contract: questions live under one key.
#[derive(Deserialize)]
struct QuestionsEnvelope {
  #[serde(default)]
  questions: Vec<AssessmentQuestion>,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// One chat completion, returning the raw assistant text.
  /// `json_mode` asks the endpoint for a JSON object response.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, json_mode))]
  async fn chat(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    json_mode: bool,
  ) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json_mode.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "courseloom-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(|e| GenerationError::Upstream(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerationError::Upstream(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse =
      res.json().await.map_err(|e| GenerationError::Upstream(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(
        prompt_tokens = ?usage.prompt_tokens,
        completion_tokens = ?usage.completion_tokens,
        total_tokens = ?usage.total_tokens,
        "OpenAI usage"
      );
    }
    let text = body
      .choices
      .first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();
    Ok(text)
  }

  // --- The four workflow operations ---

  /// Generate the 5-question learning-style assessment for a topic.
  #[instrument(level = "info", skip(self, prompts), fields(topic_len = topic.len()))]
  pub async fn request_assessment_questions(
    &self,
    prompts: &Prompts,
    topic: &str,
  ) -> Result<Vec<AssessmentQuestion>, GenerationError> {
    let user = schema::with_schema(
      &fill_template(&prompts.assessment_user_template, &[("topic", topic)]),
      &schema::assessment_schema(),
    );
    let start = std::time::Instant::now();
    let raw = self.chat(&prompts.assessment_system, &user, 0.9, true).await?;
    info!(elapsed = ?start.elapsed(), bytes = raw.len(), "Assessment response received");
    decode_assessment(&raw)
  }

  /// Infer the learning style from the user's ordered answers.
  /// Free-text call; the matching itself is total (see `from_response`), so
  /// only transport can fail here.
  #[instrument(level = "info", skip(self, prompts), fields(answer_count = answers.len()))]
  pub async fn infer_learning_style(
    &self,
    prompts: &Prompts,
    answers: &[String],
  ) -> Result<StyleInference, GenerationError> {
    let joined = answers.join(", ");
    let user = fill_template(&prompts.style_user_template, &[("answers", &joined)]);
    let raw = self.chat(&prompts.style_system, &user, 0.0, false).await?;
    let inferred = LearningStyle::from_response(&raw);
    if inferred.defaulted {
      warn!(
        target: "generation",
        response = %trunc_for_log(&raw, 120),
        "Style response matched no label; defaulting to Visual"
      );
    } else {
      info!(target: "generation", style = inferred.style.label(), "Learning style inferred");
    }
    Ok(inferred)
  }

  /// Synthesize the full course tree for the given parameters and style.
  #[instrument(
    level = "info",
    skip(self, prompts, params),
    fields(topic_len = params.topic.len(), weeks = params.duration_in_weeks, style = style.label())
  )]
  pub async fn generate_course(
    &self,
    prompts: &Prompts,
    params: &CourseParams,
    style: LearningStyle,
  ) -> Result<Course, GenerationError> {
    let weeks = params.duration_in_weeks.to_string();
    let user = schema::with_schema(
      &fill_template(
        &prompts.course_user_template,
        &[
          ("topic", params.topic.as_str()),
          ("duration_in_weeks", weeks.as_str()),
          ("difficulty", params.difficulty.label()),
          ("learning_style", style.label()),
        ],
      ),
      &schema::course_schema(),
    );
    let start = std::time::Instant::now();
    let raw = self.chat(&prompts.course_system, &user, 0.7, true).await?;
    info!(elapsed = ?start.elapsed(), bytes = raw.len(), "Course response received");
    let course: Course = decode_contract(&raw)?;
    info!(
      target: "generation",
      title = %trunc_for_log(&course.title, 60),
      modules = course.modules.len(),
      "Course generated"
    );
    Ok(course)
  }

  /// Expand one session into detailed content. Never cached: each call is an
  /// independent generation and may yield a different result.
  #[instrument(
    level = "info",
    skip(self, prompts, context),
    fields(session = %context.session_title, style = context.learning_style.label())
  )]
  pub async fn generate_session_details(
    &self,
    prompts: &Prompts,
    context: &ActiveSessionContext,
  ) -> Result<SessionDetails, GenerationError> {
    let user = schema::with_schema(
      &fill_template(
        &prompts.session_user_template,
        &[
          ("course_title", context.course_title.as_str()),
          ("module_title", context.module_title.as_str()),
          ("lesson_title", context.lesson_title.as_str()),
          ("session_title", context.session_title.as_str()),
          ("learning_style", context.learning_style.label()),
        ],
      ),
      &schema::session_details_schema(),
    );
    let start = std::time::Instant::now();
    let raw = self.chat(&prompts.session_system, &user, 0.7, true).await?;
    info!(elapsed = ?start.elapsed(), bytes = raw.len(), "Session detail response received");
    decode_session_details(&raw)
  }
}

// --- Decode helpers (pure; unit-tested without the network) ---

/// Shared parse policy: trim, strip one fenced code block, parse into the
/// typed contract. Failures keep the raw text for diagnostics.
fn decode_contract<T: for<'a> Deserialize<'a>>(raw: &str) -> Result<T, GenerationError> {
  let text = strip_code_fences(raw);
  serde_json::from_str::<T>(text).map_err(|source| {
    error!(
      target: "generation",
      error = %source,
      raw = %trunc_for_log(raw, 300),
      "Generator response failed to parse"
    );
    GenerationError::Format { source, raw: raw.to_string() }
  })
}

fn decode_assessment(raw: &str) -> Result<Vec<AssessmentQuestion>, GenerationError> {
  let envelope: QuestionsEnvelope = decode_contract(raw)?;
  if envelope.questions.is_empty() {
    return Err(GenerationError::Empty { what: "assessment questions" });
  }
  Ok(envelope.questions)
}

fn decode_session_details(raw: &str) -> Result<SessionDetails, GenerationError> {
  let mut details: SessionDetails = decode_contract(raw)?;
  let depth = details.mind_map.depth();
  if depth > MIND_MAP_DEPTH_CAP {
    warn!(target: "generation", depth, cap = MIND_MAP_DEPTH_CAP, "Pruning over-deep mind map");
    details.mind_map = details.mind_map.pruned(MIND_MAP_DEPTH_CAP);
  }
  Ok(details)
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq {
  role: String,
  content: String,
}
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  r#type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  content: Option<String>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)]
  prompt_tokens: Option<u32>,
  #[serde(default)]
  completion_tokens: Option<u32>,
  #[serde(default)]
  total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
