//! Stateless HTTP handlers: each endpoint is a thin wrapper over one gateway
//! operation, bypassing the workflow machine. Useful for scripting and for
//! probing the generator contract directly.
//!
//! Failure mapping: a generator-side failure (format, empty, upstream) is a
//! 502 with the user-facing message; a missing client is a 503.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::domain::ActiveSessionContext;
use crate::error::GenerationError;
use crate::openai::OpenAI;
use crate::protocol::*;
use crate::state::AppState;

fn generation_error(e: GenerationError) -> (StatusCode, Json<ErrorOut>) {
  (StatusCode::BAD_GATEWAY, Json(ErrorOut { message: e.user_message() }))
}

fn require_client(state: &AppState) -> Result<&OpenAI, (StatusCode, Json<ErrorOut>)> {
  state.openai.as_ref().ok_or((
    StatusCode::SERVICE_UNAVAILABLE,
    Json(ErrorOut { message: "The generation service is not configured.".into() }),
  ))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len()))]
pub async fn http_post_assessment(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AssessmentIn>,
) -> Result<Json<AssessmentOut>, (StatusCode, Json<ErrorOut>)> {
  if body.topic.trim().is_empty() {
    return Err((
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(ErrorOut { message: "Topic must not be empty.".into() }),
    ));
  }
  let oa = require_client(&state)?;
  let questions = oa
    .request_assessment_questions(&state.prompts, &body.topic)
    .await
    .map_err(generation_error)?;
  info!(target: "generation", count = questions.len(), "HTTP assessment served");
  Ok(Json(AssessmentOut { questions }))
}

#[instrument(level = "info", skip(state, body), fields(answer_count = body.answers.len()))]
pub async fn http_post_style(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StyleIn>,
) -> Result<Json<StyleOut>, (StatusCode, Json<ErrorOut>)> {
  let oa = require_client(&state)?;
  let inferred = oa
    .infer_learning_style(&state.prompts, &body.answers)
    .await
    .map_err(generation_error)?;
  Ok(Json(StyleOut { style: inferred.style, defaulted: inferred.defaulted }))
}

#[instrument(
  level = "info",
  skip(state, body),
  fields(topic_len = body.params.topic.len(), weeks = body.params.duration_in_weeks)
)]
pub async fn http_post_course(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CourseIn>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  if let Err(message) = body.params.validate() {
    return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorOut { message })));
  }
  let oa = require_client(&state)?;
  let course = oa
    .generate_course(&state.prompts, &body.params, body.learning_style)
    .await
    .map_err(generation_error)?;
  info!(target: "generation", modules = course.modules.len(), "HTTP course served");
  Ok(Json(course))
}

#[instrument(level = "info", skip(state, body), fields(session = %body.session_title))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ActiveSessionContext>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorOut>)> {
  let oa = require_client(&state)?;
  let details = oa
    .generate_session_details(&state.prompts, &body)
    .await
    .map_err(generation_error)?;
  Ok(Json(details))
}
