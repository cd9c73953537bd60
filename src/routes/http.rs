//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Terminal failures (exhausted retries, missing configuration) surface as
//! real error responses; no partial or stale result is ever served as valid.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument};

use crate::error::MentorError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// Maps core errors onto HTTP statuses with a JSON message body.
pub struct ApiError(MentorError);

impl From<MentorError> for ApiError {
  fn from(e: MentorError) -> Self {
    ApiError(e)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      MentorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      MentorError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
      MentorError::Unconfigured => StatusCode::SERVICE_UNAVAILABLE,
      MentorError::Decode(_) | MentorError::Transport(_) | MentorError::ExhaustedRetries { .. } => {
        StatusCode::BAD_GATEWAY
      }
    };
    error!(target: "juramentor", error = %self.0, %status, "Request failed");
    (status, Json(serde_json::json!({ "message": self.0.to_string() }))).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state), fields(schwierigkeit = q.schwierigkeit.unwrap_or(2)))]
pub async fn http_get_case(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CaseQuery>,
) -> Result<Json<crate::domain::GeneratedCase>, ApiError> {
  let schwierigkeit = q.schwierigkeit.unwrap_or(2);
  let schwerpunkte: Vec<String> = q
    .schwerpunkte
    .as_deref()
    .map(|s| s.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect())
    .unwrap_or_default();
  let fall = do_generate_case(&state, schwierigkeit, &schwerpunkte).await?;
  info!(target: "klausur", id = %fall.id, %schwierigkeit, "HTTP case served");
  Ok(Json(fall))
}

#[instrument(level = "info", skip(state), fields(index = q.index))]
pub async fn http_get_corpus_case(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CorpusCaseQuery>,
) -> Result<Json<crate::domain::GeneratedCase>, ApiError> {
  let fall = do_corpus_case(&state, q.index).await?;
  Ok(Json(fall))
}

#[instrument(level = "info", skip(state, body), fields(loesung_len = body.loesung.len()))]
pub async fn http_post_grade(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GradeIn>,
) -> Result<Json<GradeOut>, ApiError> {
  let out = do_grade(&state, body).await?;
  info!(
    target: "klausur",
    uebereinstimmung = out.feedback.uebereinstimmung_loesungsskizze,
    neue_erfolge = out.neue_erfolge.len(),
    "HTTP grade evaluated"
  );
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(frage_len = body.frage.len()))]
pub async fn http_post_ask(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AskIn>,
) -> Result<Json<AskOut>, ApiError> {
  let (antwort, kontext_titel) = do_ask(&state, &body.frage).await?;
  Ok(Json(AskOut { antwort, kontext_titel }))
}

#[instrument(level = "info", skip(state), fields(frage_len = q.frage.len()))]
pub async fn http_get_match(
  State(state): State<Arc<AppState>>,
  Query(q): Query<MatchQuery>,
) -> Result<Json<MatchOut>, ApiError> {
  let hit = do_find_match(&state, &q.frage).await?;
  Ok(Json(MatchOut::from_case(hit)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(do_progress(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  do_reset(&state).await;
  Json(HealthOut { ok: true })
}
