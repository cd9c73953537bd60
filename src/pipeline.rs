//! Structured generation pipeline: case generation and solution grading.
//!
//! Both operations share one mechanism: build a role-scoped instruction,
//! send it to the generative capability, extract the first JSON object from
//! the (possibly noisy) response text and decode it into the target type.
//! A failed extraction or decode counts as a failed attempt and is retried
//! by the resilience wrapper; decoding is all-or-nothing, a record missing
//! required fields is a total failure, never a partial result.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::{CaseSource, GeneratedCase, GradingResult};
use crate::error::MentorError;
use crate::retry::{with_retry, RetryPolicy, CASE_PIPELINE_RETRY};
use crate::util::{extract_first_json_object, fill_template, trunc_for_log};

/// Opaque remote text-generation capability: (system instruction, user
/// content) in, free text out. Treated as unreliable at every call site.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
  async fn generate(&self, system: &str, user: &str) -> Result<String, MentorError>;
}

/// Extract and decode the single expected JSON object from raw model text.
pub fn decode_payload<T: DeserializeOwned>(raw: &str) -> Result<T, MentorError> {
  let span = extract_first_json_object(raw).ok_or_else(|| {
    MentorError::Decode(format!("no JSON object in response: {}", trunc_for_log(raw, 120)))
  })?;
  serde_json::from_str(span)
    .map_err(|e| MentorError::Decode(format!("{e}: {}", trunc_for_log(span, 120))))
}

/// One generation attempt chain under a retry policy: request, extract,
/// decode. Shared by case generation and grading; the two differ only in
/// their instruction content.
pub async fn request_structured<T: DeserializeOwned>(
  model: &dyn GenerativeModel,
  policy: &RetryPolicy,
  system: &str,
  user: &str,
) -> Result<T, MentorError> {
  with_retry(policy, || async move {
    let raw = model.generate(system, user).await?;
    decode_payload::<T>(&raw)
  })
  .await
}

#[derive(Debug, Deserialize)]
struct CaseDraft {
  rechtsgebiet: String,
  thema: String,
  schwierigkeit: u8,
  bearbeitungszeit: u32,
  sachverhalt: String,
  #[serde(rename = "lösungsskizze")]
  loesungsskizze: Vec<String>,
}

/// Generate a fresh exam case for the requested difficulty (0-5) and
/// optional personalization tags.
#[instrument(level = "info", skip(model, prompts), fields(%schwierigkeit, tags = schwerpunkte.len()))]
pub async fn generate_case(
  model: &dyn GenerativeModel,
  prompts: &Prompts,
  schwierigkeit: u8,
  schwerpunkte: &[String],
) -> Result<GeneratedCase, MentorError> {
  let tags = if schwerpunkte.is_empty() {
    "keine".to_string()
  } else {
    schwerpunkte.join(", ")
  };
  let system = fill_template(
    &prompts.fall_architekt_system,
    &[("schwierigkeit", &schwierigkeit.to_string()), ("schwerpunkte", &tags)],
  );

  let draft: CaseDraft =
    request_structured(model, &CASE_PIPELINE_RETRY, &system, &prompts.fall_architekt_user).await?;

  let case = GeneratedCase {
    id: Uuid::new_v4().to_string(),
    source: CaseSource::Generated,
    rechtsgebiet: draft.rechtsgebiet,
    thema: draft.thema,
    schwierigkeit: draft.schwierigkeit,
    bearbeitungszeit: draft.bearbeitungszeit,
    sachverhalt: draft.sachverhalt,
    loesungsskizze: draft.loesungsskizze,
  };
  info!(
    target: "klausur",
    case_id = %case.id,
    thema = %case.thema,
    schwierigkeit = case.schwierigkeit,
    "Case generated"
  );
  Ok(case)
}

/// Grade a submitted free-text solution against a case's scenario and
/// reference outline.
///
/// Caller contract: the submission should be non-trivial; very short texts
/// are rejected by the route layer before this is invoked.
#[instrument(level = "info", skip_all, fields(sachverhalt_len = sachverhalt.len(), skizze = loesungsskizze.len(), loesung_len = loesung.len()))]
pub async fn grade_solution(
  model: &dyn GenerativeModel,
  prompts: &Prompts,
  sachverhalt: &str,
  loesungsskizze: &[String],
  loesung: &str,
) -> Result<GradingResult, MentorError> {
  let skizze_json = serde_json::to_string_pretty(loesungsskizze)
    .map_err(|e| MentorError::Decode(format!("outline serialization: {e}")))?;
  let user = format!(
    "SACHVERHALT:\n{sachverhalt}\n\nLÖSUNGSSKIZZE:\n{skizze_json}\n\nLÖSUNGSTEXT:\n{loesung}"
  );

  let result: GradingResult =
    request_structured(model, &CASE_PIPELINE_RETRY, &prompts.bewerter_system, &user).await?;
  info!(
    target: "klausur",
    uebereinstimmung = result.uebereinstimmung_loesungsskizze,
    "Solution graded"
  );
  Ok(result)
}
