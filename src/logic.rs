//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating new exam cases (and caching them in the session store)
//!   - Grading submitted solutions (history + achievement bookkeeping)
//!   - Answering open questions via the RAG tutor
//!   - Direct best-match lookup and progress reporting

use tracing::{info, instrument};
use uuid::Uuid;

use crate::chatbot::answer_question;
use crate::domain::{CaseRecord, CaseSource, GeneratedCase};
use crate::error::MentorError;
use crate::gamification::ACHIEVEMENTS;
use crate::pipeline::{generate_case, grade_solution};
use crate::protocol::{GradeIn, GradeOut, ProgressOut};
use crate::state::AppState;

/// Caller contract from §grading: submissions shorter than this are
/// rejected before any remote call is made.
pub const MIN_SOLUTION_CHARS: usize = 50;

#[instrument(level = "info", skip(state, schwerpunkte), fields(%schwierigkeit))]
pub async fn do_generate_case(
  state: &AppState,
  schwierigkeit: u8,
  schwerpunkte: &[String],
) -> Result<GeneratedCase, MentorError> {
  let oa = state.openai.as_ref().ok_or(MentorError::Unconfigured)?;
  let case = generate_case(
    &oa.case_architect_model(),
    &state.prompts,
    schwierigkeit.min(5),
    schwerpunkte,
  )
  .await?;
  state.insert_case(case.clone()).await;
  Ok(case)
}

/// Serve a stored corpus case for practice. Unlike generation this needs no
/// remote capability; the case enters the session store so it can be graded
/// like a generated one.
#[instrument(level = "info", skip(state), fields(%index))]
pub async fn do_corpus_case(state: &AppState, index: usize) -> Result<GeneratedCase, MentorError> {
  let cases = state
    .corpus
    .as_ref()
    .ok_or_else(|| MentorError::ResourceNotFound("Fallkorpus nicht geladen".into()))?;
  let record = cases
    .get(index)
    .ok_or_else(|| MentorError::InvalidRequest(format!("Kein Fall mit Index {index}")))?;

  let fall = GeneratedCase {
    id: Uuid::new_v4().to_string(),
    source: CaseSource::Corpus,
    rechtsgebiet: record.rechtsgebiet.clone(),
    thema: record.fall_titel.clone(),
    schwierigkeit: record.schwierigkeit,
    bearbeitungszeit: record.bearbeitungszeit,
    sachverhalt: record.sachverhalt.clone(),
    loesungsskizze: record.loesungsskizze.clone(),
  };
  state.insert_case(fall.clone()).await;
  info!(target: "klausur", id = %fall.id, thema = %fall.thema, "Corpus case served");
  Ok(fall)
}

#[instrument(level = "info", skip(state, input), fields(loesung_len = input.loesung.len()))]
pub async fn do_grade(state: &AppState, input: GradeIn) -> Result<GradeOut, MentorError> {
  if input.loesung.chars().count() < MIN_SOLUTION_CHARS {
    return Err(MentorError::InvalidRequest(format!(
      "Lösung zu kurz für aussagekräftiges Feedback (mindestens {MIN_SOLUTION_CHARS} Zeichen)"
    )));
  }
  let oa = state.openai.as_ref().ok_or(MentorError::Unconfigured)?;

  // Grading against a session case feeds the learning history; grading an
  // explicit (sachverhalt, skizze) payload is the stateless variant.
  match input.case_id {
    Some(id) => {
      let case = state
        .get_case(&id)
        .await
        .ok_or_else(|| MentorError::InvalidRequest(format!("Unbekannte caseId: {id}")))?;
      let feedback = grade_solution(
        &oa.grader_model(),
        &state.prompts,
        &case.sachverhalt,
        &case.loesungsskizze,
        &input.loesung,
      )
      .await?;
      let neue_erfolge = state
        .record_grading(&case, &feedback)
        .await
        .into_iter()
        .cloned()
        .collect();
      Ok(GradeOut { feedback, neue_erfolge })
    }
    None => {
      let sachverhalt = input
        .sachverhalt
        .ok_or_else(|| MentorError::InvalidRequest("sachverhalt fehlt".into()))?;
      let skizze = input
        .loesungsskizze
        .ok_or_else(|| MentorError::InvalidRequest("lösungsskizze fehlt".into()))?;
      let feedback = grade_solution(
        &oa.grader_model(),
        &state.prompts,
        &sachverhalt,
        &skizze,
        &input.loesung,
      )
      .await?;
      Ok(GradeOut { feedback, neue_erfolge: vec![] })
    }
  }
}

#[instrument(level = "info", skip(state, frage), fields(frage_len = frage.len()))]
pub async fn do_ask(state: &AppState, frage: &str) -> Result<(String, Option<String>), MentorError> {
  let oa = state.openai.as_ref().ok_or(MentorError::Unconfigured)?;
  answer_question(
    &oa.tutor_model(),
    oa,
    &state.prompts,
    frage,
    state.corpus.as_deref(),
    state.index.as_ref(),
  )
  .await
}

/// Direct retrieval without generation. Absent corpus/index/client all
/// degrade to "no match".
#[instrument(level = "info", skip(state, frage), fields(frage_len = frage.len()))]
pub async fn do_find_match<'a>(
  state: &'a AppState,
  frage: &str,
) -> Result<Option<&'a CaseRecord>, MentorError> {
  match (&state.corpus, &state.index, &state.openai) {
    (Some(cases), Some(index), Some(oa)) => {
      crate::embedding::find_best_match(frage, cases, oa, index).await
    }
    _ => Ok(None),
  }
}

pub async fn do_progress(state: &AppState) -> ProgressOut {
  let historie = state.historie.read().await.clone();
  let unlocked = state.unlocked.read().await;
  let erfolge = ACHIEVEMENTS
    .iter()
    .filter(|a| unlocked.iter().any(|id| id.as_str() == a.id))
    .cloned()
    .collect();
  ProgressOut { historie, erfolge }
}

pub async fn do_reset(state: &AppState) {
  state.reset_session().await;
  info!(target: "juramentor", "Session state discarded");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Prompts;
  use std::collections::HashMap;
  use tokio::sync::RwLock;

  fn state_with_corpus() -> AppState {
    AppState {
      corpus: Some(vec![CaseRecord {
        fall_titel: "Der teure Tippfehler".into(),
        rechtsgebiet: "BGB AT".into(),
        zentrales_problem: "Erklärungsirrtum".into(),
        kernfrage: "Anfechtung?".into(),
        kurzloesung: "Ja.".into(),
        sachverhalt: "V vertippt sich beim Preis...".into(),
        loesungsskizze: vec!["A. Anspruch aus § 433 I 1 BGB".into()],
        schwierigkeit: 2,
        bearbeitungszeit: 120,
      }]),
      index: None,
      openai: None,
      prompts: Prompts::default(),
      cases: RwLock::new(HashMap::new()),
      historie: RwLock::new(Vec::new()),
      unlocked: RwLock::new(Vec::new()),
    }
  }

  #[tokio::test]
  async fn corpus_case_is_served_and_cached_in_the_session() {
    let state = state_with_corpus();
    let fall = do_corpus_case(&state, 0).await.unwrap();
    assert_eq!(fall.thema, "Der teure Tippfehler");
    assert_eq!(fall.source, CaseSource::Corpus);
    assert!(state.get_case(&fall.id).await.is_some());
  }

  #[tokio::test]
  async fn out_of_range_corpus_index_is_rejected() {
    let state = state_with_corpus();
    let err = do_corpus_case(&state, 7).await.unwrap_err();
    assert!(matches!(err, MentorError::InvalidRequest(_)));
  }

  #[tokio::test]
  async fn trivially_short_submissions_never_reach_the_remote() {
    let state = state_with_corpus();
    let input = GradeIn {
      case_id: Some("egal".into()),
      sachverhalt: None,
      loesungsskizze: None,
      loesung: "zu kurz".into(),
    };
    let err = do_grade(&state, input).await.unwrap_err();
    assert!(matches!(err, MentorError::InvalidRequest(_)));
  }

  #[tokio::test]
  async fn generation_without_api_key_surfaces_unconfigured() {
    let state = state_with_corpus();
    let err = do_generate_case(&state, 3, &[]).await.unwrap_err();
    assert!(matches!(err, MentorError::Unconfigured));
  }
}
