//! Retrieval-augmented tutor: answers open questions over the case corpus.
//!
//! Two stages per attempt: semantic retrieval (optional context), then one
//! generation call conditioned on it. The whole attempt sits inside the
//! chat retry boundary, so a transport failure re-runs retrieval as well.
//! Absent corpus or index is the normal "no context" path, not an error.

use tracing::{debug, instrument};

use crate::config::Prompts;
use crate::domain::CaseRecord;
use crate::embedding::{find_best_match, Embedder, EmbeddingIndex};
use crate::error::MentorError;
use crate::pipeline::GenerativeModel;
use crate::retry::{with_retry, RetryPolicy, CHAT_RETRY};

/// Answer a student question. Returns (answer text, matched case title or
/// none). The title tells the caller which stored case grounded the answer.
#[instrument(level = "info", skip_all, fields(frage_len = frage.len(), has_corpus = corpus.is_some()))]
pub async fn answer_question(
  model: &dyn GenerativeModel,
  embedder: &dyn Embedder,
  prompts: &Prompts,
  frage: &str,
  corpus: Option<&[CaseRecord]>,
  index: Option<&EmbeddingIndex>,
) -> Result<(String, Option<String>), MentorError> {
  answer_with_policy(model, embedder, prompts, frage, corpus, index, &CHAT_RETRY).await
}

async fn answer_with_policy(
  model: &dyn GenerativeModel,
  embedder: &dyn Embedder,
  prompts: &Prompts,
  frage: &str,
  corpus: Option<&[CaseRecord]>,
  index: Option<&EmbeddingIndex>,
  policy: &RetryPolicy,
) -> Result<(String, Option<String>), MentorError> {
  with_retry(policy, || async move {
    let kontext_fall = match (corpus, index) {
      (Some(cases), Some(idx)) => find_best_match(frage, cases, embedder, idx).await?,
      _ => None,
    };
    debug!(target: "juramentor", matched = kontext_fall.map(|c| c.fall_titel.as_str()), "Retrieval stage done");

    let user = match kontext_fall {
      None => format!(r#"KONTEXT: Kein passender Kontext gefunden. FRAGE DES STUDENTEN: "{frage}""#),
      Some(fall) => format!(
        "KONTEXT:\n- Fall-Titel: {}\n- Zentrales Problem: {}\n- Kernfrage: {}\n- Kurzlösung: {}\n\nFRAGE DES STUDENTEN:\n\"{}\"",
        fall.fall_titel, fall.zentrales_problem, fall.kernfrage, fall.kurzloesung, frage
      ),
    };

    let antwort = model.generate(&prompts.tutor_system, &user).await?;
    Ok((antwort, kontext_fall.map(|c| c.fall_titel.clone())))
  })
  .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  struct KeywordEmbedder;

  #[async_trait]
  impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MentorError> {
      // Anything mentioning the Abstraktionsprinzip lands on axis 0.
      Ok(if text.contains("Abstraktionsprinzip") {
        vec![1.0, 0.0]
      } else {
        vec![0.0, 1.0]
      })
    }
  }

  /// Echoes the user content so tests can inspect the assembled prompt.
  struct EchoModel {
    calls: AtomicU32,
    fail_first: bool,
  }

  #[async_trait]
  impl GenerativeModel for EchoModel {
    async fn generate(&self, _system: &str, user: &str) -> Result<String, MentorError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if self.fail_first && n == 1 {
        return Err(MentorError::Transport("HTTP 502".into()));
      }
      Ok(format!("ANTWORT auf: {user}"))
    }
  }

  const FAST: RetryPolicy = RetryPolicy {
    max_attempts: 2,
    min_delay: Duration::from_millis(1),
    max_delay: Duration::from_millis(5),
  };

  fn corpus() -> Vec<CaseRecord> {
    vec![CaseRecord {
      fall_titel: "Der Grundstückskauf".into(),
      rechtsgebiet: "BGB AT".into(),
      zentrales_problem: "Abstraktionsprinzip bei der Übereignung".into(),
      kernfrage: "Trennung von Verpflichtung und Verfügung?".into(),
      kurzloesung: "Beide Geschäfte sind getrennt zu beurteilen.".into(),
      sachverhalt: String::new(),
      loesungsskizze: vec![],
      schwierigkeit: 3,
      bearbeitungszeit: 180,
    }]
  }

  #[tokio::test]
  async fn matched_context_is_woven_into_the_prompt_and_title_returned() {
    let cases = corpus();
    let index = EmbeddingIndex::build(&cases, &KeywordEmbedder).await.unwrap();
    let model = EchoModel { calls: AtomicU32::new(0), fail_first: false };

    let (antwort, titel) = answer_with_policy(
      &model,
      &KeywordEmbedder,
      &Prompts::default(),
      "Was besagt das Abstraktionsprinzip?",
      Some(&cases),
      Some(&index),
      &FAST,
    )
    .await
    .unwrap();

    assert_eq!(titel.as_deref(), Some("Der Grundstückskauf"));
    assert!(antwort.contains("Fall-Titel: Der Grundstückskauf"));
    assert!(antwort.contains("FRAGE DES STUDENTEN"));
  }

  #[tokio::test]
  async fn unrelated_question_falls_back_to_general_knowledge() {
    let cases = corpus();
    let index = EmbeddingIndex::build(&cases, &KeywordEmbedder).await.unwrap();
    let model = EchoModel { calls: AtomicU32::new(0), fail_first: false };

    let (antwort, titel) = answer_with_policy(
      &model,
      &KeywordEmbedder,
      &Prompts::default(),
      "Was ist eine Willenserklärung?",
      Some(&cases),
      Some(&index),
      &FAST,
    )
    .await
    .unwrap();

    assert!(titel.is_none());
    assert!(antwort.contains("Kein passender Kontext gefunden"));
  }

  #[tokio::test]
  async fn absent_corpus_means_no_context_not_an_error() {
    let model = EchoModel { calls: AtomicU32::new(0), fail_first: false };
    let (_, titel) = answer_with_policy(
      &model,
      &KeywordEmbedder,
      &Prompts::default(),
      "Was ist das Abstraktionsprinzip?",
      None,
      None,
      &FAST,
    )
    .await
    .unwrap();
    assert!(titel.is_none());
  }

  #[tokio::test]
  async fn transient_failure_is_retried_on_the_chat_path() {
    let model = EchoModel { calls: AtomicU32::new(0), fail_first: true };
    let (antwort, _) = answer_with_policy(
      &model,
      &KeywordEmbedder,
      &Prompts::default(),
      "Frage",
      None,
      None,
      &FAST,
    )
    .await
    .unwrap();
    assert!(antwort.starts_with("ANTWORT"));
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
  }
}
