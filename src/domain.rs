//! Domain models: corpus cases, generated cases, grading feedback, history.
//!
//! Field names follow the corpus/JSON contract of the original case
//! database (German keys, umlauts preserved via serde renames).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored legal-exam case from the corpus file. Immutable after load;
/// identity is the position in the loaded corpus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseRecord {
  pub fall_titel: String,
  pub rechtsgebiet: String,
  /// Central problem description; this is the text that gets embedded.
  pub zentrales_problem: String,
  pub kernfrage: String,
  pub kurzloesung: String,
  #[serde(default)]
  pub sachverhalt: String,
  #[serde(default, rename = "lösungsskizze")]
  pub loesungsskizze: Vec<String>,
  #[serde(default)]
  pub schwierigkeit: u8,
  #[serde(default)]
  pub bearbeitungszeit: u32,
}

/// Where a case presented to the user came from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseSource {
  Generated,
  Corpus,
}

/// A transient exam case produced by the generation pipeline.
/// Held in the active session only; discarded on reset or process end.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedCase {
  pub id: String,
  pub source: CaseSource,
  pub rechtsgebiet: String,
  pub thema: String,
  /// Echoes the requested difficulty (0-5).
  pub schwierigkeit: u8,
  /// Estimated working time in minutes.
  pub bearbeitungszeit: u32,
  pub sachverhalt: String,
  /// Ordered outline entries; leading whitespace conveys hierarchy.
  #[serde(rename = "lösungsskizze")]
  pub loesungsskizze: Vec<String>,
}

/// Structured grading feedback for one submitted solution.
///
/// The percentage measures structural alignment with the reference outline
/// only, not substantive correctness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradingResult {
  #[serde(rename = "übereinstimmung_lösungsskizze")]
  pub uebereinstimmung_loesungsskizze: u8,
  pub feedback_struktur: String,
  pub feedback_gutachtenstil: String,
  pub feedback_materielles_recht: String,
  pub fazit: String,
  pub verbesserungsvorschlag: String,
}

/// Derived summary of one grading, appended to the learning history.
/// Never mutated after creation.
#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
  pub thema: String,
  pub schwierigkeit: u8,
  /// Structural match percentage from the grading result.
  pub bewertung: u8,
  pub datum: DateTime<Utc>,
}
