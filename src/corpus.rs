//! Corpus store: loads the static case database from a JSON file.
//!
//! The corpus is read once at startup and never mutated afterwards. A
//! missing file is an explicit absent-corpus state (the retriever and the
//! tutor degrade to "no context"), not a crash. We do no schema validation
//! beyond structural decoding; malformed entries are the data owner's
//! responsibility.

use tracing::{info, instrument};

use crate::domain::CaseRecord;
use crate::error::MentorError;

pub const DEFAULT_CORPUS_PATH: &str = "data/zivilrecht-faelle.json";

/// Load all case records from `path`.
#[instrument(level = "info")]
pub fn load_cases(path: &str) -> Result<Vec<CaseRecord>, MentorError> {
  let raw = match std::fs::read_to_string(path) {
    Ok(s) => s,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(MentorError::ResourceNotFound(path.to_string()));
    }
    Err(e) => return Err(MentorError::ResourceNotFound(format!("{path}: {e}"))),
  };
  let cases: Vec<CaseRecord> = serde_json::from_str(&raw)
    .map_err(|e| MentorError::Decode(format!("corpus {path}: {e}")))?;
  info!(target: "juramentor", %path, count = cases.len(), "Corpus loaded");
  Ok(cases)
}

/// Resolve the corpus path from CORPUS_PATH or the default location.
pub fn corpus_path_from_env() -> String {
  std::env::var("CORPUS_PATH").unwrap_or_else(|_| DEFAULT_CORPUS_PATH.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn loads_records_from_file() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
      f,
      r#"[{{
        "fall_titel": "Der fliegende Dachziegel",
        "rechtsgebiet": "Schuldrecht BT",
        "zentrales_problem": "Verkehrssicherungspflicht des Hauseigentümers",
        "kernfrage": "Haftet E aus § 823 I BGB?",
        "kurzloesung": "Ja, bei Verletzung der Verkehrssicherungspflicht.",
        "schwierigkeit": 2,
        "bearbeitungszeit": 120
      }}]"#
    )
    .unwrap();

    let cases = load_cases(f.path().to_str().unwrap()).unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].fall_titel, "Der fliegende Dachziegel");
    assert_eq!(cases[0].schwierigkeit, 2);
    assert!(cases[0].loesungsskizze.is_empty());
  }

  #[test]
  fn missing_file_is_resource_not_found() {
    let err = load_cases("/nonexistent/faelle.json").unwrap_err();
    assert!(matches!(err, MentorError::ResourceNotFound(_)));
  }

  #[test]
  fn malformed_json_is_decode_failure() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "[{{not json").unwrap();
    let err = load_cases(f.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, MentorError::Decode(_)));
  }
}
