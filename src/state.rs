//! Application state: corpus, embedding index, remote client, prompts, and
//! the per-process session stores.
//!
//! Everything the core reads (corpus, index, prompts, client) is built once
//! in `AppState::build()` before the server accepts traffic and is never
//! mutated afterwards; arbitrarily many concurrent retrieval calls may read
//! it. Only the session stores (generated cases, learning history, unlocked
//! achievements) sit behind locks, and they are written exclusively by the
//! request that just produced a result.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::config::{load_mentor_config_from_env, Prompts};
use crate::corpus::{corpus_path_from_env, load_cases};
use crate::domain::{CaseRecord, GeneratedCase, GradingResult, HistoryEntry};
use crate::embedding::EmbeddingIndex;
use crate::error::MentorError;
use crate::gamification::{check_achievements, Achievement};
use crate::openai::OpenAI;

pub struct AppState {
    pub corpus: Option<Vec<CaseRecord>>,
    pub index: Option<EmbeddingIndex>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,

    pub cases: RwLock<HashMap<String, GeneratedCase>>,
    pub historie: RwLock<Vec<HistoryEntry>>,
    pub unlocked: RwLock<Vec<String>>,
}

impl AppState {
    /// Single-threaded build phase: load config, corpus, client, and the
    /// embedding index, in that order, before any concurrent read traffic.
    #[instrument(level = "info", skip_all)]
    pub async fn build() -> Self {
        let cfg_opt = load_mentor_config_from_env();
        let prompts = cfg_opt.map(|c| c.prompts).unwrap_or_default();

        let corpus_path = corpus_path_from_env();
        let corpus = match load_cases(&corpus_path) {
            Ok(cases) => Some(cases),
            Err(MentorError::ResourceNotFound(p)) => {
                warn!(target: "juramentor", path = %p, "Corpus file not found; retrieval degrades to no-context");
                None
            }
            Err(e) => {
                error!(target: "juramentor", error = %e, "Corpus load failed; retrieval degrades to no-context");
                None
            }
        };

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "juramentor", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, embed_model = %oa.embed_model, "OpenAI enabled.");
        } else {
            info!(target: "juramentor", "OpenAI disabled (no OPENAI_API_KEY). Generation and grading unavailable.");
        }

        // The index needs both a corpus and an embedding capability. Any
        // failure here degrades to an absent index rather than aborting
        // startup; the retriever then always answers "no match".
        let index = match (&corpus, &openai) {
            (Some(cases), Some(oa)) => match EmbeddingIndex::build(cases, oa).await {
                Ok(idx) => {
                    info!(target: "juramentor", vectors = idx.len(), "Embedding index built");
                    Some(idx)
                }
                Err(e) => {
                    error!(target: "juramentor", error = %e, "Embedding index build failed; retrieval disabled");
                    None
                }
            },
            _ => None,
        };

        if let Some(cases) = &corpus {
            let mut count_by_gebiet: HashMap<&str, usize> = HashMap::new();
            for c in cases {
                *count_by_gebiet.entry(c.rechtsgebiet.as_str()).or_default() += 1;
            }
            for (gebiet, n) in count_by_gebiet {
                info!(target: "juramentor", %gebiet, count = n, "Startup corpus inventory");
            }
        }

        Self {
            corpus,
            index,
            openai,
            prompts,
            cases: RwLock::new(HashMap::new()),
            historie: RwLock::new(Vec::new()),
            unlocked: RwLock::new(Vec::new()),
        }
    }

    /// Insert a generated case into the session store.
    #[instrument(level = "debug", skip(self, c), fields(id = %c.id))]
    pub async fn insert_case(&self, c: GeneratedCase) {
        self.cases.write().await.insert(c.id.clone(), c);
    }

    /// Read-only access to a session case by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_case(&self, id: &str) -> Option<GeneratedCase> {
        self.cases.read().await.get(id).cloned()
    }

    /// Append the grading summary to the history and evaluate achievements.
    /// Returns whatever newly unlocked.
    #[instrument(level = "info", skip(self, case, result), fields(case_id = %case.id))]
    pub async fn record_grading(
        &self,
        case: &GeneratedCase,
        result: &GradingResult,
    ) -> Vec<&'static Achievement> {
        let entry = HistoryEntry {
            thema: case.thema.clone(),
            schwierigkeit: case.schwierigkeit,
            bewertung: result.uebereinstimmung_loesungsskizze,
            datum: chrono::Utc::now(),
        };

        let mut historie = self.historie.write().await;
        let mut unlocked = self.unlocked.write().await;
        historie.push(entry);

        let newly = check_achievements(&historie, &unlocked);
        for a in &newly {
            info!(target: "juramentor", achievement = a.id, "Achievement unlocked");
            unlocked.push(a.id.to_string());
        }
        newly
    }

    /// Discard all session state (generated cases, history, achievements).
    #[instrument(level = "info", skip(self))]
    pub async fn reset_session(&self) {
        self.cases.write().await.clear();
        self.historie.write().await.clear();
        self.unlocked.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CaseSource;

    fn test_state() -> AppState {
        AppState {
            corpus: None,
            index: None,
            openai: None,
            prompts: Prompts::default(),
            cases: RwLock::new(HashMap::new()),
            historie: RwLock::new(Vec::new()),
            unlocked: RwLock::new(Vec::new()),
        }
    }

    fn case(schwierigkeit: u8) -> GeneratedCase {
        GeneratedCase {
            id: "f1".into(),
            source: CaseSource::Generated,
            rechtsgebiet: "BGB AT".into(),
            thema: "Anfechtung".into(),
            schwierigkeit,
            bearbeitungszeit: 180,
            sachverhalt: "K und V...".into(),
            loesungsskizze: vec!["A.".into()],
        }
    }

    fn grading(prozent: u8) -> GradingResult {
        GradingResult {
            uebereinstimmung_loesungsskizze: prozent,
            feedback_struktur: String::new(),
            feedback_gutachtenstil: String::new(),
            feedback_materielles_recht: String::new(),
            fazit: String::new(),
            verbesserungsvorschlag: String::new(),
        }
    }

    #[tokio::test]
    async fn record_grading_appends_history_and_unlocks() {
        let state = test_state();
        let newly = state.record_grading(&case(5), &grading(95)).await;
        let ids: Vec<_> = newly.iter().map(|a| a.id).collect();
        assert!(ids.contains(&"first_case"));
        assert!(ids.contains(&"high_score"));
        assert!(ids.contains(&"exam_ready"));
        assert_eq!(state.historie.read().await.len(), 1);
        assert_eq!(state.unlocked.read().await.len(), 3);

        // Second grading of the same kind unlocks nothing new.
        let again = state.record_grading(&case(5), &grading(95)).await;
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn reset_discards_all_session_state() {
        let state = test_state();
        state.insert_case(case(2)).await;
        state.record_grading(&case(2), &grading(70)).await;
        state.reset_session().await;
        assert!(state.cases.read().await.is_empty());
        assert!(state.historie.read().await.is_empty());
        assert!(state.unlocked.read().await.is_empty());
    }
}
