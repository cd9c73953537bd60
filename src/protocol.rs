//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{CaseRecord, GeneratedCase, GradingResult, HistoryEntry};
use crate::gamification::Achievement;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewCase {
        schwierigkeit: Option<u8>,
        #[serde(default)]
        schwerpunkte: Vec<String>,
    },
    SubmitSolution {
        #[serde(rename = "caseId")]
        case_id: String,
        loesung: String,
    },
    Ask {
        frage: String,
    },
    ResetSession,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Case {
        fall: GeneratedCase,
    },
    Feedback {
        feedback: GradingResult,
        neue_erfolge: Vec<Achievement>,
    },
    Answer {
        antwort: String,
        kontext_titel: Option<String>,
    },
    SessionReset,
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct CaseQuery {
    pub schwierigkeit: Option<u8>,
    /// Comma-separated personalization tags, e.g. "Sachenrecht,BGB AT".
    pub schwerpunkte: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CorpusCaseQuery {
    pub index: usize,
}

#[derive(Deserialize)]
pub struct GradeIn {
    /// Reference a generated case held in the session...
    #[serde(rename = "caseId")]
    pub case_id: Option<String>,
    /// ...or carry scenario and outline explicitly.
    pub sachverhalt: Option<String>,
    #[serde(rename = "lösungsskizze")]
    pub loesungsskizze: Option<Vec<String>>,
    pub loesung: String,
}
#[derive(Debug, Serialize)]
pub struct GradeOut {
    pub feedback: GradingResult,
    pub neue_erfolge: Vec<Achievement>,
}

#[derive(Deserialize)]
pub struct AskIn {
    pub frage: String,
}
#[derive(Serialize)]
pub struct AskOut {
    pub antwort: String,
    pub kontext_titel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub frage: String,
}

/// Best-match summary; omits the full scenario narrative.
#[derive(Serialize)]
pub struct MatchOut {
    pub fall_titel: Option<String>,
    pub zentrales_problem: Option<String>,
    pub kernfrage: Option<String>,
    pub kurzloesung: Option<String>,
}

impl MatchOut {
    pub fn from_case(c: Option<&CaseRecord>) -> Self {
        match c {
            Some(c) => Self {
                fall_titel: Some(c.fall_titel.clone()),
                zentrales_problem: Some(c.zentrales_problem.clone()),
                kernfrage: Some(c.kernfrage.clone()),
                kurzloesung: Some(c.kurzloesung.clone()),
            },
            None => Self {
                fall_titel: None,
                zentrales_problem: None,
                kernfrage: None,
                kurzloesung: None,
            },
        }
    }
}

#[derive(Serialize)]
pub struct ProgressOut {
    pub historie: Vec<HistoryEntry>,
    pub erfolge: Vec<Achievement>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
