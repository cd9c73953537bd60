//! JuraMentor · German Civil-Law Exam Trainer Backend
//!
//! - Axum HTTP + WebSocket API
//! - Optional OpenAI integration (via environment variables)
//! - Semantic retrieval over a static case corpus (RAG tutor)
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   OPENAI_API_KEY    : enables generation/grading/retrieval if present
//!   OPENAI_BASE_URL    : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL  : default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL   : default "gpt-4o"
//!   OPENAI_EMBED_MODEL : default "text-embedding-3-small"
//!   CORPUS_PATH    : path to the case corpus JSON (default data/zivilrecht-faelle.json)
//!   MENTOR_CONFIG_PATH : path to TOML config (prompt overrides)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod corpus;
mod embedding;
mod retry;
mod openai;
mod pipeline;
mod chatbot;
mod gamification;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (corpus, embedding index, client, prompts).
  // This is the single-threaded build phase; no traffic is served before it
  // completes.
  let state = Arc::new(AppState::build().await);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "juramentor", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
