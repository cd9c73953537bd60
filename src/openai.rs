//! Minimal OpenAI-compatible client for our use-cases.
//!
//! We call chat.completions for text generation and /embeddings for the
//! retrieval index. Calls are instrumented and log model names, latencies,
//! and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.
//!
//! Generation responses are requested as plain text on purpose: the
//! pipeline's repair layer extracts the JSON object from whatever prose the
//! model wraps around it, so a strict response format is not assumed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::embedding::Embedder;
use crate::error::MentorError;
use crate::pipeline::GenerativeModel;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
  pub embed_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let embed_model =
      std::env::var("OPENAI_EMBED_MODEL").unwrap_or_else(|_| "text-embedding-3-small".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model, embed_model })
  }

  /// Strong model at a creative temperature; used for case generation.
  pub fn case_architect_model(&self) -> ChatModel<'_> {
    ChatModel { client: self, model: &self.strong_model, temperature: 0.95 }
  }

  /// Strong model at a low temperature; used for grading.
  pub fn grader_model(&self) -> ChatModel<'_> {
    ChatModel { client: self, model: &self.strong_model, temperature: 0.2 }
  }

  /// Fast model for the tutor chat path.
  pub fn tutor_model(&self) -> ChatModel<'_> {
    ChatModel { client: self, model: &self.fast_model, temperature: 0.2 }
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_text(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, MentorError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "juramentor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| MentorError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(MentorError::Transport(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| MentorError::Transport(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// Batch embedding call; one vector per input, input order preserved.
  #[instrument(level = "info", skip(self, texts), fields(model = %self.embed_model, count = texts.len()))]
  async fn embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MentorError> {
    let url = format!("{}/embeddings", self.base_url);
    let req = EmbeddingsRequest { model: self.embed_model.clone(), input: texts.to_vec() };

    let res = self.client.post(&url)
      .header(USER_AGENT, "juramentor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| MentorError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(MentorError::Transport(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: EmbeddingsResponse = res
      .json()
      .await
      .map_err(|e| MentorError::Transport(e.to_string()))?;

    // The API may reorder entries; `index` restores input order.
    let mut data = body.data;
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
  }
}

/// One chat tier (model + temperature) of the shared client.
#[derive(Clone, Copy)]
pub struct ChatModel<'a> {
  client: &'a OpenAI,
  model: &'a str,
  temperature: f32,
}

#[async_trait]
impl GenerativeModel for ChatModel<'_> {
  async fn generate(&self, system: &str, user: &str) -> Result<String, MentorError> {
    self.client.chat_text(self.model, system, user, self.temperature).await
  }
}

#[async_trait]
impl Embedder for OpenAI {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, MentorError> {
    let mut vectors = self.embeddings(&[text.to_string()]).await?;
    vectors
      .pop()
      .ok_or_else(|| MentorError::Decode("embeddings response was empty".into()))
  }

  async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MentorError> {
    self.embeddings(texts).await
  }
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

#[derive(Serialize)]
struct EmbeddingsRequest {
  model: String,
  input: Vec<String>,
}
#[derive(Deserialize)]
struct EmbeddingsResponse {
  data: Vec<EmbeddingDatum>,
}
#[derive(Deserialize)]
struct EmbeddingDatum {
  index: usize,
  embedding: Vec<f32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
