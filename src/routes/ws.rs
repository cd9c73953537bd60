//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "juramentor", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "juramentor", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "juramentor", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "juramentor", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "juramentor", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewCase { schwierigkeit, schwerpunkte } => {
      let schwierigkeit = schwierigkeit.unwrap_or(2);
      match do_generate_case(state, schwierigkeit, &schwerpunkte).await {
        Ok(fall) => {
          info!(target: "klausur", id = %fall.id, %schwierigkeit, "WS case served");
          ServerWsMessage::Case { fall }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SubmitSolution { case_id, loesung } => {
      let input = crate::protocol::GradeIn {
        case_id: Some(case_id),
        sachverhalt: None,
        loesungsskizze: None,
        loesung,
      };
      match do_grade(state, input).await {
        Ok(out) => {
          info!(
            target: "klausur",
            uebereinstimmung = out.feedback.uebereinstimmung_loesungsskizze,
            "WS grade evaluated"
          );
          ServerWsMessage::Feedback { feedback: out.feedback, neue_erfolge: out.neue_erfolge }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Ask { frage } => match do_ask(state, &frage).await {
      Ok((antwort, kontext_titel)) => ServerWsMessage::Answer { antwort, kontext_titel },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::ResetSession => {
      do_reset(state).await;
      ServerWsMessage::SessionReset
    }
  }
}
