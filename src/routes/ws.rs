//! WebSocket upgrade + message loop. Each connection owns one workflow run;
//! client messages are parsed as JSON intents and forwarded to the driver.
//!
//! Generation intents are answered in two steps: the busy snapshot goes out
//! before the gateway call is issued, and while the call is in flight the
//! socket keeps being drained so that intents arriving mid-call are dropped,
//! not queued (ping excepted). The settled snapshot follows once the call
//! completes. Disconnecting discards the run; nothing is persisted.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn};

use crate::logic::{apply_intent, run_generation, Dispatch, GenerationCall};
use crate::protocol::{stage_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::workflow::Workflow;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
  info!(target: "courseloom", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn send_msg(socket: &mut WebSocket, reply: &ServerWsMessage) -> Result<(), ()> {
  let out = serde_json::to_string(reply).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) })
      .to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|_| ())
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let mut wf = Workflow::new();
  info!(target: "courseloom", run_id = %wf.run_id, "WebSocket connected, workflow started");

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let dispatch = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "courseloom", run_id = %wf.run_id, "WS received: {:?}", &incoming);
            apply_intent(&mut wf, incoming)
          }
          Err(e) => {
            Dispatch::Reply(vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }])
          }
        };

        let ok = match dispatch {
          Dispatch::Reply(replies) => {
            let mut ok = true;
            for reply in &replies {
              if send_msg(&mut socket, reply).await.is_err() {
                ok = false;
                break;
              }
            }
            ok
          }
          Dispatch::Generate { busy, call } => {
            // Busy snapshot first, so the client sees the generating stage
            // while the call is actually outstanding.
            if send_msg(&mut socket, &busy).await.is_err() {
              false
            } else {
              match settle_generation(&mut socket, &state, &wf, call).await {
                Some(event) => {
                  wf.dispatch(event);
                  send_msg(
                    &mut socket,
                    &ServerWsMessage::Stage { stage: stage_out(&wf.stage) },
                  )
                  .await
                  .is_ok()
                }
                // Socket went away mid-call; the run is discarded with it.
                None => false,
              }
            }
          }
        };
        if !ok {
          error!(target: "courseloom", run_id = %wf.run_id, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => {
        let _ = socket.send(Message::Pong(payload)).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "courseloom", run_id = %wf.run_id, stage = wf.stage.name(), "WebSocket disconnected, workflow discarded");
}

/// Await the in-flight generation while draining the socket. Intents that
/// arrive during the call are dropped (the busy guard: no queuing); protocol
/// pings are still answered. Returns None if the connection closed.
async fn settle_generation(
  socket: &mut WebSocket,
  state: &AppState,
  wf: &Workflow,
  call: GenerationCall,
) -> Option<crate::workflow::Event> {
  let generation = run_generation(state, call);
  tokio::pin!(generation);

  loop {
    tokio::select! {
      event = &mut generation => return Some(event),
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(ClientWsMessage::Ping) => {
            if send_msg(socket, &ServerWsMessage::Pong).await.is_err() {
              return None;
            }
          }
          Ok(dropped) => {
            warn!(target: "workflow", run_id = %wf.run_id, "Intent dropped while generation in flight: {:?}", dropped);
          }
          Err(e) => {
            if send_msg(socket, &ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) })
              .await
              .is_err()
            {
              return None;
            }
          }
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
        }
        Some(Ok(Message::Close(_))) | None => return None,
        Some(Ok(_)) => {}
        Some(Err(_)) => return None,
      },
    }
  }
}
