use axum::{
    extract::{Query, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::{IntoResponse, Response},
};
use bson::oid::ObjectId;
use futures::{SinkExt, StreamExt};
use realtydesk_services::support::{Caller, CaseEvent, events::PresenceSignal};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher::{send_to_connection, send_to_room};
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Frames a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
enum ClientMessage {
    Ping,
    JoinRoom { case_id: String },
    LeaveRoom { case_id: String },
    Typing(PresenceSignal),
    StopTyping(PresenceSignal),
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // Verify JWT before accepting the WebSocket
    let caller = match params.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => match state.auth.resolve_caller(token) {
            Ok(caller) => caller,
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => Caller::anonymous(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, caller))
}

async fn handle_socket(socket: WebSocket, state: AppState, caller: Caller) {
    let connection_id = Uuid::new_v4().to_string();
    info!(user_id = ?caller.user_id, role = ?caller.role, %connection_id, "WebSocket connected");

    let (mut sink, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Writer: the only task touching the sink.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    state.ws_storage.add(connection_id.clone(), &caller, tx.clone());

    send_to_connection(
        &state.ws_storage,
        &connection_id,
        &serde_json::json!({
            "type": "connected",
            "data": {
                "connection_id": connection_id,
                "user_id": caller.user_id.map(|id| id.to_hex()),
                "role": caller.role,
            }
        }),
    );

    // Message loop
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &caller, &connection_id, text.as_str()).await;
            }
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Err(e) => {
                warn!(user_id = ?caller.user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Cleanup: drop the connection and every room it was in
    state.ws_storage.remove(&connection_id);
    drop(tx);
    writer.abort();

    info!(
        user_id = ?caller.user_id,
        %connection_id,
        remaining = state.ws_storage.connection_count(),
        "WebSocket disconnected"
    );
}

async fn handle_client_message(state: &AppState, caller: &Caller, connection_id: &str, text: &str) {
    let parsed: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            reply_error(state, connection_id, &format!("Unrecognised message: {e}"));
            return;
        }
    };

    debug!(user_id = ?caller.user_id, %connection_id, ?parsed, "WS message received");

    match parsed {
        ClientMessage::Ping => {
            send_to_connection(&state.ws_storage, connection_id, &serde_json::json!({ "type": "pong" }));
        }
        ClientMessage::JoinRoom { case_id } => {
            let Some(room) = parse_room(state, connection_id, &case_id) else {
                return;
            };
            match state.cases.authorize_room(caller, room).await {
                Ok(()) => {
                    state.ws_storage.join(connection_id, room);
                    send_to_connection(
                        &state.ws_storage,
                        connection_id,
                        &serde_json::json!({ "type": "roomJoined", "data": { "case_id": case_id } }),
                    );
                }
                Err(e) => {
                    let message = ApiError::from(e);
                    let text = match message {
                        ApiError::NotFound(m) | ApiError::Forbidden(m) => m,
                        _ => "Could not join room".to_string(),
                    };
                    reply_error(state, connection_id, &text);
                }
            }
        }
        ClientMessage::LeaveRoom { case_id } => {
            let Some(room) = parse_room(state, connection_id, &case_id) else {
                return;
            };
            state.ws_storage.leave(connection_id, room);
            send_to_connection(
                &state.ws_storage,
                connection_id,
                &serde_json::json!({ "type": "roomLeft", "data": { "case_id": case_id } }),
            );
        }
        ClientMessage::Typing(signal) => {
            let case_id = signal.case_id.clone();
            relay_presence(state, connection_id, &case_id, CaseEvent::Typing(signal));
        }
        ClientMessage::StopTyping(signal) => {
            let case_id = signal.case_id.clone();
            relay_presence(state, connection_id, &case_id, CaseEvent::StopTyping(signal));
        }
    }
}

/// Forwards a typing signal to the rest of the room. Only members may signal.
fn relay_presence(state: &AppState, connection_id: &str, case_id: &str, event: CaseEvent) {
    let Some(room) = parse_room(state, connection_id, case_id) else {
        return;
    };
    if !state.ws_storage.is_member(connection_id, room) {
        reply_error(state, connection_id, "Join the room first");
        return;
    }
    if let Err(e) = send_to_room(&state.ws_storage, room, &event, Some(connection_id)) {
        warn!(%room, %e, "Failed to relay presence");
    }
}

fn parse_room(state: &AppState, connection_id: &str, case_id: &str) -> Option<ObjectId> {
    match ObjectId::parse_str(case_id) {
        Ok(id) => Some(id),
        Err(_) => {
            reply_error(state, connection_id, "Invalid case_id");
            None
        }
    }
}

fn reply_error(state: &AppState, connection_id: &str, message: &str) {
    send_to_connection(
        &state.ws_storage,
        connection_id,
        &serde_json::json!({ "type": "error", "data": { "message": message } }),
    );
}
