pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::{ClientMessage, Outbound, RoomSnapshot, ServerMessage};
use crate::state::{AppState, JoinedRoom};
use crate::types::{PlayerId, RoomCode};

/// One connected client: its player id and the room it currently sits in
pub struct Session {
    pub player_id: PlayerId,
    pub room: Option<RoomCode>,
    events: Option<broadcast::Receiver<Outbound>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            player_id: ulid::Ulid::new().to_string(),
            room: None,
            events: None,
        }
    }

    /// Switch to a freshly created or joined room
    pub fn enter(&mut self, joined: JoinedRoom) -> (RoomCode, RoomSnapshot) {
        self.room = Some(joined.code.clone());
        self.events = Some(joined.events);
        (joined.code, joined.room)
    }

    /// Forget the current room; returns its code
    pub fn leave(&mut self) -> Option<RoomCode> {
        self.events = None;
        self.room.take()
    }

    /// Wait for the next room notification addressed to this player.
    /// Pends forever while outside a room.
    pub async fn next_event(&mut self) -> ServerMessage {
        loop {
            let Some(events) = self.events.as_mut() else {
                return std::future::pending().await;
            };
            match events.recv().await {
                Ok(event) if event.is_for(&self.player_id) => return event.message,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(player = %self.player_id, skipped, "Client fell behind on room events");
                }
                Err(RecvError::Closed) => self.events = None,
            }
        }
    }

    /// Notifications already queued for this player, without waiting
    pub fn pending_events(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        let Some(events) = self.events.as_mut() else {
            return out;
        };
        loop {
            match events.try_recv() {
                Ok(event) if event.is_for(&self.player_id) => out.push(event.message),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        out
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new();

    tracing::info!(player = %session.player_id, "WebSocket connected");

    let welcome = ServerMessage::Welcome {
        player_id: session.player_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            event = session.next_event() => {
                if !send_json(&mut sender, &event).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(player = %session.player_id, "Received message: {}", text.as_str());

                        if let Some(limiter) = &state.rate_limiter {
                            if !limiter.check(&session.player_id).await {
                                tracing::warn!(player = %session.player_id, "Rate limited");
                                let error = ServerMessage::Error {
                                    code: "RATE_LIMITED".to_string(),
                                    msg: "Too many messages, slow down".to_string(),
                                };
                                if !send_json(&mut sender, &error).await {
                                    break;
                                }
                                continue;
                            }
                        }

                        let response = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &mut session, &state).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };
                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(player = %session.player_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // A dropped connection counts as leaving the room
    if let Some(code) = session.leave() {
        if let Err(e) = state.leave_room(&session.player_id, &code).await {
            tracing::debug!(room = %code, "Disconnect cleanup skipped: {}", e);
        }
    }
    if let Some(limiter) = &state.rate_limiter {
        limiter.forget(&session.player_id).await;
    }
    tracing::info!(player = %session.player_id, "WebSocket connection closed");
}
