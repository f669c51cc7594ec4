//! WebSocket message dispatch
//!
//! Room-scoped commands resolve the room from the session, never from the
//! message, so a client can only act on the room it joined.

use super::Session;
use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

/// Resolve the session's room or answer with an error
macro_rules! in_room {
    ($session:expr) => {
        match $session.room.clone() {
            Some(code) => code,
            None => {
                return Some(ServerMessage::from(GameError::state(
                    "Join or create a room first",
                )))
            }
        }
    };
}

/// Commands without a direct answer only reply when they fail
fn reply(result: GameResult<()>) -> Option<ServerMessage> {
    result.err().map(ServerMessage::from)
}

fn answer(result: GameResult<ServerMessage>) -> Option<ServerMessage> {
    Some(result.unwrap_or_else(ServerMessage::from))
}

/// Leave whatever room the session is in; errors only mean it is already gone
async fn leave_current(session: &mut Session, state: &AppState) {
    if let Some(code) = session.leave() {
        if let Err(e) = state.leave_room(&session.player_id, &code).await {
            tracing::debug!(player = %session.player_id, room = %code, "Leave ignored: {}", e);
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let player_id = session.player_id.clone();

    match msg {
        ClientMessage::CreateRoom {
            room_name,
            player_name,
        } => {
            leave_current(session, state).await;
            match state.create_room(&player_id, room_name, player_name).await {
                Ok(joined) => {
                    let (code, room) = session.enter(joined);
                    Some(ServerMessage::RoomCreated { code, room })
                }
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::JoinRoom { code, player_name } => {
            if session.room.as_deref() == Some(code.trim().to_uppercase().as_str()) {
                return Some(GameError::state("Already in this room").into());
            }
            leave_current(session, state).await;
            match state.join_room(&player_id, &code, player_name).await {
                Ok(joined) => {
                    let (code, room) = session.enter(joined);
                    Some(ServerMessage::RoomJoined { code, room })
                }
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::ListRooms { query } => Some(ServerMessage::RoomList {
            rooms: state.list_rooms(query.as_deref()).await,
        }),

        ClientMessage::LeaveRoom => {
            let code = in_room!(session);
            session.leave();
            match state.leave_room(&player_id, &code).await {
                Ok(()) => Some(ServerMessage::RoomLeft),
                Err(e) => Some(e.into()),
            }
        }

        ClientMessage::UpdatePlayerName { name } => {
            let code = in_room!(session);
            reply(state.update_player_name(&player_id, &code, &name).await)
        }

        ClientMessage::AddBot => {
            let code = in_room!(session);
            reply(state.add_bot(&player_id, &code).await)
        }

        ClientMessage::RemoveBot { bot_id } => {
            let code = in_room!(session);
            reply(state.remove_bot(&player_id, &code, &bot_id).await)
        }

        ClientMessage::UpdateBotName { bot_id, name } => {
            let code = in_room!(session);
            reply(state.update_bot_name(&player_id, &code, &bot_id, &name).await)
        }

        ClientMessage::UpdateConfig { config } => {
            let code = in_room!(session);
            reply(state.update_config(&player_id, &code, &config).await)
        }

        ClientMessage::StartGame => {
            let code = in_room!(session);
            reply(state.start_game(&player_id, &code).await)
        }

        ClientMessage::ReturnToLobby => {
            let code = in_room!(session);
            reply(state.return_to_lobby(&player_id, &code).await)
        }

        ClientMessage::PlayerRevealed => {
            let code = in_room!(session);
            reply(state.player_revealed(&player_id, &code).await)
        }

        ClientMessage::SubmitWord { word } => {
            let code = in_room!(session);
            reply(state.submit_word(&player_id, &code, &word).await)
        }

        ClientMessage::SubmitVote { target_id } => {
            let code = in_room!(session);
            reply(state.submit_vote(&player_id, &code, &target_id).await)
        }

        ClientMessage::InterrogatePlayer { target_id } => {
            let code = in_room!(session);
            answer(state.interrogate_player(&player_id, &code, &target_id).await)
        }

        ClientMessage::RemoveVote { target_id } => {
            let code = in_room!(session);
            answer(state.remove_vote(&player_id, &code, &target_id).await)
        }

        ClientMessage::UseWriterAbility {
            target_id,
            fake_word,
        } => {
            let code = in_room!(session);
            answer(
                state
                    .use_writer_ability(&player_id, &code, &target_id, &fake_word)
                    .await,
            )
        }
    }
}
