use super::registry::RoomHandle;
use super::AppState;
use crate::config::ConfigUpdate;
use crate::error::{GameError, GameResult};
use crate::game::{AfterDeparture, GameRoom};
use crate::protocol::{Outbound, RoomSnapshot, RoomSummary, ServerMessage};
use crate::types::*;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A membership that was just created or joined, with its notification feed.
/// The feed is subscribed before the room is touched so nothing is missed.
pub struct JoinedRoom {
    pub code: RoomCode,
    pub room: RoomSnapshot,
    pub events: broadcast::Receiver<Outbound>,
}

fn special_role_briefing(role: SpecialRole) -> &'static str {
    match role {
        SpecialRole::Detective => {
            "You are the detective. Interrogate players to learn their side, but answers are not always truthful."
        }
        SpecialRole::Medic => "You are the medic. Once per game you can remove a vote during voting.",
        SpecialRole::Writer => {
            "You are the writer. Once per round you can try to change the word another player sees."
        }
    }
}

impl AppState {
    async fn room_for(&self, code: &str) -> GameResult<Arc<RoomHandle>> {
        self.registry
            .get(code)
            .await
            .ok_or_else(|| GameError::not_found("Room"))
    }

    pub async fn create_room(
        &self,
        player_id: &str,
        room_name: Option<String>,
        player_name: Option<String>,
    ) -> GameResult<JoinedRoom> {
        let handle = self
            .registry
            .create(room_name, player_id.to_string(), player_name)
            .await?;
        let events = handle.subscribe();
        let room = handle.room.lock().await;
        Ok(JoinedRoom {
            code: handle.code.clone(),
            room: room.snapshot(),
            events,
        })
    }

    pub async fn list_rooms(&self, query: Option<&str>) -> Vec<RoomSummary> {
        self.registry.list(query).await
    }

    pub async fn join_room(
        &self,
        player_id: &str,
        code: &str,
        player_name: Option<String>,
    ) -> GameResult<JoinedRoom> {
        let handle = self.room_for(code).await?;
        let events = handle.subscribe();
        let mut room = handle.room.lock().await;
        if !self.registry.is_live(&handle).await {
            return Err(GameError::not_found("Room"));
        }
        room.add_player(player_id.to_string(), player_name)?;
        self.publish_snapshot(&handle, &room);
        Ok(JoinedRoom {
            code: handle.code.clone(),
            room: room.snapshot(),
            events,
        })
    }

    /// Leave a room (explicitly or by disconnecting). The last human out
    /// takes the room down with them.
    pub async fn leave_room(&self, player_id: &str, code: &str) -> GameResult<()> {
        let handle = self.room_for(code).await?;
        let mut room = handle.room.lock().await;
        match room.remove_player(player_id)? {
            AfterDeparture::Abandoned => {
                self.registry.remove(&handle.code).await;
            }
            next => self.after_departure(&handle, &mut room, next),
        }
        Ok(())
    }

    pub async fn add_bot(&self, player_id: &str, code: &str) -> GameResult<()> {
        self.with_room(code, |_, handle, room| {
            room.ensure_host(player_id, "add bots")?;
            room.add_bot()?;
            self.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    pub async fn remove_bot(&self, player_id: &str, code: &str, bot_id: &str) -> GameResult<()> {
        self.with_room(code, |_, handle, room| {
            room.ensure_host(player_id, "remove bots")?;
            room.remove_bot(bot_id)?;
            self.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    pub async fn update_player_name(&self, player_id: &str, code: &str, name: &str) -> GameResult<()> {
        self.with_room(code, |_, handle, room| {
            room.ensure_member(player_id)?;
            room.rename_player(player_id, name)?;
            self.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    pub async fn update_bot_name(
        &self,
        player_id: &str,
        code: &str,
        bot_id: &str,
        name: &str,
    ) -> GameResult<()> {
        self.with_room(code, |_, handle, room| {
            room.ensure_host(player_id, "rename bots")?;
            room.rename_bot(bot_id, name)?;
            self.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    pub async fn update_config(
        &self,
        player_id: &str,
        code: &str,
        update: &ConfigUpdate,
    ) -> GameResult<()> {
        self.with_room(code, |_, handle, room| {
            room.ensure_host(player_id, "change settings")?;
            room.update_config(update)?;
            self.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    pub async fn start_game(&self, player_id: &str, code: &str) -> GameResult<()> {
        self.with_room(code, |state, handle, room| {
            room.ensure_host(player_id, "start the game")?;
            room.start_game()?;

            for player in &room.players {
                let Some(role) = player.role else {
                    continue;
                };
                handle.notify_player(
                    &player.id,
                    ServerMessage::GameStarted {
                        role,
                        special_role: player.special_role,
                        word: room.word_for(&player.id),
                        clue: room.clue_for(&player.id),
                        word_history: room.word_history.clone(),
                        ability: room.ability_of(&player.id).cloned(),
                    },
                );
                if let Some(special) = player.special_role {
                    handle.notify_player(
                        &player.id,
                        ServerMessage::RoleNotification {
                            kind: format!("{:?}", special).to_lowercase(),
                            message: special_role_briefing(special).to_string(),
                        },
                    );
                }
            }

            let (revealed, total) = room.reveal_progress();
            handle.notify_room(ServerMessage::RevealProgress { revealed, total });
            state.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    pub async fn player_revealed(&self, player_id: &str, code: &str) -> GameResult<()> {
        self.with_room(code, |state, handle, room| {
            let (revealed, total) = room.acknowledge_reveal(player_id)?;
            handle.notify_room(ServerMessage::RevealProgress { revealed, total });
            if room.reveal_complete() {
                state.begin_playing(handle, room);
            }
            Ok(())
        })
        .await
    }

    pub async fn submit_word(&self, player_id: &str, code: &str, word: &str) -> GameResult<()> {
        self.with_room(code, |state, handle, room| {
            room.ensure_member(player_id)?;
            let record = room.submit_word(player_id, word)?;
            state.word_accepted(handle, room, record);
            Ok(())
        })
        .await
    }

    pub async fn submit_vote(&self, player_id: &str, code: &str, target_id: &str) -> GameResult<()> {
        self.with_room(code, |state, handle, room| {
            room.ensure_member(player_id)?;
            room.submit_vote(player_id, target_id)?;
            state.vote_accepted(handle, room);
            Ok(())
        })
        .await
    }

    /// Detective ability. The verdict goes to the detective only.
    pub async fn interrogate_player(
        &self,
        player_id: &str,
        code: &str,
        target_id: &str,
    ) -> GameResult<ServerMessage> {
        self.with_room(code, |_, _, room| {
            room.ensure_member(player_id)?;
            let result = room.interrogate(player_id, target_id)?;
            Ok(ServerMessage::InterrogationResult {
                target_id: result.target,
                role: result.verdict,
            })
        })
        .await
    }

    /// Medic ability. Everyone sees the new counts, not who used it.
    pub async fn remove_vote(
        &self,
        player_id: &str,
        code: &str,
        target_id: &str,
    ) -> GameResult<ServerMessage> {
        self.with_room(code, |state, handle, room| {
            room.ensure_member(player_id)?;
            room.remove_vote(player_id, target_id)?;
            state.vote_removed(handle, room, target_id);
            Ok(ServerMessage::VoteRemoved {
                target_id: target_id.to_string(),
            })
        })
        .await
    }

    /// Writer ability. Only the writer learns whether the swap landed.
    pub async fn use_writer_ability(
        &self,
        player_id: &str,
        code: &str,
        target_id: &str,
        fake_word: &str,
    ) -> GameResult<ServerMessage> {
        self.with_room(code, |state, handle, room| {
            room.ensure_member(player_id)?;
            let swap = room.use_writer_ability(player_id, target_id, fake_word)?;
            state.word_swap_landed(handle, room, &swap);
            Ok(ServerMessage::WriterResult {
                target_id: swap.target,
                success: swap.success,
            })
        })
        .await
    }

    pub async fn return_to_lobby(&self, player_id: &str, code: &str) -> GameResult<()> {
        self.with_room(code, |state, handle, room| {
            room.ensure_host(player_id, "return to the lobby")?;
            room.return_to_lobby()?;
            state.publish_snapshot(handle, room);
            Ok(())
        })
        .await
    }

    /// Lock a live room and run `f` on it
    async fn with_room<T>(
        &self,
        code: &str,
        f: impl FnOnce(&Self, &Arc<RoomHandle>, &mut GameRoom) -> GameResult<T>,
    ) -> GameResult<T> {
        let handle = self.room_for(code).await?;
        let mut room = handle.room.lock().await;
        f(self, &handle, &mut *room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameMode, Timings};
    use crate::state::RoomRegistry;

    fn app() -> AppState {
        AppState::with_registry(RoomRegistry::with_seed(7), Timings::instant())
    }

    fn drain(events: &mut broadcast::Receiver<Outbound>, player_id: &str) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            if event.is_for(player_id) {
                out.push(event.message);
            }
        }
        out
    }

    async fn lobby(app: &AppState, bots: usize) -> (JoinedRoom, JoinedRoom) {
        let host = app
            .create_room("h1", Some("Test".to_string()), Some("Ana".to_string()))
            .await
            .unwrap();
        let guest = app
            .join_room("h2", &host.code, Some("Ben".to_string()))
            .await
            .unwrap();
        for _ in 0..bots {
            app.add_bot("h1", &host.code).await.unwrap();
        }
        (host, guest)
    }

    #[tokio::test]
    async fn test_create_and_join() {
        let app = app();
        let (mut host, guest) = lobby(&app, 0).await;
        assert_eq!(guest.room.players.len(), 2);
        assert_eq!(guest.room.host_id, "h1");

        let seen = drain(&mut host.events, "h1");
        assert!(matches!(
            seen.last(),
            Some(ServerMessage::RoomUpdated { room }) if room.players.len() == 2
        ));
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let app = app();
        let err = app.join_room("p", "ZZZZZZ", None).await.err().unwrap();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_lobby_actions_are_host_only() {
        let app = app();
        let (host, _guest) = lobby(&app, 0).await;

        let err = app.add_bot("h2", &host.code).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        let err = app.start_game("h2", &host.code).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        let update = ConfigUpdate {
            game_mode: Some(GameMode::Roles),
            ..Default::default()
        };
        assert!(app.update_config("h2", &host.code, &update).await.is_err());
        app.update_config("h1", &host.code, &update).await.unwrap();

        app.update_player_name("h2", &host.code, "Benny").await.unwrap();
        let handle = app.registry.get(&host.code).await.unwrap();
        assert_eq!(handle.room.lock().await.display_name("h2"), "Benny");
    }

    #[tokio::test]
    async fn test_start_sends_private_roles() {
        let app = app();
        let (mut host, mut guest) = lobby(&app, 2).await;
        drain(&mut host.events, "h1");
        drain(&mut guest.events, "h2");

        app.start_game("h1", &host.code).await.unwrap();

        let host_seen = drain(&mut host.events, "h1");
        let started: Vec<_> = host_seen
            .iter()
            .filter(|m| matches!(m, ServerMessage::GameStarted { .. }))
            .collect();
        assert_eq!(started.len(), 1);
        match started[0] {
            ServerMessage::GameStarted {
                role, word, clue, ..
            } => match role {
                Role::Civil => assert!(word.is_some() && clue.is_none()),
                Role::Impostor => assert!(word.is_none() && clue.is_some()),
            },
            _ => unreachable!(),
        }
        assert!(host_seen.iter().any(|m| matches!(
            m,
            ServerMessage::RevealProgress {
                revealed: 0,
                total: 2
            }
        )));
        // Roles stay hidden in the public snapshot
        assert!(host_seen.iter().any(|m| matches!(
            m,
            ServerMessage::RoomUpdated { room } if room.players.iter().all(|p| p.role.is_none())
        )));
    }

    #[tokio::test]
    async fn test_reveals_open_playing_phase() {
        let app = app();
        let (mut host, _guest) = lobby(&app, 1).await;
        app.start_game("h1", &host.code).await.unwrap();
        app.player_revealed("h1", &host.code).await.unwrap();
        drain(&mut host.events, "h1");

        app.player_revealed("h2", &host.code).await.unwrap();
        let seen = drain(&mut host.events, "h1");
        assert!(seen.iter().any(|m| matches!(
            m,
            ServerMessage::PlayingPhaseStarted { player_order, .. } if player_order.len() == 3
        )));
        let handle = app.registry.get(&host.code).await.unwrap();
        assert_eq!(handle.room.lock().await.phase, GamePhase::Playing);
    }

    #[tokio::test]
    async fn test_last_human_leaving_removes_room() {
        let app = app();
        let (host, _guest) = lobby(&app, 1).await;
        app.leave_room("h1", &host.code).await.unwrap();

        let handle = app.registry.get(&host.code).await.unwrap();
        assert_eq!(handle.room.lock().await.host_id, "h2");

        app.leave_room("h2", &host.code).await.unwrap();
        assert!(app.registry.get(&host.code).await.is_none());
        assert_eq!(app.registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_return_to_lobby_only_when_finished() {
        let app = app();
        let (host, _guest) = lobby(&app, 1).await;
        app.start_game("h1", &host.code).await.unwrap();
        let err = app.return_to_lobby("h1", &host.code).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }
}
