//! Voting and the elimination tally

use super::room::GameRoom;
use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::HashMap;

/// A cast vote. `seq` orders votes by submission; a medic marks a vote `voided`
/// so it stops counting while the voter still counts as having voted.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub target: PlayerId,
    pub seq: u64,
    pub voided: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TallyOutcome {
    /// Several players share the top count; nobody is eliminated
    Tied(Vec<PlayerId>),
    Eliminated {
        player_id: PlayerId,
        role: Role,
        votes: u32,
    },
}

impl GameRoom {
    pub fn submit_vote(&mut self, voter: &str, target: &str) -> GameResult<()> {
        if self.phase != GamePhase::Voting {
            return Err(GameError::state("Voting is not open"));
        }
        if self.locked {
            return Err(GameError::state("Votes are being counted"));
        }
        if self.participant(voter).is_none() {
            return Err(GameError::not_found("Player"));
        }
        if self.eliminated.contains(voter) {
            return Err(GameError::state("Eliminated players cannot vote"));
        }
        if self.participant(target).is_none() {
            return Err(GameError::not_found("Target"));
        }

        self.vote_seq += 1;
        self.votes.insert(
            voter.to_string(),
            Vote {
                target: target.to_string(),
                seq: self.vote_seq,
                voided: false,
            },
        );
        tracing::debug!(room = %self.code, voter, target, "Vote cast");
        Ok(())
    }

    pub fn has_voted(&self, player_id: &str) -> bool {
        self.votes.contains_key(player_id)
    }

    /// (alive players who voted, alive players)
    pub fn vote_progress(&self) -> (usize, usize) {
        let alive = self.alive_ids();
        let voted = alive.iter().filter(|id| self.has_voted(id)).count();
        (voted, alive.len())
    }

    pub fn all_votes_in(&self) -> bool {
        let (voted, total) = self.vote_progress();
        voted == total
    }

    fn counting_votes(&self) -> impl Iterator<Item = (&PlayerId, &Vote)> {
        self.votes
            .iter()
            .filter(|(voter, vote)| !vote.voided && self.is_alive(voter) && self.is_alive(&vote.target))
    }

    /// Votes per target, counting only votes between alive players
    pub fn vote_counts(&self) -> HashMap<PlayerId, u32> {
        let mut counts = HashMap::new();
        for (_, vote) in self.counting_votes() {
            *counts.entry(vote.target.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Count the votes. A unique leader is eliminated; otherwise every player
    /// sharing the top count is returned. No counting vote at all ties everyone.
    pub fn eliminate_player(&mut self) -> GameResult<TallyOutcome> {
        if self.phase != GamePhase::Voting {
            return Err(GameError::state("Voting is not open"));
        }

        let counts = self.vote_counts();
        let alive = self.alive_ids();
        let max = counts.values().copied().max().unwrap_or(0);

        let leaders: Vec<PlayerId> = if max == 0 {
            alive
        } else {
            alive
                .into_iter()
                .filter(|id| counts.get(id) == Some(&max))
                .collect()
        };

        self.locked = true;
        self.bump_epoch();

        if leaders.len() != 1 {
            tracing::info!(room = %self.code, tied = ?leaders, "Vote tied");
            return Ok(TallyOutcome::Tied(leaders));
        }

        let player_id = leaders[0].clone();
        let role = self.role_of(&player_id).unwrap_or(Role::Civil);
        self.eliminated.insert(player_id.clone());
        tracing::info!(
            room = %self.code,
            player = %player_id,
            role = ?role,
            votes = max,
            "Player eliminated"
        );
        Ok(TallyOutcome::Eliminated {
            player_id,
            role,
            votes: max,
        })
    }

    /// Void the earliest counting vote against `target`; returns its voter
    pub(crate) fn void_vote_for(&mut self, target: &str) -> Option<PlayerId> {
        let voter = self
            .counting_votes()
            .filter(|(_, vote)| vote.target == target)
            .min_by_key(|(_, vote)| vote.seq)
            .map(|(voter, _)| voter.clone())?;

        if let Some(vote) = self.votes.get_mut(&voter) {
            vote.voided = true;
        }
        Some(voter)
    }

    /// Vote for the bot, among alive players other than itself
    pub fn bot_vote(&mut self, bot_id: &str) -> Option<PlayerId> {
        if self.phase != GamePhase::Voting || self.locked || !self.is_alive(bot_id) {
            return None;
        }
        let eligible: Vec<PlayerId> = self
            .alive_ids()
            .into_iter()
            .filter(|id| id != bot_id)
            .collect();
        let bot = self.bots.iter().find(|b| b.player.id == bot_id)?;
        bot.brain.vote(&eligible, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::super::room::tests::room_with;
    use super::*;

    fn voting_room(humans: usize, seed: u64) -> GameRoom {
        let mut room = room_with(humans, 0, seed);
        room.start_game().unwrap();
        room.start_playing_phase();
        room.start_voting();
        room
    }

    fn cast(room: &mut GameRoom, votes: &[(&str, &str)]) {
        for (voter, target) in votes {
            room.submit_vote(voter, target).unwrap();
        }
    }

    #[test]
    fn test_two_way_tie_eliminates_nobody() {
        let mut room = voting_room(5, 1);
        cast(
            &mut room,
            &[("h1", "h2"), ("h2", "h1"), ("h3", "h1"), ("h4", "h2"), ("h5", "h3")],
        );
        assert!(room.all_votes_in());

        let outcome = room.eliminate_player().unwrap();
        assert_eq!(
            outcome,
            TallyOutcome::Tied(vec!["h1".to_string(), "h2".to_string()])
        );
        assert!(room.eliminated.is_empty());
    }

    #[test]
    fn test_unique_leader_eliminated() {
        let mut room = voting_room(4, 2);
        cast(&mut room, &[("h2", "h1"), ("h3", "h1"), ("h4", "h1"), ("h1", "h2")]);

        match room.eliminate_player().unwrap() {
            TallyOutcome::Eliminated {
                player_id,
                role,
                votes,
            } => {
                assert_eq!(player_id, "h1");
                assert_eq!(votes, 3);
                assert_eq!(Some(role), room.role_of("h1"));
            }
            other => panic!("expected elimination, got {:?}", other),
        }
        assert!(room.eliminated.contains("h1"));
        assert!(room.locked);
    }

    #[test]
    fn test_no_counting_votes_ties_everyone() {
        let mut room = voting_room(3, 3);
        let outcome = room.eliminate_player().unwrap();
        assert_eq!(
            outcome,
            TallyOutcome::Tied(vec!["h1".to_string(), "h2".to_string(), "h3".to_string()])
        );
    }

    #[test]
    fn test_revote_overwrites() {
        let mut room = voting_room(3, 4);
        cast(&mut room, &[("h1", "h2"), ("h1", "h3")]);
        let counts = room.vote_counts();
        assert_eq!(counts.get("h3"), Some(&1));
        assert_eq!(counts.get("h2"), None);
        assert_eq!(room.vote_progress(), (1, 3));
    }

    #[test]
    fn test_vote_validation() {
        let mut room = room_with(3, 0, 5);
        assert!(room.submit_vote("h1", "h2").is_err());

        let mut room = voting_room(4, 5);
        assert!(matches!(
            room.submit_vote("ghost", "h2"),
            Err(GameError::NotFound(_))
        ));
        assert!(matches!(
            room.submit_vote("h1", "ghost"),
            Err(GameError::NotFound(_))
        ));

        room.eliminated.insert("h4".to_string());
        assert!(matches!(
            room.submit_vote("h4", "h1"),
            Err(GameError::InvalidState(_))
        ));
        // Self-votes are allowed
        room.submit_vote("h1", "h1").unwrap();
    }

    #[test]
    fn test_votes_involving_eliminated_players_do_not_count() {
        let mut room = voting_room(4, 6);
        cast(&mut room, &[("h1", "h4"), ("h2", "h3")]);
        room.eliminated.insert("h4".to_string());
        let counts = room.vote_counts();
        assert_eq!(counts.get("h4"), None);
        assert_eq!(counts.get("h3"), Some(&1));
        assert_eq!(room.vote_progress(), (2, 3));
    }

    #[test]
    fn test_void_earliest_vote() {
        let mut room = voting_room(4, 7);
        cast(&mut room, &[("h3", "h1"), ("h2", "h1"), ("h4", "h1")]);
        assert_eq!(room.void_vote_for("h1"), Some("h3".to_string()));
        assert_eq!(room.vote_counts().get("h1"), Some(&2));
        // The voter still counts as having voted
        assert!(room.has_voted("h3"));
        assert_eq!(room.void_vote_for("h2"), None);
    }

    #[test]
    fn test_tiebreak_then_elimination_advances_round_once() {
        let mut room = room_with(5, 0, 8);
        room.start_game().unwrap();
        for id in ["h1", "h2", "h3", "h4", "h5"] {
            room.acknowledge_reveal(id).unwrap();
        }
        room.start_playing_phase();

        let speak_all = |room: &mut GameRoom| {
            while let Some(current) = room.current_player().cloned() {
                room.submit_word(&current, "Word").unwrap();
                room.conclude_turn();
            }
        };

        speak_all(&mut room);
        assert_eq!(room.phase, GamePhase::Voting);
        // Everyone gets exactly one vote: a full tie
        cast(
            &mut room,
            &[("h1", "h2"), ("h2", "h3"), ("h3", "h4"), ("h4", "h5"), ("h5", "h1")],
        );
        let TallyOutcome::Tied(tied) = room.eliminate_player().unwrap() else {
            panic!("expected a tie");
        };
        assert_eq!(tied.len(), 5);
        room.reset_for_tiebreaker(&tied);
        assert_eq!(room.round_number, 1);
        assert!(room.votes.is_empty());

        speak_all(&mut room);
        let civilian = room
            .players
            .iter()
            .find(|p| p.role == Some(Role::Civil))
            .map(|p| p.id.clone())
            .unwrap();
        let voters = room.alive_ids();
        for voter in &voters {
            room.submit_vote(voter, &civilian).unwrap();
        }
        assert!(matches!(
            room.eliminate_player().unwrap(),
            TallyOutcome::Eliminated { .. }
        ));
        assert_eq!(room.check_win_condition(), None);

        room.start_new_round();
        assert_eq!(room.round_number, 2);
        assert_eq!(room.player_order.len(), 4);
        assert!(!room.player_order.contains(&civilian));
    }

    #[test]
    fn test_tiebreaker_restricted_to_tied_players() {
        let mut room = voting_room(5, 9);
        let tied = vec!["h2".to_string(), "h4".to_string()];
        room.reset_for_tiebreaker(&tied);
        assert_eq!(room.phase, GamePhase::Playing);
        let mut order = room.player_order.clone();
        order.sort();
        assert_eq!(order, tied);
    }

    #[test]
    fn test_bot_vote_targets_alive_other_player() {
        let mut room = room_with(2, 2, 10);
        room.start_game().unwrap();
        room.start_playing_phase();
        room.start_voting();
        let bot_id = room.bots[0].player.id.clone();
        for _ in 0..20 {
            let target = room.bot_vote(&bot_id).unwrap();
            assert_ne!(target, bot_id);
            assert!(room.is_alive(&target));
        }
    }
}
