//! Tournament aggregate operations.
//!
//! Every mutating operation goes through [`Tournament`]; the lazy sweep
//! ([`Tournament::sweep`]) finalizes elapsed matches and advances rounds and is
//! run after every operation, reads included.

use super::{
    advance::{self, Advancement, Champion},
    builder, registry,
    errors::{Missing, TournamentError, TournamentResult},
    models::{
        Caller, Entry, EntryId, Match, MatchStatus, Registration, Tournament, TournamentConfig,
        TournamentId, TournamentStatus, UserId,
    },
    resolver::VoteOutcome,
};
use chrono::{DateTime, Utc};

/// What a sweep changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sweep {
    /// Matches finalized because their window elapsed
    pub finalized: usize,
    pub advancements: Vec<Advancement>,
}

impl Sweep {
    pub fn changed(&self) -> bool {
        self.finalized > 0 || !self.advancements.is_empty()
    }

    pub fn champion(&self) -> Option<Champion> {
        self.advancements.iter().find_map(|a| match a {
            Advancement::Completed(champion) => Some(*champion),
            Advancement::RoundCreated { .. } => None,
        })
    }
}

impl Tournament {
    /// Create a draft tournament
    pub fn new(
        id: TournamentId,
        config: TournamentConfig,
        creator_id: UserId,
        now: DateTime<Utc>,
    ) -> TournamentResult<Self> {
        config.validate()?;

        Ok(Self {
            id,
            config,
            status: TournamentStatus::Draft,
            creator_id,
            entries: Vec::new(),
            matches: Vec::new(),
            winner: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            version: 0,
        })
    }

    /// Finalize every elapsed match, then advance rounds until nothing is eligible.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Sweep {
        let finalized = self
            .matches
            .iter_mut()
            .map(|m| m.resolve_if_elapsed(now))
            .filter(|&changed| changed)
            .count();

        Sweep {
            finalized,
            advancements: advance::try_advance(self, now),
        }
    }

    pub fn register_entry(
        &mut self,
        entry_id: EntryId,
        entry: Option<&Entry>,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        registry::register(self, entry_id, entry, caller.user_id, now)
    }

    pub fn withdraw_entry(
        &mut self,
        entry_id: EntryId,
        caller: Caller,
    ) -> TournamentResult<Registration> {
        registry::withdraw(self, entry_id, caller)
    }

    /// Build round one. Administrators only.
    pub fn start(&mut self, caller: Caller, now: DateTime<Utc>) -> TournamentResult<()> {
        caller.require_admin("start a tournament")?;
        builder::start(self, now)
    }

    fn match_mut(&mut self, index: usize) -> TournamentResult<&mut Match> {
        self.matches
            .get_mut(index)
            .ok_or(TournamentError::NotFound(Missing::Match(index)))
    }

    /// Vote in match `index`.
    ///
    /// The tournament must be active. A vote on a match whose window already
    /// closed finalizes it and reports [`VoteOutcome::Closed`]; that also holds
    /// for the finished matches of a completed tournament.
    pub fn vote(
        &mut self,
        index: usize,
        voter: UserId,
        pick: &str,
        now: DateTime<Utc>,
    ) -> TournamentResult<VoteOutcome> {
        if index >= self.matches.len() {
            return Err(TournamentError::NotFound(Missing::Match(index)));
        }
        // A completed tournament still answers late votes on its finished matches
        let late_read = self.status == TournamentStatus::Completed
            && self.matches[index].status == MatchStatus::Finished;
        if self.status != TournamentStatus::Active && !late_read {
            return Err(TournamentError::invalid_state(
                TournamentStatus::Active,
                self.status,
            ));
        }

        self.match_mut(index)?.cast_vote(voter, pick, now)
    }

    /// Clear the votes of an unfinished match. Administrators only.
    pub fn reset_match_votes(
        &mut self,
        index: usize,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        caller.require_admin("reset match votes")?;
        self.match_mut(index)?.reset_votes(now)
    }

    /// Number of rounds a full run of this bracket takes
    pub fn total_rounds(&self) -> u32 {
        self.config.size.rounds()
    }

    /// Highest round created so far, 0 before the start
    pub fn current_round(&self) -> u32 {
        self.matches.iter().map(|m| m.round).max().unwrap_or(0)
    }

    /// Matches of round `round` with their indices
    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = (usize, &Match)> {
        self.matches
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.round == round)
    }

    /// Index of the first unfinished match whose window contains `now`
    pub fn live_match(&self, now: DateTime<Utc>) -> Option<usize> {
        self.matches
            .iter()
            .position(|m| m.phase_at(now) == MatchStatus::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::BracketSize;
    use chrono::TimeDelta;

    fn entry(i: i64) -> Entry {
        Entry {
            id: i * 10,
            owner_id: i,
        }
    }

    fn full(size: BracketSize, now: DateTime<Utc>) -> Tournament {
        let mut t = Tournament::new(7, TournamentConfig::new("Cup", size), 1, now).unwrap();
        for i in 1..=size.entries() as i64 {
            t.register_entry(i * 10, Some(&entry(i)), Caller::user(i), now)
                .unwrap();
        }
        t
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = TournamentConfig {
            match_duration_secs: -5,
            ..TournamentConfig::new("Cup", BracketSize::Four)
        };
        assert!(matches!(
            Tournament::new(1, config, 1, Utc::now()),
            Err(TournamentError::InvalidDuration(-5))
        ));
    }

    #[test]
    fn test_start_requires_admin() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        assert!(matches!(
            t.start(Caller::user(1), now),
            Err(TournamentError::Forbidden(_))
        ));
        t.start(Caller::admin(1), now).unwrap();
        assert_eq!(t.status, TournamentStatus::Active);
    }

    #[test]
    fn test_vote_on_missing_match() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        t.start(Caller::admin(1), now).unwrap();
        assert!(matches!(
            t.vote(9, 1, "A", now),
            Err(TournamentError::NotFound(Missing::Match(9)))
        ));
    }

    #[test]
    fn test_vote_requires_active_tournament() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        t.start(Caller::admin(1), now).unwrap();
        t.status = TournamentStatus::Completed;
        assert!(matches!(
            t.vote(0, 1, "A", now),
            Err(TournamentError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_late_vote_on_completed_tournament_is_a_read() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        t.start(Caller::admin(1), now).unwrap();
        for hours in 1..=3 {
            t.sweep(now + TimeDelta::hours(hours));
        }
        assert_eq!(t.status, TournamentStatus::Completed);

        let outcome = t.vote(2, 5, "B", now + TimeDelta::hours(4)).unwrap();
        assert_eq!(outcome, VoteOutcome::Closed);
        assert_eq!(t.matches[2].total_votes(), 0);
    }

    #[test]
    fn test_sweep_runs_whole_bracket_by_time() {
        let now = Utc::now();
        let mut t = full(BracketSize::Eight, now);
        t.start(Caller::admin(1), now).unwrap();

        // Far in the future every round resolves in one sweep after another
        let mut clock = now;
        let mut champion = None;
        for _ in 0..10 {
            clock += TimeDelta::hours(2);
            let sweep = t.sweep(clock);
            if let Some(c) = sweep.champion() {
                champion = Some(c);
            }
        }

        assert_eq!(t.status, TournamentStatus::Completed);
        assert_eq!(t.current_round(), t.total_rounds());
        assert_eq!(t.matches.len(), 7);
        let champion = champion.unwrap();
        assert_eq!(Some(champion.entry_id), t.winner);
        assert_eq!(champion.owner_id, Some(1));
    }

    #[test]
    fn test_sweep_without_elapsed_matches_changes_nothing() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        t.start(Caller::admin(1), now).unwrap();
        let before = t.clone();
        let sweep = t.sweep(now + TimeDelta::minutes(5));
        assert!(!sweep.changed());
        assert_eq!(t, before);
    }

    #[test]
    fn test_live_match_follows_serial_schedule() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        t.start(Caller::admin(1), now).unwrap();

        assert_eq!(t.live_match(now), Some(0));
        assert_eq!(t.live_match(now + TimeDelta::minutes(10)), Some(1));
        assert_eq!(t.live_match(now + TimeDelta::minutes(20)), None);
        assert_eq!(t.round_matches(1).count(), 2);
    }

    #[test]
    fn test_reset_requires_admin() {
        let now = Utc::now();
        let mut t = full(BracketSize::Four, now);
        t.start(Caller::admin(1), now).unwrap();
        t.vote(0, 5, "B", now).unwrap();
        assert!(matches!(
            t.reset_match_votes(0, Caller::user(5), now),
            Err(TournamentError::Forbidden(_))
        ));
        t.reset_match_votes(0, Caller::admin(1), now).unwrap();
        assert_eq!(t.matches[0].total_votes(), 0);
    }
}
