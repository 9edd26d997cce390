//! Match clock and resolver.
//!
//! A match moves `scheduled -> live -> finished`. It goes live on its first
//! vote and finishes once `now >= ends_at`, either from a sweep or from a vote
//! attempt that arrives after the window closed. `finished` is terminal.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{EntryId, Match, MatchStatus, Pick, UserId},
};
use chrono::{DateTime, Utc};

/// Result of a vote attempt that was not rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was counted
    Recorded,
    /// The window had already closed; the match was finalized and nothing was counted
    Closed,
}

impl Match {
    /// Entry currently ahead. Ties go to slot A.
    pub fn leader(&self) -> EntryId {
        if self.votes_a >= self.votes_b {
            self.slot_a
        } else {
            self.slot_b
        }
    }

    /// Status as observed at `now`, without mutating the match
    pub fn phase_at(&self, now: DateTime<Utc>) -> MatchStatus {
        if self.status == MatchStatus::Finished || now >= self.ends_at {
            MatchStatus::Finished
        } else if now >= self.starts_at {
            MatchStatus::Live
        } else {
            MatchStatus::Scheduled
        }
    }

    pub fn total_votes(&self) -> u32 {
        self.votes_a + self.votes_b
    }

    /// Finish the match if its window has elapsed.
    ///
    /// Returns `true` only when this call performed the transition.
    pub fn resolve_if_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == MatchStatus::Finished || now < self.ends_at {
            return false;
        }

        self.status = MatchStatus::Finished;
        if self.winner.is_none() {
            self.winner = Some(self.leader());
        }
        true
    }

    /// Count one vote from `voter` for `pick` ("A" or "B").
    ///
    /// A vote before the window opens fails with `TooEarly`. A vote after the
    /// window closed is not an error: it finalizes the match and counts nothing.
    pub fn cast_vote(
        &mut self,
        voter: UserId,
        pick: &str,
        now: DateTime<Utc>,
    ) -> TournamentResult<VoteOutcome> {
        if now < self.starts_at {
            return Err(TournamentError::TooEarly {
                starts_at: self.starts_at,
            });
        }

        if self.status == MatchStatus::Finished || now >= self.ends_at {
            self.resolve_if_elapsed(now);
            return Ok(VoteOutcome::Closed);
        }

        if self.voters.contains(&voter) {
            return Err(TournamentError::AlreadyVoted);
        }

        match pick.parse::<Pick>()? {
            Pick::A => self.votes_a += 1,
            Pick::B => self.votes_b += 1,
        }
        self.voters.insert(voter);
        self.status = MatchStatus::Live;

        Ok(VoteOutcome::Recorded)
    }

    /// Clear all votes of an unfinished match, sending it back to `scheduled`
    pub fn reset_votes(&mut self, now: DateTime<Utc>) -> TournamentResult<()> {
        self.resolve_if_elapsed(now);
        if self.status == MatchStatus::Finished {
            return Err(TournamentError::invalid_state(
                "unfinished match",
                MatchStatus::Finished,
            ));
        }

        self.votes_a = 0;
        self.votes_b = 0;
        self.voters.clear();
        self.status = MatchStatus::Scheduled;
        Ok(())
    }
}
