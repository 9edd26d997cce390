//! Tournament actor message types.

use crate::tournament::{
    Caller, Entry, EntryId, Match, Registration, Tournament, TournamentResult, UserId,
    VoteOutcome,
};
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// Reply channel carried by every request
pub type Reply<T> = oneshot::Sender<TournamentResult<T>>;

/// Messages that can be sent to a [`super::TournamentActor`]
#[derive(Debug)]
pub enum TournamentMessage {
    /// Read the tournament after the lazy sweep
    Get {
        now: DateTime<Utc>,
        response: Reply<Tournament>,
    },

    /// Register an entry; `entry` is the directory lookup result
    Register {
        entry_id: EntryId,
        entry: Option<Entry>,
        caller: Caller,
        now: DateTime<Utc>,
        response: Reply<Tournament>,
    },

    Withdraw {
        entry_id: EntryId,
        caller: Caller,
        now: DateTime<Utc>,
        response: Reply<Registration>,
    },

    /// Build round one (admin only)
    Start {
        caller: Caller,
        now: DateTime<Utc>,
        response: Reply<Tournament>,
    },

    Vote {
        match_index: usize,
        voter: UserId,
        pick: String,
        now: DateTime<Utc>,
        response: Reply<(VoteOutcome, Match)>,
    },

    /// Clear a match's votes (admin only)
    ResetVotes {
        match_index: usize,
        caller: Caller,
        now: DateTime<Utc>,
        response: Reply<Match>,
    },

    /// Run the lazy sweep; replies whether anything changed
    Sweep {
        now: DateTime<Utc>,
        response: Reply<bool>,
    },

    /// Stop the actor once every earlier message is handled
    Close { response: oneshot::Sender<()> },
}
