//! Tournament error types.

use super::models::{EntryId, TournamentId, UserId};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// What a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Tournament(TournamentId),
    Entry(EntryId),
    Registration(EntryId),
    Match(usize),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Tournament(id) => write!(f, "Tournament {id}"),
            Missing::Entry(id) => write!(f, "Entry {id}"),
            Missing::Registration(id) => write!(f, "Registration for entry {id}"),
            Missing::Match(index) => write!(f, "Match {index}"),
        }
    }
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Tournament is full ({size} entries)")]
    Capacity { size: usize },

    #[error("Tournament is not full: need {needed}, have {current}")]
    NotFull { needed: usize, current: usize },

    #[error("Entry {0} already registered")]
    Duplicate(EntryId),

    #[error("User {0} already has an entry in this tournament")]
    DuplicateOwner(UserId),

    #[error("Invalid bracket capacity {0}: must be 4, 8, 16 or 32")]
    InvalidCapacity(usize),

    #[error("Invalid match duration {0}s: must be positive and at most a year")]
    InvalidDuration(i64),

    #[error("Tournament name must not be empty")]
    InvalidName,

    #[error("Invalid pick '{0}': must be A or B")]
    InvalidPick(String),

    #[error("Match not started yet: opens at {starts_at}")]
    TooEarly { starts_at: DateTime<Utc> },

    #[error("You already voted in this match")]
    AlreadyVoted,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Tournament {0} is unavailable")]
    Unavailable(TournamentId),
}

impl TournamentError {
    pub(crate) fn invalid_state(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        TournamentError::InvalidState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage failures and unavailable actors are reported without internal detail.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Storage(_) => "Internal server error".to_string(),
            TournamentError::Unavailable(_) => "Tournament temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_missing_thing() {
        let err = TournamentError::NotFound(Missing::Match(7));
        assert_eq!(err.to_string(), "Match 7 not found");
        let err = TournamentError::NotFound(Missing::Tournament(3));
        assert_eq!(err.to_string(), "Tournament 3 not found");
    }

    #[test]
    fn test_client_message_hides_storage_detail() {
        let err = TournamentError::Storage(StoreError::Backend("disk on fire".to_string()));
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.client_message().contains("disk"));
    }

    #[test]
    fn test_client_message_passes_domain_errors() {
        let err = TournamentError::NotFull {
            needed: 4,
            current: 3,
        };
        assert_eq!(err.client_message(), "Tournament is not full: need 4, have 3");
    }
}
