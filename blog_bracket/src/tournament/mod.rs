//! Single-elimination voting tournaments.
//!
//! This module provides the bracket engine:
//! - Entry registration with capacity and one-entry-per-owner rules
//! - Round-one bracket construction with timed match windows
//! - The match clock: scheduled, live and finished matches, vote counting
//! - Round advancement until a single champion remains
//!
//! Everything here is synchronous and takes the current time as a parameter.
//! Concurrency and persistence live in [`crate::arena`].
//!
//! ## Example
//!
//! ```
//! use blog_bracket::tournament::{BracketSize, Caller, Entry, Tournament, TournamentConfig};
//! use chrono::{TimeDelta, Utc};
//!
//! let now = Utc::now();
//! let config = TournamentConfig::new("Spring Cup", BracketSize::Four);
//! let mut t = Tournament::new(1, config, 1, now).unwrap();
//!
//! for user in 1..=4 {
//!     let entry = Entry { id: user * 100, owner_id: user };
//!     t.register_entry(entry.id, Some(&entry), Caller::user(user), now).unwrap();
//! }
//! t.start(Caller::admin(1), now).unwrap();
//! t.vote(0, 42, "A", now).unwrap();
//!
//! let sweep = t.sweep(now + TimeDelta::minutes(10));
//! assert_eq!(sweep.finalized, 1);
//! ```

pub mod advance;
pub mod aggregate;
pub mod builder;
pub mod errors;
pub mod models;
pub mod registry;
pub mod resolver;

pub use advance::{Advancement, Champion};
pub use aggregate::Sweep;
pub use errors::{Missing, TournamentError, TournamentResult};
pub use models::{
    BracketSize, Caller, DEFAULT_MATCH_DURATION_SECS, Entry, EntryId, ListQuery,
    MAX_MATCH_DURATION_SECS, Match, MatchStatus, Pick, Registration, SchedulePolicy, Tournament,
    TournamentConfig, TournamentId, TournamentPage, TournamentStats, TournamentStatus, UserId,
};
pub use resolver::VoteOutcome;
