//! # Blog Bracket
//!
//! Single-elimination voting tournaments between blog entries.
//!
//! Owners register entries into a bracket of 4, 8, 16 or 32 slots. Once the
//! bracket is full an administrator starts it: entries are paired in
//! registration order and each match gets a timed voting window. Voters pick
//! side A or B; when a window closes the match is decided (ties go to A) and
//! once a round is done its winners are paired into the next one, until a
//! single champion remains.
//!
//! Time only moves when somebody looks: every operation, reads included,
//! first settles elapsed matches and pending rounds.
//!
//! ## Core Modules
//!
//! - [`tournament`]: the bracket engine, synchronous and clock-injected
//! - [`arena`]: one actor per tournament serializing all operations
//! - [`store`]: persistence, entry lookup and win recording seams
//! - [`db`]: PostgreSQL pool management
//!
//! ## Example
//!
//! ```
//! use blog_bracket::{BracketSize, Tournament, TournamentConfig, TournamentStatus};
//! use chrono::Utc;
//!
//! let config = TournamentConfig::new("Winter Cup", BracketSize::Sixteen);
//! let tournament = Tournament::new(1, config, 1, Utc::now()).unwrap();
//! assert_eq!(tournament.status, TournamentStatus::Draft);
//! assert_eq!(tournament.total_rounds(), 4);
//! ```

/// Per-tournament actors and the manager routing operations to them.
pub mod arena;
pub use arena::{TournamentHandle, TournamentManager};

/// PostgreSQL connection pooling.
pub mod db;

/// Storage traits with in-memory and PostgreSQL implementations.
pub mod store;
pub use store::{EntryDirectory, StoreError, StoreResult, TournamentStore, WinRecorder};

/// The bracket engine.
pub mod tournament;
pub use tournament::{
    BracketSize, Caller, Entry, EntryId, ListQuery, Match, MatchStatus, Pick, Registration,
    SchedulePolicy, Tournament, TournamentConfig, TournamentError, TournamentId, TournamentPage,
    TournamentResult, TournamentStats, TournamentStatus, UserId, VoteOutcome,
};
