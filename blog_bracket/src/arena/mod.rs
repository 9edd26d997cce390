//! Per-tournament single-writer region.
//!
//! This module implements:
//! - TournamentActor: tokio task owning one tournament's committed snapshot
//! - TournamentHandle: cloneable sender for an actor's mailbox
//! - TournamentManager: spawns actors on demand and routes every operation
//!
//! ## Architecture
//!
//! Each tournament runs in its own Tokio task with an mpsc inbox, so all
//! operations against one tournament are serialized while different
//! tournaments proceed in parallel. Entry lookups happen in the manager
//! before a message is sent; inside the actor an operation is pure
//! computation over the snapshot followed by a single store write.
//!
//! ## Example
//!
//! ```
//! use blog_bracket::arena::TournamentManager;
//! use blog_bracket::store::{InMemoryEntryDirectory, InMemoryTournamentStore, InMemoryWinLedger};
//! use blog_bracket::tournament::{BracketSize, TournamentConfig};
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TournamentManager::new(
//!     Arc::new(InMemoryTournamentStore::new()),
//!     Arc::new(InMemoryEntryDirectory::new()),
//!     Arc::new(InMemoryWinLedger::new()),
//! );
//!
//! let config = TournamentConfig::new("Autumn Cup", BracketSize::Eight);
//! let created = manager.create_tournament(config, 1, Utc::now()).await?;
//! let fetched = manager.get_tournament(created.id, Utc::now()).await?;
//! assert_eq!(fetched.config.name, "Autumn Cup");
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod manager;
pub mod messages;

pub use actor::{TournamentActor, TournamentHandle};
pub use manager::TournamentManager;
pub use messages::{Reply, TournamentMessage};
