//! HTTP server for blog bracket tournaments.
//!
//! Wraps a [`blog_bracket::TournamentManager`] in a JSON API with JWT
//! authentication, a background sweeper and Prometheus metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod sweeper;
