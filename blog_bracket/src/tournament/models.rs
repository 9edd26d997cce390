//! Tournament data models for single-elimination voting brackets.

use super::errors::{TournamentError, TournamentResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Tournament ID type
pub type TournamentId = i64;

/// Entry (competing content) ID type
pub type EntryId = i64;

/// User ID type
pub type UserId = i64;

/// Default match window: ten minutes.
pub const DEFAULT_MATCH_DURATION_SECS: i64 = 600;

/// Longest accepted match window: one year.
pub const MAX_MATCH_DURATION_SECS: i64 = 365 * 24 * 60 * 60;

/// Bracket capacity. Only powers of two that form a full bracket are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum BracketSize {
    Four,
    Eight,
    Sixteen,
    ThirtyTwo,
}

impl BracketSize {
    /// Number of entries needed to start
    pub fn entries(self) -> usize {
        match self {
            BracketSize::Four => 4,
            BracketSize::Eight => 8,
            BracketSize::Sixteen => 16,
            BracketSize::ThirtyTwo => 32,
        }
    }

    /// Number of rounds until a champion remains (log2 of the capacity)
    pub fn rounds(self) -> u32 {
        self.entries().trailing_zeros()
    }
}

impl TryFrom<usize> for BracketSize {
    type Error = TournamentError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(BracketSize::Four),
            8 => Ok(BracketSize::Eight),
            16 => Ok(BracketSize::Sixteen),
            32 => Ok(BracketSize::ThirtyTwo),
            other => Err(TournamentError::InvalidCapacity(other)),
        }
    }
}

impl From<BracketSize> for usize {
    fn from(size: BracketSize) -> Self {
        size.entries()
    }
}

/// How the matches of one round are laid out in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePolicy {
    /// One pair at a time: match `i` opens when match `i - 1` closes
    #[default]
    Serial,
    /// Every match of the round shares the same window
    Concurrent,
}

impl FromStr for SchedulePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" => Ok(SchedulePolicy::Serial),
            "concurrent" => Ok(SchedulePolicy::Concurrent),
            other => Err(format!("unknown schedule policy '{other}'")),
        }
    }
}

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Accepting registrations
    Draft,
    /// Bracket built, matches being voted on
    Active,
    /// A champion has been crowned
    Completed,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(TournamentStatus::Draft),
            "active" => Ok(TournamentStatus::Active),
            "completed" => Ok(TournamentStatus::Completed),
            other => Err(format!("unknown tournament status '{other}'")),
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Side of a match a voter picks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pick {
    A,
    B,
}

impl FromStr for Pick {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Pick::A),
            "B" => Ok(Pick::B),
            other => Err(TournamentError::InvalidPick(other.to_string())),
        }
    }
}

/// Already-authenticated actor performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Fail with `Forbidden` unless the caller is an administrator
    pub fn require_admin(&self, action: &str) -> TournamentResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(TournamentError::Forbidden(format!(
                "only administrators may {action}"
            )))
        }
    }
}

/// Competable content as seen by the bracket: an id and who owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub owner_id: UserId,
}

/// An entry registered into a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub entry_id: EntryId,
    pub owner_id: UserId,
    pub registered_at: DateTime<Utc>,
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Bracket capacity
    pub size: BracketSize,
    /// Length of every match window in seconds
    pub match_duration_secs: i64,
    /// Match window layout within a round
    #[serde(default)]
    pub schedule: SchedulePolicy,
}

impl TournamentConfig {
    /// Create a configuration with the default ten-minute serial windows
    pub fn new(name: impl Into<String>, size: BracketSize) -> Self {
        Self {
            name: name.into(),
            size,
            match_duration_secs: DEFAULT_MATCH_DURATION_SECS,
            schedule: SchedulePolicy::Serial,
        }
    }

    pub fn with_match_duration(mut self, duration: TimeDelta) -> Self {
        self.match_duration_secs = duration.num_seconds();
        self
    }

    pub fn with_schedule(mut self, schedule: SchedulePolicy) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn match_duration(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.match_duration_secs).unwrap_or(TimeDelta::MAX)
    }

    /// Reject empty names and match windows outside `1..=MAX_MATCH_DURATION_SECS` seconds
    pub fn validate(&self) -> TournamentResult<()> {
        if self.name.trim().is_empty() {
            return Err(TournamentError::InvalidName);
        }
        if !(1..=MAX_MATCH_DURATION_SECS).contains(&self.match_duration_secs) {
            return Err(TournamentError::InvalidDuration(self.match_duration_secs));
        }
        Ok(())
    }
}

/// One pairwise match inside a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Round number (1-indexed)
    pub round: u32,
    pub slot_a: EntryId,
    pub slot_b: EntryId,
    pub votes_a: u32,
    pub votes_b: u32,
    /// Users who already voted in this match
    pub voters: BTreeSet<UserId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: MatchStatus,
    pub winner: Option<EntryId>,
}

/// Tournament aggregate root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub config: TournamentConfig,
    pub status: TournamentStatus,
    pub creator_id: UserId,
    /// Registrations in arrival order; the order seeds round one
    pub entries: Vec<Registration>,
    /// Every match ever created, rounds appended in order
    pub matches: Vec<Match>,
    pub winner: Option<EntryId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every persisted change
    pub version: i64,
}

/// Filter and paging for tournament listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<TournamentStatus>,
    /// 1-indexed page
    pub page: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: 50,
        }
    }
}

/// One page of tournaments, newest first
#[derive(Debug, Clone, Serialize)]
pub struct TournamentPage {
    pub tournaments: Vec<Tournament>,
    pub page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl TournamentPage {
    /// Slice an already filtered and sorted list into the requested page
    pub fn paginate(all: Vec<Tournament>, page: usize, limit: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = all.len();
        let total_pages = total.div_ceil(limit);
        let tournaments = all
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Self {
            tournaments,
            page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Tournament counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TournamentStats {
    pub total: usize,
    pub draft: usize,
    pub active: usize,
    pub completed: usize,
}

impl TournamentStats {
    pub fn count(&mut self, status: TournamentStatus) {
        self.total += 1;
        match status {
            TournamentStatus::Draft => self.draft += 1,
            TournamentStatus::Active => self.active += 1,
            TournamentStatus::Completed => self.completed += 1,
        }
    }
}
