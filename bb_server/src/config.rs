//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use blog_bracket::{Entry, SchedulePolicy, db::DatabaseConfig};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

const DEFAULT_BIND: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 6969));

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// PostgreSQL settings; `None` runs on in-memory stores
    pub database: Option<DatabaseConfig>,
    /// JWT verification secret (required)
    pub jwt_secret: String,
    pub tournament_defaults: TournamentDefaults,
    /// Period of the background sweep
    pub sweep_interval: Duration,
    /// Prometheus scrape address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// JSON file of entries loaded into the in-memory directory
    pub seed_entries: Option<PathBuf>,
}

/// Settings applied to tournaments created without explicit values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentDefaults {
    pub match_duration_mins: i64,
    pub schedule: SchedulePolicy,
}

impl Default for TournamentDefaults {
    fn default() -> Self {
        Self {
            match_duration_mins: 10,
            schedule: SchedulePolicy::Serial,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// CLI overrides win over `SERVER_BIND` and `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
        )
    }

    /// Load configuration through `lookup` instead of the process environment
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_or(&lookup, "SERVER_BIND", DEFAULT_BIND)?,
        };

        let database = database_url_override
            .or_else(|| lookup("DATABASE_URL"))
            .map(|url| -> Result<DatabaseConfig, ConfigError> {
                let d = DatabaseConfig::new(url);
                Ok(DatabaseConfig {
                    max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", d.max_connections)?,
                    min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", d.min_connections)?,
                    connection_timeout_secs: parse_or(
                        &lookup,
                        "DB_CONNECTION_TIMEOUT_SECS",
                        d.connection_timeout_secs,
                    )?,
                    idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", d.idle_timeout_secs)?,
                    max_lifetime_secs: parse_or(&lookup, "DB_MAX_LIFETIME_SECS", d.max_lifetime_secs)?,
                    ..d
                })
            })
            .transpose()?;

        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let tournament_defaults = TournamentDefaults {
            match_duration_mins: parse_or(&lookup, "DEFAULT_MATCH_DURATION_MINS", 10)?,
            schedule: parse_or(&lookup, "SCHEDULE_POLICY", SchedulePolicy::Serial)?,
        };

        let sweep_interval = Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", 5)?);
        let metrics_bind = parse_var(&lookup, "METRICS_BIND")?;
        let seed_entries = lookup("SEED_ENTRIES").map(PathBuf::from);

        let config = ServerConfig {
            bind,
            database,
            jwt_secret,
            tournament_defaults,
            sweep_interval,
            metrics_bind,
            seed_entries,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(invalid(
                "JWT_SECRET",
                "Must be at least 32 characters (128-bit security)",
            ));
        }

        if self.tournament_defaults.match_duration_mins <= 0 {
            return Err(invalid("DEFAULT_MATCH_DURATION_MINS", "Must be greater than 0"));
        }

        if self.sweep_interval.is_zero() {
            return Err(invalid("SWEEP_INTERVAL_SECS", "Must be greater than 0"));
        }

        if let Some(db) = &self.database
            && db.min_connections > db.max_connections
        {
            return Err(invalid(
                "DB_MIN_CONNECTIONS",
                &format!("Cannot exceed max connections ({})", db.max_connections),
            ));
        }

        if self.database.is_some() && self.seed_entries.is_some() {
            return Err(invalid(
                "SEED_ENTRIES",
                "Only used without DATABASE_URL; entries come from the blogs table",
            ));
        }

        Ok(())
    }
}

/// Read a seed file holding a JSON array of `{"id": .., "owner_id": ..}` entries
///
/// # Errors
///
/// Returns `ConfigError::Seed` if the file cannot be read or parsed
pub fn read_seed_entries(path: &Path) -> Result<Vec<Entry>, ConfigError> {
    let seed_error = |reason: String| ConfigError::Seed {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| seed_error(e.to_string()))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Cannot load seed entries from {path}: {reason}")]
    Seed { path: String, reason: String },
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a variable if it is set; a set but malformed value is an error
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| invalid(key, &format!("Cannot parse '{v}'")))
        })
        .transpose()
}

/// Helper to parse a variable with default fallback
fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_var(lookup, key)?.unwrap_or(default))
}
