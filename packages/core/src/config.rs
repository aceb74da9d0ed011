use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::AppError;
use crate::feed::{twin::TWIN_PERIOD, DEFAULT_PERIOD};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_FEED_INTERVAL_SECONDS: u64 = DEFAULT_PERIOD.as_secs();
pub const DEFAULT_TWIN_INTERVAL_SECONDS: u64 = TWIN_PERIOD.as_secs();
pub const DEFAULT_LEDGER_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub feed_interval_seconds: u64,
    pub twin_interval_seconds: u64,
    pub ledger_size: usize,
    /// `None` seeds the mock data from OS entropy.
    pub ledger_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys fall back to defaults;
    /// present but malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let feed_interval_seconds = parse_or(
            &lookup,
            "FEED_INTERVAL_SECONDS",
            Some(DEFAULT_FEED_INTERVAL_SECONDS),
        )?;
        let twin_interval_seconds = parse_or(
            &lookup,
            "TWIN_INTERVAL_SECONDS",
            Some(DEFAULT_TWIN_INTERVAL_SECONDS),
        )?;
        let ledger_size = parse_or(&lookup, "LEDGER_SIZE", Some(DEFAULT_LEDGER_SIZE))?;
        let ledger_seed = match lookup("LEDGER_SEED") {
            Some(raw) => Some(parse_value("LEDGER_SEED", &raw)?),
            None => None,
        };

        let config = Self {
            bind_addr,
            feed_interval_seconds,
            twin_interval_seconds,
            ledger_size,
            ledger_seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// Command-line flags override environment values.
    pub fn apply_cli(mut self, cli: &Cli) -> Result<Self, AppError> {
        if let Some(bind) = &cli.bind {
            self.bind_addr = parse_value("--bind", bind)?;
        }
        if let Some(interval) = cli.feed_interval {
            self.feed_interval_seconds = interval;
        }
        if let Some(interval) = cli.twin_interval {
            self.twin_interval_seconds = interval;
        }
        if let Some(size) = cli.ledger_size {
            self.ledger_size = size;
        }
        if let Some(seed) = cli.seed {
            self.ledger_seed = Some(seed);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_secs(self.feed_interval_seconds)
    }

    pub fn twin_interval(&self) -> Duration {
        Duration::from_secs(self.twin_interval_seconds)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.feed_interval_seconds == 0 {
            return Err(AppError::Config(
                "FEED_INTERVAL_SECONDS must be greater than zero".into(),
            ));
        }
        if self.twin_interval_seconds == 0 {
            return Err(AppError::Config(
                "TWIN_INTERVAL_SECONDS must be greater than zero".into(),
            ));
        }
        if self.ledger_size == 0 {
            return Err(AppError::Config("LEDGER_SIZE must be greater than zero".into()));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<T>,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => default.ok_or_else(|| AppError::Config(format!("{} is required", key))),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw)))
}
