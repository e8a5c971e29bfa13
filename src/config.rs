//! Process configuration, read once at startup and passed down explicitly.
//!
//! | variable                   | default          |
//! |----------------------------|------------------|
//! | `DATABASE_URL`             | required         |
//! | `KIWIFY_WEBHOOK_TOKEN`     | required         |
//! | `ADMIN_TOKEN`              | unset (disabled) |
//! | `BIND_ADDR`                | `0.0.0.0:3000`   |
//! | `REQUEST_TIMEOUT_SECS`     | `10`             |
//! | `DATABASE_MAX_CONNECTIONS` | `20`             |
//! | `TRANSITION_POLICY`        | `strict`         |

use {
    crate::domain::purchase::TransitionPolicy,
    std::{net::SocketAddr, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub webhook_token: String,
    pub admin_token: Option<String>,
    pub transition_policy: TransitionPolicy,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let webhook_token =
            get("KIWIFY_WEBHOOK_TOKEN").ok_or(ConfigError::Missing("KIWIFY_WEBHOOK_TOKEN"))?;

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: v,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let request_timeout =
            Duration::from_secs(positive(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", 10)?);
        let database_max_connections =
            positive(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 20)? as u32;

        let transition_policy = match get("TRANSITION_POLICY").as_deref() {
            None | Some("strict") => TransitionPolicy::Strict,
            Some("last_write_wins") => TransitionPolicy::LastWriteWins,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "TRANSITION_POLICY",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            request_timeout,
            webhook_token,
            admin_token: get("ADMIN_TOKEN"),
            transition_policy,
        })
    }
}

fn positive(raw: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => match v.parse::<u32>() {
            Ok(n) if n > 0 => Ok(u64::from(n)),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}
