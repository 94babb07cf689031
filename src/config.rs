//! Runtime configuration
//!
//! The listen address comes from the first command line argument or
//! `HUB_ADDR`. Queue sizes and the bounded-send timeout can be tuned
//! through environment variables; all have working defaults.

use std::time::Duration;

use crate::error::HubError;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// How long the Room waits for a client's outbound queue to accept a message
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(10);

/// Per-client outbound queue size
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 16;

/// Room command queue size
pub const DEFAULT_ROOM_CAPACITY: usize = 256;

/// Settings each connection needs when its client is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub send_timeout: Duration,
    pub outbound_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Address the TCP listener binds to
    pub addr: String,
    /// Bounded-send timeout used for slow-consumer eviction
    pub send_timeout: Duration,
    /// Capacity of each client's outbound queue
    pub outbound_capacity: usize,
    /// Capacity of the Room's command queue
    pub room_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

impl HubConfig {
    /// Build a config from command line arguments (program name already
    /// skipped) and the process environment
    pub fn from_env(args: impl IntoIterator<Item = String>) -> Result<Self, HubError> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        args: impl IntoIterator<Item = String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HubError> {
        let mut config = Self::default();

        if let Some(addr) = args.into_iter().next().or_else(|| lookup("HUB_ADDR")) {
            config.addr = addr;
        }
        if let Some(ms) = lookup("HUB_SEND_TIMEOUT_MS") {
            config.send_timeout = Duration::from_millis(parse_number("HUB_SEND_TIMEOUT_MS", &ms)?);
        }
        if let Some(cap) = lookup("HUB_OUTBOUND_CAPACITY") {
            config.outbound_capacity = parse_capacity("HUB_OUTBOUND_CAPACITY", &cap)?;
        }
        if let Some(cap) = lookup("HUB_ROOM_CAPACITY") {
            config.room_capacity = parse_capacity("HUB_ROOM_CAPACITY", &cap)?;
        }

        Ok(config)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            send_timeout: self.send_timeout,
            outbound_capacity: self.outbound_capacity,
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, HubError> {
    value
        .trim()
        .parse()
        .map_err(|e| HubError::Config(format!("{key}={value}: {e}")))
}

// tokio channels panic on a zero capacity
fn parse_capacity(key: &str, value: &str) -> Result<usize, HubError> {
    match parse_number(key, value)? {
        0 => Err(HubError::Config(format!("{key} must be at least 1"))),
        n => usize::try_from(n).map_err(|e| HubError::Config(format!("{key}={value}: {e}"))),
    }
}
