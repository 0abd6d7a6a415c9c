//! Server configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! working development server:
//!
//! ```toml
//! bind_addr = "0.0.0.0:8080"
//! idle_timeout_ms = 15000
//!
//! [limits]
//! max_segments = 512
//!
//! [persistence]
//! queue_capacity = 1024
//! concurrency = 8
//!
//! [logging]
//! level = "info"
//! json = false
//!
//! [[auth.tokens]]
//! token = "dev-ana"
//! user_id = 1
//! username = "ana"
//! ```

use std::path::Path;
use std::time::Duration;

use arena_persist::PersistConfig;
use arena_protocol::UserId;
use arena_session::{Identity, SessionLimits, TokenTable};
use serde::{Deserialize, Serialize};

use crate::ArenaError;

/// Everything the server reads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// How long a new connection has to send `join_arena`.
    pub handshake_timeout_ms: u64,
    /// How often the read loop checks for silence and pings.
    pub heartbeat_interval_ms: u64,
    /// Silence longer than this closes the connection.
    pub idle_timeout_ms: u64,
    /// Frames that may wait for one slow client before new ones are dropped.
    pub outbound_queue_capacity: usize,
    /// How often the binary logs the roster. `0` disables the report.
    pub monitor_interval_secs: u64,
    pub limits: SessionLimits,
    pub persistence: PersistConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout_ms: 5_000,
            heartbeat_interval_ms: 5_000,
            idle_timeout_ms: 15_000,
            outbound_queue_capacity: 256,
            monitor_interval_secs: 60,
            limits: SessionLimits::default(),
            persistence: PersistConfig::default(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ArenaConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ArenaError> {
        let config: Self = toml::from_str(text).map_err(|e| ArenaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ArenaError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ArenaError::Config(format!("{}: {e}", path.display())));
            }
        };
        Self::from_toml_str(&text)
    }

    /// Rejects values that would make the server misbehave.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ArenaError::Config("bind_addr is empty".into()));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ArenaError::Config("handshake_timeout_ms must be positive".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ArenaError::Config("heartbeat_interval_ms must be positive".into()));
        }
        if self.idle_timeout_ms < self.heartbeat_interval_ms {
            return Err(ArenaError::Config(format!(
                "idle_timeout_ms ({}) is shorter than heartbeat_interval_ms ({})",
                self.idle_timeout_ms, self.heartbeat_interval_ms
            )));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(ArenaError::Config("outbound_queue_capacity must be positive".into()));
        }
        if self.persistence.queue_capacity == 0 || self.persistence.concurrency == 0 {
            return Err(ArenaError::Config(
                "persistence.queue_capacity and persistence.concurrency must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// `[logging]`: how the binary sets up its subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
    /// One JSON object per line instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// `[auth]`: the fixed token table used by development servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenEntry>,
}

/// One `[[auth.tokens]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: u64,
    pub username: String,
}

impl AuthConfig {
    /// Builds the authenticator. Later entries win on duplicate tokens.
    pub fn token_table(&self) -> TokenTable {
        let mut table = TokenTable::new();
        for entry in &self.tokens {
            table.insert(
                entry.token.clone(),
                Identity::new(UserId(entry.user_id), entry.username.clone()),
            );
        }
        table
    }
}
