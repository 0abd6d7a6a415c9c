//! Command-line arguments.

use std::path::PathBuf;

use arena::ArenaConfig;
use clap::Parser;

/// Real-time arena coordinator.
///
/// Flags override the matching keys in the configuration file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(short, long, default_value = "arena.toml")]
    pub config: PathBuf,

    /// Listen address, e.g. `0.0.0.0:8080`.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Log filter, e.g. `debug` or `info,arena=trace`. `RUST_LOG` still wins.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    /// Applies the flags on top of the file configuration.
    pub fn apply(&self, config: &mut ArenaConfig) {
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["arena-server"]).expect("no flags is valid");
        assert_eq!(args.config, PathBuf::from("arena.toml"));
        assert!(args.bind.is_none());
        assert!(args.log_level.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_flags_override_file_values() {
        let args = Args::try_parse_from([
            "arena-server",
            "--config",
            "/etc/arena.toml",
            "--bind",
            "0.0.0.0:9000",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .expect("valid flags");

        let mut config = ArenaConfig::default();
        args.apply(&mut config);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let args = Args::try_parse_from(["arena-server"]).expect("valid");
        let mut config = ArenaConfig {
            bind_addr: "10.0.0.1:7000".into(),
            ..ArenaConfig::default()
        };
        config.logging.json = true;
        args.apply(&mut config);
        assert_eq!(config.bind_addr, "10.0.0.1:7000");
        assert!(config.logging.json);
    }
}
