//! Command-line and environment configuration
//!
//! Every setting is a flag with an environment fallback, so a `.env` file in
//! the working directory configures the service without arguments.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coffeenote_server::{AppConfig, ConnectionMode, DatabaseConfig, ManagerConfig, ServerConfig};

/// Load `./.env` into the process environment.
///
/// Variables already set are not overwritten. Returns the file that was
/// loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "coffeenote", version, about = "Coffee drink notes HTTP API")]
pub struct Cli {
    /// MySQL host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// MySQL port
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    /// MySQL user
    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    /// MySQL password
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Database holding the coffeedrinknote table
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// HTTP listen port
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// HTTP bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Connection handling: "reconnect" retries and recovers, "single" connects once
    #[arg(long, env = "DB_CONNECTION_MODE", default_value = "reconnect")]
    pub connection_mode: ConnectionMode,

    /// Delay between connect attempts in milliseconds
    #[arg(long, env = "DB_RETRY_DELAY_MS", default_value_t = 2000)]
    pub retry_delay_ms: u64,

    /// Seconds between liveness pings while connected (0 disables)
    #[arg(long, env = "DB_HEARTBEAT_SECS", default_value_t = 30)]
    pub heartbeat_secs: u64,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Translate flags into the server's configuration.
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                bind_addr: SocketAddr::new(self.host, self.port),
            },
            database: DatabaseConfig {
                host: self.db_host.clone(),
                port: self.db_port,
                user: self.db_user.clone(),
                password: self.db_password.clone(),
                database: self.db_name.clone().filter(|name| !name.is_empty()),
            },
            connection: ManagerConfig {
                mode: self.connection_mode,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
                heartbeat: (self.heartbeat_secs > 0).then(|| Duration::from_secs(self.heartbeat_secs)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_app_config() {
        let cli = Cli::try_parse_from([
            "coffeenote",
            "--db-host",
            "db.internal",
            "--db-name",
            "coffee",
            "--port",
            "8080",
            "--connection-mode",
            "single",
            "--retry-delay-ms",
            "500",
            "--heartbeat-secs",
            "0",
        ])
        .unwrap();

        let config = cli.app_config();
        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.database.as_deref(), Some("coffee"));
        assert_eq!(config.connection.mode, ConnectionMode::Single);
        assert_eq!(config.connection.retry_delay, Duration::from_millis(500));
        assert!(config.connection.heartbeat.is_none());
    }

    #[test]
    fn unknown_connection_mode_is_rejected() {
        let result = Cli::try_parse_from(["coffeenote", "--connection-mode", "sometimes"]);
        assert!(result.is_err());
    }

    #[test]
    fn load_dotenv_doesnt_panic() {
        // Should never panic, even if no .env exists
        let _ = load_dotenv();
    }
}
