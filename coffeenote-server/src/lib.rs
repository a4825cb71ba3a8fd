//! coffeenote-server: CRUD HTTP API over the `coffeedrinknote` table
//!
//! Five note endpoints, each one parameterized statement against a single
//! MySQL connection. The connection is owned by a
//! [`db::ConnectionManager`] that retries failed connects and reconnects
//! after loss.

pub mod db;
pub mod error;
pub mod http;
pub mod models;

use std::sync::Arc;

pub use db::{ConnectionMode, DatabaseConfig, ManagerConfig};
pub use error::{Error, Result};
pub use http::{AppState, ServerConfig};

use db::{ConnectionManager, MySqlConnector, MySqlNoteStore};

/// Everything needed to start the service
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub connection: ManagerConfig,
}

/// Start the connection supervisor and the HTTP server.
///
/// Returns when the server shuts down gracefully, or with
/// [`Error::FatalDatabase`] when the connection fails in a way the manager
/// does not recover from.
pub async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!(
        host = %config.database.host,
        port = config.database.port,
        mode = %config.connection.mode,
        "Connecting to MySQL database"
    );

    let connector = MySqlConnector::new(&config.database);
    let (manager, supervisor) = ConnectionManager::new(connector, config.connection);
    let supervisor = tokio::spawn(supervisor.run());

    let state = AppState::new(Arc::new(MySqlNoteStore::new(manager)));

    tokio::select! {
        served = http::run_server(state, config.server) => {
            served?;
            Ok(())
        }
        fatal = supervisor => {
            let err = fatal?;
            tracing::error!(error = %err, "Database connection failed fatally, shutting down");
            Err(Error::FatalDatabase(err))
        }
    }
}
