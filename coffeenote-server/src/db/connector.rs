//! Opening the single MySQL connection
//!
//! The [`Connector`] trait is the seam the connection manager drives:
//! MySQL in production, a scripted fake in tests.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use tokio::sync::Mutex;

use super::DbError;

/// Default MySQL port.
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Connection settings for the relational store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_DB_PORT,
            user: "root".to_string(),
            password: String::new(),
            database: None,
        }
    }
}

impl DatabaseConfig {
    /// Build sqlx connect options from these settings.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password);

        match &self.database {
            Some(name) => options.database(name),
            None => options,
        }
    }
}

/// Opens connections and checks that an open one is still alive.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The live handle shared by every statement.
    type Conn: Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Conn, DbError>;

    async fn ping(&self, conn: &Self::Conn) -> Result<(), DbError>;
}

/// Connector for a single MySQL connection.
///
/// The connection sits behind an async mutex so concurrent statements
/// queue on the one handle.
pub struct MySqlConnector {
    options: MySqlConnectOptions,
}

impl MySqlConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            options: config.connect_options(),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Conn = Mutex<MySqlConnection>;

    async fn connect(&self) -> Result<Self::Conn, DbError> {
        let conn = MySqlConnection::connect_with(&self.options).await?;
        Ok(Mutex::new(conn))
    }

    async fn ping(&self, conn: &Self::Conn) -> Result<(), DbError> {
        conn.lock().await.ping().await?;
        Ok(())
    }
}
