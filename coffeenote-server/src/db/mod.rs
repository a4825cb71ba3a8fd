//! Database layer - single connection lifecycle and the note repository
//!
//! - One connection, owned by [`ConnectionManager`], shared by every request
//! - Statements borrow the current handle; nothing queues while disconnected
//! - One statement per operation, no transactions

pub mod connector;
pub mod error;
pub mod manager;
pub mod repos;

pub use connector::{Connector, DatabaseConfig, MySqlConnector};
pub use error::{DbError, ErrorKind};
pub use manager::{ConnectionManager, ConnectionMode, ConnectionSupervisor, ManagerConfig};
pub use repos::{ManagedNoteStore, MemoryNoteStore, MySqlNoteStore, NoteConnection, NoteStore};
