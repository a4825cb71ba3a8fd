//! In-memory note store for tests and local runs without MySQL

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::NoteStore;
use crate::db::DbError;
use crate::models::{Note, NotePayload};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Note>,
}

/// [`NoteStore`] backed by a map, with a switch to simulate a lost connection.
pub struct MemoryNoteStore {
    table: RwLock<Table>,
    connected: AtomicBool,
}

impl Default for MemoryNoteStore {
    fn default() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            connected: AtomicBool::new(true),
        }
    }
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While disconnected every call fails with [`DbError::Disconnected`].
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> Result<(), DbError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DbError::Disconnected)
        }
    }
}

/// Non-numeric ids match no row.
fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, note: &NotePayload) -> Result<i64, DbError> {
        self.ensure_connected()?;
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(id, note.clone().into_note(id));
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Note>, DbError> {
        self.ensure_connected()?;
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Note>, DbError> {
        self.ensure_connected()?;
        let table = self.table.read().await;
        Ok(parse_id(id).and_then(|id| table.rows.get(&id).cloned()))
    }

    async fn update(&self, id: &str, note: &NotePayload) -> Result<u64, DbError> {
        self.ensure_connected()?;
        let mut table = self.table.write().await;
        match parse_id(id).and_then(|id| table.rows.get_mut(&id)) {
            Some(row) => {
                *row = note.clone().into_note(row.id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: &str) -> Result<u64, DbError> {
        self.ensure_connected()?;
        let mut table = self.table.write().await;
        let removed = parse_id(id).and_then(|id| table.rows.remove(&id));
        Ok(u64::from(removed.is_some()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
