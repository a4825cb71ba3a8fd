//! Note repository
//!
//! One parameterized statement per operation:
//! - create: INSERT, returns the generated id
//! - list: unfiltered SELECT
//! - get: SELECT by primary key
//! - update/delete: by primary key, affected-row count returned but not
//!   checked here
//!
//! [`ManagedNoteStore`] borrows the manager's current handle for each call
//! and reports failures back to it. The statements themselves live on the
//! handle type through [`NoteConnection`].

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{FromRow, Row};
use tokio::sync::Mutex;

use crate::db::{ConnectionManager, Connector, DbError, MySqlConnector};
use crate::models::{Note, NotePayload};

const INSERT_NOTE: &str = "INSERT INTO coffeedrinknote (nama, kategori, deskripsi, makanan_pelengkap) VALUES (?, ?, ?, ?)";
const SELECT_NOTES: &str =
    "SELECT id, nama, kategori, deskripsi, makanan_pelengkap FROM coffeedrinknote";
const SELECT_NOTE: &str =
    "SELECT id, nama, kategori, deskripsi, makanan_pelengkap FROM coffeedrinknote WHERE id = ?";
const UPDATE_NOTE: &str = "UPDATE coffeedrinknote SET nama = ?, kategori = ?, deskripsi = ?, makanan_pelengkap = ? WHERE id = ?";
const DELETE_NOTE: &str = "DELETE FROM coffeedrinknote WHERE id = ?";

/// Storage for notes.
///
/// Ids arrive as the raw path segment and are handed to storage as is.
#[async_trait]
pub trait NoteStore: Send + Sync + 'static {
    /// Insert a note, returning the id storage assigned.
    async fn create(&self, note: &NotePayload) -> Result<i64, DbError>;

    async fn list(&self) -> Result<Vec<Note>, DbError>;

    async fn get(&self, id: &str) -> Result<Option<Note>, DbError>;

    /// Overwrite all four text fields. Returns the affected-row count.
    async fn update(&self, id: &str, note: &NotePayload) -> Result<u64, DbError>;

    /// Returns the affected-row count.
    async fn delete(&self, id: &str) -> Result<u64, DbError>;

    /// Whether a storage handle is currently live.
    fn is_connected(&self) -> bool {
        true
    }
}

/// The five note statements, run on one live connection handle.
#[async_trait]
pub trait NoteConnection: Send + Sync + 'static {
    async fn insert(&self, note: &NotePayload) -> Result<i64, DbError>;

    async fn select_all(&self) -> Result<Vec<Note>, DbError>;

    async fn select_one(&self, id: &str) -> Result<Option<Note>, DbError>;

    async fn update(&self, id: &str, note: &NotePayload) -> Result<u64, DbError>;

    async fn delete(&self, id: &str) -> Result<u64, DbError>;
}

/// Store over whatever handle a [`ConnectionManager`] currently holds
pub struct ManagedNoteStore<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
}

/// The production store: one managed MySQL connection.
pub type MySqlNoteStore = ManagedNoteStore<MySqlConnector>;

impl<C: Connector> ManagedNoteStore<C> {
    pub fn new(manager: Arc<ConnectionManager<C>>) -> Self {
        Self { manager }
    }

    /// Pass a statement result through, telling the manager about failures on `conn`.
    fn observe<T>(&self, conn: &Arc<C::Conn>, result: Result<T, DbError>) -> Result<T, DbError> {
        if let Err(err) = &result {
            self.manager.report(conn, err);
        }
        result
    }
}

#[async_trait]
impl<C> NoteStore for ManagedNoteStore<C>
where
    C: Connector,
    C::Conn: NoteConnection,
{
    async fn create(&self, note: &NotePayload) -> Result<i64, DbError> {
        let conn = self.manager.handle()?;
        let result = conn.insert(note).await;
        self.observe(&conn, result)
    }

    async fn list(&self) -> Result<Vec<Note>, DbError> {
        let conn = self.manager.handle()?;
        let result = conn.select_all().await;
        self.observe(&conn, result)
    }

    async fn get(&self, id: &str) -> Result<Option<Note>, DbError> {
        let conn = self.manager.handle()?;
        let result = conn.select_one(id).await;
        self.observe(&conn, result)
    }

    async fn update(&self, id: &str, note: &NotePayload) -> Result<u64, DbError> {
        let conn = self.manager.handle()?;
        let result = NoteConnection::update(&*conn, id, note).await;
        self.observe(&conn, result)
    }

    async fn delete(&self, id: &str) -> Result<u64, DbError> {
        let conn = self.manager.handle()?;
        let result = NoteConnection::delete(&*conn, id).await;
        self.observe(&conn, result)
    }

    fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }
}

#[async_trait]
impl NoteConnection for Mutex<MySqlConnection> {
    async fn insert(&self, note: &NotePayload) -> Result<i64, DbError> {
        let mut conn = self.lock().await;
        let done = sqlx::query(INSERT_NOTE)
            .bind(note.nama.as_deref())
            .bind(note.kategori.as_deref())
            .bind(note.deskripsi.as_deref())
            .bind(note.makanan_pelengkap.as_deref())
            .execute(&mut *conn)
            .await?;

        let id = i64::try_from(done.last_insert_id())
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(id)
    }

    async fn select_all(&self) -> Result<Vec<Note>, DbError> {
        let mut conn = self.lock().await;
        let notes = sqlx::query_as::<_, Note>(SELECT_NOTES)
            .fetch_all(&mut *conn)
            .await?;
        Ok(notes)
    }

    async fn select_one(&self, id: &str) -> Result<Option<Note>, DbError> {
        let mut conn = self.lock().await;
        let note = sqlx::query_as::<_, Note>(SELECT_NOTE)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(note)
    }

    async fn update(&self, id: &str, note: &NotePayload) -> Result<u64, DbError> {
        let mut conn = self.lock().await;
        let done = sqlx::query(UPDATE_NOTE)
            .bind(note.nama.as_deref())
            .bind(note.kategori.as_deref())
            .bind(note.deskripsi.as_deref())
            .bind(note.makanan_pelengkap.as_deref())
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(done.rows_affected())
    }

    async fn delete(&self, id: &str) -> Result<u64, DbError> {
        let mut conn = self.lock().await;
        let done = sqlx::query(DELETE_NOTE)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(done.rows_affected())
    }
}

impl<'r> FromRow<'r, MySqlRow> for Note {
    fn from_row(row: &'r MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_id(row)?,
            nama: row.try_get("nama")?,
            kategori: row.try_get("kategori")?,
            deskripsi: row.try_get("deskripsi")?,
            makanan_pelengkap: row.try_get("makanan_pelengkap")?,
        })
    }
}

/// Read `id` from a signed or unsigned integer column.
fn decode_id(row: &MySqlRow) -> Result<i64, sqlx::Error> {
    match row.try_get::<i64, _>("id") {
        Err(sqlx::Error::ColumnDecode { .. }) => {
            let id: u64 = row.try_get("id")?;
            i64::try_from(id).map_err(|e| sqlx::Error::ColumnDecode {
                index: "id".to_owned(),
                source: Box::new(e),
            })
        }
        other => other,
    }
}
