//! Note repositories
//!
//! Handlers only see the [`NoteStore`] trait. The managed store runs one
//! statement per call on the connection manager's handle; the memory store
//! stands in for it in tests.

pub mod memory;
pub mod notes;

pub use memory::MemoryNoteStore;
pub use notes::{ManagedNoteStore, MySqlNoteStore, NoteConnection, NoteStore};
