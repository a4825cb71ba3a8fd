//! Request and response models for coffeenote-server

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Notes
// ============================================================================

/// One row of `coffeedrinknote`
///
/// Text columns are nullable; a field left out on create reads back as `null`.
/// The id is read from signed or unsigned integer columns alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub nama: Option<String>,
    pub kategori: Option<String>,
    pub deskripsi: Option<String>,
    pub makanan_pelengkap: Option<String>,
}

/// Body of create and update requests
///
/// No field is required and none is validated. Numbers and booleans are
/// taken as their text form, the way MySQL stores them in a text column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePayload {
    #[serde(default, deserialize_with = "text_field", skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    #[serde(default, deserialize_with = "text_field", skip_serializing_if = "Option::is_none")]
    pub kategori: Option<String>,
    #[serde(default, deserialize_with = "text_field", skip_serializing_if = "Option::is_none")]
    pub deskripsi: Option<String>,
    #[serde(default, deserialize_with = "text_field", skip_serializing_if = "Option::is_none")]
    pub makanan_pelengkap: Option<String>,
}

/// Accept any JSON scalar for a text column; objects and arrays are rejected.
fn text_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if b { "1" } else { "0" }.to_owned())),
        Some(Value::Array(_)) => Err(D::Error::custom("expected text, found an array")),
        Some(Value::Object(_)) => Err(D::Error::custom("expected text, found an object")),
    }
}

impl NotePayload {
    /// The row this payload becomes once storage assigns `id`.
    pub fn into_note(self, id: i64) -> Note {
        Note {
            id,
            nama: self.nama,
            kategori: self.kategori,
            deskripsi: self.deskripsi,
            makanan_pelengkap: self.makanan_pelengkap,
        }
    }
}

/// Create response: the request body echoed with the generated id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedNote {
    pub id: i64,
    #[serde(flatten)]
    pub note: NotePayload,
}

// ============================================================================
// Responses
// ============================================================================

/// Fixed confirmation body for update and delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
