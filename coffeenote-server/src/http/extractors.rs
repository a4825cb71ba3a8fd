//! Custom Axum extractors
//!
//! Both map axum's plain-text rejections onto the `{"error": ...}` shape.

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::error::ApiError;
use crate::models::NotePayload;

/// Note id from the path, kept as the raw segment.
///
/// Storage does any coercion; a segment that is not a number matches no row.
pub struct NoteId(pub String);

impl<S> FromRequestParts<S> for NoteId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                message: rejection.body_text(),
            })?;

        Ok(Self(id))
    }
}

/// JSON body of create and update requests
///
/// A request that does not declare a JSON content type carries no fields:
/// its body is ignored and every column is written as NULL. A declared JSON
/// body that does not parse is a 400.
pub struct NoteBody(pub NotePayload);

impl<S> FromRequest<S> for NoteBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !declares_json(req.headers()) {
            return Ok(Self(NotePayload::default()));
        }

        let Json(payload) = Json::<NotePayload>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                message: rejection.body_text(),
            })?;

        Ok(Self(payload))
    }
}

/// `application/json` or an `application/*+json` subtype, parameters ignored.
fn declares_json(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn json_content_types() {
        assert!(declares_json(&headers(Some("application/json"))));
        assert!(declares_json(&headers(Some("application/json; charset=utf-8"))));
        assert!(declares_json(&headers(Some("Application/JSON"))));
        assert!(declares_json(&headers(Some("application/merge-patch+json"))));
    }

    #[test]
    fn other_content_types() {
        assert!(!declares_json(&headers(None)));
        assert!(!declares_json(&headers(Some("text/plain"))));
        assert!(!declares_json(&headers(Some("application/x-www-form-urlencoded"))));
    }
}
