use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    services::media::{self, RangeQuery},
    services::signer::MEDIA_TTL,
    state::AppState,
};

/// The query parameters for signing an object key.
#[derive(Deserialize)]
pub struct SignQuery {
    pub key: String,
}

/// The response payload for a signed key.
#[derive(Serialize)]
pub struct SignResponse {
    pub url: String,
}

/// The query parameters for the streaming proxy. The token travels in the
/// URL because the browser's video element cannot attach headers.
#[derive(Deserialize)]
pub struct StreamQuery {
    pub key: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Exchanges a private storage key for a short-lived public URL. Runs
/// behind the auth middleware.
#[axum::debug_handler]
pub async fn sign_key(
    State(state): State<AppState>,
    Query(query): Query<SignQuery>,
) -> Result<impl IntoResponse> {
    if query.key.trim().is_empty() {
        return Err(AppError::Validation("Key is required".to_string()));
    }

    let url = state.signer.sign(&query.key, MEDIA_TTL).await?;
    Ok(Json(SignResponse { url }))
}

/// Relays one byte range of a private video object as a 206 response.
///
/// Unauthenticated at the router level: the session token is carried in the
/// query string and checked here on every range request.
#[axum::debug_handler]
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let token = query.token.as_deref().unwrap_or("");
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let ranged = media::serve_range(
        state.storage.as_ref(),
        &state.config.jwt_secret,
        RangeQuery {
            key: &query.key,
            token,
            range,
        },
    )
    .await?;

    let response = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_RANGE, ranged.content_range())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, ranged.content_length())
        .header(header::CONTENT_TYPE, ranged.content_type.clone())
        .body(Body::from_stream(ranged.body))
        .map_err(|e| AppError::Internal(format!("Failed to build stream response: {}", e)))?;

    Ok(response)
}
