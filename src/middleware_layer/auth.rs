use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::auth,
    state::AppState,
};

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == crate::models::user::ROLE_ADMIN
    }
}

/// Extracts the bearer token from the Authorization header.
///
/// # Arguments
///
/// * `request` - The incoming request.
///
/// # Returns
///
/// An `Option` containing the raw token if found.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A middleware that requires a valid bearer token to be present.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an error `AppError`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_bearer_token(&request).ok_or_else(|| {
        tracing::warn!("❌ No bearer token found");
        AppError::Authentication("Missing authentication token".to_string())
    })?;

    let claims = auth::verify_token(&state.config.jwt_secret, token).map_err(|e| {
        tracing::warn!("❌ Token rejected: {}", e);
        AppError::Authentication("Invalid or expired token".to_string())
    })?;

    tracing::debug!("✅ User authenticated: {}", claims.sub);

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// A middleware that restricts a route to admin users. Must run after
/// [`require_auth`].
///
/// # Arguments
///
/// * `user` - The authenticated user.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an error `AppError`.
pub async fn require_admin(
    Extension(user): Extension<AuthUser>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        tracing::warn!("❌ Admin route denied for user: {}", user.id);
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
