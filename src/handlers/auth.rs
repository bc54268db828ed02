use axum::{
    extract::State,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    models::user::{self, User},
    repositories::user as user_repo,
    services::{auth as auth_service, otp},
    state::AppState,
    validation::auth::*,
};

/// The request payload for starting a signup (OTP request).
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupInitRequest {
    pub first_name: String,
    pub email: String,
}

/// The request payload for completing a signup.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupVerifyRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
    pub otp: String,
}

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The response payload for starting a signup.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInitResponse {
    pub message: String,
    /// Populated only in mock-mail mode so development setups can complete
    /// signup without a provider. Never set when a provider is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_otp: Option<String>,
}

/// The response payload for a successful signup or login.
#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// Starts a signup by issuing a fresh OTP to the given address.
///
/// Re-requesting a code replaces the previous one. Registered addresses are
/// rejected before any code is issued.
#[axum::debug_handler]
pub async fn signup_init(
    State(state): State<AppState>,
    Json(payload): Json<SignupInitRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Signup OTP requested for: {}", payload.email);
    validate_email(&payload.email)?;
    validate_name(&payload.first_name)?;

    if user_repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(AppError::Validation(
            "User already exists. Please login.".to_string(),
        ));
    }

    let email = payload.email.to_lowercase();
    let code = otp::initiate(state.otp.as_ref(), &email, state.config.otp_ttl()).await?;

    let delivery = state
        .mailer
        .send_signup_code(&email, &payload.first_name, &code)
        .await;

    Ok(Json(initiation_outcome(
        delivery,
        state.mailer.is_live(),
        &email,
        code,
    )))
}

/// Maps an email delivery attempt to the initiation response. The code is
/// already pending at this point, so initiation reports success no matter
/// how delivery went: a provider outage must not break signup. A failed
/// live send logs the code at warn so an operator can relay it; only mock
/// mode puts the code in the response.
fn initiation_outcome(
    delivery: Result<()>,
    live: bool,
    email: &str,
    code: String,
) -> SignupInitResponse {
    match delivery {
        Ok(()) => SignupInitResponse {
            message: "OTP sent to your email".to_string(),
            dev_otp: None,
        },
        Err(e) if live => {
            tracing::warn!(
                "⚠️ OTP delivery to {} failed: {}. Code for manual delivery: {}",
                email,
                e,
                code
            );
            SignupInitResponse {
                message: "OTP generated. Email delivery is delayed.".to_string(),
                dev_otp: None,
            }
        }
        Err(e) => {
            tracing::warn!("⚠️ Mock mail mode, returning OTP in response: {}", e);
            SignupInitResponse {
                message: "Email undeliverable. Use the code below.".to_string(),
                dev_otp: Some(code),
            }
        }
    }
}

/// Completes a signup: consumes the OTP, creates the account, and issues a
/// session token.
#[axum::debug_handler]
pub async fn signup_verify(
    State(state): State<AppState>,
    Json(payload): Json<SignupVerifyRequest>,
) -> Result<impl IntoResponse> {
    validate_email(&payload.email)?;
    validate_name(&payload.first_name)?;
    validate_password(&payload.password)?;

    let email = payload.email.to_lowercase();

    otp::verify(state.otp.as_ref(), &email, payload.otp.trim()).await?;

    // Checked again after OTP consumption: initiation and verification can
    // race for the same address.
    if user_repo::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Validation(
            "User already exists. Please login.".to_string(),
        ));
    }

    let role = match &state.config.admin_email {
        Some(admin) if admin.eq_ignore_ascii_case(&email) => user::ROLE_ADMIN,
        _ => user::ROLE_STUDENT,
    };

    let password_hash = auth_service::hash_password(&payload.password)?;

    let created = user_repo::create(
        &state.db,
        user_repo::NewUser {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email,
            password_hash,
            role: role.to_string(),
            branch: payload.branch,
            year: payload.year,
            college: payload.college,
        },
    )
    .await?;

    let token = auth_service::issue_token(
        &state.config.jwt_secret,
        created.id,
        &created.role,
        state.config.session_ttl_days,
    )?;

    tracing::info!("✅ Signup completed for: {}", created.email);

    Ok(Json(SessionResponse { token, user: created }))
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    validate_email(&payload.email)?;

    let user = user_repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    if !auth_service::verify_password(&payload.password, &user.password)? {
        tracing::warn!("❌ Bad password for: {}", user.email);
        return Err(AppError::Authentication("Invalid credentials".to_string()));
    }

    let token = auth_service::issue_token(
        &state.config.jwt_secret,
        user.id,
        &user.role,
        state.config.session_ttl_days,
    )?;

    tracing::info!("✅ Login: {}", user.email);

    Ok(Json(SessionResponse { token, user }))
}

/// Returns the authenticated user's profile, entitlements included.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let user = user_repo::find_by_id(&state.db, auth.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_failed() -> crate::error::Result<()> {
        Err(AppError::Mail("Provider returned 503".to_string()))
    }

    #[test]
    fn delivery_failure_with_live_provider_still_succeeds() {
        let outcome = initiation_outcome(send_failed(), true, "a@x.com", "1234".to_string());

        // The code is pending regardless of delivery; the response reports
        // success and never carries the code when a provider is configured.
        assert!(outcome.dev_otp.is_none());
        assert_eq!(outcome.message, "OTP generated. Email delivery is delayed.");
    }

    #[test]
    fn mock_mode_surfaces_the_code_in_the_response() {
        let outcome = initiation_outcome(send_failed(), false, "a@x.com", "1234".to_string());

        assert_eq!(outcome.dev_otp.as_deref(), Some("1234"));
    }

    #[test]
    fn successful_delivery_never_carries_the_code() {
        let outcome = initiation_outcome(Ok(()), true, "a@x.com", "1234".to_string());

        assert!(outcome.dev_otp.is_none());
        assert_eq!(outcome.message, "OTP sent to your email");
    }
}
