use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    repositories::course as course_repo,
    repositories::note as note_repo,
    repositories::user::{self as user_repo, EntitlementKind},
    state::AppState,
};

/// The request payload for creating a payment order.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub item_id: String,
    pub item_type: String,
}

/// The response payload for a created order: what the checkout widget
/// needs to open.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// The gateway's payment confirmation, field names as the checkout widget
/// posts them.
#[derive(Deserialize, Debug)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "itemType")]
    pub item_type: String,
}

#[derive(Serialize)]
pub struct PaymentStatus {
    pub status: &'static str,
}

fn entitlement_kind(item_type: &str) -> Result<EntitlementKind> {
    match item_type {
        "course" => Ok(EntitlementKind::Course),
        "note" => Ok(EntitlementKind::Note),
        other => Err(AppError::Validation(format!(
            "Unknown item type: {}",
            other
        ))),
    }
}

/// Creates a gateway order for a catalog item, priced from the database
/// rather than the client.
#[axum::debug_handler]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    let price = match entitlement_kind(&payload.item_type)? {
        EntitlementKind::Course => course_repo::find(&state.db, &payload.item_id)
            .await?
            .ok_or(AppError::NotFound)?
            .price,
        EntitlementKind::Note => note_repo::find(&state.db, &payload.item_id)
            .await?
            .ok_or(AppError::NotFound)?
            .price,
    };

    let order = state.payments.create_order(price, &payload.item_id).await?;

    tracing::info!("💳 Order {} created for {}", order.id, payload.item_id);

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
        key_id: state.config.razorpay_key_id.clone(),
    }))
}

/// Confirms a payment and grants the entitlement.
///
/// The signature is recomputed server-side from the order and payment ids;
/// only a match grants access. Granting is idempotent, so a retried
/// confirmation cannot double-record a purchase.
#[axum::debug_handler]
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Response> {
    let kind = entitlement_kind(&payload.item_type)?;

    if !state.payments.verify_signature(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    ) {
        tracing::warn!(
            "❌ Payment signature mismatch for order {}",
            payload.razorpay_order_id
        );
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(PaymentStatus { status: "failure" }),
        )
            .into_response());
    }

    user_repo::grant_entitlement(&state.db, auth.id, &payload.item_id, kind).await?;

    tracing::info!(
        "✅ Payment verified, {} {} granted to {}",
        payload.item_type,
        payload.item_id,
        auth.id
    );

    Ok(Json(PaymentStatus { status: "success" }).into_response())
}
