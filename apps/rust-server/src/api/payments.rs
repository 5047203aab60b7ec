// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::Utc;

use super::failure;
use crate::{
    checkout::CredentialIssuer,
    error::{ApiError, ErrorBody, ErrorKind},
    models::{VerifyPaymentRequest, VerifyPaymentResponse},
    state::AppState,
};

/// Verify a KKiaPay transaction and issue a download credential.
///
/// The amount recorded on the order is the one reported by KKiaPay, never a
/// client-supplied value.
#[utoipa::path(
    post,
    path = "/functions/v1/verify-payment",
    request_body = VerifyPaymentRequest,
    tag = "Checkout",
    responses(
        (status = 200, description = "Order created", body = VerifyPaymentResponse),
        (status = 400, description = "Invalid input, unverified payment or replay", body = ErrorBody),
        (status = 404, description = "Product not found or inactive", body = ErrorBody),
        (status = 500, description = "Gateway unreachable or server misconfigured", body = ErrorBody)
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| failure("verify-payment", ErrorKind::InvalidInput, &e))?;

    let issuer = CredentialIssuer::new(
        state.gateway.as_ref(),
        state.database.as_ref(),
        state.database.as_ref(),
    );
    let issued = issuer
        .issue(
            request.transaction_id.as_deref().unwrap_or_default(),
            request.product_id.as_deref().unwrap_or_default(),
            request.buyer_email.as_deref().unwrap_or_default(),
            Utc::now(),
        )
        .await
        .map_err(|e| failure("verify-payment", e.kind(), &e))?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        order_id: issued.order_id,
        download_token: issued.download_token,
    }))
}
