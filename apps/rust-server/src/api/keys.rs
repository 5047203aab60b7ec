// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use super::failure;
use crate::{
    checkout::public_key,
    error::{ApiError, ErrorBody, ErrorKind},
    models::PublicKeyResponse,
    state::AppState,
};

/// Public KKiaPay key for initializing the checkout widget.
///
/// Any request body is ignored.
#[utoipa::path(
    post,
    path = "/functions/v1/get-public-key",
    tag = "Checkout",
    responses(
        (status = 200, description = "Public key", body = PublicKeyResponse),
        (status = 500, description = "Public key not configured", body = ErrorBody)
    )
)]
pub async fn get_public_key(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let key = public_key(&state.config.gateway)
        .map_err(|e| failure("get-public-key", ErrorKind::Configuration, &e))?;
    Ok(Json(PublicKeyResponse { public_key: key }))
}
