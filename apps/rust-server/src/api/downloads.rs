// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::Utc;

use super::failure;
use crate::{
    checkout::DownloadAuthorizer,
    error::{ApiError, ErrorBody, ErrorKind},
    models::{DownloadRequest, DownloadResponse},
    state::AppState,
};

/// Exchange a download credential for a short-lived file URL.
///
/// A credential can be redeemed any number of times until it expires.
#[utoipa::path(
    post,
    path = "/functions/v1/download-product",
    request_body = DownloadRequest,
    tag = "Checkout",
    responses(
        (status = 200, description = "Download authorized", body = DownloadResponse),
        (status = 400, description = "Malformed body or token", body = ErrorBody),
        (status = 403, description = "Unknown or expired token", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
        (status = 500, description = "File URL could not be produced", body = ErrorBody)
    )
)]
pub async fn download_product(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| failure("download-product", ErrorKind::InvalidInput, &e))?;

    let authorizer = DownloadAuthorizer::new(
        state.database.as_ref(),
        state.database.as_ref(),
        state.objects.as_ref(),
        state.product_files_bucket(),
    );
    let download = authorizer
        .authorize(
            request.download_token.as_deref().unwrap_or_default(),
            Utc::now(),
        )
        .map_err(|e| failure("download-product", e.kind(), &e))?;

    Ok(Json(DownloadResponse {
        download_url: download.file_url,
        product_title: download.product_title,
    }))
}
