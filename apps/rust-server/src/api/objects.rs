// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use utoipa::IntoParams;

use super::failure;
use crate::{
    error::{ApiError, ErrorBody, ErrorKind},
    state::AppState,
    storage::ObjectStoreError,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SignedObjectQuery {
    /// Unix timestamp after which the URL is rejected.
    pub expires: i64,
    /// base64url HMAC over bucket, path and expiry.
    pub token: String,
}

/// Serve a product file through a URL minted by download-product.
#[utoipa::path(
    get,
    path = "/storage/v1/object/sign/{bucket}/{path}",
    params(
        ("bucket" = String, Path, description = "Storage bucket"),
        ("path" = String, Path, description = "Object path inside the bucket"),
        SignedObjectQuery
    ),
    tag = "Storage",
    responses(
        (status = 200, description = "File contents as an attachment"),
        (status = 403, description = "Signature invalid or expired", body = ErrorBody),
        (status = 404, description = "Object not found", body = ErrorBody)
    )
)]
pub async fn fetch_signed_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
    query: Result<Query<SignedObjectQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) =
        query.map_err(|e| failure("signed-object", ErrorKind::InvalidOrExpired, &e))?;

    state
        .objects
        .verify(&bucket, &path, query.expires, &query.token, Utc::now())
        .map_err(|e| failure("signed-object", ErrorKind::InvalidOrExpired, &e))?;

    let file = state.objects.open(&bucket, &path).map_err(|e| {
        let kind = match &e {
            ObjectStoreError::NotFound(_) => ErrorKind::ProductNotFound,
            ObjectStoreError::InvalidPath(_) => ErrorKind::InvalidOrExpired,
            _ => ErrorKind::Processing,
        };
        failure("signed-object", kind, &e)
    })?;

    let length = file
        .metadata()
        .map_err(|e| failure("signed-object", ErrorKind::Processing, &e))?
        .len();
    let body = Body::from_stream(ReaderStream::new(tokio::fs::File::from_std(file)));

    let file_name = path.rsplit('/').next().unwrap_or_default().replace('"', "");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
            (CACHE_CONTROL, HeaderValue::from_static("private, no-store")),
            (CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        body,
    )
        .into_response())
}
