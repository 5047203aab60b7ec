// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::fmt::Display;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::{ApiError, ErrorBody, ErrorKind},
    models::{
        DownloadRequest, DownloadResponse, PublicKeyResponse, VerifyPaymentRequest,
        VerifyPaymentResponse,
    },
    state::AppState,
};

pub mod cors;
pub mod downloads;
pub mod health;
pub mod keys;
pub mod objects;
pub mod payments;

/// Request body limit for the storefront functions.
pub const FUNCTION_BODY_LIMIT: usize = 16 * 1024;

pub fn router(state: AppState) -> Router {
    let cors_policy = cors::CorsPolicy::new(&state.config.allowed_origins);

    let functions = Router::new()
        .route("/verify-payment", post(payments::verify_payment))
        .route("/get-public-key", post(keys::get_public_key))
        .route("/download-product", post(downloads::download_product))
        .layer(DefaultBodyLimit::max(FUNCTION_BODY_LIMIT));

    Router::new()
        .nest("/functions/v1", functions)
        .route(
            "/storage/v1/object/sign/{bucket}/{*path}",
            get(objects::fetch_signed_object),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn_with_state(
            cors_policy,
            cors::cors_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Log a failed request and convert it into the caller-visible error.
///
/// The detailed cause only ever reaches the logs.
pub(crate) fn failure(operation: &'static str, kind: ErrorKind, cause: &dyn Display) -> ApiError {
    if kind.is_server_error() {
        error!(operation, code = kind.error_code(), error = %cause, "Request failed");
    } else {
        warn!(operation, code = kind.error_code(), error = %cause, "Request rejected");
    }
    ApiError::from(kind)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        payments::verify_payment,
        keys::get_public_key,
        downloads::download_product,
        objects::fetch_signed_object,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            PublicKeyResponse,
            DownloadRequest,
            DownloadResponse,
            ErrorBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Checkout", description = "Payment verification and download authorization"),
        (name = "Storage", description = "Signed product file access"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
