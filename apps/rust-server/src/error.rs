// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller-visible error taxonomy.
//!
//! Every internal failure is mapped to exactly one [`ErrorKind`] at the
//! handler boundary. Only the kind's short message and code are serialized;
//! the detailed cause is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// The closed set of errors a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing request field.
    InvalidInput,
    /// Download token has the wrong shape.
    InvalidToken,
    /// Provider declined or did not settle the transaction.
    PaymentNotVerified,
    /// Provider could not be reached or answered garbage.
    PaymentUnreachable,
    /// The transaction already produced an order.
    AlreadyProcessed,
    /// Product missing or inactive.
    ProductNotFound,
    /// Unknown, stale or non-completed download credential.
    InvalidOrExpired,
    /// Server configuration is incomplete.
    Configuration,
    /// Storage or signing failure not otherwise classified.
    Processing,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput
            | ErrorKind::InvalidToken
            | ErrorKind::PaymentNotVerified
            | ErrorKind::AlreadyProcessed => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidOrExpired => StatusCode::FORBIDDEN,
            ErrorKind::ProductNotFound => StatusCode::NOT_FOUND,
            ErrorKind::PaymentUnreachable | ErrorKind::Configuration | ErrorKind::Processing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::PaymentNotVerified => "payment_not_verified",
            ErrorKind::PaymentUnreachable => "payment_unreachable",
            ErrorKind::AlreadyProcessed => "already_processed",
            ErrorKind::ProductNotFound => "product_not_found",
            ErrorKind::InvalidOrExpired => "invalid_or_expired",
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::Processing => "processing_error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Invalid request",
            ErrorKind::InvalidToken => "Invalid download token",
            ErrorKind::PaymentNotVerified | ErrorKind::PaymentUnreachable => {
                "Payment could not be verified"
            }
            ErrorKind::AlreadyProcessed => "This transaction has already been processed",
            ErrorKind::ProductNotFound => "Product not found",
            ErrorKind::InvalidOrExpired => "Invalid or expired download link",
            ErrorKind::Configuration => "Payment service configuration is missing",
            ErrorKind::Processing => "An error occurred while processing the request",
        }
    }

    /// Whether the failure is the server's fault rather than the caller's.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Short user-facing message.
    pub error: String,
    /// Stable machine-readable error code.
    pub code: String,
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            status: kind.status_code(),
            code: kind.error_code(),
            message: kind.message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message.to_string(),
            code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}
