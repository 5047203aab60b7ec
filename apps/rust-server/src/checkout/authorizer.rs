// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Exchanges a download credential for a short-lived file URL.

use chrono::{DateTime, Duration, Utc};
use percent_encoding::percent_decode_str;
use tracing::{info, warn};

use super::validation::{DownloadToken, ValidationError};
use crate::error::ErrorKind;
use crate::storage::{LedgerError, ObjectStore, ObjectStoreError, OrderLedger, ProductCatalog};

/// Lifetime of a signed file URL.
pub const SIGNED_URL_TTL_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("malformed download token: {0}")]
    InvalidToken(#[from] ValidationError),

    #[error("download token unknown, not completed or expired")]
    InvalidOrExpired,

    #[error("product {0} not found")]
    ProductNotFound(String),

    #[error("could not sign file URL: {0}")]
    Signing(#[from] ObjectStoreError),

    #[error("storage error: {0}")]
    Storage(#[from] LedgerError),
}

impl AuthzError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::InvalidToken(_) => ErrorKind::InvalidToken,
            AuthzError::InvalidOrExpired => ErrorKind::InvalidOrExpired,
            AuthzError::ProductNotFound(_) => ErrorKind::ProductNotFound,
            AuthzError::Signing(_) | AuthzError::Storage(_) => ErrorKind::Processing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedDownload {
    pub file_url: String,
    pub product_title: String,
}

/// Where a product's file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    /// Object path inside the product-files bucket.
    Stored(String),
    /// Third-party URL handed out unchanged.
    External(String),
}

impl FileLocation {
    /// Classify a product's `file_url`.
    ///
    /// Anything not starting with `http` is a bucket path (an optional
    /// leading `<bucket>/` is dropped). A URL into this storage's public or
    /// signed object routes for the bucket is reduced to its percent-decoded
    /// object path.
    pub fn classify(file_url: &str, bucket: &str) -> Self {
        if !file_url.starts_with("http") {
            let path = file_url
                .strip_prefix(bucket)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(file_url);
            return FileLocation::Stored(path.to_string());
        }

        for route in ["/storage/v1/object/public/", "/storage/v1/object/sign/"] {
            let marker = format!("{route}{bucket}/");
            if let Some(start) = file_url.find(&marker) {
                let rest = &file_url[start + marker.len()..];
                let path = rest.split(['?', '#']).next().unwrap_or_default();
                if !path.is_empty() {
                    let path = percent_decode_str(path).decode_utf8_lossy();
                    return FileLocation::Stored(path.into_owned());
                }
            }
        }

        FileLocation::External(file_url.to_string())
    }
}

pub struct DownloadAuthorizer<'a> {
    ledger: &'a dyn OrderLedger,
    catalog: &'a dyn ProductCatalog,
    objects: &'a dyn ObjectStore,
    bucket: &'a str,
}

impl<'a> DownloadAuthorizer<'a> {
    pub fn new(
        ledger: &'a dyn OrderLedger,
        catalog: &'a dyn ProductCatalog,
        objects: &'a dyn ObjectStore,
        bucket: &'a str,
    ) -> Self {
        Self {
            ledger,
            catalog,
            objects,
            bucket,
        }
    }

    pub fn authorize(
        &self,
        download_token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedDownload, AuthzError> {
        let token = DownloadToken::parse(download_token)?;

        let order = self
            .ledger
            .find_completed_by_token(token.as_str())?
            .ok_or(AuthzError::InvalidOrExpired)?;

        if !order.credential_valid_at(now) {
            return Err(AuthzError::InvalidOrExpired);
        }

        // Inactive products stay downloadable for buyers who already paid.
        let product = self
            .catalog
            .get_product(&order.product_id)?
            .ok_or_else(|| AuthzError::ProductNotFound(order.product_id.clone()))?;

        if let Err(e) = self.ledger.record_redemption(&order.id, now) {
            warn!(order_id = %order.id, error = %e, "Failed to record download timestamp");
        }

        let file_url = match FileLocation::classify(&product.file_url, self.bucket) {
            FileLocation::Stored(path) => self.objects.sign(
                self.bucket,
                &path,
                Duration::seconds(SIGNED_URL_TTL_SECS),
                now,
            )?,
            FileLocation::External(url) => url,
        };

        info!(order_id = %order.id, product_id = %product.id, "Download authorized");

        Ok(AuthorizedDownload {
            file_url,
            product_title: product.title,
        })
    }
}
