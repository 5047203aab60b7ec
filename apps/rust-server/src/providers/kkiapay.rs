// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! KKiaPay mobile-money transaction lookups.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{PaymentGateway, SettledTransaction};
use crate::checkout::validation::{TransactionId, ValidationError};
use crate::config::{GatewayConfig, KKIAPAY_PRIVATE_KEY_ENV};
use crate::models::Amount;

const API_KEY_HEADER: &str = "x-api-key";
const SETTLED_STATUS: &str = "success";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid transaction id: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("KKiaPay configuration missing: {0}")]
    MissingConfig(&'static str),

    #[error("KKiaPay transaction not settled: {0}")]
    NotSettled(String),

    #[error("KKiaPay unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone)]
pub struct KkiapayClient {
    api_base_url: Url,
    private_key: Option<String>,
    http: Client,
}

impl KkiapayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: config.api_base_url.clone(),
            private_key: config.private_key.clone(),
            http,
        })
    }

    fn transaction_url(&self, transaction_id: &TransactionId) -> Result<Url, GatewayError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Unreachable("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "v1", "transactions"])
            .push(transaction_id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for KkiapayClient {
    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<SettledTransaction, GatewayError> {
        let transaction_id = TransactionId::parse(transaction_id)?;
        let private_key = self
            .private_key
            .as_deref()
            .ok_or(GatewayError::MissingConfig(KKIAPAY_PRIVATE_KEY_ENV))?;

        let url = self.transaction_url(&transaction_id)?;
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, private_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Unreachable("request timed out".to_string())
                } else {
                    GatewayError::Unreachable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Unreachable(format!("provider returned {status}")));
        }
        if !status.is_success() {
            // 4xx: the provider refuses or does not know the transaction.
            warn!(status = %status, "KKiaPay rejected transaction lookup");
            return Err(GatewayError::NotSettled(format!("provider returned {status}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("invalid JSON body: {e}")))?;

        settled_from_payload(transaction_id.as_str(), &payload, status)
    }

    fn is_configured(&self) -> bool {
        self.private_key.is_some()
    }
}

fn settled_from_payload(
    transaction_id: &str,
    payload: &Value,
    http_status: StatusCode,
) -> Result<SettledTransaction, GatewayError> {
    let raw_status = payload
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    debug!(http_status = %http_status, provider_status = %raw_status, "KKiaPay lookup answered");

    if !raw_status.trim().eq_ignore_ascii_case(SETTLED_STATUS) {
        return Err(GatewayError::NotSettled(format!("status {raw_status:?}")));
    }

    let amount = payload
        .get("amount")
        .ok_or_else(|| GatewayError::NotSettled("missing amount".to_string()))
        .and_then(|value| {
            Amount::from_json(value)
                .map_err(|e| GatewayError::NotSettled(format!("unusable amount: {e}")))
        })?;

    Ok(SettledTransaction {
        transaction_id: transaction_id.to_string(),
        amount,
        raw_status,
    })
}
