// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment provider integrations.

pub mod kkiapay;

use async_trait::async_trait;

use crate::models::Amount;

pub use kkiapay::{GatewayError, KkiapayClient};

/// A transaction the provider reports as settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledTransaction {
    pub transaction_id: String,
    /// Amount actually paid, as reported by the provider.
    pub amount: Amount,
    pub raw_status: String,
}

/// Authoritative source of payment state.
///
/// Implementations perform exactly one provider call per invocation and
/// never retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<SettledTransaction, GatewayError>;

    /// Whether the server-held secret is present.
    fn is_configured(&self) -> bool;
}
