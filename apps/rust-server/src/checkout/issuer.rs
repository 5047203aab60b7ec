// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Turns a provider-confirmed payment into an order and a download token.
//!
//! An order, and therefore a credential, exists only if the gateway reported
//! the transaction settled for exactly the product's price. The ledger's
//! uniqueness on `transaction_id` is what makes replay impossible; the
//! `has_order_for` lookup only avoids generating a token for a request that
//! is bound to fail.

use chrono::{DateTime, Utc};
use ring::rand::SystemRandom;
use tracing::{info, warn};

use super::token::{generate_download_token, TokenError};
use super::validation::{BuyerEmail, ProductId, TransactionId, ValidationError};
use crate::error::ErrorKind;
use crate::models::Amount;
use crate::providers::{GatewayError, PaymentGateway};
use crate::storage::{LedgerError, OrderDraft, OrderLedger, ProductCatalog};

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("payment not verified: {0}")]
    PaymentNotVerified(#[from] GatewayError),

    #[error("paid amount {paid} does not match product price {price}")]
    AmountMismatch { paid: Amount, price: Amount },

    #[error("product {0} not found or inactive")]
    ProductNotFound(String),

    #[error("transaction {0} already processed")]
    AlreadyProcessed(String),

    #[error("token generation failed: {0}")]
    Token(#[from] TokenError),

    #[error("storage error: {0}")]
    Storage(#[from] LedgerError),
}

impl IssueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IssueError::InvalidInput(_) => ErrorKind::InvalidInput,
            IssueError::PaymentNotVerified(gateway) => match gateway {
                GatewayError::InvalidInput(_) => ErrorKind::InvalidInput,
                GatewayError::MissingConfig(_) => ErrorKind::Configuration,
                GatewayError::NotSettled(_) => ErrorKind::PaymentNotVerified,
                GatewayError::Unreachable(_) => ErrorKind::PaymentUnreachable,
            },
            IssueError::AmountMismatch { .. } => ErrorKind::PaymentNotVerified,
            IssueError::ProductNotFound(_) => ErrorKind::ProductNotFound,
            IssueError::AlreadyProcessed(_) => ErrorKind::AlreadyProcessed,
            IssueError::Token(_) | IssueError::Storage(_) => ErrorKind::Processing,
        }
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub order_id: String,
    pub download_token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct CredentialIssuer<'a> {
    gateway: &'a dyn PaymentGateway,
    catalog: &'a dyn ProductCatalog,
    ledger: &'a dyn OrderLedger,
}

impl<'a> CredentialIssuer<'a> {
    pub fn new(
        gateway: &'a dyn PaymentGateway,
        catalog: &'a dyn ProductCatalog,
        ledger: &'a dyn OrderLedger,
    ) -> Self {
        Self {
            gateway,
            catalog,
            ledger,
        }
    }

    pub async fn issue(
        &self,
        transaction_id: &str,
        product_id: &str,
        buyer_email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, IssueError> {
        // All fields are checked before anything leaves the process.
        let transaction_id = TransactionId::parse(transaction_id)?;
        let product_id = ProductId::parse(product_id)?;
        let buyer_email = BuyerEmail::parse(buyer_email)?;

        info!(
            transaction_id = %transaction_id.as_str(),
            product_id = %product_id.as_str(),
            buyer = %buyer_email.masked(),
            "Verifying payment"
        );

        let settled = self
            .gateway
            .verify_transaction(transaction_id.as_str())
            .await?;

        let product = match self.catalog.get_product(product_id.as_str())? {
            Some(product) if product.is_active => product,
            _ => return Err(IssueError::ProductNotFound(product_id.as_str().to_string())),
        };

        if self.ledger.has_order_for(transaction_id.as_str())? {
            return Err(IssueError::AlreadyProcessed(
                transaction_id.as_str().to_string(),
            ));
        }

        if settled.amount != product.price {
            return Err(IssueError::AmountMismatch {
                paid: settled.amount,
                price: product.price,
            });
        }

        let download_token = generate_download_token(&SystemRandom::new())?;
        let order = self
            .ledger
            .insert_order(OrderDraft {
                buyer_email: buyer_email.into_inner(),
                product_id: product.id.clone(),
                amount: settled.amount,
                transaction_id: transaction_id.as_str().to_string(),
                download_token,
                created_at: now,
            })
            .map_err(|e| match e {
                LedgerError::DuplicateTransaction(id) => IssueError::AlreadyProcessed(id),
                other => IssueError::Storage(other),
            })?;

        if let Err(e) = self.catalog.increment_sales_count(&product.id) {
            warn!(product_id = %product.id, error = %e, "Failed to increment sales count");
        }

        info!(
            order_id = %order.id,
            product_id = %product.id,
            amount = %order.amount,
            "Order created"
        );

        Ok(IssuedCredential {
            order_id: order.id,
            download_token: order.download_token,
            expires_at: order.download_expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SettledTransaction;
    use crate::storage::{MarketDatabase, PaymentStatus, StoredProduct};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    const PRODUCT_ID: &str = "11111111-1111-1111-1111-111111111111";

    #[derive(Clone, Copy)]
    enum Outcome {
        Settled(u64),
        NotSettled,
        Unreachable,
        MissingConfig,
    }

    struct StubGateway {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl StubGateway {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn verify_transaction(
            &self,
            transaction_id: &str,
        ) -> Result<SettledTransaction, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Settled(major) => Ok(SettledTransaction {
                    transaction_id: transaction_id.to_string(),
                    amount: Amount::from_major(major).unwrap(),
                    raw_status: "SUCCESS".to_string(),
                }),
                Outcome::NotSettled => Err(GatewayError::NotSettled("FAILED".into())),
                Outcome::Unreachable => Err(GatewayError::Unreachable("timed out".into())),
                Outcome::MissingConfig => Err(GatewayError::MissingConfig("KKIAPAY_PRIVATE_KEY")),
            }
        }

        fn is_configured(&self) -> bool {
            !matches!(self.outcome, Outcome::MissingConfig)
        }
    }

    fn temp_db(is_active: bool) -> (MarketDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = MarketDatabase::open(&dir.path().join("ledger.redb")).unwrap();
        db.upsert_product(&StoredProduct {
            id: PRODUCT_ID.to_string(),
            seller_id: "seller-1".to_string(),
            title: "Guide".to_string(),
            price: Amount::from_major(5000).unwrap(),
            file_url: "seller-1/guide.pdf".to_string(),
            is_active,
            sales_count: 0,
        })
        .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn settled_payment_creates_completed_order() {
        let (db, _dir) = temp_db(true);
        let gateway = StubGateway::new(Outcome::Settled(5000));
        let issuer = CredentialIssuer::new(&gateway, &db, &db);
        let now = Utc::now();

        let issued = issuer.issue("TX123", PRODUCT_ID, "a@b.com", now).await.unwrap();

        assert_eq!(issued.download_token.len(), 43);
        assert_eq!(issued.expires_at, now + Duration::hours(24));

        let order = db.get_order(&issued.order_id).unwrap().unwrap();
        assert_eq!(order.amount.to_string(), "5000.00");
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.transaction_id, "TX123");
        assert_eq!(order.buyer_email, "a@b.com");
        assert_eq!(order.download_token, issued.download_token);
        assert_eq!(db.get_product(PRODUCT_ID).unwrap().unwrap().sales_count, 1);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn replayed_transaction_is_already_processed() {
        let (db, _dir) = temp_db(true);
        let gateway = StubGateway::new(Outcome::Settled(5000));
        let issuer = CredentialIssuer::new(&gateway, &db, &db);

        issuer.issue("TX123", PRODUCT_ID, "a@b.com", Utc::now()).await.unwrap();
        let err = issuer
            .issue("TX123", PRODUCT_ID, "a@b.com", Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyProcessed);
        assert_eq!(db.order_count().unwrap(), 1);
        assert_eq!(db.get_product(PRODUCT_ID).unwrap().unwrap().sales_count, 1);
    }

    #[tokio::test]
    async fn replay_after_price_change_is_already_processed() {
        let (db, _dir) = temp_db(true);
        let gateway = StubGateway::new(Outcome::Settled(5000));
        let issuer = CredentialIssuer::new(&gateway, &db, &db);
        issuer.issue("TX1", PRODUCT_ID, "a@b.com", Utc::now()).await.unwrap();

        let mut product = db.get_product(PRODUCT_ID).unwrap().unwrap();
        product.price = Amount::from_major(6000).unwrap();
        db.upsert_product(&product).unwrap();

        let err = issuer
            .issue("TX1", PRODUCT_ID, "a@b.com", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyProcessed);
        assert_eq!(db.order_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_gateway() {
        let (db, _dir) = temp_db(true);
        let gateway = StubGateway::new(Outcome::Settled(5000));
        let issuer = CredentialIssuer::new(&gateway, &db, &db);
        let long_id = "x".repeat(101);

        for (tx, product, email) in [
            (long_id.as_str(), PRODUCT_ID, "a@b.com"),
            ("", PRODUCT_ID, "a@b.com"),
            ("TX1", "not-a-uuid", "a@b.com"),
            ("TX1", PRODUCT_ID, "not-an-email"),
            ("TX1", PRODUCT_ID, ""),
        ] {
            let err = issuer.issue(tx, product, email, Utc::now()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert_eq!(gateway.calls(), 0);
        assert_eq!(db.order_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn gateway_failures_map_to_distinct_kinds() {
        let (db, _dir) = temp_db(true);
        for (outcome, kind) in [
            (Outcome::NotSettled, ErrorKind::PaymentNotVerified),
            (Outcome::Unreachable, ErrorKind::PaymentUnreachable),
            (Outcome::MissingConfig, ErrorKind::Configuration),
        ] {
            let gateway = StubGateway::new(outcome);
            let err = CredentialIssuer::new(&gateway, &db, &db)
                .issue("TX123", PRODUCT_ID, "a@b.com", Utc::now())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind);
        }
        assert_eq!(db.order_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn amount_must_match_price() {
        let (db, _dir) = temp_db(true);
        let gateway = StubGateway::new(Outcome::Settled(100));
        let err = CredentialIssuer::new(&gateway, &db, &db)
            .issue("TX123", PRODUCT_ID, "a@b.com", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::AmountMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::PaymentNotVerified);
        assert_eq!(db.order_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn inactive_or_unknown_product_is_not_found() {
        let (db, _dir) = temp_db(false);
        let gateway = StubGateway::new(Outcome::Settled(5000));
        let issuer = CredentialIssuer::new(&gateway, &db, &db);

        let err = issuer
            .issue("TX123", PRODUCT_ID, "a@b.com", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductNotFound);

        let err = issuer
            .issue("TX124", "22222222-2222-2222-2222-222222222222", "a@b.com", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductNotFound);
        assert_eq!(db.order_count().unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_issuance_creates_one_order() {
        let (db, _dir) = temp_db(true);
        let db = Arc::new(db);
        let gateway = Arc::new(StubGateway::new(Outcome::Settled(5000)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                let gateway = Arc::clone(&gateway);
                tokio::spawn(async move {
                    CredentialIssuer::new(gateway.as_ref(), db.as_ref(), db.as_ref())
                        .issue("TX-RACE", PRODUCT_ID, "a@b.com", Utc::now())
                        .await
                        .map_err(|e| e.kind())
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(kind) => assert_eq!(kind, ErrorKind::AlreadyProcessed),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(db.order_count().unwrap(), 1);
    }
}
