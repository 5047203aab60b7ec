// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted order and product records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Amount;

/// How long a download credential stays valid after the order is created.
pub const DOWNLOAD_CREDENTIAL_TTL_HOURS: i64 = 24;

/// Payment status of an order. The service itself only writes `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// A purchasable product, owned by a seller's boutique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProduct {
    /// Lower-case hyphenated UUID.
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub price: Amount,
    /// Object path inside the product-files bucket, or an absolute URL.
    pub file_url: String,
    pub is_active: bool,
    #[serde(default)]
    pub sales_count: u64,
}

/// Everything needed to record a settled purchase.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub buyer_email: String,
    pub product_id: String,
    /// Amount reported by the payment gateway, never the client.
    pub amount: Amount,
    pub transaction_id: String,
    pub download_token: String,
    pub created_at: DateTime<Utc>,
}

/// A completed purchase.
///
/// Immutable after insert except for `downloaded_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: String,
    pub buyer_email: String,
    pub product_id: String,
    pub amount: Amount,
    pub transaction_id: String,
    pub payment_status: PaymentStatus,
    pub download_token: String,
    pub download_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StoredOrder {
    /// Materialize a draft as a completed order with a fresh identifier.
    pub fn completed(draft: OrderDraft) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            buyer_email: draft.buyer_email,
            product_id: draft.product_id,
            amount: draft.amount,
            transaction_id: draft.transaction_id,
            payment_status: PaymentStatus::Completed,
            download_token: draft.download_token,
            download_expires_at: draft.created_at + Duration::hours(DOWNLOAD_CREDENTIAL_TTL_HOURS),
            downloaded_at: None,
            created_at: draft.created_at,
        }
    }

    /// A credential authorizes downloads only while the order is completed
    /// and `now` is strictly before the expiry.
    pub fn credential_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.payment_status == PaymentStatus::Completed && now < self.download_expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(now: DateTime<Utc>) -> OrderDraft {
        OrderDraft {
            buyer_email: "a@b.com".to_string(),
            product_id: "11111111-1111-1111-1111-111111111111".to_string(),
            amount: Amount::from_major(5000).unwrap(),
            transaction_id: "TX123".to_string(),
            download_token: "token".to_string(),
            created_at: now,
        }
    }

    #[test]
    fn completed_order_expires_after_24_hours() {
        let now = Utc::now();
        let order = StoredOrder::completed(draft(now));
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.download_expires_at, now + Duration::hours(24));
        assert!(order.downloaded_at.is_none());
        assert!(uuid::Uuid::parse_str(&order.id).is_ok());
    }

    #[test]
    fn credential_validity_boundary_is_exclusive() {
        let now = Utc::now();
        let order = StoredOrder::completed(draft(now));
        assert!(order.credential_valid_at(now));
        assert!(order.credential_valid_at(order.download_expires_at - Duration::seconds(1)));
        assert!(!order.credential_valid_at(order.download_expires_at));
        assert!(!order.credential_valid_at(now + Duration::hours(25)));
    }

    #[test]
    fn non_completed_order_never_valid() {
        let now = Utc::now();
        let mut order = StoredOrder::completed(draft(now));
        order.payment_status = PaymentStatus::Pending;
        assert!(!order.credential_valid_at(now));
    }

    #[test]
    fn product_sales_count_defaults_to_zero() {
        let product: StoredProduct = serde_json::from_value(serde_json::json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "seller_id": "seller-1",
            "title": "Guide",
            "price": 5000,
            "file_url": "seller-1/guide.pdf",
            "is_active": true
        }))
        .unwrap();
        assert_eq!(product.sales_count, 0);
        assert_eq!(product.price.to_string(), "5000.00");
    }
}
