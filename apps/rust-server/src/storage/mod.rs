// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state of the marketplace service, all under `DATA_DIR`:
//!
//! - [`MarketDatabase`]: redb file holding the order ledger and the product
//!   catalog.
//! - [`LocalObjectStore`]: product files, fetched only through signed URLs.
//!
//! The checkout flow depends on the [`OrderLedger`], [`ProductCatalog`] and
//! [`ObjectStore`] traits rather than the concrete types, so tests can swap
//! in failing implementations.

pub mod market_db;
pub mod objects;
pub mod paths;
pub mod records;

use chrono::{DateTime, Utc};

pub use market_db::{LedgerError, LedgerResult, MarketDatabase};
pub use objects::{object_segments, LocalObjectStore, ObjectResult, ObjectStore, ObjectStoreError};
pub use paths::StoragePaths;
pub use records::{OrderDraft, PaymentStatus, StoredOrder, StoredProduct};

/// Durable record of completed purchases.
///
/// At most one order exists per transaction id, and download tokens are
/// unique across all orders.
pub trait OrderLedger: Send + Sync {
    fn has_order_for(&self, transaction_id: &str) -> LedgerResult<bool>;

    /// Insert a completed order.
    ///
    /// Fails with [`LedgerError::DuplicateTransaction`] when an order for the
    /// same transaction id already exists; the check and the insert are one
    /// atomic step.
    fn insert_order(&self, draft: OrderDraft) -> LedgerResult<StoredOrder>;

    /// Completed order carrying this download token, if any.
    fn find_completed_by_token(&self, download_token: &str) -> LedgerResult<Option<StoredOrder>>;

    /// Set `downloaded_at`; nothing else on the order changes.
    fn record_redemption(&self, order_id: &str, at: DateTime<Utc>) -> LedgerResult<()>;
}

/// Product lookups, the sales counter, and catalog seeding.
pub trait ProductCatalog: Send + Sync {
    fn get_product(&self, product_id: &str) -> LedgerResult<Option<StoredProduct>>;

    /// Insert or replace a catalog entry.
    fn upsert_product(&self, product: &StoredProduct) -> LedgerResult<()>;

    /// Increment and return the product's sales count.
    fn increment_sales_count(&self, product_id: &str) -> LedgerResult<u64>;
}
