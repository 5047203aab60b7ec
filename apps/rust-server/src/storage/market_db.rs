// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded order ledger and product catalog backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `orders`: order_id → serialized StoredOrder
//! - `orders_by_transaction`: transaction_id → order_id (unique)
//! - `orders_by_token`: download_token → order_id (unique)
//! - `products`: product_id → serialized StoredProduct
//!
//! redb allows a single write transaction at a time, so a check of
//! `orders_by_transaction` followed by the insert inside that same write
//! transaction is atomic: concurrent issuances for one transaction id yield
//! exactly one order.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::records::{OrderDraft, PaymentStatus, StoredOrder, StoredProduct};
use super::{OrderLedger, ProductCatalog};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: order_id → serialized StoredOrder (JSON bytes).
const ORDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Unique index: external transaction id → order_id.
const ORDERS_BY_TRANSACTION: TableDefinition<&str, &str> =
    TableDefinition::new("orders_by_transaction");

/// Unique index: download token → order_id.
const ORDERS_BY_TOKEN: TableDefinition<&str, &str> = TableDefinition::new("orders_by_token");

/// Catalog: product_id → serialized StoredProduct (JSON bytes).
const PRODUCTS: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("transaction {0} already has an order")]
    DuplicateTransaction(String),

    #[error("download token collision")]
    DuplicateToken,

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// MarketDatabase
// =============================================================================

/// Embedded ACID store for orders and the product catalog.
pub struct MarketDatabase {
    db: Database,
}

impl MarketDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(ORDERS_BY_TRANSACTION)?;
            let _ = write_txn.open_table(ORDERS_BY_TOKEN)?;
            let _ = write_txn.open_table(PRODUCTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Verify a read transaction can be opened.
    pub fn health_check(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ORDERS)?;
        Ok(())
    }

    /// Number of orders in the ledger.
    pub fn order_count(&self) -> LedgerResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;
        Ok(table.len()?)
    }

    /// Look up a single order by id.
    pub fn get_order(&self, order_id: &str) -> LedgerResult<Option<StoredOrder>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Upsert every product from a JSON array file.
    pub fn seed_products(&self, path: &Path) -> LedgerResult<usize> {
        let raw = std::fs::read(path)?;
        let products: Vec<StoredProduct> = serde_json::from_slice(&raw)?;
        let count = products.len();
        for mut product in products {
            product.id = product.id.to_ascii_lowercase();
            self.upsert_product(&product)?;
        }
        Ok(count)
    }
}

impl OrderLedger for MarketDatabase {
    fn has_order_for(&self, transaction_id: &str) -> LedgerResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_BY_TRANSACTION)?;
        Ok(table.get(transaction_id)?.is_some())
    }

    fn insert_order(&self, draft: OrderDraft) -> LedgerResult<StoredOrder> {
        let order = StoredOrder::completed(draft);
        let json = serde_json::to_vec(&order)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut by_transaction = write_txn.open_table(ORDERS_BY_TRANSACTION)?;
            if by_transaction.get(order.transaction_id.as_str())?.is_some() {
                // Dropping the write transaction aborts it.
                return Err(LedgerError::DuplicateTransaction(order.transaction_id));
            }

            let mut by_token = write_txn.open_table(ORDERS_BY_TOKEN)?;
            if by_token.get(order.download_token.as_str())?.is_some() {
                return Err(LedgerError::DuplicateToken);
            }

            let mut orders = write_txn.open_table(ORDERS)?;
            orders.insert(order.id.as_str(), json.as_slice())?;
            by_transaction.insert(order.transaction_id.as_str(), order.id.as_str())?;
            by_token.insert(order.download_token.as_str(), order.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(order)
    }

    fn find_completed_by_token(&self, download_token: &str) -> LedgerResult<Option<StoredOrder>> {
        let read_txn = self.db.begin_read()?;
        let by_token = read_txn.open_table(ORDERS_BY_TOKEN)?;
        let Some(order_id) = by_token.get(download_token)? else {
            return Ok(None);
        };

        let orders = read_txn.open_table(ORDERS)?;
        let Some(value) = orders.get(order_id.value())? else {
            return Ok(None);
        };
        let order: StoredOrder = serde_json::from_slice(value.value())?;
        if order.payment_status != PaymentStatus::Completed {
            return Ok(None);
        }
        Ok(Some(order))
    }

    fn record_redemption(&self, order_id: &str, at: DateTime<Utc>) -> LedgerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ORDERS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(order_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Order {order_id}")))?;
                existing.value().to_vec()
            };

            let mut order: StoredOrder = serde_json::from_slice(&existing_bytes)?;
            order.downloaded_at = Some(at);

            let json = serde_json::to_vec(&order)?;
            table.insert(order_id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl ProductCatalog for MarketDatabase {
    fn get_product(&self, product_id: &str) -> LedgerResult<Option<StoredProduct>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn upsert_product(&self, product: &StoredProduct) -> LedgerResult<()> {
        let json = serde_json::to_vec(product)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRODUCTS)?;
            table.insert(product.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn increment_sales_count(&self, product_id: &str) -> LedgerResult<u64> {
        let write_txn = self.db.begin_write()?;
        let count = {
            let mut table = write_txn.open_table(PRODUCTS)?;
            let existing_bytes = {
                let existing = table
                    .get(product_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("Product {product_id}")))?;
                existing.value().to_vec()
            };

            let mut product: StoredProduct = serde_json::from_slice(&existing_bytes)?;
            product.sales_count = product.sales_count.saturating_add(1);

            let json = serde_json::to_vec(&product)?;
            table.insert(product_id, json.as_slice())?;
            product.sales_count
        };
        write_txn.commit()?;
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================
