// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::providers::{GatewayError, KkiapayClient, PaymentGateway};
use crate::storage::{
    LedgerError, LocalObjectStore, MarketDatabase, ObjectStore, ObjectStoreError, StoragePaths,
};

/// Failure while assembling the application state at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("failed to open object store: {0}")]
    Objects(#[from] ObjectStoreError),

    #[error("failed to build payment gateway client: {0}")]
    Gateway(#[from] GatewayError),
}

/// Shared, immutable handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Arc<MarketDatabase>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub objects: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        database: MarketDatabase,
        gateway: Arc<dyn PaymentGateway>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database: Arc::new(database),
            gateway,
            objects,
        }
    }

    /// Open storage under `config.data_dir` and build the KKiaPay client.
    pub fn open(config: AppConfig) -> Result<Self, StartupError> {
        let paths = StoragePaths::new(&config.data_dir);
        let database = MarketDatabase::open(&paths.ledger_db())?;
        let objects = LocalObjectStore::open(paths, &config.objects)?;
        let gateway = KkiapayClient::new(&config.gateway)?;
        Ok(Self::new(config, database, Arc::new(gateway), Arc::new(objects)))
    }

    /// Bucket holding purchasable files.
    pub fn product_files_bucket(&self) -> &str {
        &self.config.objects.product_files_bucket
    }
}
