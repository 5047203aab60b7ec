// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Boutique Marketplace - Payment Verification and Download Service
//!
//! Confirms KKiaPay mobile-money payments with the provider, records exactly
//! one order per settled transaction, and exchanges the resulting download
//! credential for short-lived file URLs.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum), CORS policy, OpenAPI
//! - `checkout` - credential issuance and download authorization
//! - `providers` - KKiaPay transaction lookups
//! - `storage` - order ledger, product catalog and object storage (redb + filesystem)

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
