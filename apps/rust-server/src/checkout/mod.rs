// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Checkout
//!
//! Core flows behind the storefront functions:
//!
//! - [`CredentialIssuer`]: verified payment → order + download token
//! - [`DownloadAuthorizer`]: download token → short-lived file URL
//! - [`public_key`]: client-side gateway key for the payment widget

pub mod authorizer;
pub mod issuer;
pub mod public_key;
pub mod token;
pub mod validation;

pub use authorizer::{AuthorizedDownload, AuthzError, DownloadAuthorizer, FileLocation};
pub use issuer::{CredentialIssuer, IssueError, IssuedCredential};
pub use public_key::public_key;
