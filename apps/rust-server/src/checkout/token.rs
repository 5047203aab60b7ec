// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Download credential generation.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};

/// Entropy of a download token.
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("system random generator failed")]
pub struct TokenError;

/// A fresh 256-bit token, base64url without padding (43 characters).
pub fn generate_download_token(rng: &SystemRandom) -> Result<String, TokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes).map_err(|_| TokenError)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
