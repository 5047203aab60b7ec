// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parsed request fields.
//!
//! Each newtype can only be obtained through `parse`, so holding one means
//! the value already passed boundary validation.

use std::fmt;

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub const MAX_TRANSACTION_ID_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_DOWNLOAD_TOKEN_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("transaction id must be 1 to 100 characters")]
    TransactionId,
    #[error("product id must be a hyphenated UUID")]
    ProductId,
    #[error("buyer email is not a valid address")]
    BuyerEmail,
    #[error("download token must be 1 to 100 characters")]
    DownloadToken,
}

fn within(value: &str, max: usize) -> bool {
    !value.is_empty() && value.chars().count() <= max
}

/// Payment provider transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if !within(raw, MAX_TRANSACTION_ID_LEN) {
            return Err(ValidationError::TransactionId);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Product identifier, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductId(String);

impl ProductId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        // Only the 36-character hyphenated form; `Uuid` also accepts simple,
        // braced and URN forms.
        if raw.len() != 36 {
            return Err(ValidationError::ProductId);
        }
        let uuid = Uuid::try_parse(raw).map_err(|_| ValidationError::ProductId)?;
        Ok(Self(uuid.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Buyer e-mail address: trimmed, NFC-normalized, `local@domain.tld`.
#[derive(Clone, PartialEq, Eq)]
pub struct BuyerEmail(String);

impl BuyerEmail {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized: String = raw.trim().nfc().collect();
        if normalized.chars().count() > MAX_EMAIL_LEN || !has_address_shape(&normalized) {
            return Err(ValidationError::BuyerEmail);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First three characters followed by `***`, for logs.
    pub fn masked(&self) -> String {
        mask_email(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for BuyerEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuyerEmail").field(&self.masked()).finish()
    }
}

/// Mask an address for logging, whether or not it validated.
pub fn mask_email(raw: &str) -> String {
    let prefix: String = raw.chars().take(3).collect();
    format!("{prefix}***")
}

/// One `@`, something before it, and a dot inside the domain with
/// something on both sides. No whitespace anywhere.
fn has_address_shape(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Opaque download credential as presented by the buyer.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadToken(String);

impl DownloadToken {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if !within(raw, MAX_DOWNLOAD_TOKEN_LEN) {
            return Err(ValidationError::DownloadToken);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DownloadToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_length_bounds() {
        assert!(TransactionId::parse("TX123").is_ok());
        assert!(TransactionId::parse(&"a".repeat(100)).is_ok());
        assert_eq!(
            TransactionId::parse(&"a".repeat(101)),
            Err(ValidationError::TransactionId)
        );
        assert_eq!(TransactionId::parse(""), Err(ValidationError::TransactionId));
    }

    #[test]
    fn product_id_requires_hyphenated_uuid() {
        let id = ProductId::parse("AAAAAAAA-1111-1111-1111-111111111111").unwrap();
        assert_eq!(id.as_str(), "aaaaaaaa-1111-1111-1111-111111111111");

        for bad in [
            "",
            "not-a-uuid",
            "aaaaaaaa111111111111111111111111",
            "{aaaaaaaa-1111-1111-1111-111111111111}",
            "gggggggg-1111-1111-1111-111111111111",
        ] {
            assert_eq!(ProductId::parse(bad), Err(ValidationError::ProductId), "{bad}");
        }
    }

    #[test]
    fn buyer_email_shape() {
        assert_eq!(BuyerEmail::parse("  a@b.com ").unwrap().as_str(), "a@b.com");
        assert!(BuyerEmail::parse("first.last@sub.example.org").is_ok());

        for bad in ["", "ab.com", "@b.com", "a@b", "a@.com", "a@b.", "a b@c.com", "a@b@c.com"] {
            assert_eq!(BuyerEmail::parse(bad), Err(ValidationError::BuyerEmail), "{bad}");
        }

        let long = format!("{}@b.com", "a".repeat(250));
        assert_eq!(BuyerEmail::parse(&long), Err(ValidationError::BuyerEmail));
    }

    #[test]
    fn buyer_email_is_nfc_normalized() {
        // "e" followed by a combining acute accent
        let email = BuyerEmail::parse("re\u{301}mi@example.com").unwrap();
        assert_eq!(email.as_str(), "r\u{e9}mi@example.com");
    }

    #[test]
    fn masked_email_keeps_three_characters() {
        let email = BuyerEmail::parse("alice@example.com").unwrap();
        assert_eq!(email.masked(), "ali***");
        assert_eq!(format!("{email:?}"), "BuyerEmail(\"ali***\")");
        assert_eq!(mask_email("ab"), "ab***");
    }

    #[test]
    fn download_token_bounds() {
        assert!(DownloadToken::parse("tok").is_ok());
        assert_eq!(DownloadToken::parse(""), Err(ValidationError::DownloadToken));
        assert_eq!(
            DownloadToken::parse(&"t".repeat(101)),
            Err(ValidationError::DownloadToken)
        );
    }
}
