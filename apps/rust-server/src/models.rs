// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the storefront-facing functions, plus the
//! [`Amount`] type shared by the catalog, the ledger and the payment gateway.
//!
//! Request fields are all optional at the serde layer: a missing field and a
//! malformed field both surface as `invalid_input` after validation, never as
//! a framework rejection that would echo parser details.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

// =============================================================================
// Amount
// =============================================================================

/// A positive monetary amount with at most two decimal places.
///
/// Stored as integer minor units so that gateway amounts and catalog prices
/// compare exactly. The currency is implicit (the marketplace settles in a
/// single currency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount must be a valid positive number")]
    Invalid,
    #[error("amount must have at most 2 decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

impl Amount {
    pub fn from_minor(minor: u64) -> Result<Self, AmountError> {
        if minor == 0 {
            return Err(AmountError::Invalid);
        }
        Ok(Self(minor))
    }

    pub fn from_major(major: u64) -> Result<Self, AmountError> {
        major
            .checked_mul(100)
            .ok_or(AmountError::Overflow)
            .and_then(Self::from_minor)
    }

    pub fn minor_units(&self) -> u64 {
        self.0
    }

    /// Interpret a provider JSON value (`5000`, `5000.5` or `"5000"`).
    pub fn from_json(value: &Value) -> Result<Self, AmountError> {
        match value {
            Value::Number(number) => match number.as_u64() {
                Some(whole) => Self::from_major(whole),
                None => number.to_string().parse(),
            },
            Value::String(raw) => raw.parse(),
            _ => Err(AmountError::Invalid),
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(amount: &str) -> Result<Self, Self::Err> {
        let trimmed = amount.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Invalid);
        }

        let (whole_part, fraction_part) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::Invalid);
        }
        if !fraction_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::Invalid);
        }
        // "5000.000" from float formatting is still two significant places.
        let fraction_part = fraction_part.trim_end_matches('0');
        if fraction_part.len() > 2 {
            return Err(AmountError::TooPrecise);
        }

        let whole = whole_part
            .parse::<u64>()
            .map_err(|_| AmountError::Overflow)?;
        let fraction = match fraction_part.len() {
            0 => 0,
            1 => fraction_part.parse::<u64>().map_err(|_| AmountError::Invalid)? * 10,
            _ => fraction_part.parse::<u64>().map_err(|_| AmountError::Invalid)?,
        };

        let minor = whole
            .checked_mul(100)
            .and_then(|base| base.checked_add(fraction))
            .ok_or(AmountError::Overflow)?;
        Self::from_minor(minor)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Amount::from_json(&value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// verify-payment
// =============================================================================

/// Body sent by the storefront after the payment widget reports success.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// KKiaPay transaction identifier (at most 100 characters).
    pub transaction_id: Option<String>,
    /// Purchased product (hyphenated UUID).
    pub product_id: Option<String>,
    /// Buyer e-mail address for the download link.
    pub buyer_email: Option<String>,
}

/// Successful verification: the order exists and a credential was issued.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Always `true`.
    pub success: bool,
    /// Identifier of the newly created order.
    pub order_id: String,
    /// Opaque download credential, valid for 24 hours.
    pub download_token: String,
}

// =============================================================================
// get-public-key
// =============================================================================

/// KKiaPay client-side key for the checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

// =============================================================================
// download-product
// =============================================================================

/// Body sent when a buyer follows the download link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Download credential returned by verify-payment.
    pub download_token: Option<String>,
}

/// Short-lived URL for the purchased file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    /// Signed URL (5 minute lifetime) or the product's external URL.
    pub download_url: String,
    /// Product title, for display.
    pub product_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_amount_rejects_non_positive_values() {
        assert_eq!("0".parse::<Amount>(), Err(AmountError::Invalid));
        assert_eq!("0.00".parse::<Amount>(), Err(AmountError::Invalid));
        assert_eq!("-5".parse::<Amount>(), Err(AmountError::Invalid));
    }

    #[test]
    fn parse_amount_converts_to_minor_units() {
        let amount: Amount = "25.5".parse().expect("valid amount");
        assert_eq!(amount.minor_units(), 2550);
        assert_eq!(amount.to_string(), "25.50");
    }

    #[test]
    fn parse_amount_rejects_too_many_decimals() {
        assert_eq!("1.234".parse::<Amount>(), Err(AmountError::TooPrecise));
        assert_eq!("1.5000".parse::<Amount>().unwrap().minor_units(), 150);
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert_eq!("".parse::<Amount>(), Err(AmountError::Invalid));
        assert_eq!("1.2.3".parse::<Amount>(), Err(AmountError::Invalid));
        assert_eq!("abc".parse::<Amount>(), Err(AmountError::Invalid));
        assert_eq!(".5".parse::<Amount>(), Err(AmountError::Invalid));
    }

    #[test]
    fn amount_from_provider_json() {
        assert_eq!(
            Amount::from_json(&json!(5000)).unwrap(),
            Amount::from_major(5000).unwrap()
        );
        assert_eq!(Amount::from_json(&json!(12.5)).unwrap().minor_units(), 1250);
        assert_eq!(Amount::from_json(&json!("300")).unwrap().minor_units(), 30000);
        assert!(Amount::from_json(&json!(null)).is_err());
        assert!(Amount::from_json(&json!(-10)).is_err());
        assert!(Amount::from_json(&json!(0)).is_err());
    }

    #[test]
    fn amount_serializes_as_decimal_string() {
        let amount = Amount::from_major(5000).unwrap();
        assert_eq!(serde_json::to_value(amount).unwrap(), json!("5000.00"));
        let back: Amount = serde_json::from_value(json!("5000.00")).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn verify_payment_request_uses_camel_case() {
        let request: VerifyPaymentRequest = serde_json::from_value(json!({
            "transactionId": "TX123",
            "productId": "11111111-1111-1111-1111-111111111111",
            "buyerEmail": "a@b.com"
        }))
        .unwrap();
        assert_eq!(request.transaction_id.as_deref(), Some("TX123"));
        assert_eq!(request.buyer_email.as_deref(), Some("a@b.com"));

        let empty: VerifyPaymentRequest = serde_json::from_value(json!({})).unwrap();
        assert!(empty.product_id.is_none());
    }
}
