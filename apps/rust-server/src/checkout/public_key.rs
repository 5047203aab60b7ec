// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side KKiaPay key for the checkout widget.

use tracing::error;

use crate::config::{ConfigError, GatewayConfig, KKIAPAY_PUBLIC_KEY_ENV};

/// The configured public key. It is never defaulted.
pub fn public_key(config: &GatewayConfig) -> Result<String, ConfigError> {
    match config.public_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => {
            error!(variable = KKIAPAY_PUBLIC_KEY_ENV, "KKiaPay public key is not configured");
            Err(ConfigError::Missing(KKIAPAY_PUBLIC_KEY_ENV))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn returns_configured_key_every_time() {
        let config = AppConfig::for_tests("/tmp/unused");
        assert_eq!(public_key(&config.gateway).unwrap(), "test-public-key");
        assert_eq!(public_key(&config.gateway).unwrap(), "test-public-key");
    }

    #[test]
    fn missing_or_blank_key_is_a_config_error() {
        let mut config = AppConfig::for_tests("/tmp/unused").gateway;
        config.public_key = None;
        assert_eq!(
            public_key(&config),
            Err(ConfigError::Missing(KKIAPAY_PUBLIC_KEY_ENV))
        );
        config.public_key = Some("   ".to_string());
        assert!(public_key(&config).is_err());
    }
}
