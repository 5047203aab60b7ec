// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment exactly once at startup and
//! shared, immutable, through [`crate::state::AppState`]. Handlers never read
//! the environment themselves.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the ledger database and object store | `./data` |
//! | `ALLOWED_ORIGINS` | Comma-separated CORS allow-list (first entry is the fallback) | `http://localhost:5173,http://localhost:3000` |
//! | `KKIAPAY_API_BASE_URL` | KKiaPay REST API base URL | `https://api.kkiapay.me` |
//! | `KKIAPAY_PRIVATE_KEY` | Server-held KKiaPay secret | Required for payment verification |
//! | `KKIAPAY_PUBLIC_KEY` | Client-side KKiaPay key served to the checkout | Required for checkout |
//! | `KKIAPAY_TIMEOUT_SECS` | Timeout for transaction lookups | `10` |
//! | `STORAGE_PUBLIC_BASE_URL` | Origin used when minting signed object URLs | `http://localhost:8080` |
//! | `STORAGE_SIGNING_SECRET` | HMAC key for signed object URLs | Random per process |
//! | `PRODUCT_FILES_BUCKET` | Bucket holding purchasable files | `product-files` |
//! | `CATALOG_SEED_PATH` | JSON file of products upserted at startup | Optional |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files for HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// Holds `ledger.redb` and the `objects/` tree of the local object store.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";
pub const KKIAPAY_API_BASE_URL_ENV: &str = "KKIAPAY_API_BASE_URL";
pub const KKIAPAY_PRIVATE_KEY_ENV: &str = "KKIAPAY_PRIVATE_KEY";
pub const KKIAPAY_PUBLIC_KEY_ENV: &str = "KKIAPAY_PUBLIC_KEY";
pub const KKIAPAY_TIMEOUT_SECS_ENV: &str = "KKIAPAY_TIMEOUT_SECS";
pub const STORAGE_PUBLIC_BASE_URL_ENV: &str = "STORAGE_PUBLIC_BASE_URL";
pub const STORAGE_SIGNING_SECRET_ENV: &str = "STORAGE_SIGNING_SECRET";
pub const PRODUCT_FILES_BUCKET_ENV: &str = "PRODUCT_FILES_BUCKET";
pub const CATALOG_SEED_PATH_ENV: &str = "CATALOG_SEED_PATH";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
const DEFAULT_KKIAPAY_API_BASE_URL: &str = "https://api.kkiapay.me";
const DEFAULT_KKIAPAY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STORAGE_PUBLIC_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PRODUCT_FILES_BUCKET: &str = "product-files";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required configuration `{0}` is missing")]
    Missing(&'static str),

    #[error("configuration `{name}` is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for the KKiaPay transaction-lookup client.
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_base_url: Url,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Settings for the object store and the URLs it signs.
#[derive(Clone)]
pub struct ObjectStoreConfig {
    pub public_base_url: Url,
    /// `None` means a random key is generated when the store is opened.
    pub signing_secret: Option<Vec<u8>>,
    pub product_files_bucket: String,
}

impl std::fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("public_base_url", &self.public_base_url.as_str())
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<redacted>"))
            .field("product_files_bucket", &self.product_files_bucket)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Process-wide configuration, loaded once by [`AppConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub gateway: GatewayConfig,
    pub objects: ObjectStoreConfig,
    pub catalog_seed_path: Option<PathBuf>,
    pub tls: Option<TlsConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default(HOST_ENV, DEFAULT_HOST);
        let port = match env_optional(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let allowed_origins =
            parse_allowed_origins(&env_or_default(ALLOWED_ORIGINS_ENV, DEFAULT_ALLOWED_ORIGINS))?;

        let timeout_secs = match env_optional(KKIAPAY_TIMEOUT_SECS_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: KKIAPAY_TIMEOUT_SECS_ENV,
                    reason: format!("expected a positive number of seconds, got `{raw}`"),
                })?,
            None => DEFAULT_KKIAPAY_TIMEOUT_SECS,
        };

        let gateway = GatewayConfig {
            api_base_url: parse_url(
                KKIAPAY_API_BASE_URL_ENV,
                &env_or_default(KKIAPAY_API_BASE_URL_ENV, DEFAULT_KKIAPAY_API_BASE_URL),
            )?,
            private_key: env_optional(KKIAPAY_PRIVATE_KEY_ENV),
            public_key: env_optional(KKIAPAY_PUBLIC_KEY_ENV),
            timeout: Duration::from_secs(timeout_secs),
        };

        let objects = ObjectStoreConfig {
            public_base_url: parse_url(
                STORAGE_PUBLIC_BASE_URL_ENV,
                &env_or_default(STORAGE_PUBLIC_BASE_URL_ENV, DEFAULT_STORAGE_PUBLIC_BASE_URL),
            )?,
            signing_secret: env_optional(STORAGE_SIGNING_SECRET_ENV).map(String::into_bytes),
            product_files_bucket: env_or_default(
                PRODUCT_FILES_BUCKET_ENV,
                DEFAULT_PRODUCT_FILES_BUCKET,
            ),
        };

        let tls = match (env_optional(TLS_CERT_PATH_ENV), env_optional(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            allowed_origins,
            gateway,
            objects,
            catalog_seed_path: env_optional(CATALOG_SEED_PATH_ENV).map(PathBuf::from),
            tls,
        })
    }

    /// Configuration suitable for tests: everything local, nothing secret.
    pub fn for_tests(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            data_dir: data_dir.into(),
            allowed_origins: vec![
                "https://shop.example.com".to_string(),
                "http://localhost:5173".to_string(),
            ],
            gateway: GatewayConfig {
                api_base_url: Url::parse("http://127.0.0.1:9").expect("static url"),
                private_key: Some("test-private-key".to_string()),
                public_key: Some("test-public-key".to_string()),
                timeout: Duration::from_secs(2),
            },
            objects: ObjectStoreConfig {
                public_base_url: Url::parse("https://files.example.com").expect("static url"),
                signing_secret: Some(b"test-signing-secret".to_vec()),
                product_files_bucket: DEFAULT_PRODUCT_FILES_BUCKET.to_string(),
            },
            catalog_seed_path: None,
            tls: None,
        }
    }
}

/// Split and validate the comma-separated origin allow-list.
pub fn parse_allowed_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::Missing(ALLOWED_ORIGINS_ENV));
    }
    if let Some(wildcard) = origins.iter().find(|origin| origin.contains('*')) {
        return Err(ConfigError::Invalid {
            name: ALLOWED_ORIGINS_ENV,
            reason: format!("wildcard origins are not allowed: `{wildcard}`"),
        });
    }
    Ok(origins)
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_origins_are_trimmed_and_ordered() {
        let origins =
            parse_allowed_origins(" https://shop.example.com/ , http://localhost:3000,,").unwrap();
        assert_eq!(
            origins,
            vec![
                "https://shop.example.com".to_string(),
                "http://localhost:3000".to_string()
            ]
        );
    }

    #[test]
    fn empty_allowed_origins_is_missing() {
        assert_eq!(
            parse_allowed_origins(" , ").unwrap_err(),
            ConfigError::Missing(ALLOWED_ORIGINS_ENV)
        );
    }

    #[test]
    fn wildcard_origin_is_rejected() {
        let err = parse_allowed_origins("*").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == ALLOWED_ORIGINS_ENV));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig::for_tests("/tmp/unused");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("test-private-key"));
        assert!(!rendered.contains("test-signing-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
