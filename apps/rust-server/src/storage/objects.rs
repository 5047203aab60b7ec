// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Object storage for product files.
//!
//! Objects live under `{DATA_DIR}/objects/{bucket}/{path}`. They are never
//! served publicly: the only way to fetch one is through a signed URL
//!
//! ```text
//! {public_base}/storage/v1/object/sign/{bucket}/{path}?expires=<unix>&token=<mac>
//! ```
//!
//! where `mac` is base64url(HMAC-SHA256(secret, "{bucket}/{path}:{expires}")).

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use super::StoragePaths;
use crate::config::ObjectStoreConfig;

type HmacSha256 = Hmac<Sha256>;

/// Path prefix of signed object URLs, relative to the public base URL.
pub const SIGNED_OBJECT_PREFIX: [&str; 4] = ["storage", "v1", "object", "sign"];

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("signature does not match")]
    InvalidSignature,

    #[error("signed URL expired")]
    Expired,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type ObjectResult<T> = Result<T, ObjectStoreError>;

/// Storage backend that can hand out short-lived signed URLs.
pub trait ObjectStore: Send + Sync {
    fn put(&self, bucket: &str, path: &str, bytes: &[u8]) -> ObjectResult<()>;

    /// Open an object for reading. Callers stream from the returned handle.
    fn open(&self, bucket: &str, path: &str) -> ObjectResult<File>;

    /// Signed URL for an existing object, valid for `ttl` from `now`.
    fn sign(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> ObjectResult<String>;

    /// Check a signature produced by [`ObjectStore::sign`].
    fn verify(
        &self,
        bucket: &str,
        path: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> ObjectResult<()>;

    fn health_check(&self) -> ObjectResult<()>;
}

/// Split an object path into validated segments.
///
/// Rejects empty paths, absolute paths, backslashes, and empty, `.` or `..`
/// segments so a path can never escape its bucket directory.
pub fn object_segments(path: &str) -> ObjectResult<Vec<&str>> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return Err(ObjectStoreError::InvalidPath(path.to_string()));
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments
        .iter()
        .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
    {
        return Err(ObjectStoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn validate_bucket(bucket: &str) -> ObjectResult<()> {
    match object_segments(bucket)?.len() {
        1 => Ok(()),
        _ => Err(ObjectStoreError::InvalidPath(bucket.to_string())),
    }
}

/// Filesystem-backed object store under `DATA_DIR/objects`.
pub struct LocalObjectStore {
    paths: StoragePaths,
    public_base_url: Url,
    signing_key: Vec<u8>,
}

impl std::fmt::Debug for LocalObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalObjectStore")
            .field("paths", &self.paths)
            .field("public_base_url", &self.public_base_url.as_str())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl LocalObjectStore {
    /// Create the store and its root directory.
    ///
    /// Without a configured secret a random per-process key is generated,
    /// so signed URLs do not survive a restart.
    pub fn open(paths: StoragePaths, config: &ObjectStoreConfig) -> ObjectResult<Self> {
        fs::create_dir_all(paths.objects_dir())?;

        let signing_key = match &config.signing_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("STORAGE_SIGNING_SECRET not set; using an ephemeral signing key");
                let mut key = vec![0u8; 32];
                SystemRandom::new().fill(&mut key).map_err(|_| {
                    ObjectStoreError::Signing("random key generation failed".into())
                })?;
                key
            }
        };

        Ok(Self {
            paths,
            public_base_url: config.public_base_url.clone(),
            signing_key,
        })
    }

    fn mac(&self, bucket: &str, path: &str, expires: i64) -> ObjectResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| ObjectStoreError::Signing(e.to_string()))?;
        mac.update(format!("{bucket}/{path}:{expires}").as_bytes());
        Ok(mac)
    }

    fn signed_url(
        &self,
        bucket: &str,
        segments: &[&str],
        expires: i64,
        token: &str,
    ) -> ObjectResult<String> {
        let mut url = self.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::Signing("public base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(SIGNED_OBJECT_PREFIX)
            .push(bucket)
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("token", token);
        Ok(url.into())
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, bucket: &str, path: &str, bytes: &[u8]) -> ObjectResult<()> {
        validate_bucket(bucket)?;
        let segments = object_segments(path)?;
        let target = self.paths.object(bucket, &segments);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = target.with_extension("upload.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, &target)?;
        Ok(())
    }

    fn open(&self, bucket: &str, path: &str) -> ObjectResult<File> {
        validate_bucket(bucket)?;
        let segments = object_segments(path)?;
        let target = self.paths.object(bucket, &segments);
        if !target.is_file() {
            return Err(ObjectStoreError::NotFound(format!("{bucket}/{path}")));
        }
        File::open(&target).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ObjectStoreError::NotFound(format!("{bucket}/{path}")),
            _ => ObjectStoreError::Io(e),
        })
    }

    fn sign(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> ObjectResult<String> {
        validate_bucket(bucket)?;
        let segments = object_segments(path)?;
        if !self.paths.object(bucket, &segments).is_file() {
            return Err(ObjectStoreError::NotFound(format!("{bucket}/{path}")));
        }

        let expires = (now + ttl).timestamp();
        let token = Base64UrlUnpadded::encode_string(
            &self.mac(bucket, path, expires)?.finalize().into_bytes(),
        );
        self.signed_url(bucket, &segments, expires, &token)
    }

    fn verify(
        &self,
        bucket: &str,
        path: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> ObjectResult<()> {
        let provided = Base64UrlUnpadded::decode_vec(signature)
            .map_err(|_| ObjectStoreError::InvalidSignature)?;
        self.mac(bucket, path, expires)?
            .verify_slice(&provided)
            .map_err(|_| ObjectStoreError::InvalidSignature)?;

        if now.timestamp() >= expires {
            return Err(ObjectStoreError::Expired);
        }
        Ok(())
    }

    /// Write-read-delete check in the objects directory. Each call uses its
    /// own file so concurrent checks do not interfere.
    fn health_check(&self) -> ObjectResult<()> {
        let check_file = self
            .paths
            .objects_dir()
            .join(format!(".health_check-{}", Uuid::new_v4()));
        let data = b"health_check_data";

        fs::write(&check_file, data)?;
        let read_back = fs::read(&check_file);
        fs::remove_file(&check_file)?;

        if read_back? != data {
            return Err(ObjectStoreError::Io(io::Error::other(
                "health check data mismatch",
            )));
        }
        Ok(())
    }
}
