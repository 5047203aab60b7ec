// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout of the data directory.
//!
//! ```text
//! {DATA_DIR}/
//!   ledger.redb                  # orders + product catalog
//!   objects/{bucket}/{path...}   # local object store
//! ```

use std::path::{Path, PathBuf};

/// Storage path utilities rooted at `DATA_DIR`.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Embedded ledger database file.
    pub fn ledger_db(&self) -> PathBuf {
        self.root.join("ledger.redb")
    }

    /// Directory containing all object-store buckets.
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    /// Directory for a single bucket.
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.objects_dir().join(bucket)
    }

    /// File backing an object.
    ///
    /// `segments` must already be validated (see `objects::object_segments`).
    pub fn object(&self, bucket: &str, segments: &[&str]) -> PathBuf {
        segments
            .iter()
            .fold(self.bucket_dir(bucket), |path, segment| path.join(segment))
    }
}
