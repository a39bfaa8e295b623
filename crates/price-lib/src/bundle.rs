//! Persisted model bundle
//!
//! The bundle file holds everything the service needs to answer requests:
//! the fitted price model, the category encoder, the feature order and the
//! held-out metrics. Layout:
//!
//! ```text
//! CAMPRICE-BUNDLE 1
//! <hex sha256 of payload>
//! <json payload>
//! ```
//!
//! Writes go through a temp file and a rename so a crashed trainer never
//! leaves a half-written bundle behind.

use crate::encoder::CategoryEncoder;
use crate::error::BundleError;
use crate::models::{Performance, FEATURE_NAMES};
use crate::predictor::GradientBoostingRegressor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

const BUNDLE_MAGIC: &str = "CAMPRICE-BUNDLE";
const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: GradientBoostingRegressor,
    pub encoder: CategoryEncoder,
    pub feature_names: Vec<String>,
    pub performance: Performance,
    /// RFC 3339 training timestamp
    pub trained_at: String,
}

impl ModelBundle {
    pub fn new(
        model: GradientBoostingRegressor,
        encoder: CategoryEncoder,
        performance: Performance,
    ) -> Self {
        Self {
            model,
            encoder,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            performance,
            trained_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Serialize into the on-disk representation
    pub fn to_bytes(&self) -> Result<Vec<u8>, BundleError> {
        let payload = serde_json::to_vec(self)?;
        let checksum = compute_checksum(&payload);

        let mut bytes = format!("{} {}\n{}\n", BUNDLE_MAGIC, BUNDLE_VERSION, checksum).into_bytes();
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parse and validate the on-disk representation
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BundleError> {
        let (header, rest) = split_line(bytes)
            .ok_or_else(|| BundleError::BadHeader("missing header line".to_string()))?;
        let expected_header = format!("{} {}", BUNDLE_MAGIC, BUNDLE_VERSION);
        if header != expected_header.as_bytes() {
            return Err(BundleError::BadHeader(
                String::from_utf8_lossy(header).into_owned(),
            ));
        }

        let (checksum, payload) = split_line(rest)
            .ok_or_else(|| BundleError::BadHeader("missing checksum line".to_string()))?;
        let expected = String::from_utf8_lossy(checksum).into_owned();
        let actual = compute_checksum(payload);
        if expected != actual {
            return Err(BundleError::ChecksumMismatch { expected, actual });
        }

        let bundle: ModelBundle = serde_json::from_slice(payload)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Write the bundle atomically
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        let bytes = self.to_bytes()?;
        let io_err = |source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        };

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;

        info!(
            path = %path.display(),
            size = bytes.len(),
            brands = self.encoder.len(),
            "Model bundle saved"
        );
        Ok(())
    }

    /// Load and validate a bundle from disk
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let bytes = fs::read(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    fn validate(&self) -> Result<(), BundleError> {
        if self.feature_names != FEATURE_NAMES {
            return Err(BundleError::Invalid(format!(
                "feature order {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.encoder.is_empty() {
            return Err(BundleError::Invalid("category encoder is empty".to_string()));
        }
        if !self.model.is_fitted() {
            return Err(BundleError::Invalid("price model is not fitted".to_string()));
        }
        Ok(())
    }
}

fn split_line(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().position(|&b| b == b'\n')?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
