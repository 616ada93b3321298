// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Photo references handed over by the camera or gallery picker

use std::path::{Path, PathBuf};

use crate::{LeafLensError, Result};

/// A local photo: the reference shown to the user plus the file behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    reference: String,
    path: PathBuf,
}

impl PhotoRef {
    /// Accepts `file://` URIs and plain filesystem paths
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LeafLensError::InvalidInput("No photo given".to_string()));
        }

        let path = match reference.split_once("://") {
            Some(("file", rest)) => PathBuf::from(rest),
            Some((scheme, _)) => {
                return Err(LeafLensError::InvalidInput(format!(
                    "Unsupported photo URI scheme: {}",
                    scheme
                )))
            }
            None => PathBuf::from(reference),
        };

        Ok(Self {
            reference: reference.to_string(),
            path,
        })
    }

    pub fn from_path(path: &Path) -> Self {
        Self {
            reference: format!("file://{}", path.display()),
            path: path.to_path_buf(),
        }
    }

    /// Reference used for display and as the gallery fallback
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the image bytes for submission
    pub async fn read(&self) -> Result<Vec<u8>> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(LeafLensError::InvalidInput(format!("Not a file: {}", self.path.display())))
            }
            Err(_) => {
                return Err(LeafLensError::InvalidInput(format!("Photo not found: {}", self.path.display())))
            }
        }

        let bytes = tokio::fs::read(&self.path).await?;
        if bytes.is_empty() {
            return Err(LeafLensError::InvalidInput(format!("Photo is empty: {}", self.path.display())));
        }
        Ok(bytes)
    }
}
