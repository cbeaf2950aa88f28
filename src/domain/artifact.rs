//! Generated script artifact.
//!
//! The plan generator returns a test script alongside the suite. It is
//! exported verbatim; the digest lets users confirm what they downloaded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use super::suite::TestSuite;

/// Default file name for exported scripts
pub const DEFAULT_SCRIPT_NAME: &str = "playwright.test.ts";

/// Script text produced by planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptArtifact {
    /// Name of the suite that produced this script
    pub suite_name: String,

    /// Script text, unmodified
    pub content: String,

    /// When the artifact was captured
    pub created_at: DateTime<Utc>,

    /// Size in bytes
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of `content`
    pub sha256: String,
}

impl ScriptArtifact {
    pub fn new(suite_name: String, content: String) -> Self {
        let size_bytes = content.len() as u64;
        let sha256 = hex::encode(Sha256::digest(content.as_bytes()));
        Self {
            suite_name,
            content,
            created_at: Utc::now(),
            size_bytes,
            sha256,
        }
    }

    /// Capture the generated code of a suite
    pub fn from_suite(suite: &TestSuite) -> Self {
        Self::new(suite.name.clone(), suite.generated_code.clone())
    }

    /// Write the script to `path`. A directory path gets the default file name.
    pub async fn write_to(&self, path: &Path) -> Result<PathBuf> {
        let target = if fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
            path.join(DEFAULT_SCRIPT_NAME)
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(&target, &self.content)
            .await
            .with_context(|| format!("Failed to write script: {}", target.display()))?;

        Ok(target)
    }
}
