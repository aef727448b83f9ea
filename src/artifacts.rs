//! Model artifact materialization
//!
//! Artifacts are fetched once at startup into a local directory. A failed
//! fetch aborts startup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::validation::validate_artifact_id;

/// Resolves an artifact identifier to a readable local file.
#[async_trait]
pub trait ModelArtifactStore: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<PathBuf>;
}

/// Artifacts already present under a directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ModelArtifactStore for LocalArtifactStore {
    async fn fetch(&self, identifier: &str) -> Result<PathBuf> {
        validate_artifact_id(identifier)?;
        let path = self.root.join(identifier);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            PipelineError::Artifact(format!("{} is not readable: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(PipelineError::Artifact(format!(
                "{} is not a file",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Blob container reachable over HTTP.
///
/// `identifier` is appended to `base_url`, followed by `query` verbatim
/// (e.g. a SAS token starting with `?`). Bodies are streamed to
/// `model_dir/<identifier>`.
pub struct HttpArtifactStore {
    base_url: String,
    query: Option<String>,
    model_dir: PathBuf,
    client: reqwest::Client,
}

impl HttpArtifactStore {
    /// Store downloading into `model_dir`
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        query: Option<String>,
        model_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            query,
            model_dir: model_dir.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Download URL for an identifier
    #[must_use]
    pub fn url_for(&self, identifier: &str) -> String {
        let query = self.query.as_deref().unwrap_or("");
        let query = if query.is_empty() || query.starts_with('?') {
            query.to_string()
        } else {
            format!("?{query}")
        };
        format!("{}/{identifier}{query}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelArtifactStore for HttpArtifactStore {
    async fn fetch(&self, identifier: &str) -> Result<PathBuf> {
        validate_artifact_id(identifier)?;
        let dest = self.model_dir.join(identifier);
        if let Some(dir) = dest.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                PipelineError::Artifact(format!("creating {}: {e}", dir.display()))
            })?;
        }

        let mut response = self
            .client
            .get(self.url_for(identifier))
            .send()
            .await
            .map_err(|e| PipelineError::Artifact(format!("downloading {identifier}: {e}")))?;
        if !response.status().is_success() {
            return Err(PipelineError::Artifact(format!(
                "downloading {identifier}: status {}",
                response.status()
            )));
        }

        let partial = partial_path(&dest);
        let mut file = tokio::fs::File::create(&partial).await.map_err(|e| {
            PipelineError::Artifact(format!("writing {}: {e}", partial.display()))
        })?;

        let mut bytes = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::Artifact(format!("reading {identifier}: {e}")))?
        {
            bytes += chunk.len();
            file.write_all(&chunk).await.map_err(|e| {
                PipelineError::Artifact(format!("writing {}: {e}", partial.display()))
            })?;
        }
        file.flush().await.map_err(|e| {
            PipelineError::Artifact(format!("writing {}: {e}", partial.display()))
        })?;
        drop(file);

        tokio::fs::rename(&partial, &dest).await.map_err(|e| {
            PipelineError::Artifact(format!("finalizing {}: {e}", dest.display()))
        })?;

        info!(artifact = identifier, bytes, path = %dest.display(), "Artifact downloaded");
        Ok(dest)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
