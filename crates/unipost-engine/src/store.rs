//! Variant publication seam.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;
use unipost_media::fs_utils;
use unipost_models::Variant;

use crate::error::{EngineError, EngineResult};

/// Where finished variants become publicly reachable.
///
/// A failed store excludes the target from publishing the same way a
/// failed encode does; the orchestrator only ever sees reachable URLs.
#[async_trait]
pub trait VariantStore: Send + Sync {
    /// Persist the variant and return its public URL.
    async fn store(&self, variant: &Variant) -> EngineResult<String>;
}

/// Store that moves variants into a locally served directory.
pub struct LocalDirStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalDirStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let base = public_base_url.into();
        Self {
            dir: dir.into(),
            public_base_url: base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl VariantStore for LocalDirStore {
    async fn store(&self, variant: &Variant) -> EngineResult<String> {
        let file_name = variant.path.file_name().ok_or_else(|| {
            EngineError::store(format!(
                "variant path has no file name: {}",
                variant.path.display()
            ))
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let dest = self.dir.join(file_name);
        fs_utils::move_file(&variant.path, &dest).await?;

        let url = format!("{}/{}", self.public_base_url, file_name.to_string_lossy());
        info!(variant_id = %variant.id, url = %url, "Variant stored");
        Ok(url)
    }
}
