use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use bazaar_types::error::{MarketError, MarketResult};

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// 10 MB upload limit for product images
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Product images on disk, stored as `{sha256}.{ext}` in one flat directory.
///
/// Keys depend only on the content, so identical uploads share a file and
/// user-supplied filenames never reach the filesystem.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store an uploaded image. Returns its storage key.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> MarketResult<String> {
        let ext = allowed_extension(file_name).ok_or_else(|| {
            MarketError::InvalidInput(format!(
                "images must be one of: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        if bytes.is_empty() {
            return Err(MarketError::InvalidInput("the image file is empty".into()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(MarketError::InvalidInput(format!(
                "images are limited to {} MB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        let key = storage_key(bytes, ext);
        let path = self.dir.join(&key);

        if fs::try_exists(&path).await.map_err(anyhow::Error::from)? {
            debug!("Image {} already stored", key);
            return Ok(key);
        }

        // Write under a temporary name first so a reader never sees a partial file
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, bytes).await.map_err(anyhow::Error::from)?;
        fs::rename(&tmp, &path).await.map_err(anyhow::Error::from)?;

        info!("Stored image {} ({} bytes)", key, bytes.len());
        Ok(key)
    }
}

/// The whitelisted, lowercased extension of `file_name`, if it has one.
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext)
}

pub fn storage_key(bytes: &[u8], ext: &str) -> String {
    format!("{}.{}", hex::encode(Sha256::digest(bytes)), ext)
}
