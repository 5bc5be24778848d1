//! Model manager with auto-download functionality

use crate::config::ModelConfig;
use crate::error::VisionError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB max
const MIN_MODEL_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// Locates detection weights on disk, fetching them when they are missing
pub struct ModelManager {
    config: Arc<ModelConfig>,
}

impl ModelManager {
    pub fn new(config: Arc<ModelConfig>) -> Self {
        Self { config }
    }

    /// Return a path to usable weights, downloading them first if the
    /// configured file is absent and a URL is known
    pub async fn resolve(&self) -> Result<PathBuf, VisionError> {
        let path = &self.config.path;
        if path.is_file() {
            info!("Using model weights at {:?}", path);
            return Ok(path.clone());
        }

        match &self.config.url {
            Some(url) => {
                warn!("Model weights not found at {:?}, downloading", path);
                self.download(url, path, self.config.sha256.as_deref()).await
            }
            None => Err(VisionError::Model(format!(
                "Model weights not found at {:?} and no download URL configured",
                path
            ))),
        }
    }

    /// Ensure the parent directory of `path` exists
    pub async fn ensure_model_dir(path: &Path) -> Result<(), VisionError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).await?;
                info!("Created model directory: {:?}", dir);
            }
        }
        Ok(())
    }

    /// Download weights from `url` into `path`
    pub async fn download(&self, url: &str, path: &Path, checksum: Option<&str>) -> Result<PathBuf, VisionError> {
        validate_file_name(path)?;
        validate_url(url)?;
        Self::ensure_model_dir(path).await?;

        info!("Downloading model from {}", url);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        let mut response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Model(format!("Failed to download model: HTTP {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            ensure_within_cap(content_length)?;
        }

        // Content-Length is optional, so the cap is enforced while streaming
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            ensure_within_cap((bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }

        store_download(path, &bytes, checksum).await?;
        info!("Model saved to {:?}", path);
        Ok(path.to_path_buf())
    }
}

fn ensure_within_cap(received: u64) -> Result<(), VisionError> {
    if received > MAX_MODEL_SIZE as u64 {
        return Err(VisionError::Model(format!(
            "Model too large: {} bytes (max {} bytes)",
            received, MAX_MODEL_SIZE
        )));
    }
    Ok(())
}

/// Check a fully received download and move it into place
async fn store_download(path: &Path, bytes: &[u8], checksum: Option<&str>) -> Result<(), VisionError> {
    ensure_within_cap(bytes.len() as u64)?;
    if bytes.len() < MIN_MODEL_SIZE {
        return Err(VisionError::Model("Downloaded file too small, likely corrupted".to_string()));
    }

    match checksum {
        Some(expected) => {
            verify_checksum(bytes, expected)?;
            info!("Verified checksum for {:?}", path);
        }
        None => info!("Downloaded {} bytes (checksum verification skipped)", bytes.len()),
    }

    write_atomic(path, bytes).await
}

fn validate_file_name(path: &Path) -> Result<(), VisionError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| VisionError::Model("Invalid model name".to_string()))?;

    if name.is_empty() || name.len() > 255 {
        return Err(VisionError::Model("Invalid model name".to_string()));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(VisionError::Model("Model name contains invalid characters".to_string()));
    }
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(VisionError::Model("Path traversal detected".to_string()));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), VisionError> {
    if url.is_empty() || url.len() > 2048 {
        return Err(VisionError::Model("Invalid URL".to_string()));
    }
    if !url.starts_with("https://") {
        return Err(VisionError::Model("Only HTTPS URLs are allowed for model downloads".to_string()));
    }
    Ok(())
}

/// Compare the SHA-256 of `bytes` against a hex digest (case-insensitive)
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), VisionError> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let computed = hex::encode(hasher.finalize());

    if !computed.eq_ignore_ascii_case(expected) {
        return Err(VisionError::Model(format!(
            "Checksum mismatch: expected {}, got {}",
            expected, computed
        )));
    }
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), VisionError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    // sha256("abc")
    const ABC_DIGEST: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn manager_for(path: PathBuf, url: Option<&str>) -> ModelManager {
        let config = ModelConfig {
            path,
            url: url.map(str::to_string),
            ..ModelConfig::default()
        };
        ModelManager::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_resolve_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");
        std_fs::write(&path, b"weights").unwrap();

        let manager = manager_for(path.clone(), None);
        assert_eq!(manager.resolve().await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_resolve_missing_without_url() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_for(temp_dir.path().join("missing.onnx"), None);
        assert!(matches!(manager.resolve().await, Err(VisionError::Model(_))));
    }

    #[tokio::test]
    async fn test_download_rejects_insecure_urls() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");
        let manager = manager_for(path.clone(), None);

        for url in ["", "http://example.com/model.onnx", "ftp://example.com/model.onnx"] {
            let result = manager.download(url, &path, None).await;
            assert!(matches!(result, Err(VisionError::Model(_))), "accepted {:?}", url);
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("..").join("evil.onnx");
        let manager = manager_for(path.clone(), None);

        let result = manager.download("https://example.com/model.onnx", &path, None).await;
        assert!(matches!(result, Err(VisionError::Model(_))));
    }

    #[tokio::test]
    async fn test_ensure_model_dir_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("best.onnx");
        assert!(ModelManager::ensure_model_dir(&path).await.is_ok());
        assert!(path.parent().unwrap().is_dir());
        assert!(ModelManager::ensure_model_dir(&path).await.is_ok());
    }

    #[test]
    fn test_verify_checksum() {
        assert!(verify_checksum(b"abc", ABC_DIGEST).is_ok());
        assert!(verify_checksum(b"abc", &ABC_DIGEST.to_uppercase()).is_ok());
        assert!(verify_checksum(b"abd", ABC_DIGEST).is_err());
    }

    #[test]
    fn test_size_cap() {
        assert!(ensure_within_cap(0).is_ok());
        assert!(ensure_within_cap(MAX_MODEL_SIZE as u64).is_ok());
        assert!(matches!(
            ensure_within_cap(MAX_MODEL_SIZE as u64 + 1),
            Err(VisionError::Model(_))
        ));
    }

    #[tokio::test]
    async fn test_store_rejects_small_download() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");

        let result = store_download(&path, &[0u8; MIN_MODEL_SIZE - 1], None).await;
        assert!(matches!(result, Err(VisionError::Model(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_store_checksum_mismatch_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");

        let result = store_download(&path, &[7u8; 2048], Some(ABC_DIGEST)).await;
        assert!(matches!(result, Err(VisionError::Model(_))));
        assert!(!path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_store_writes_verified_download() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");
        let bytes = vec![3u8; MIN_MODEL_SIZE];

        let digest = hex::encode(Sha256::digest(&bytes));
        store_download(&path, &bytes, Some(&digest)).await.unwrap();
        assert_eq!(std_fs::read(&path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");
        write_atomic(&path, b"weights").await.unwrap();
        assert_eq!(std_fs::read(&path).unwrap(), b"weights");
        assert!(!path.with_extension("tmp").exists());
    }
}
