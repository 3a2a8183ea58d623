use crate::error::ExtractError;
use anyhow::Context;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Read-only store of templates and master-data documents, addressed by logical
/// paths such as `templates/skill_tab.png`.
pub trait ResourceStore: Send + Sync {
    fn open(&self, logical_path: &str) -> Result<Vec<u8>, ExtractError>;

    fn open_image(&self, logical_path: &str) -> Result<DynamicImage, ExtractError> {
        let bytes = self.open(logical_path)?;
        image::load_from_memory(&bytes)
            .with_context(|| format!("decoding {}", logical_path))
            .map_err(|e| ExtractError::resource(logical_path, e))
    }
}

/// Resources under a directory on local disk.
pub struct LocalResourceStore {
    root: PathBuf,
}

impl LocalResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceStore for LocalResourceStore {
    fn open(&self, logical_path: &str) -> Result<Vec<u8>, ExtractError> {
        let path = self.root.join(logical_path);
        debug!("loading resource {}", path.display());
        std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .map_err(|e| ExtractError::resource(logical_path, e))
    }
}

/// Resources held in memory.
#[derive(Default)]
pub struct MemoryResourceStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, logical_path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(logical_path.into(), bytes);
    }

    /// Store `image` PNG-encoded.
    pub fn insert_image(
        &mut self,
        logical_path: impl Into<String>,
        image: &DynamicImage,
    ) -> anyhow::Result<()> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .context("encoding PNG")?;
        self.insert(logical_path, bytes);
        Ok(())
    }
}

impl ResourceStore for MemoryResourceStore {
    fn open(&self, logical_path: &str) -> Result<Vec<u8>, ExtractError> {
        self.files.get(logical_path).cloned().ok_or_else(|| {
            ExtractError::resource(
                logical_path,
                anyhow::anyhow!("no such resource: {}", logical_path),
            )
        })
    }
}

/// Side channel for intermediate crops. Never affects returned data.
pub trait DebugSink: Send + Sync {
    /// Lets callers skip building images nobody will look at.
    fn is_enabled(&self) -> bool {
        true
    }

    fn save_image(&self, image: &DynamicImage, logical_path: &str);
}

pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn is_enabled(&self) -> bool {
        false
    }

    fn save_image(&self, _image: &DynamicImage, _logical_path: &str) {}
}

/// Writes every image under a directory, creating subdirectories as needed.
pub struct DirDebugSink {
    root: PathBuf,
}

impl DirDebugSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DebugSink for DirDebugSink {
    fn save_image(&self, image: &DynamicImage, logical_path: &str) {
        let path = self.root.join(logical_path);
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = image.save(&path) {
            warn!("Failed to save debug image {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_memory_store_round_trips_image() {
        let mut store = MemoryResourceStore::new();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));
        store.insert_image("templates/x.png", &img).unwrap();
        let back = store.open_image("templates/x.png").unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_missing_resource_is_resource_load() {
        let store = MemoryResourceStore::new();
        let err = store.open("master_data/skills.json").unwrap_err();
        assert!(matches!(err, ExtractError::ResourceLoad { ref path, .. } if path == "master_data/skills.json"));
    }

    #[test]
    fn test_undecodable_image_is_resource_load() {
        let mut store = MemoryResourceStore::new();
        store.insert("templates/bad.png", b"not a png".to_vec());
        assert!(matches!(
            store.open_image("templates/bad.png"),
            Err(ExtractError::ResourceLoad { .. })
        ));
    }

    #[test]
    fn test_local_store_missing_file() {
        let store = LocalResourceStore::new("/nonexistent-root");
        assert!(store.open("templates/skill_tab.png").is_err());
    }
}
