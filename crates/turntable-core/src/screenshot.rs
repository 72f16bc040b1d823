//! Screenshot store - ordered log of captured images
//!
//! Image bytes live in a `BlobStore` under `image_<id>` keys; the log only
//! keeps the metadata needed to find and label them.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::position::Position;
use crate::store::{BlobStore, StoreError};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Invalid image data for key {0}")]
    InvalidImageData(String),
}

/// True if the bytes start with the PNG signature
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub id: String,
    pub model_name: String,
    pub image_key: String,
    pub position: Position,
}

/// One file of an export: `{model}/{position}.png`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Directory/archive stem for an export made at `now`
pub fn archive_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}-model-screenshots", now.format("%m-%d-%Y-%H-%M"))
}

fn path_segment(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Append-only log of screenshots, in capture order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotLog {
    #[serde(default)]
    screenshots: Vec<Screenshot>,
}

impl ScreenshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store image bytes under a fresh key and append an entry
    pub fn add_screenshot(
        &mut self,
        model_name: &str,
        position: Position,
        bytes: Vec<u8>,
        images: &mut dyn BlobStore,
    ) -> Result<&Screenshot, ScreenshotError> {
        let id = Uuid::new_v4().simple().to_string();
        let image_key = format!("image_{}", id);
        images.put(&image_key, bytes)?;

        debug!(id = %id, model = model_name, position = %position.name, "Recorded screenshot");
        self.screenshots.push(Screenshot {
            id,
            model_name: model_name.to_string(),
            image_key,
            position,
        });
        Ok(&self.screenshots[self.screenshots.len() - 1])
    }

    pub fn screenshots(&self) -> &[Screenshot] {
        &self.screenshots
    }

    pub fn get(&self, id: &str) -> Option<&Screenshot> {
        self.screenshots.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.screenshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screenshots.is_empty()
    }

    /// Delete one entry and its image. Returns false if the id is unknown.
    pub fn delete(&mut self, id: &str, images: &mut dyn BlobStore) -> Result<bool, ScreenshotError> {
        let Some(index) = self.screenshots.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        images.remove(&self.screenshots[index].image_key)?;
        self.screenshots.remove(index);
        debug!(id, "Deleted screenshot");
        Ok(true)
    }

    /// Remove every entry and its image. If an image can't be removed, it
    /// and every later entry stay in the log.
    pub fn clear(&mut self, images: &mut dyn BlobStore) -> Result<(), ScreenshotError> {
        let mut removed = 0;
        let result = self.screenshots.iter().try_for_each(|s| {
            images.remove(&s.image_key)?;
            removed += 1;
            Ok::<_, StoreError>(())
        });
        self.screenshots.drain(..removed);
        result?;
        info!("Cleared screenshots");
        Ok(())
    }

    /// Fetch the PNG bytes for an image key
    pub fn image_data(
        &self,
        image_key: &str,
        images: &dyn BlobStore,
    ) -> Result<Vec<u8>, ScreenshotError> {
        match images.get(image_key)? {
            Some(bytes) if is_png(&bytes) => Ok(bytes),
            _ => Err(ScreenshotError::InvalidImageData(image_key.to_string())),
        }
    }

    /// Resolve every screenshot into its export path and bytes, in log order
    pub fn export_entries(&self, images: &dyn BlobStore) -> Result<Vec<ExportEntry>, ScreenshotError> {
        self.screenshots
            .iter()
            .map(|s| {
                Ok(ExportEntry {
                    path: format!(
                        "{}/{}.png",
                        path_segment(&s.model_name),
                        path_segment(&s.position.name)
                    ),
                    bytes: self.image_data(&s.image_key, images)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBlobStore, StickyBlobStore};
    use chrono::Utc;

    fn png(tag: u8) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.push(tag);
        bytes
    }

    #[test]
    fn test_add_and_keys() {
        let mut images = MemoryBlobStore::new();
        let mut log = ScreenshotLog::new();

        let shot = log
            .add_screenshot("teapot", Position::new("front", [0.0, 0.0, 5.0]), png(1), &mut images)
            .unwrap()
            .clone();

        assert!(shot.image_key.starts_with("image_"));
        assert!(images.contains(&shot.image_key));
        assert_eq!(log.image_data(&shot.image_key, &images).unwrap(), png(1));
    }

    #[test]
    fn test_invalid_image_data() {
        let mut images = MemoryBlobStore::new();
        let log = ScreenshotLog::new();
        images.put("image_text", b"not an image".to_vec()).unwrap();

        assert!(matches!(
            log.image_data("image_text", &images),
            Err(ScreenshotError::InvalidImageData(_))
        ));
        assert!(matches!(
            log.image_data("image_missing", &images),
            Err(ScreenshotError::InvalidImageData(_))
        ));
    }

    #[test]
    fn test_delete_and_clear_remove_images() {
        let mut images = MemoryBlobStore::new();
        let mut log = ScreenshotLog::new();
        for name in ["front", "back", "left"] {
            log.add_screenshot("a", Position::new(name, [0.0; 3]), png(0), &mut images)
                .unwrap();
        }

        let id = log.screenshots()[1].id.clone();
        assert!(log.delete(&id, &mut images).unwrap());
        assert!(!log.delete(&id, &mut images).unwrap());
        assert_eq!(log.len(), 2);
        assert_eq!(images.len(), 2);
        assert_eq!(log.screenshots()[1].position.name, "left");

        log.clear(&mut images).unwrap();
        assert!(log.is_empty());
        assert!(images.is_empty());
    }

    #[test]
    fn test_export_layout() {
        let mut images = MemoryBlobStore::new();
        let mut log = ScreenshotLog::new();
        log.add_screenshot("ship", Position::new("top", [0.0; 3]), png(7), &mut images)
            .unwrap();
        log.add_screenshot("parts/gear", Position::new("front", [0.0; 3]), png(8), &mut images)
            .unwrap();

        let entries = log.export_entries(&images).unwrap();
        assert_eq!(entries[0].path, "ship/top.png");
        assert_eq!(entries[0].bytes, png(7));
        assert_eq!(entries[1].path, "parts_gear/front.png");
    }

    #[test]
    fn test_archive_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(archive_name(&now), "03-07-2024-09-05-model-screenshots");
    }

    #[test]
    fn test_failed_image_removal_keeps_entries() {
        let mut images = StickyBlobStore {
            inner: MemoryBlobStore::new(),
            sticky_key: String::new(),
        };
        let mut log = ScreenshotLog::new();
        for name in ["front", "back", "left"] {
            log.add_screenshot("a", Position::new(name, [0.0; 3]), png(0), &mut images)
                .unwrap();
        }
        let back = log.screenshots()[1].clone();
        images.sticky_key = back.image_key.clone();

        assert!(log.delete(&back.id, &mut images).is_err());
        assert_eq!(log.len(), 3);

        // Entries up to the failing image are cleared, the rest stay
        assert!(log.clear(&mut images).is_err());
        assert_eq!(log.len(), 2);
        assert_eq!(log.screenshots()[0].id, back.id);
        assert_eq!(images.inner.len(), 2);
        assert!(images.contains(&log.screenshots()[1].image_key));
    }
}
