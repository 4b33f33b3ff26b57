use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::layout::{ElementId, ImageDimensions};

/// Upload lifecycle of a pool image. `Uploading` moves exactly once to
/// `Success` or `Error`; both are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Uploading,
    Success,
    Error,
}

/// An image available for placement but not (necessarily) placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolImage {
    pub id: ElementId,
    pub src: String,
    pub dimensions: ImageDimensions,
    pub caption: String,
    pub upload_status: Option<UploadStatus>,
}

impl PoolImage {
    pub fn new(src: impl Into<String>, dimensions: ImageDimensions) -> Self {
        Self {
            id: ElementId::new(),
            src: src.into(),
            dimensions,
            caption: String::new(),
            upload_status: None,
        }
    }
}

/// The image pool shown next to the layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePool {
    images: Vec<PoolImage>,
}

impl ImagePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[PoolImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&PoolImage> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn add(&mut self, image: PoolImage) -> ElementId {
        let id = image.id;
        self.images.push(image);
        id
    }

    /// Add an image that is about to be uploaded to object storage.
    pub fn add_uploading(&mut self, src: impl Into<String>, dimensions: ImageDimensions) -> ElementId {
        let mut image = PoolImage::new(src, dimensions);
        image.upload_status = Some(UploadStatus::Uploading);
        self.add(image)
    }

    pub fn remove(&mut self, id: ElementId) -> Option<PoolImage> {
        let idx = self.images.iter().position(|img| img.id == id)?;
        Some(self.images.remove(idx))
    }

    /// Apply the outcome of an upload. On success the image's source is
    /// replaced with the public URL. Only images still `Uploading` change.
    pub fn set_upload_result(&mut self, id: ElementId, result: Result<String, UploadError>) -> Result<UploadStatus, UploadError> {
        let img = self
            .images
            .iter_mut()
            .find(|img| img.id == id)
            .ok_or_else(|| UploadError::NotUploading(id.to_string()))?;
        if img.upload_status != Some(UploadStatus::Uploading) {
            return Err(UploadError::NotUploading(id.to_string()));
        }
        let status = match result {
            Ok(url) => {
                img.src = url;
                UploadStatus::Success
            }
            Err(e) => {
                log::warn!("upload of pool image {} failed: {}", id, e);
                UploadStatus::Error
            }
        };
        img.upload_status = Some(status);
        Ok(status)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

impl Extend<PoolImage> for ImagePool {
    fn extend<I: IntoIterator<Item = PoolImage>>(&mut self, iter: I) {
        self.images.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_status_is_terminal() {
        let mut pool = ImagePool::new();
        let id = pool.add_uploading("blob:local", ImageDimensions::new(10, 10));

        let status = pool.set_upload_result(id, Ok("https://cdn/x.webp".into())).unwrap();
        assert_eq!(status, UploadStatus::Success);
        assert_eq!(pool.get(id).unwrap().src, "https://cdn/x.webp");

        let again = pool.set_upload_result(id, Err(UploadError::Failed("late".into())));
        assert!(again.is_err());
        assert_eq!(pool.get(id).unwrap().upload_status, Some(UploadStatus::Success));
    }

    #[test]
    fn failed_upload_keeps_local_source() {
        let mut pool = ImagePool::new();
        let id = pool.add_uploading("blob:local", ImageDimensions::new(10, 10));
        let status = pool.set_upload_result(id, Err(UploadError::Failed("503".into()))).unwrap();
        assert_eq!(status, UploadStatus::Error);
        assert_eq!(pool.get(id).unwrap().src, "blob:local");
    }

    #[test]
    fn images_without_upload_cannot_transition() {
        let mut pool = ImagePool::new();
        let id = pool.add(PoolImage::new("a.png", ImageDimensions::new(1, 1)));
        assert!(pool.set_upload_result(id, Ok("x".into())).is_err());
        assert!(pool.remove(id).is_some());
        assert!(pool.is_empty());
    }
}
