// ============================================================================
// IMAGE PROBING: can this source be decoded, and how large is it?
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::layout::ImageDimensions;

/// Reachability check for image sources. Implementations must be callable
/// from rayon worker threads.
pub trait ImageProbe: Send + Sync {
    /// Natural dimensions of the image at `src`, or `None` if it cannot be
    /// loaded.
    fn probe(&self, src: &str) -> Option<ImageDimensions>;

    fn is_reachable(&self, src: &str) -> bool {
        self.probe(src).is_some()
    }
}

/// Probes local files with the `image` crate. Accepts plain paths (relative
/// ones are resolved against `base_dir`) and `file://` URLs. Remote URLs,
/// `data:` and `blob:` sources are reported unreachable.
#[derive(Debug, Clone, Default)]
pub struct FsImageProbe {
    base_dir: Option<PathBuf>,
}

impl FsImageProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative sources against `dir` (usually the document's folder).
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, src: &str) -> Option<PathBuf> {
        let src = src.trim();
        if src.is_empty() {
            return None;
        }
        let raw = if let Some(rest) = src.strip_prefix("file://") {
            rest
        } else if src.contains("://") || src.starts_with("data:") || src.starts_with("blob:") {
            return None;
        } else {
            src
        };
        let path = Path::new(raw);
        match &self.base_dir {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path.to_path_buf()),
        }
    }
}

impl ImageProbe for FsImageProbe {
    fn probe(&self, src: &str) -> Option<ImageDimensions> {
        let path = self.resolve(src)?;
        match image::image_dimensions(&path) {
            Ok((width, height)) => Some(ImageDimensions::new(width, height)),
            Err(e) => {
                log::debug!("image probe failed for {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Fixed answers keyed by source string. Unknown sources are unreachable.
/// Handy for hosts that already know their images, and for tests.
#[derive(Debug, Clone, Default)]
pub struct KnownImages {
    known: HashMap<String, ImageDimensions>,
}

impl KnownImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, src: impl Into<String>, width: u32, height: u32) -> Self {
        self.insert(src, ImageDimensions::new(width, height));
        self
    }

    pub fn insert(&mut self, src: impl Into<String>, dimensions: ImageDimensions) {
        self.known.insert(src.into(), dimensions);
    }
}

impl ImageProbe for KnownImages {
    fn probe(&self, src: &str) -> Option<ImageDimensions> {
        self.known.get(src).copied()
    }
}
