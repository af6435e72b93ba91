//! Image resources and the image-decode capability.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A decoded image resource on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    /// Location of the raster file
    pub path: PathBuf,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageHandle {
    /// Create a handle for an already-known image.
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    /// Height divided by width.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            return 1.0;
        }
        self.height as f32 / self.width as f32
    }
}

/// Loads image files into handles.
pub trait ImageLoader {
    /// Open and decode the image at `path`.
    fn load(&self, path: &Path) -> Result<ImageHandle>;
}

/// [`ImageLoader`] backed by the `image` crate.
///
/// Only the header is decoded; pixel data is read again by the writer that
/// embeds the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageLoader;

impl ImageLoader for DefaultImageLoader {
    fn load(&self, path: &Path) -> Result<ImageHandle> {
        if !path.is_file() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        let (width, height) = image::ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(ImageHandle::new(path, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loader_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        image::RgbImage::new(4, 2).save(&path).unwrap();

        let handle = DefaultImageLoader.load(&path).unwrap();
        assert_eq!((handle.width, handle.height), (4, 2));
        assert_eq!(handle.path, path);
        assert!((handle.aspect_ratio() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_default_loader_missing_file() {
        let err = DefaultImageLoader
            .load(Path::new("/nonexistent/pixel.png"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingResource(_)));
    }

    #[test]
    fn test_default_loader_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(DefaultImageLoader.load(&path).is_err());
    }
}
