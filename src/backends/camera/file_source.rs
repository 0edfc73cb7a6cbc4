// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera over still image files
//!
//! Plays a list of images as if they were consecutive camera frames,
//! looping at the end. Useful for running the scanner without hardware.

use super::types::CameraFrame;
use super::{CameraFacing, CameraProvider, CameraStream};
use crate::constants::file_formats;
use crate::errors::DeviceError;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<CameraFrame, DeviceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(DeviceError::AcquisitionFailed(format!(
            "Unsupported file format: {}",
            path.display()
        )));
    }

    let img = image::open(path).map_err(|e| {
        DeviceError::AcquisitionFailed(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path.display(), width, height, "Image loaded");

    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Provides [`ImageSequenceStream`]s over preloaded frames
pub struct ImageSequenceProvider {
    back: Vec<Arc<CameraFrame>>,
    front: Vec<Arc<CameraFrame>>,
    acquisitions: u64,
}

impl ImageSequenceProvider {
    /// Use the same frames for both cameras
    pub fn new(frames: Vec<CameraFrame>) -> Self {
        Self {
            back: frames.into_iter().map(Arc::new).collect(),
            front: Vec::new(),
            acquisitions: 0,
        }
    }

    /// Load image files for the back camera
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, DeviceError> {
        let frames = paths
            .iter()
            .map(|path| load_image_as_frame(path))
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = frames.len(), "Loaded virtual camera frames");
        Ok(Self::new(frames))
    }

    /// Give the front camera its own frames
    pub fn with_front_frames(mut self, frames: Vec<CameraFrame>) -> Self {
        self.front = frames.into_iter().map(Arc::new).collect();
        self
    }

    /// How many devices have been handed out
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }

    fn frames_for(&self, facing: CameraFacing) -> &[Arc<CameraFrame>] {
        match facing {
            CameraFacing::Front if !self.front.is_empty() => &self.front,
            _ => &self.back,
        }
    }
}

impl CameraProvider for ImageSequenceProvider {
    fn acquire(
        &mut self,
        facing: CameraFacing,
    ) -> BoxFuture<'_, Result<Box<dyn CameraStream>, DeviceError>> {
        let frames = self.frames_for(facing).to_vec();
        Box::pin(async move {
            if frames.is_empty() {
                return Err(DeviceError::NotFound(format!("no {} frames", facing)));
            }
            self.acquisitions += 1;
            info!(%facing, frames = frames.len(), "Virtual camera acquired");
            Ok(Box::new(ImageSequenceStream {
                frames,
                position: 0,
                paused: false,
                facing,
            }) as Box<dyn CameraStream>)
        })
    }
}

/// A looping stream over still frames
pub struct ImageSequenceStream {
    frames: Vec<Arc<CameraFrame>>,
    position: usize,
    paused: bool,
    facing: CameraFacing,
}

impl CameraStream for ImageSequenceStream {
    fn dimensions(&self) -> (u32, u32) {
        let frame = &self.frames[self.position % self.frames.len()];
        (frame.width, frame.height)
    }

    fn snapshot(&mut self) -> Result<Arc<CameraFrame>, DeviceError> {
        let index = self.position % self.frames.len();
        let frame = &self.frames[index];
        // A paused stream keeps showing the same frame
        if !self.paused {
            self.position = (self.position + 1) % self.frames.len();
        }
        Ok(Arc::new(CameraFrame {
            captured_at: Instant::now(),
            ..(**frame).clone()
        }))
    }

    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn release(self: Box<Self>) {
        debug!(facing = %self.facing, "Virtual camera released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame::from_gray(width, height, vec![0; (width * height) as usize])
    }

    #[tokio::test]
    async fn test_stream_loops_over_frames() {
        let mut provider = ImageSequenceProvider::new(vec![frame(4, 2), frame(8, 6)]);
        let mut stream = provider.acquire(CameraFacing::Back).await.unwrap();

        assert_eq!(stream.dimensions(), (4, 2));
        assert_eq!(stream.snapshot().unwrap().width, 4);
        assert_eq!(stream.snapshot().unwrap().width, 8);
        assert_eq!(stream.snapshot().unwrap().width, 4);
        assert_eq!(provider.acquisitions(), 1);
    }

    #[tokio::test]
    async fn test_paused_stream_repeats_frame() {
        let mut provider = ImageSequenceProvider::new(vec![frame(4, 2), frame(8, 6)]);
        let mut stream = provider.acquire(CameraFacing::Back).await.unwrap();
        stream.pause();
        assert_eq!(stream.snapshot().unwrap().width, 4);
        assert_eq!(stream.snapshot().unwrap().width, 4);
        stream.resume();
        stream.snapshot().unwrap();
        assert_eq!(stream.snapshot().unwrap().width, 8);
    }

    #[tokio::test]
    async fn test_front_falls_back_to_shared_frames() {
        let mut provider = ImageSequenceProvider::new(vec![frame(4, 2)]);
        let stream = provider.acquire(CameraFacing::Front).await.unwrap();
        assert_eq!(stream.facing(), CameraFacing::Front);
        assert!(!stream.supports_torch());
    }

    #[tokio::test]
    async fn test_empty_provider_is_a_device_error() {
        let mut provider = ImageSequenceProvider::new(Vec::new());
        assert!(matches!(
            provider.acquire(CameraFacing::Back).await,
            Err(DeviceError::NotFound(_))
        ));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = load_image_as_frame(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, DeviceError::AcquisitionFailed(_)));
    }
}
