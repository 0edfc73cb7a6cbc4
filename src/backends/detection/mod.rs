// SPDX-License-Identifier: GPL-3.0-only

//! Detection backend abstraction
//!
//! Two engines sit behind the same [`DetectionBackend`] interface: the
//! host's native barcode detector (preferred, fast) and a software fallback
//! decoder. [`DetectionEngineSelector`] owns both and decides which one runs.

pub mod selector;

pub use selector::{DetectionEngineSelector, EngineState};

use crate::app::frame_processor::types::DetectedCode;
use crate::backends::camera::CameraFrame;
use crate::errors::BackendError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Identity of a detection engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Host-provided detector
    Native,
    /// Software decoder, the terminal engine
    Fallback,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Native => write!(f, "native"),
            EngineKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Capability interface of a detection engine
///
/// `detect` is called at most once per processed frame and is awaited by
/// the scheduler; implementations doing heavy work should move it off the
/// async runtime.
pub trait DetectionBackend: Send {
    /// Backend identifier for logs
    fn name(&self) -> &'static str;

    /// Host capability flag; `false` means the backend can never be used here
    fn is_available(&self) -> bool {
        true
    }

    /// Prepare the backend; failure marks it unavailable for this session
    fn initialize(&mut self) -> BoxFuture<'_, BackendResult<()>>;

    /// Detect codes in a frame (or ROI crop)
    ///
    /// Corner coordinates are relative to the frame that was passed in.
    fn detect(&mut self, frame: Arc<CameraFrame>) -> BoxFuture<'_, BackendResult<Vec<DetectedCode>>>;

    /// Release backend resources
    fn dispose(&mut self);
}
