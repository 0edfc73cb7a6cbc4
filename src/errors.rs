// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanning pipeline

use std::fmt;

/// Result type alias using ScanError
pub type ScanResult<T> = Result<T, ScanError>;

/// Main pipeline error type
///
/// Cloneable so that it can be forwarded to consumers inside
/// [`ScannerEvent::Error`](crate::app::state::ScannerEvent::Error).
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Camera acquisition or frame access errors
    Device(DeviceError),
    /// Detection backend errors
    Backend(BackendError),
    /// Any other failure while processing a single frame
    Pipeline(String),
    /// Configuration errors (loading/saving; values themselves are clamped)
    Config(String),
    /// The drawing surface is gone; fatal to the scheduler
    Surface(String),
    /// Filesystem errors
    Io(String),
}

/// Camera device errors
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// No device matching the requested facing
    NotFound(String),
    /// Access to the device was refused
    PermissionDenied(String),
    /// Opening the device failed
    AcquisitionFailed(String),
    /// An operation needed a device but none is held
    NotAcquired,
    /// The device went away while streaming
    Disconnected,
    /// The stream could not produce a frame right now
    FrameUnavailable(String),
}

/// Detection backend errors
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend is not supported on this host
    NotAvailable(String),
    /// Backend initialization failed
    InitializationFailed(String),
    /// `detect` was called before `initialize`
    NotInitialized,
    /// A detection call failed
    DetectionFailed(String),
    /// A detection call did not finish within its frame budget
    Stalled { budget_ms: u64 },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Device(e) => write!(f, "Device error: {}", e),
            ScanError::Backend(e) => write!(f, "Detection backend error: {}", e),
            ScanError::Pipeline(msg) => write!(f, "Detection pipeline error: {}", msg),
            ScanError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ScanError::Surface(msg) => write!(f, "Overlay surface error: {}", msg),
            ScanError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound(msg) => write!(f, "No camera found: {}", msg),
            DeviceError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            DeviceError::AcquisitionFailed(msg) => write!(f, "Failed to open camera: {}", msg),
            DeviceError::NotAcquired => write!(f, "No camera acquired"),
            DeviceError::Disconnected => write!(f, "Camera disconnected"),
            DeviceError::FrameUnavailable(msg) => write!(f, "Frame unavailable: {}", msg),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::NotInitialized => write!(f, "Backend not initialized"),
            BackendError::DetectionFailed(msg) => write!(f, "Detection failed: {}", msg),
            BackendError::Stalled { budget_ms } => {
                write!(f, "Detection stalled (budget {} ms)", budget_ms)
            }
        }
    }
}

impl std::error::Error for ScanError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for BackendError {}

impl From<DeviceError> for ScanError {
    fn from(err: DeviceError) -> Self {
        ScanError::Device(err)
    }
}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        ScanError::Backend(err)
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Config(err.to_string())
    }
}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        ScanError::Io(err.to_string())
    }
}

impl ScanError {
    /// Whether the scheduler must stop rescheduling after this error
    pub fn is_scheduler_fatal(&self) -> bool {
        matches!(self, ScanError::Surface(_))
    }
}
