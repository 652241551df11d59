//! Error types for bubblegrab.

use thiserror::Error;

/// Result alias for bubblegrab operations.
pub type GrabResult<T> = std::result::Result<T, GrabError>;

/// Errors that can occur while capturing, matching or acting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GrabError {
    /// No window whose name starts with the requested prefix exists.
    #[error("no window found ({name})")]
    WindowNotFound { name: String },
    /// The display server connection could not be established or used.
    #[error("display unavailable: {reason}")]
    DisplayUnavailable { reason: String },
    /// The shared-memory capture extension is missing on the host.
    #[error("capture extension unavailable: {reason}")]
    CaptureUnavailable { reason: String },
    /// Allocating or attaching the shared capture buffer failed.
    #[error("shared memory allocation failed: {reason}")]
    SharedMemory { reason: String },
    /// A frame refresh failed after a successful initialization.
    #[error("capture failed: {reason}")]
    Capture { reason: String },
    /// The pointer collaborator rejected a request.
    #[error("pointer input failed: {reason}")]
    Input { reason: String },
    /// Writing an action report or debug frame failed.
    #[error("output failed: {reason}")]
    Output { reason: String },
    /// A template image could not be read or decoded.
    #[error("failed to load template {path}: {reason}")]
    TemplateLoad { path: String, reason: String },
    /// The template does not fit inside the frame.
    #[error(
        "template {templ_width}x{templ_height} exceeds frame {frame_width}x{frame_height}"
    )]
    TemplateTooLarge {
        templ_width: usize,
        templ_height: usize,
        frame_width: usize,
        frame_height: usize,
    },
    /// Frame and template were converted with different channel counts.
    #[error("channel mismatch: frame has {frame}, template has {templ}")]
    ChannelMismatch { frame: usize, templ: usize },
    /// Width or height is zero or overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The backing buffer is smaller than the described image.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The stride is smaller than one row of pixels.
    #[error("invalid stride: width {width}, stride {stride}")]
    InvalidStride { width: usize, stride: usize },
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

impl GrabError {
    /// Returns true when the failure must abort the process.
    ///
    /// Degenerate matches are reported through `MatchResult`, never here.
    pub fn is_fatal(&self) -> bool {
        match self {
            GrabError::WindowNotFound { .. }
            | GrabError::DisplayUnavailable { .. }
            | GrabError::CaptureUnavailable { .. }
            | GrabError::SharedMemory { .. }
            | GrabError::Capture { .. }
            | GrabError::Input { .. }
            | GrabError::Output { .. }
            | GrabError::TemplateLoad { .. }
            | GrabError::TemplateTooLarge { .. }
            | GrabError::ChannelMismatch { .. }
            | GrabError::InvalidDimensions { .. }
            | GrabError::BufferTooSmall { .. }
            | GrabError::InvalidStride { .. }
            | GrabError::InvalidConfig(_) => true,
        }
    }
}
