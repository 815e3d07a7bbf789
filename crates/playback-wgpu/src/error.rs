//! Error types for stream setup, decoding, conversion, presentation and GPU bring-up
//!
//! The split mirrors how each failure is handled: setup errors make a session inert,
//! source/convert/present errors only end the current tick, and GPU errors abort
//! initialization.

use std::path::PathBuf;

/// Fatal errors raised while opening a stream
///
/// Any of these leaves the session inert: it stays constructed, reports the error
/// once, and never decodes or presents.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The container could not be opened or probed
    #[error("failed to open {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// The container holds no video stream
    #[error("no video stream found in {}", path.display())]
    NoVideoStream { path: PathBuf },

    /// No decoder is available for the selected stream's codec
    #[error("no decoder available for codec {codec}")]
    DecoderNotFound { codec: String },

    /// Stream parameters could not be copied into a decoder context
    #[error("failed to copy stream parameters into the decoder context: {0}")]
    ContextCopy(String),

    /// The decoder refused to open
    #[error("failed to open decoder: {0}")]
    DecoderOpen(String),

    /// The decoder emits a pixel layout the conversion stage does not handle
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// The stream's time base cannot be turned into milliseconds
    #[error("invalid stream time base {num}/{den}")]
    InvalidTimeBase { num: i32, den: i32 },
}

/// Transient errors reported by a [`VideoSource`](crate::VideoSource)
///
/// The decode driver ends the current step on these and retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read packet: {0}")]
    Read(String),

    #[error("decoder rejected packet: {0}")]
    Send(String),
}

/// Errors raised while writing a decoded image into a frame slot
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    #[error("decoded image is {actual:?}, expected {expected:?}")]
    DimensionMismatch { expected: (u32, u32), actual: (u32, u32) },

    #[error("plane {plane} holds {actual} bytes, needs at least {needed}")]
    PlaneTooShort { plane: usize, needed: usize, actual: usize },
}

/// Errors raised while drawing a slot to the display surface
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Unrecoverable errors during one-time GPU initialization
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    /// A frame slot's render target never reached a valid state
    #[error("render target for slot {slot} is incomplete: {message}")]
    IncompleteRenderTarget { slot: usize, message: String },

    /// The conversion texture bank could not be created
    #[error("conversion textures are incomplete: {0}")]
    IncompleteTextureBank(String),
}

/// Invalid player configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least {minimum} frame slots are required, got {requested}")]
    TooFewSlots { requested: usize, minimum: usize },

    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
}
