//! Wall-clock paced video playback on wgpu
//!
//! This crate decodes a video stream and presents it in real time against a
//! monotonic presentation clock. Decoded images are converted from planar YCbCr to
//! RGB on the GPU and stored in a small, fixed pool of frame slots; every repaint
//! draws the latest slot whose timestamp has been reached.
//!
//! The pipeline is driven from one thread by a fixed-interval tick:
//! - [`DecodeDriver`] keeps the ready frames just ahead of "now"
//! - [`Presenter`] draws whatever is due
//! - [`FramePool`] is the only channel between the two
//!
//! Decoding sits behind the [`VideoSource`] trait; enable the `ffmpeg` feature for
//! an FFmpeg implementation.

pub mod config;
pub mod driver;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod gpu;
pub mod pool;
pub mod presenter;
pub mod session;
pub mod source;
pub mod ticker;
pub mod timeline;

pub use config::PlayerConfig;
pub use driver::{DecodeDriver, DecodeStats, PumpReport, SlotWriter, StopReason};
pub use error::{ConfigError, ConvertError, GpuError, PresentError, SetupError, SourceError};
pub use pool::{FramePool, SlotId, SlotLease};
pub use presenter::{Presented, Presenter, SlotPresenter};
pub use session::{Playback, Session, SessionState};
pub use source::{DecodedImage, PixelData, Plane, ReadOutcome, SampleLayout, StreamDescriptor, VideoSource};
pub use ticker::Ticker;
pub use timeline::{PresentationClock, TimeBase, Timeline};
