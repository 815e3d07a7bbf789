//! The demuxer/decoder boundary
//!
//! Playback treats demuxing and decoding as a black box behind [`VideoSource`]: it
//! opens a container, hands out compressed packets, accepts them back for decoding and
//! emits decoded images. Any decoding library can sit behind the trait; the crate ships
//! an FFmpeg implementation behind the `ffmpeg` feature.

use crate::{
    error::{ConvertError, SetupError, SourceError},
    timeline::{TimeBase, Timeline},
};
use std::path::Path;

/// How decoded samples are laid out in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    /// Separate 8-bit Y, U and V planes; chroma is subsampled by `1 << shift` per axis
    Planar { chroma_shift: (u8, u8) },
    /// A single plane of interleaved 8-bit RGBA
    Rgba,
}

impl SampleLayout {
    /// Planar 4:2:0, the common case for compressed video
    pub const YUV420: Self = Self::Planar { chroma_shift: (1, 1) };
    pub const YUV422: Self = Self::Planar { chroma_shift: (1, 0) };
    pub const YUV444: Self = Self::Planar { chroma_shift: (0, 0) };

    pub fn name(&self) -> &'static str {
        match self {
            Self::Planar { chroma_shift: (1, 1) } => "yuv420p",
            Self::Planar { chroma_shift: (1, 0) } => "yuv422p",
            Self::Planar { chroma_shift: (0, 0) } => "yuv444p",
            Self::Planar { .. } => "planar yuv",
            Self::Rgba => "rgba",
        }
    }
}

/// Immutable properties of the selected video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub width: u32,
    pub height: u32,
    pub layout: SampleLayout,
    pub time_base: TimeBase,
}

impl StreamDescriptor {
    /// Size of each chroma plane, `None` for interleaved layouts
    pub fn chroma_size(&self) -> Option<(u32, u32)> {
        match self.layout {
            SampleLayout::Planar { chroma_shift: (shift_x, shift_y) } => Some((self.width.div_ceil(1 << shift_x), self.height.div_ceil(1 << shift_y))),
            SampleLayout::Rgba => None,
        }
    }

    /// Builds the timestamp converter for this stream
    pub fn timeline(&self) -> Result<Timeline, SetupError> {
        Timeline::new(self.time_base)
    }
}

/// One plane of decoded samples, borrowed from the decoder
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of consecutive rows
    pub stride: usize,
}

impl Plane<'_> {
    /// Verifies the plane can supply `rows` rows of `row_bytes` bytes
    fn check(&self, index: usize, row_bytes: usize, rows: usize) -> Result<(), ConvertError> {
        let too_short = |needed: usize| ConvertError::PlaneTooShort {
            plane: index,
            needed,
            actual: self.data.len(),
        };

        let needed = match rows.checked_sub(1) {
            None => 0,
            Some(last_row) => self
                .stride
                .checked_mul(last_row)
                .and_then(|offset| offset.checked_add(row_bytes))
                .ok_or_else(|| too_short(usize::MAX))?,
        };

        if self.stride < row_bytes || self.data.len() < needed {
            return Err(too_short(needed.max(row_bytes.saturating_mul(rows))));
        }

        Ok(())
    }
}

/// Pixel payload of a decoded image
#[derive(Debug, Clone)]
pub enum PixelData<'a> {
    Planar { y: Plane<'a>, u: Plane<'a>, v: Plane<'a> },
    Rgba(Plane<'a>),
    /// A layout the conversion stage has no path for, named for diagnostics
    Unsupported(String),
}

/// A decoded image, valid until the next call into its source
#[derive(Debug, Clone)]
pub struct DecodedImage<'a> {
    /// Native timestamp, if the decoder produced one
    pub pts: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub pixels: PixelData<'a>,
}

impl DecodedImage<'_> {
    /// Checks that the image matches the stream it was opened with
    ///
    /// # Errors
    /// Fails when the layout or size differs from `descriptor`, or when a plane is too
    /// short for its declared stride.
    pub fn validate(&self, descriptor: &StreamDescriptor) -> Result<(), ConvertError> {
        if (self.width, self.height) != (descriptor.width, descriptor.height) {
            return Err(ConvertError::DimensionMismatch {
                expected: (descriptor.width, descriptor.height),
                actual: (self.width, self.height),
            });
        }

        let width = self.width as usize;
        let height = self.height as usize;

        match (&self.pixels, descriptor.chroma_size()) {
            (PixelData::Planar { y, u, v }, Some((chroma_width, chroma_height))) => {
                y.check(0, width, height)?;
                u.check(1, chroma_width as usize, chroma_height as usize)?;
                v.check(2, chroma_width as usize, chroma_height as usize)
            }
            (PixelData::Rgba(plane), None) => plane.check(0, width * 4, height),
            (PixelData::Unsupported(name), _) => Err(ConvertError::UnsupportedLayout(name.clone())),
            (PixelData::Planar { .. }, None) => Err(ConvertError::UnsupportedLayout("planar yuv in an rgba stream".to_string())),
            (PixelData::Rgba(_), Some(_)) => Err(ConvertError::UnsupportedLayout("rgba in a planar stream".to_string())),
        }
    }
}

/// Result of reading from the container
#[derive(Debug)]
pub enum ReadOutcome<P> {
    Packet(P),
    EndOfStream,
}

/// A demuxer and decoder for the first video stream of a container
pub trait VideoSource {
    /// A compressed packet read from the container
    type Packet;

    /// Opens a container and selects its first video stream
    ///
    /// # Errors
    /// Returns a [`SetupError`] when the file cannot be opened, holds no video stream,
    /// or no usable decoder exists for it.
    fn open(path: &Path) -> Result<Self, SetupError>
    where
        Self: Sized;

    /// Properties of the selected stream
    fn descriptor(&self) -> &StreamDescriptor;

    /// Reads the next packet from any stream in the container
    fn read_packet(&mut self) -> Result<ReadOutcome<Self::Packet>, SourceError>;

    /// Whether a packet belongs to the selected video stream
    fn is_selected(&self, packet: &Self::Packet) -> bool;

    /// Submits a packet to the decoder
    fn send_packet(&mut self, packet: &Self::Packet) -> Result<(), SourceError>;

    /// Tells the decoder no more packets follow, so it releases held-back images
    fn send_eof(&mut self) -> Result<(), SourceError>;

    /// Takes the next decoded image, `None` when the decoder needs more input
    fn receive_frame(&mut self) -> Option<DecodedImage<'_>>;
}
