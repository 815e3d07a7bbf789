//! FFmpeg-backed [`VideoSource`]

use crate::{
    error::{SetupError, SourceError},
    source::{DecodedImage, PixelData, Plane, ReadOutcome, SampleLayout, StreamDescriptor, VideoSource},
    timeline::TimeBase,
};
use ffmpeg_next::{self as ffmpeg, Packet, format::Pixel, media, util::frame::video::Video as VideoFrame};
use std::path::{Path, PathBuf};

/// Maps an FFmpeg pixel format onto a layout the conversion stage handles
fn sample_layout(pixel: Pixel) -> Option<SampleLayout> {
    match pixel {
        Pixel::YUV420P | Pixel::YUVJ420P => Some(SampleLayout::YUV420),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(SampleLayout::YUV422),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(SampleLayout::YUV444),
        Pixel::RGBA => Some(SampleLayout::Rgba),
        _ => None,
    }
}

fn pixel_name(pixel: Pixel) -> String {
    format!("{pixel:?}").to_lowercase()
}

/// Demuxes a container and decodes its first video stream with FFmpeg
pub struct FfmpegSource {
    decoder: ffmpeg::codec::decoder::Video,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    descriptor: StreamDescriptor,
    /// Reused for every decoded image
    frame: VideoFrame,
    path: PathBuf,
}

impl FfmpegSource {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoSource for FfmpegSource {
    type Packet = Packet;

    fn open(path: &Path) -> Result<Self, SetupError> {
        let open_error = |error: ffmpeg::Error| SetupError::Open {
            path: path.to_path_buf(),
            message: error.to_string(),
        };

        ffmpeg::init().map_err(open_error)?;
        let input = ffmpeg::format::input(&path).map_err(open_error)?;

        let stream = input
            .streams()
            .find(|stream| stream.parameters().medium() == media::Type::Video)
            .ok_or_else(|| SetupError::NoVideoStream { path: path.to_path_buf() })?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let codec_id = stream.parameters().id();

        let codec = ffmpeg::codec::decoder::find(codec_id).ok_or_else(|| SetupError::DecoderNotFound { codec: format!("{codec_id:?}") })?;
        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters()).map_err(|error| SetupError::ContextCopy(error.to_string()))?;
        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|error| SetupError::DecoderOpen(error.to_string()))?;

        let layout = match decoder.format() {
            // Some codecs only report their format with the first frame
            Pixel::None => {
                tracing::debug!("Decoder did not report a pixel format, assuming yuv420p");
                SampleLayout::YUV420
            }
            pixel => sample_layout(pixel).ok_or_else(|| SetupError::UnsupportedPixelFormat(pixel_name(pixel)))?,
        };

        let descriptor = StreamDescriptor {
            width: decoder.width(),
            height: decoder.height(),
            layout,
            time_base: TimeBase::new(time_base.numerator(), time_base.denominator()),
        };

        tracing::debug!("Selected stream {stream_index} ({codec_id:?}) of {}", path.display());

        Ok(Self {
            decoder,
            input,
            stream_index,
            descriptor,
            frame: VideoFrame::empty(),
            path: path.to_path_buf(),
        })
    }

    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn read_packet(&mut self) -> Result<ReadOutcome<Packet>, SourceError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(ReadOutcome::Packet(packet)),
            Err(ffmpeg::Error::Eof) => Ok(ReadOutcome::EndOfStream),
            Err(error) => Err(SourceError::Read(error.to_string())),
        }
    }

    fn is_selected(&self, packet: &Packet) -> bool {
        packet.stream() == self.stream_index
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<(), SourceError> {
        self.decoder.send_packet(packet).map_err(|error| SourceError::Send(error.to_string()))
    }

    fn send_eof(&mut self) -> Result<(), SourceError> {
        self.decoder.send_eof().map_err(|error| SourceError::Send(error.to_string()))
    }

    fn receive_frame(&mut self) -> Option<DecodedImage<'_>> {
        self.decoder.receive_frame(&mut self.frame).ok()?;

        let frame = &self.frame;
        let plane = |index: usize| Plane {
            data: frame.data(index),
            stride: frame.stride(index),
        };

        let pixels = match sample_layout(frame.format()) {
            Some(layout) if layout != self.descriptor.layout => PixelData::Unsupported(pixel_name(frame.format())),
            Some(SampleLayout::Planar { .. }) => PixelData::Planar {
                y: plane(0),
                u: plane(1),
                v: plane(2),
            },
            Some(SampleLayout::Rgba) => PixelData::Rgba(plane(0)),
            None => PixelData::Unsupported(pixel_name(frame.format())),
        };

        Some(DecodedImage {
            pts: frame.timestamp().or(frame.pts()),
            width: frame.width(),
            height: frame.height(),
            pixels,
        })
    }
}
