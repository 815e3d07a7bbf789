//! Color conversion on a real device, read back to the CPU
//!
//! Every test returns early when the machine has no usable GPU adapter.

use image::RgbaImage;
use playback_wgpu::{
    ConvertError, DecodedImage, PixelData, Plane, SampleLayout, SlotWriter, StreamDescriptor, TimeBase,
    gpu::{ColorConverter, FrameTarget, GpuContext},
};

/// Wide enough that a row of RGBA8 is exactly one 256-byte copy row
const WIDTH: u32 = 64;
const HEIGHT: u32 = 4;

fn context() -> Option<GpuContext> {
    match GpuContext::headless() {
        Ok(context) => Some(context),
        Err(error) => {
            eprintln!("Skipping GPU test: {error}");
            None
        }
    }
}

fn descriptor(layout: SampleLayout) -> StreamDescriptor {
    StreamDescriptor {
        width: WIDTH,
        height: HEIGHT,
        layout,
        time_base: TimeBase::new(1, 25),
    }
}

/// Copies a frame target into CPU memory
fn read_target(context: &GpuContext, target: &FrameTarget) -> RgbaImage {
    let (width, height) = target.size();
    let bytes_per_row = width * 4;

    let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback buffer"),
        size: (bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Readback") });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: target.texture(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    context.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |v| sender.send(v).unwrap());
    context.device.poll(wgpu::PollType::Wait).unwrap();
    pollster::block_on(receiver.receive()).unwrap().unwrap();

    let data = buffer_slice.get_mapped_range().to_vec();
    RgbaImage::from_raw(width, height, data).unwrap()
}

/// CPU reference of the conversion matrix
fn reference_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = f32::from(y) / 255.0;
    let u = f32::from(u) / 255.0 - 0.5;
    let v = f32::from(v) / 255.0 - 0.5;

    let r = y + 1.13983 * v;
    let g = y - 0.39465 * u - 0.58060 * v;
    let b = y + 2.03211 * u;

    [r, g, b].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn assert_close(actual: [u8; 3], expected: [u8; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 2, "got {actual:?}, expected {expected:?}");
    }
}

/// A 4:2:0 image whose luma is `top` in the upper half and `bottom` in the lower half
fn planar_planes(top: u8, bottom: u8, u: u8, v: u8) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let half = (WIDTH * HEIGHT / 2) as usize;
    let luma = [vec![top; half], vec![bottom; half]].concat();
    let chroma_len = (WIDTH / 2 * HEIGHT / 2) as usize;
    (luma, vec![u; chroma_len], vec![v; chroma_len])
}

fn planar_image<'a>(luma: &'a [u8], u: &'a [u8], v: &'a [u8]) -> DecodedImage<'a> {
    DecodedImage {
        pts: Some(0),
        width: WIDTH,
        height: HEIGHT,
        pixels: PixelData::Planar {
            y: Plane { data: luma, stride: WIDTH as usize },
            u: Plane { data: u, stride: (WIDTH / 2) as usize },
            v: Plane { data: v, stride: (WIDTH / 2) as usize },
        },
    }
}

#[test]
fn test_planar_conversion_matches_reference() {
    let Some(context) = context() else { return };
    let mut converter = ColorConverter::new(&context, &descriptor(SampleLayout::YUV420)).unwrap();
    let targets = converter.create_targets(1).unwrap();

    for (y, u, v) in [(128, 128, 128), (82, 90, 240), (145, 54, 34), (41, 240, 110), (235, 128, 128)] {
        let (luma, u_plane, v_plane) = planar_planes(y, y, u, v);
        converter.write(&planar_image(&luma, &u_plane, &v_plane), &targets[0]).unwrap();

        let image = read_target(&context, &targets[0]);
        let pixel = image.get_pixel(WIDTH / 2, HEIGHT / 2).0;
        assert_close([pixel[0], pixel[1], pixel[2]], reference_rgb(y, u, v));
        assert_eq!(pixel[3], 255);
    }
}

#[test]
fn test_first_row_lands_at_the_top() {
    let Some(context) = context() else { return };
    let mut converter = ColorConverter::new(&context, &descriptor(SampleLayout::YUV420)).unwrap();
    let targets = converter.create_targets(1).unwrap();

    let (luma, u_plane, v_plane) = planar_planes(30, 220, 128, 128);
    converter.write(&planar_image(&luma, &u_plane, &v_plane), &targets[0]).unwrap();

    let image = read_target(&context, &targets[0]);
    assert_close(image.get_pixel(0, 0).0[..3].try_into().unwrap(), reference_rgb(30, 128, 128));
    assert_close(image.get_pixel(WIDTH - 1, HEIGHT - 1).0[..3].try_into().unwrap(), reference_rgb(220, 128, 128));
}

#[test]
fn test_rgba_frames_are_copied_unchanged() {
    let Some(context) = context() else { return };
    let mut converter = ColorConverter::new(&context, &descriptor(SampleLayout::Rgba)).unwrap();
    let targets = converter.create_targets(2).unwrap();

    let rgba: Vec<u8> = (0..WIDTH * HEIGHT).flat_map(|i| [(i % 256) as u8, 0x40, 0x80, 0xff]).collect();
    let image = DecodedImage {
        pts: Some(0),
        width: WIDTH,
        height: HEIGHT,
        pixels: PixelData::Rgba(Plane {
            data: &rgba,
            stride: (WIDTH * 4) as usize,
        }),
    };
    converter.write(&image, &targets[1]).unwrap();

    assert_eq!(read_target(&context, &targets[1]).into_raw(), rgba);
}

#[test]
fn test_mismatched_image_is_rejected() {
    let Some(context) = context() else { return };
    let mut converter = ColorConverter::new(&context, &descriptor(SampleLayout::YUV420)).unwrap();
    let targets = converter.create_targets(1).unwrap();

    let rgba = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    let image = DecodedImage {
        pts: Some(0),
        width: WIDTH,
        height: HEIGHT,
        pixels: PixelData::Rgba(Plane {
            data: &rgba,
            stride: (WIDTH * 4) as usize,
        }),
    };

    assert!(matches!(converter.write(&image, &targets[0]), Err(ConvertError::UnsupportedLayout(_))));
}

#[test]
fn test_targets_match_stream_size() {
    let Some(context) = context() else { return };
    let converter = ColorConverter::new(&context, &descriptor(SampleLayout::YUV444)).unwrap();

    let targets = converter.create_targets(5).unwrap();

    assert_eq!(targets.len(), 5);
    assert!(targets.iter().all(|target| target.size() == (WIDTH, HEIGHT)));
}
