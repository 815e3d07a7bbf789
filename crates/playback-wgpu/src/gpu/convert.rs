//! YCbCr to RGB conversion into frame slots

use super::{
    GpuContext,
    quad::{self, Quad},
    target::{FRAME_FORMAT, FrameTarget},
};
use crate::{
    driver::SlotWriter,
    error::{ConvertError, GpuError},
    source::{DecodedImage, PixelData, Plane, SampleLayout, StreamDescriptor},
};

/// Background of the conversion pass, fully overwritten by the quad
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// The three single-channel textures every planar image is uploaded into
///
/// One bank is shared by all images: each upload is converted into its slot before
/// the next one overwrites the bank.
#[derive(Debug)]
struct PlaneBank {
    planes: [wgpu::Texture; 3],
    bind_group: wgpu::BindGroup,
}

/// Writes decoded images into [`FrameTarget`]s
///
/// Planar images go through a render pass running `yuv_to_rgb.wgsl`. RGBA images
/// already match the slot format and are copied straight into the slot.
#[derive(Debug)]
pub struct ColorConverter {
    device: wgpu::Device,
    queue: wgpu::Queue,
    descriptor: StreamDescriptor,
    /// `None` for RGBA streams
    bank: Option<PlaneBank>,
    pipeline: wgpu::RenderPipeline,
    quad: Quad,
}

impl ColorConverter {
    /// Creates the conversion pipeline and, for planar streams, the plane bank
    ///
    /// # Errors
    /// Returns [`GpuError::IncompleteTextureBank`] when the bank textures are rejected
    /// by the device.
    pub fn new(context: &GpuContext, descriptor: &StreamDescriptor) -> Result<Self, GpuError> {
        let device = &context.device;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("YUV bind group layout"),
            entries: &[quad::texture_entry(0), quad::texture_entry(1), quad::texture_entry(2), quad::sampler_entry(3)],
        });
        let shader = device.create_shader_module(wgpu::include_wgsl!("../shaders/yuv_to_rgb.wgsl"));
        let pipeline = quad::create_quad_pipeline(device, "YUV to RGB pipeline", &shader, &bind_group_layout, FRAME_FORMAT);

        let bank = match descriptor.chroma_size() {
            Some(chroma_size) => {
                device.push_error_scope(wgpu::ErrorFilter::Validation);
                let bank = Self::create_bank(device, &bind_group_layout, (descriptor.width, descriptor.height), chroma_size);
                if let Some(error) = pollster::block_on(device.pop_error_scope()) {
                    return Err(GpuError::IncompleteTextureBank(error.to_string()));
                }
                Some(bank)
            }
            None => None,
        };

        tracing::debug!("Color converter ready for {}x{} {}", descriptor.width, descriptor.height, descriptor.layout.name());

        Ok(Self {
            device: context.device.clone(),
            queue: context.queue.clone(),
            descriptor: *descriptor,
            bank,
            pipeline,
            quad: Quad::new(&context.device),
        })
    }

    fn create_bank(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, luma_size: (u32, u32), chroma_size: (u32, u32)) -> PlaneBank {
        let create_plane = |label: &str, (width, height): (u32, u32)| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };

        let planes = [create_plane("Y plane", luma_size), create_plane("U plane", chroma_size), create_plane("V plane", chroma_size)];
        let views = planes.each_ref().map(|plane| plane.create_view(&Default::default()));
        let sampler = quad::create_linear_sampler(device, "YUV sampler");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("YUV bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&views[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&views[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&views[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        PlaneBank { planes, bind_group }
    }

    /// Allocates `count` slot targets sized for the stream
    ///
    /// # Errors
    /// Returns [`GpuError::IncompleteRenderTarget`] for the first slot the device
    /// rejects.
    pub fn create_targets(&self, count: usize) -> Result<Vec<FrameTarget>, GpuError> {
        (0..count)
            .map(|slot| {
                self.device.push_error_scope(wgpu::ErrorFilter::Validation);
                let target = FrameTarget::new(&self.device, self.descriptor.width, self.descriptor.height, slot);
                match pollster::block_on(self.device.pop_error_scope()) {
                    Some(error) => Err(GpuError::IncompleteRenderTarget {
                        slot,
                        message: error.to_string(),
                    }),
                    None => Ok(target),
                }
            })
            .collect()
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn upload(&self, texture: &wgpu::Texture, plane: &Plane<'_>, width: u32, height: u32) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            plane.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(plane.stride as u32),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn convert_planar(&self, bank: &PlaneBank, planes: [&Plane<'_>; 3], target: &FrameTarget) {
        let (width, height) = (self.descriptor.width, self.descriptor.height);
        let (chroma_width, chroma_height) = self.descriptor.chroma_size().unwrap_or((width, height));

        self.upload(&bank.planes[0], planes[0], width, height);
        self.upload(&bank.planes[1], planes[1], chroma_width, chroma_height);
        self.upload(&bank.planes[2], planes[2], chroma_width, chroma_height);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("YUV to RGB") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("YUV to RGB pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bank.bind_group, &[]);
            self.quad.draw(&mut pass);
        }

        self.queue.submit(Some(encoder.finish()));
    }
}

impl SlotWriter<FrameTarget> for ColorConverter {
    fn write(&mut self, image: &DecodedImage<'_>, slot: &FrameTarget) -> Result<(), ConvertError> {
        image.validate(&self.descriptor)?;

        match (&image.pixels, &self.bank) {
            (PixelData::Planar { y, u, v }, Some(bank)) => {
                self.convert_planar(bank, [y, u, v], slot);
                Ok(())
            }
            (PixelData::Rgba(plane), None) => {
                self.upload(slot.texture(), plane, image.width, image.height);
                Ok(())
            }
            _ => Err(ConvertError::UnsupportedLayout(match self.descriptor.layout {
                SampleLayout::Planar { .. } => "planar stream without a texture bank".to_string(),
                SampleLayout::Rgba => "planar image in an rgba stream".to_string(),
            })),
        }
    }
}
