//! Drawing frame slots to a window surface

use super::{
    GpuContext,
    quad::{self, Quad},
    target::FrameTarget,
};
use crate::{
    error::{GpuError, PresentError},
    presenter::SlotPresenter,
};

const BACKGROUND_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Blits frame slots onto a configured surface with the pass-through program
pub struct SurfacePresenter {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    configuration: wgpu::SurfaceConfiguration,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipeline: wgpu::RenderPipeline,
    quad: Quad,
    /// Called right before each present, e.g. `Window::pre_present_notify`
    pre_present: Option<Box<dyn Fn()>>,
}

impl SurfacePresenter {
    /// Configures `surface` at `size` and builds the pass-through pipeline
    ///
    /// # Errors
    /// Returns [`GpuError::UnsupportedSurface`] when the adapter cannot present to it.
    pub fn new(context: &GpuContext, surface: wgpu::Surface<'static>, (width, height): (u32, u32)) -> Result<Self, GpuError> {
        let device = &context.device;
        let capabilities = surface.get_capabilities(&context.adapter);
        let Some(&first_format) = capabilities.formats.first() else {
            return Err(GpuError::UnsupportedSurface);
        };

        // Slots hold display-ready values, so they are written through a linear view
        let format = capabilities.formats.iter().find(|f| f.is_srgb()).copied().unwrap_or(first_format);
        let configuration = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            width: width.max(1),
            height: height.max(1),
            format,
            view_formats: vec![format, format.remove_srgb_suffix()],
            alpha_mode: capabilities.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            present_mode: capabilities.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &configuration);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame bind group layout"),
            entries: &[quad::texture_entry(0), quad::sampler_entry(1)],
        });
        let shader = device.create_shader_module(wgpu::include_wgsl!("../shaders/passthrough.wgsl"));
        let pipeline = quad::create_quad_pipeline(device, "Frame to screen pipeline", &shader, &bind_group_layout, format.remove_srgb_suffix());

        tracing::debug!("Surface configured: {width}x{height} {format:?}");

        Ok(Self {
            surface,
            device: device.clone(),
            queue: context.queue.clone(),
            configuration,
            bind_group_layout,
            sampler: quad::create_linear_sampler(device, "Frame sampler"),
            pipeline,
            quad: Quad::new(device),
            pre_present: None,
        })
    }

    /// Registers a hook run right before each present
    pub fn set_pre_present(&mut self, hook: impl Fn() + 'static) {
        self.pre_present = Some(Box::new(hook));
    }

    /// Reconfigures the surface for a new window size; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.configuration.width = width;
            self.configuration.height = height;
            self.surface.configure(&self.device, &self.configuration);
        }
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.configuration);
    }
}

impl SlotPresenter<FrameTarget> for SurfacePresenter {
    fn draw(&mut self, slot: &FrameTarget) -> Result<(), PresentError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(error @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                tracing::warn!("Surface {error}, reconfiguring");
                self.reconfigure();
                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        };

        let surface_view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(frame.texture.format().remove_srgb_suffix()),
            ..Default::default()
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(slot.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Present") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame to screen pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            self.quad.draw(&mut pass);
        }

        self.queue.submit(Some(encoder.finish()));
        if let Some(hook) = &self.pre_present {
            hook();
        }
        frame.present();

        Ok(())
    }
}
