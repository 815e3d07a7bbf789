//! wgpu implementation of the conversion and presentation stages
//!
//! Every GPU operation records into its own command encoder and submits before
//! returning, so no encoder outlives the call that created it.

mod convert;
mod present;
pub mod quad;
mod target;

pub use convert::ColorConverter;
pub use present::SurfacePresenter;
pub use target::{FRAME_FORMAT, FrameTarget};

use crate::{
    driver::SlotWriter,
    error::{ConvertError, GpuError, PresentError},
    presenter::SlotPresenter,
    source::{DecodedImage, StreamDescriptor},
};

/// Adapter, device and queue shared by all stages
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Requests an adapter able to present to `compatible_surface` and opens a device
    ///
    /// # Errors
    /// Fails when no adapter is available or the device cannot be created.
    pub fn new(instance: &wgpu::Instance, compatible_surface: Option<&wgpu::Surface<'_>>) -> Result<Self, GpuError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Playback device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        }))?;

        let info = adapter.get_info();
        tracing::info!("Using GPU {} ({:?})", info.name, info.backend);

        Ok(Self { adapter, device, queue })
    }

    /// A context without a surface, for offscreen conversion
    ///
    /// # Errors
    /// Fails when no adapter is available or the device cannot be created.
    pub fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        Self::new(&instance, None)
    }
}

/// The GPU side of a playback session: conversion into slots and drawing them
pub struct Renderer {
    converter: ColorConverter,
    presenter: SurfacePresenter,
}

impl Renderer {
    /// Brings up the device, surface and both stages, and allocates the frame slots
    ///
    /// # Errors
    /// Any [`GpuError`] here is unrecoverable for the session.
    pub fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        surface_size: (u32, u32),
        descriptor: &StreamDescriptor,
        slot_count: usize,
    ) -> Result<(Self, Vec<FrameTarget>), GpuError> {
        let context = GpuContext::new(instance, Some(&surface))?;
        let presenter = SurfacePresenter::new(&context, surface, surface_size)?;
        let converter = ColorConverter::new(&context, descriptor)?;
        let targets = converter.create_targets(slot_count)?;

        tracing::info!("Allocated {slot_count} frame slots of {}x{}", descriptor.width, descriptor.height);

        Ok((Self { converter, presenter }, targets))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.presenter.resize(width, height);
    }

    pub fn set_pre_present(&mut self, hook: impl Fn() + 'static) {
        self.presenter.set_pre_present(hook);
    }
}

impl SlotWriter<FrameTarget> for Renderer {
    fn write(&mut self, image: &DecodedImage<'_>, slot: &FrameTarget) -> Result<(), ConvertError> {
        self.converter.write(image, slot)
    }
}

impl SlotPresenter<FrameTarget> for Renderer {
    fn draw(&mut self, slot: &FrameTarget) -> Result<(), PresentError> {
        self.presenter.draw(slot)
    }
}
