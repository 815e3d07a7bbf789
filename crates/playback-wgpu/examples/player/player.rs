//! One playback window: session bring-up, ticks and redraws

use playback_wgpu::{
    PlayerConfig, Presented, Session,
    error::GpuError,
    ffmpeg::FfmpegSource,
    gpu::{FrameTarget, Renderer},
};
use std::{path::Path, sync::Arc, time::Instant};
use winit::{
    dpi::PhysicalSize,
    event_loop::ActiveEventLoop,
    window::{Window, WindowAttributes},
};

const TITLE: &str = "playback-wgpu Video Player";

/// Playback state bound to its window
///
/// The session is declared first so it is torn down before the window it draws to.
pub struct PlayerContext {
    session: Session<Renderer, FfmpegSource, FrameTarget>,
    /// Wrapped in `Arc` to avoid lifetime issue with `wgpu::Surface`.
    window: Arc<Window>,
}

impl PlayerContext {
    /// Creates the window and opens the session
    ///
    /// A file that cannot be played still yields a context: its session is inert and
    /// the window title shows why.
    ///
    /// # Errors
    /// Fails when the window cannot be created or GPU initialization fails.
    pub fn new(event_loop: &ActiveEventLoop, filename: &Path, config: &PlayerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let window = Arc::new(event_loop.create_window(WindowAttributes::default().with_resizable(false).with_visible(false).with_title(TITLE))?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let session = Session::open(filename, config, |descriptor, slot_count| {
            let size = PhysicalSize::new(descriptor.width, descriptor.height);
            let _ = window.request_inner_size(size);

            let surface = instance.create_surface(window.clone()).map_err(GpuError::from)?;
            let (mut renderer, targets) = Renderer::new(&instance, surface, (size.width, size.height), descriptor, slot_count)?;

            let notify = window.clone();
            renderer.set_pre_present(move || notify.pre_present_notify());

            Ok((renderer, targets))
        })?;

        let context = Self { session, window };

        context.update_window_title();
        context.window.set_visible(true);
        context.window.focus_window();
        context.window.request_redraw();

        Ok(context)
    }

    /// Runs the decode tick if due and asks for a repaint after it
    pub fn handle_tick(&mut self, now: Instant) {
        if let Some(report) = self.session.poll_tick(now) {
            if report.published > 0 || report.dropped > 0 || report.rejected > 0 {
                tracing::debug!("Decoded {} frames ({} dropped, {} rejected)", report.published, report.dropped, report.rejected);
            }
            self.window.request_redraw();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.next_deadline()
    }

    /// Draws the frame due now
    pub fn handle_redraw(&mut self) {
        match self.session.present() {
            Ok(Presented::Frame { .. } | Presented::Nothing) => {}
            Err(error) => tracing::debug!("Skipped redraw: {error}"),
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(renderer) = self.session.gpu_mut() {
            renderer.resize(new_size.width, new_size.height);
        }
        self.window.request_redraw();
    }

    pub fn toggle_pause(&mut self) {
        if let Some(playback) = self.session.playback_mut() {
            playback.toggle_pause();
        }
        self.update_window_title();
        self.window.request_redraw();
    }

    /// Stops ticking and releases the GPU and decoder
    pub fn teardown(&mut self) {
        self.session.teardown();
    }

    fn update_window_title(&self) {
        let title = match (self.session.error(), self.session.playback()) {
            (Some(error), _) => format!("{TITLE} [{error}]"),
            (None, Some(playback)) if playback.is_paused() => format!("{TITLE} [PAUSED]"),
            _ => TITLE.to_string(),
        };
        self.window.set_title(&title);
    }
}
