//! Application event handler for the video player

use super::player::PlayerContext;
use playback_wgpu::PlayerConfig;
use std::{path::PathBuf, time::Instant};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowId,
};

/// Main video player application structure
pub struct VideoPlayerApp {
    /// The media file to play
    filename: PathBuf,
    config: PlayerConfig,
    /// Window and playback session, created on the first resume
    context: Option<PlayerContext>,
}

impl VideoPlayerApp {
    pub fn new(filename: PathBuf, config: PlayerConfig) -> Self {
        Self {
            filename,
            config,
            context: None,
        }
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut context) = self.context.take() {
            context.teardown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for VideoPlayerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }

        match PlayerContext::new(event_loop, &self.filename, &self.config) {
            Ok(context) => self.context = Some(context),
            Err(error) => {
                tracing::error!("Failed to start playback: {error}");
                event_loop.exit();
                return;
            }
        }

        println!();
        println!("Keyboard shortcuts:");
        println!("  - Esc: Quit");
        println!("  - Space: Pause/Resume video playback");
        if self.config.start_paused {
            println!();
            println!("NOTE: Video starts in paused state. Press Space to resume playback.");
        }
        println!();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                    ..
                },
                ..
            }
            | WindowEvent::CloseRequested => {
                self.quit(event_loop);
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::Space),
                    repeat: false,
                    ..
                },
                ..
            } => {
                if let Some(context) = self.context.as_mut() {
                    context.toggle_pause();
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(context) = self.context.as_mut() {
                    context.handle_redraw();
                }
            }

            WindowEvent::Resized(new_size) => {
                if let Some(context) = self.context.as_mut() {
                    context.resize(new_size);
                }
            }

            _ => {}
        }
    }

    /// Runs the decode tick and sleeps until the next one
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(context) = self.context.as_mut() else {
            return;
        };

        context.handle_tick(Instant::now());

        match context.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut context) = self.context.take() {
            context.teardown();
        }
    }
}
