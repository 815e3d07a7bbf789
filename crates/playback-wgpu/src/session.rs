//! Playback sessions: setup, the per-tick loop and ordered teardown
//!
//! [`Playback`] ties the pipeline together for one opened stream. [`Session`] wraps it
//! with the tick schedule and the GPU context, and owns the lifecycle: a stream that
//! fails to open leaves the session inert, and teardown stops the tick, releases GPU
//! resources and only then releases the decoder.

use crate::{
    config::PlayerConfig,
    driver::{DecodeDriver, DecodeStats, PumpReport, SlotWriter},
    error::{GpuError, PresentError, SetupError},
    pool::FramePool,
    presenter::{Presented, Presenter, SlotPresenter},
    source::{StreamDescriptor, VideoSource},
    ticker::Ticker,
    timeline::PresentationClock,
};
use std::{path::Path, time::Instant};

/// The decode/present pipeline for one opened stream
///
/// Fields drop in declaration order, so the frame slots are released before the
/// source that fed them.
pub struct Playback<Src: VideoSource, S> {
    pool: FramePool<S>,
    driver: DecodeDriver,
    presenter: Presenter,
    clock: PresentationClock,
    source: Src,
}

impl<Src: VideoSource, S> Playback<Src, S> {
    /// Assembles the pipeline and captures the clock origin
    ///
    /// # Errors
    /// Returns [`SetupError::InvalidTimeBase`] when the stream's time base is unusable.
    pub fn new(source: Src, slots: impl IntoIterator<Item = S>, start_paused: bool) -> Result<Self, SetupError> {
        let timeline = source.descriptor().timeline()?;
        let pool = FramePool::new(slots);

        let mut clock = PresentationClock::start();
        if start_paused {
            clock.pause();
        }

        Ok(Self {
            pool,
            driver: DecodeDriver::new(timeline),
            presenter: Presenter::new(),
            clock,
            source,
        })
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        self.source.descriptor()
    }

    pub fn pool(&self) -> &FramePool<S> {
        &self.pool
    }

    pub fn stats(&self) -> DecodeStats {
        self.driver.stats()
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    /// Milliseconds on the presentation clock
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Decodes far enough ahead of the clock's current time
    pub fn tick<W: SlotWriter<S>>(&mut self, writer: &mut W) -> PumpReport {
        let now = self.clock.now_ms();
        self.tick_at(now, writer)
    }

    /// Decodes far enough ahead of `now`
    pub fn tick_at<W: SlotWriter<S>>(&mut self, now: u64, writer: &mut W) -> PumpReport {
        self.driver.pump(now, &mut self.source, &mut self.pool, writer)
    }

    /// Draws the frame due at the clock's current time
    ///
    /// # Errors
    /// Propagates the draw failure.
    pub fn present<P: SlotPresenter<S>>(&mut self, output: &mut P) -> Result<Presented, PresentError> {
        let now = self.clock.now_ms();
        self.present_at(now, output)
    }

    /// Draws the frame due at `now`
    ///
    /// # Errors
    /// Propagates the draw failure.
    pub fn present_at<P: SlotPresenter<S>>(&mut self, now: u64, output: &mut P) -> Result<Presented, PresentError> {
        self.presenter.present(now, &self.pool, output)
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn pause(&mut self) {
        if !self.clock.is_paused() {
            self.clock.pause();
            tracing::info!("Playback paused at {} ms", self.clock.now_ms());
        }
    }

    pub fn resume(&mut self) {
        if self.clock.is_paused() {
            self.clock.resume();
            tracing::info!("Playback resumed at {} ms", self.clock.now_ms());
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.clock.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Releases the frame slots, then the source
    pub fn release(self) {
        let Self { pool, driver, presenter, source, .. } = self;
        let stats = driver.stats();

        tracing::info!(
            "Playback finished: {} frames published, {} dropped, {} rejected, {} presented",
            stats.published,
            stats.dropped,
            stats.rejected,
            presenter.draws()
        );

        drop(pool);
        tracing::debug!("Frame slots released");
        drop(source);
        tracing::debug!("Video source released");
    }
}

/// Lifecycle state of a [`Session`]
pub enum SessionState<G, Src: VideoSource, S> {
    /// The stream failed to open; nothing else was created
    Inert(SetupError),
    Running {
        ticker: Ticker,
        gpu: G,
        playback: Playback<Src, S>,
    },
    /// Torn down
    Closed,
}

/// A playback session driven by a fixed-interval tick
///
/// `G` is the GPU context: it creates the slot resources `S`, writes decoded images
/// into them and draws them.
pub struct Session<G, Src: VideoSource, S> {
    state: SessionState<G, Src, S>,
}

impl<G, Src: VideoSource, S> Session<G, Src, S> {
    /// Opens `path` and brings up the pipeline
    ///
    /// A stream that cannot be opened does not fail this call: the session is returned
    /// inert and reports the [`SetupError`] through [`error`](Self::error). The GPU
    /// context is only created once the stream is known to be playable.
    ///
    /// # Arguments
    /// * `create_gpu` - builds the GPU context and `slot_count` slot resources for the
    ///   opened stream
    ///
    /// # Errors
    /// Returns the [`GpuError`] raised by `create_gpu`.
    pub fn open<F>(path: &Path, config: &PlayerConfig, create_gpu: F) -> Result<Self, GpuError>
    where
        F: FnOnce(&StreamDescriptor, usize) -> Result<(G, Vec<S>), GpuError>,
    {
        let source = match Src::open(path) {
            Ok(source) => source,
            Err(error) => return Ok(Self::inert(error)),
        };

        let descriptor = *source.descriptor();
        if let Err(error) = descriptor.timeline() {
            return Ok(Self::inert(error));
        }

        tracing::info!(
            "Opened {}: {}x{} {}, time base {}/{}",
            path.display(),
            descriptor.width,
            descriptor.height,
            descriptor.layout.name(),
            descriptor.time_base.num,
            descriptor.time_base.den
        );

        let (gpu, slots) = create_gpu(&descriptor, config.slot_count)?;
        let playback = match Playback::new(source, slots, config.start_paused) {
            Ok(playback) => playback,
            Err(error) => return Ok(Self::inert(error)),
        };

        let mut ticker = Ticker::new(config.tick_interval);
        ticker.start(Instant::now());

        Ok(Self {
            state: SessionState::Running { ticker, gpu, playback },
        })
    }

    fn inert(error: SetupError) -> Self {
        tracing::error!("Playback setup failed: {error}");
        Self {
            state: SessionState::Inert(error),
        }
    }

    pub fn state(&self) -> &SessionState<G, Src, S> {
        &self.state
    }

    /// The setup error of an inert session
    pub fn error(&self) -> Option<&SetupError> {
        match &self.state {
            SessionState::Inert(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running { .. })
    }

    pub fn playback(&self) -> Option<&Playback<Src, S>> {
        match &self.state {
            SessionState::Running { playback, .. } => Some(playback),
            _ => None,
        }
    }

    pub fn playback_mut(&mut self) -> Option<&mut Playback<Src, S>> {
        match &mut self.state {
            SessionState::Running { playback, .. } => Some(playback),
            _ => None,
        }
    }

    pub fn gpu_mut(&mut self) -> Option<&mut G> {
        match &mut self.state {
            SessionState::Running { gpu, .. } => Some(gpu),
            _ => None,
        }
    }

    /// When the event loop should wake for the next tick
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            SessionState::Running { ticker, .. } => ticker.next_deadline(),
            _ => None,
        }
    }

    /// Runs the decode tick if one is due at `now`
    pub fn poll_tick(&mut self, now: Instant) -> Option<PumpReport>
    where
        G: SlotWriter<S>,
    {
        let SessionState::Running { ticker, gpu, playback } = &mut self.state else {
            return None;
        };

        ticker.poll(now).then(|| playback.tick(gpu))
    }

    /// Draws the frame due now; inert and closed sessions draw nothing
    ///
    /// # Errors
    /// Propagates the draw failure.
    pub fn present(&mut self) -> Result<Presented, PresentError>
    where
        G: SlotPresenter<S>,
    {
        match &mut self.state {
            SessionState::Running { gpu, playback, .. } => playback.present(gpu),
            _ => Ok(Presented::Nothing),
        }
    }

    /// Stops the tick, then releases GPU resources, then the decoder
    ///
    /// Safe to call repeatedly; an inert session has nothing to release.
    pub fn teardown(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Running { mut ticker, gpu, playback } => {
                ticker.stop();
                drop(gpu);
                tracing::debug!("GPU context released");
                playback.release();
            }
            SessionState::Inert(_) | SessionState::Closed => {}
        }
    }
}

impl<G, Src: VideoSource, S> Drop for Session<G, Src, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
