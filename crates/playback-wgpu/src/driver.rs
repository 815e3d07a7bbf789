//! Decode driver: keeps the ready sequence ahead of the presentation clock
//!
//! Once per tick the driver decodes until the newest ready frame lies in the future.
//! Each decoded image is written into a free slot by a [`SlotWriter`] (the GPU color
//! conversion stage in the player) and published with its presentation timestamp.
//! Nothing here blocks: end-of-stream, read and send failures and an exhausted pool
//! all end the current tick, and the next tick simply tries again.

use crate::{
    error::ConvertError,
    pool::FramePool,
    source::{DecodedImage, ReadOutcome, VideoSource},
    timeline::Timeline,
};

/// Writes a decoded image into a frame slot's resources
///
/// The write must replace the slot's previous contents entirely.
pub trait SlotWriter<S> {
    /// # Errors
    /// Returns a [`ConvertError`] when the image cannot be represented in the slot; the
    /// driver then drops the image and leaves the slot free.
    fn write(&mut self, image: &DecodedImage<'_>, slot: &S) -> Result<(), ConvertError>;
}

/// Why a pump stopped decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The newest ready frame is in the future
    Ahead,
    /// The container is exhausted and the decoder drained
    EndOfStream,
    /// Reading a packet failed; retried next tick
    ReadFailed,
    /// The decoder rejected a packet; retried next tick
    SendFailed,
    /// No slot was free or reclaimable, so an image was dropped
    PoolExhausted,
    /// The slot writer could not take an image; decoding resumes next tick
    Rejected,
}

/// What one pump did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    /// Images written and published
    pub published: usize,
    /// Images dropped because the pool was exhausted
    pub dropped: usize,
    /// Images rejected by the slot writer
    pub rejected: usize,
    pub stop: StopReason,
}

/// Totals over the lifetime of a driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub packets: u64,
    pub published: u64,
    pub dropped: u64,
    pub rejected: u64,
}

/// Pulls packets through the decoder and fills pool slots
#[derive(Debug)]
pub struct DecodeDriver {
    timeline: Timeline,
    /// Timestamp of the last published image
    last_timestamp: Option<u64>,
    /// Set once the decoder has been told no more packets follow
    flushed: bool,
    /// Stop reason of the previous pump, to log transitions only
    last_stop: Option<StopReason>,
    stats: DecodeStats,
}

impl DecodeDriver {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            last_timestamp: None,
            flushed: false,
            last_stop: None,
            stats: DecodeStats::default(),
        }
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Whether end-of-stream has been reached
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Decode is behind while nothing is ready or the newest ready frame is due
    pub fn is_behind<S>(pool: &FramePool<S>, now: u64) -> bool {
        pool.newest_timestamp().is_none_or(|newest| newest <= now)
    }

    /// Runs decode steps until the ready sequence is ahead of `now` or a step stops
    pub fn pump<Src, S, W>(&mut self, now: u64, source: &mut Src, pool: &mut FramePool<S>, writer: &mut W) -> PumpReport
    where
        Src: VideoSource,
        W: SlotWriter<S>,
    {
        let mut report = PumpReport {
            published: 0,
            dropped: 0,
            rejected: 0,
            stop: StopReason::Ahead,
        };

        while Self::is_behind(pool, now) {
            if let Err(stop) = self.step(now, source, pool, writer, &mut report) {
                report.stop = stop;
                break;
            }
        }

        self.log_pump(now, &report);
        report
    }

    /// Decodes at most one packet
    ///
    /// Images the decoder still holds from an earlier step are drained first, so a
    /// decoder that refuses input until its output is read never wedges.
    fn step<Src, S, W>(&mut self, now: u64, source: &mut Src, pool: &mut FramePool<S>, writer: &mut W, report: &mut PumpReport) -> Result<(), StopReason>
    where
        Src: VideoSource,
        W: SlotWriter<S>,
    {
        if self.drain(now, source, pool, writer, report)? > 0 {
            return Ok(());
        }

        if self.flushed {
            return Err(StopReason::EndOfStream);
        }

        match source.read_packet() {
            Ok(ReadOutcome::Packet(packet)) => {
                if !source.is_selected(&packet) {
                    return Ok(());
                }

                self.stats.packets += 1;
                if let Err(error) = source.send_packet(&packet) {
                    tracing::debug!("Decoder rejected packet: {error}");
                    return Err(StopReason::SendFailed);
                }
            }
            Ok(ReadOutcome::EndOfStream) => {
                self.flushed = true;
                if let Err(error) = source.send_eof() {
                    tracing::debug!("Failed to flush decoder: {error}");
                    return Err(StopReason::EndOfStream);
                }
            }
            Err(error) => {
                tracing::debug!("Packet read failed: {error}");
                return Err(StopReason::ReadFailed);
            }
        }

        self.drain(now, source, pool, writer, report)?;
        Ok(())
    }

    /// Takes every image the decoder is ready to emit
    ///
    /// # Returns
    /// The number of images taken, [`StopReason::PoolExhausted`] once an image had to
    /// be dropped, or [`StopReason::Rejected`] once the writer refused one
    fn drain<Src, S, W>(&mut self, now: u64, source: &mut Src, pool: &mut FramePool<S>, writer: &mut W, report: &mut PumpReport) -> Result<usize, StopReason>
    where
        Src: VideoSource,
        W: SlotWriter<S>,
    {
        let mut taken = 0;

        while let Some(image) = source.receive_frame() {
            taken += 1;
            let timestamp = self.presentation_timestamp(&image);

            if pool.free_len() == 0 {
                pool.reclaim_consumed(now);
            }

            let Some(lease) = pool.acquire_free() else {
                tracing::debug!("Frame pool exhausted at {now} ms, dropping frame for {timestamp} ms");
                report.dropped += 1;
                self.stats.dropped += 1;
                return Err(StopReason::PoolExhausted);
            };

            match writer.write(&image, lease.resource()) {
                Ok(()) => {
                    lease.publish(timestamp);
                    self.last_timestamp = Some(timestamp);
                    report.published += 1;
                    self.stats.published += 1;
                }
                Err(error) => {
                    tracing::warn!("Dropping frame for {timestamp} ms: {error}");
                    report.rejected += 1;
                    self.stats.rejected += 1;
                    return Err(StopReason::Rejected);
                }
            }
        }

        Ok(taken)
    }

    /// Converts an image's timestamp, never going behind the last published frame
    fn presentation_timestamp(&self, image: &DecodedImage<'_>) -> u64 {
        let converted = image.pts.map(|pts| self.timeline.to_presentation_ms(pts));

        match (converted, self.last_timestamp) {
            (Some(timestamp), Some(last)) => timestamp.max(last),
            (Some(timestamp), None) => timestamp,
            (None, last) => last.unwrap_or_default(),
        }
    }

    fn log_pump(&mut self, now: u64, report: &PumpReport) {
        if report.published > 0 || report.dropped > 0 || report.rejected > 0 {
            tracing::debug!(
                "Tick at {now} ms: published={}, dropped={}, rejected={}, stop={:?}",
                report.published,
                report.dropped,
                report.rejected,
                report.stop
            );
        }

        if self.last_stop == Some(report.stop) {
            return;
        }

        match report.stop {
            StopReason::EndOfStream => tracing::debug!("End of stream reached after {} frames", self.stats.published),
            StopReason::PoolExhausted => tracing::debug!("Decode paused: all frame slots hold future frames"),
            StopReason::ReadFailed | StopReason::SendFailed => tracing::debug!("Decode stalled at {now} ms: {:?}", report.stop),
            StopReason::Ahead | StopReason::Rejected => {}
        }

        self.last_stop = Some(report.stop);
    }
}
