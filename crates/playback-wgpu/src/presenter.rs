//! Presentation: picks the frame due at "now" and draws it

use crate::{
    error::PresentError,
    pool::{FramePool, SlotId},
};

/// Draws a slot's contents to the display surface
pub trait SlotPresenter<S> {
    /// Draws the full slot, replacing whatever was on the surface
    ///
    /// # Errors
    /// Returns a [`PresentError`] when the surface cannot be drawn to this time; the
    /// caller skips the draw and tries again on the next repaint.
    fn draw(&mut self, slot: &S) -> Result<(), PresentError>;
}

/// What a repaint ended up showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    /// Nothing is displayable yet, the surface was left alone
    Nothing,
    /// The frame with this timestamp was drawn
    Frame { slot: SlotId, timestamp: u64 },
}

/// Chooses and draws the current frame on every repaint
#[derive(Debug, Default)]
pub struct Presenter {
    /// Timestamp of the last frame drawn
    last_timestamp: Option<u64>,
    /// Frames drawn so far
    draws: u64,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest ready slot not in the future
    pub fn select<S>(pool: &FramePool<S>, now: u64) -> Option<SlotId> {
        pool.current_for(now)
    }

    /// Timestamp of the last frame drawn
    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Draws the frame due at `now`
    ///
    /// The selected slot is only read. Nothing is drawn while no ready frame is due,
    /// which leaves the surface untouched before the first frame arrives.
    ///
    /// # Errors
    /// Propagates the draw failure; the pool and presenter state are unchanged.
    pub fn present<S, P>(&mut self, now: u64, pool: &FramePool<S>, output: &mut P) -> Result<Presented, PresentError>
    where
        P: SlotPresenter<S>,
    {
        let Some(slot) = Self::select(pool, now) else {
            return Ok(Presented::Nothing);
        };
        let timestamp = pool.timestamp(slot).unwrap_or_default();

        output.draw(pool.resource(slot))?;

        if self.last_timestamp != Some(timestamp) {
            tracing::trace!("Presenting frame {timestamp} ms from slot {} at {now} ms", slot.index());
        }
        self.last_timestamp = Some(timestamp);
        self.draws += 1;

        Ok(Presented::Frame { slot, timestamp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Remembers what was drawn
    #[derive(Default)]
    struct Canvas {
        drawn: Vec<&'static str>,
        fail: bool,
    }

    impl SlotPresenter<&'static str> for Canvas {
        fn draw(&mut self, slot: &&'static str) -> Result<(), PresentError> {
            if self.fail {
                return Err(PresentError::Surface(wgpu::SurfaceError::Outdated));
            }
            self.drawn.push(*slot);
            Ok(())
        }
    }

    fn pool(frames: &[(&'static str, u64)]) -> FramePool<&'static str> {
        let mut pool = FramePool::new(frames.iter().map(|(name, _)| *name));
        for &(_, timestamp) in frames {
            pool.acquire_free().unwrap().publish(timestamp);
        }
        pool
    }

    #[test]
    fn test_presents_latest_due_frame() {
        let pool = pool(&[("a", 20), ("b", 30)]);
        let mut presenter = Presenter::new();
        let mut canvas = Canvas::default();

        let presented = presenter.present(25, &pool, &mut canvas).unwrap();

        assert!(matches!(presented, Presented::Frame { timestamp: 20, .. }));
        assert_eq!(canvas.drawn, vec!["a"]);

        presenter.present(30, &pool, &mut canvas).unwrap();
        assert_eq!(canvas.drawn, vec!["a", "b"]);
        assert_eq!(presenter.last_timestamp(), Some(30));
    }

    #[test]
    fn test_nothing_due_leaves_surface_alone() {
        let pool = pool(&[("a", 20), ("b", 30)]);
        let mut presenter = Presenter::new();
        let mut canvas = Canvas::default();

        assert_eq!(presenter.present(15, &pool, &mut canvas).unwrap(), Presented::Nothing);
        assert!(canvas.drawn.is_empty());
        assert_eq!(presenter.draws(), 0);
    }

    #[test]
    fn test_repaint_redraws_same_frame() {
        let pool = pool(&[("a", 0)]);
        let mut presenter = Presenter::new();
        let mut canvas = Canvas::default();

        presenter.present(5, &pool, &mut canvas).unwrap();
        presenter.present(9, &pool, &mut canvas).unwrap();

        assert_eq!(canvas.drawn, vec!["a", "a"]);
    }

    #[test]
    fn test_failed_draw_keeps_state() {
        let pool = pool(&[("a", 0)]);
        let mut presenter = Presenter::new();
        let mut canvas = Canvas { fail: true, ..Default::default() };

        assert!(presenter.present(5, &pool, &mut canvas).is_err());
        assert_eq!(presenter.last_timestamp(), None);
        assert_eq!(pool.ready_len(), 1);
    }
}
