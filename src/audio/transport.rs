use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source for the transport.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Play/pause state plus the cumulative playback offset.
///
/// Every source starts its own clock at zero, so the position is rebuilt here:
/// `base_offset + (now - started_at)` while playing, a frozen offset otherwise.
#[derive(Debug, Clone)]
pub struct TransportClock {
    state: PlaybackState,
    offset: Duration,
    started_at: Duration,
    length: Duration,
}

impl TransportClock {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            offset: Duration::ZERO,
            started_at: Duration::ZERO,
            length: Duration::ZERO,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// A new buffer was installed: Paused at zero.
    pub fn reset(&mut self, length: Duration) {
        self.state = PlaybackState::Paused;
        self.offset = Duration::ZERO;
        self.started_at = Duration::ZERO;
        self.length = length;
    }

    /// Paused -> Playing. Returns the offset the new source must start at, or
    /// `None` when the transition does not apply (Idle or already Playing).
    pub fn play(&mut self, now: Duration) -> Option<Duration> {
        if self.state != PlaybackState::Paused {
            return None;
        }
        self.state = PlaybackState::Playing;
        self.started_at = now;
        Some(self.offset)
    }

    /// Playing -> Paused. Returns the frozen offset, or `None` when not playing.
    pub fn pause(&mut self, now: Duration) -> Option<Duration> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        self.offset = self.position(now);
        self.state = PlaybackState::Paused;
        Some(self.offset)
    }

    /// Playing -> Paused after the source stopped on its own or failed.
    /// The offset keeps whatever had elapsed up to `now`.
    pub fn halt(&mut self, now: Duration) -> Option<Duration> {
        self.pause(now)
    }

    /// Move the playhead. While playing the transport is re-based at `now`,
    /// so the caller must restart the source at the returned offset.
    pub fn seek(&mut self, to: Duration, now: Duration) -> Option<Duration> {
        if self.state == PlaybackState::Idle {
            return None;
        }
        self.offset = to.min(self.length);
        self.started_at = now;
        Some(self.offset)
    }

    /// Effective playback position at `now`, clamped to the loaded length.
    pub fn position(&self, now: Duration) -> Duration {
        match self.state {
            PlaybackState::Idle => Duration::ZERO,
            PlaybackState::Paused => self.offset,
            PlaybackState::Playing => {
                let elapsed = now.saturating_sub(self.started_at);
                (self.offset + elapsed).min(self.length)
            }
        }
    }
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_idle_ignores_play_and_pause() {
        let mut transport = TransportClock::new();
        assert_eq!(transport.play(secs(1.0)), None);
        assert_eq!(transport.pause(secs(2.0)), None);
        assert_eq!(transport.state(), PlaybackState::Idle);
        assert_eq!(transport.position(secs(3.0)), Duration::ZERO);
    }

    #[test]
    fn test_pause_resume_accumulates() {
        let mut transport = TransportClock::new();
        transport.reset(secs(10.0));

        assert_eq!(transport.play(secs(100.0)), Some(Duration::ZERO));
        assert_eq!(transport.pause(secs(103.0)), Some(secs(3.0)));

        // Wall time passing while paused must not count
        assert_eq!(transport.position(secs(150.0)), secs(3.0));

        assert_eq!(transport.play(secs(150.0)), Some(secs(3.0)));
        assert_eq!(transport.position(secs(151.0)), secs(4.0));
        assert_eq!(transport.pause(secs(152.0)), Some(secs(5.0)));
    }

    #[test]
    fn test_double_play_and_double_pause_are_noops() {
        let mut transport = TransportClock::new();
        transport.reset(secs(10.0));
        transport.play(secs(0.0));
        assert_eq!(transport.play(secs(1.0)), None);
        assert_eq!(transport.position(secs(2.0)), secs(2.0));

        transport.pause(secs(2.0));
        assert_eq!(transport.pause(secs(4.0)), None);
        assert_eq!(transport.position(secs(4.0)), secs(2.0));
    }

    #[test]
    fn test_offsets_are_monotonic_across_cycles() {
        let mut transport = TransportClock::new();
        transport.reset(secs(60.0));

        let mut now = secs(0.0);
        let mut last = Duration::ZERO;
        for step in 1..=20 {
            transport.play(now);
            now += secs(0.1 * step as f64);
            let paused_at = transport.pause(now).unwrap();
            assert!(paused_at >= last);
            last = paused_at;
            now += secs(0.5);
        }
    }

    #[test]
    fn test_position_clamps_to_length() {
        let mut transport = TransportClock::new();
        transport.reset(secs(2.0));
        transport.play(secs(0.0));
        assert_eq!(transport.position(secs(5.0)), secs(2.0));
    }

    #[test]
    fn test_seek_rebases_while_playing() {
        let mut transport = TransportClock::new();
        transport.reset(secs(10.0));
        transport.play(secs(0.0));
        assert_eq!(transport.seek(secs(7.0), secs(1.0)), Some(secs(7.0)));
        assert_eq!(transport.position(secs(2.0)), secs(8.0));
        assert_eq!(transport.seek(secs(99.0), secs(2.0)), Some(secs(10.0)));
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(250));
        handle.set(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }
}
