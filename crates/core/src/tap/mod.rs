use std::time::{Duration, Instant};

use crate::tempo::MAX_BPM;

/// Number of inter-tap intervals averaged into a tempo estimate.
pub const TAP_WINDOW: usize = 4;

/// Rolling tap-tempo estimator.
///
/// The window starts zero-filled and every tap averages all slots, so the
/// first few estimates run fast until the window holds real intervals.
#[derive(Debug, Default, Clone)]
pub struct TapTempo {
    window: [Duration; TAP_WINDOW],
    last_tap: Option<Instant>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> &[Duration; TAP_WINDOW] {
        &self.window
    }

    /// Records a tap and returns the tempo to apply, if any.
    ///
    /// The first tap has no predecessor and contributes a zero interval.
    /// Estimates above the maximum tempo are saturated rather than rejected,
    /// while an average longer than a minute yields no tempo at all.
    pub fn record_tap(&mut self, now: Instant) -> Option<u32> {
        let delta = self
            .last_tap
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tap = Some(now);

        self.window.rotate_left(1);
        self.window[TAP_WINDOW - 1] = delta;

        let average = self.average();
        if average.is_zero() {
            return None;
        }

        let raw = Duration::from_secs(60).as_nanos() / average.as_nanos();
        if raw == 0 {
            tracing::debug!(?average, "tap interval too long, tempo unchanged");
            return None;
        }
        let bpm = u32::try_from(raw).unwrap_or(u32::MAX).min(MAX_BPM);
        tracing::debug!(?average, raw_bpm = %raw, bpm, "tap tempo estimate");
        Some(bpm)
    }

    pub fn average(&self) -> Duration {
        self.window.iter().sum::<Duration>() / TAP_WINDOW as u32
    }
}
