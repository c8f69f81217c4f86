use std::time::Duration;

use crate::timeline::Ticker;

pub const MIN_BPM: u32 = 1;
pub const MAX_BPM: u32 = 240;
pub const DEFAULT_BPM: u32 = 60;

/// Returns the time between two beats at `bpm`.
pub fn beat_interval(bpm: u32) -> Duration {
    Duration::from_secs(60) / bpm.max(MIN_BPM)
}

/// Owns the tempo and decides when the shared [`Ticker`] is armed.
#[derive(Debug)]
pub struct TempoClock {
    bpm: u32,
    running: bool,
    ticker: Ticker,
}

impl TempoClock {
    /// Creates a stopped clock driving `ticker`.
    pub fn new(bpm: u32, ticker: Ticker) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            running: false,
            ticker,
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        beat_interval(self.bpm)
    }

    /// Stores the saturated tempo and, while running, rearms the ticker so the
    /// next beat lands one new interval from now.
    pub fn set_bpm(&mut self, bpm: u32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        if self.running {
            self.ticker.reset(self.interval());
            tracing::debug!(bpm = self.bpm, interval = ?self.interval(), "retimed clock");
        }
    }

    pub fn start(&mut self) {
        self.ticker.reset(self.interval());
        self.running = true;
        tracing::debug!(bpm = self.bpm, "clock started");
    }

    pub fn stop(&mut self) {
        self.ticker.stop();
        self.running = false;
        tracing::debug!("clock stopped");
    }

    pub fn toggle(&mut self) {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_clock(bpm: u32) -> (TempoClock, Ticker) {
        let ticker = Ticker::new();
        let mut clock = TempoClock::new(bpm, ticker.clone());
        clock.start();
        (clock, ticker)
    }

    #[test]
    fn interval_is_a_minute_divided_by_bpm() {
        assert_eq!(beat_interval(60), Duration::from_secs(1));
        assert_eq!(beat_interval(120), Duration::from_millis(500));
        assert_eq!(beat_interval(240), Duration::from_millis(250));
    }

    #[test]
    fn bpm_saturates_at_both_ends() {
        let (mut clock, _) = running_clock(60);
        for _ in 0..500 {
            clock.set_bpm(clock.bpm() + 1);
        }
        assert_eq!(clock.bpm(), MAX_BPM);
        clock.set_bpm(clock.bpm() + 1);
        assert_eq!(clock.bpm(), MAX_BPM);

        for _ in 0..500 {
            clock.set_bpm(clock.bpm().saturating_sub(1));
        }
        assert_eq!(clock.bpm(), MIN_BPM);
    }

    #[test]
    fn retiming_a_running_clock_rearms_the_ticker() {
        let (mut clock, ticker) = running_clock(60);
        assert_eq!(ticker.period(), Some(Duration::from_secs(1)));

        clock.set_bpm(120);
        assert_eq!(ticker.period(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn retiming_a_stopped_clock_leaves_the_ticker_disarmed() {
        let ticker = Ticker::new();
        let mut clock = TempoClock::new(60, ticker.clone());
        clock.set_bpm(90);
        assert!(!ticker.is_armed());

        clock.start();
        assert_eq!(ticker.period(), Some(beat_interval(90)));
    }

    #[test]
    fn toggling_stops_then_restarts_at_current_tempo() {
        let (mut clock, ticker) = running_clock(60);

        clock.toggle();
        assert!(!clock.is_running());
        assert!(!ticker.is_armed());

        clock.set_bpm(150);
        clock.toggle();
        assert!(clock.is_running());
        assert_eq!(ticker.period(), Some(Duration::from_millis(400)));
    }
}
