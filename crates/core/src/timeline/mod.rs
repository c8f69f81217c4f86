use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

pub const MIN_SIGNATURE_VALUE: u32 = 1;
pub const MAX_SIGNATURE_VALUE: u32 = 16;

/// Beats per bar over note value. Each field saturates at `1..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    numerator: u32,
    denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator: clamp_signature(numerator),
            denominator: clamp_signature(denominator),
        }
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn set_numerator(&mut self, numerator: u32) {
        self.numerator = clamp_signature(numerator);
    }

    pub fn set_denominator(&mut self, denominator: u32) {
        self.denominator = clamp_signature(denominator);
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn clamp_signature(value: u32) -> u32 {
    value.clamp(MIN_SIGNATURE_VALUE, MAX_SIGNATURE_VALUE)
}

/// Index of the active beat inside the bar.
///
/// The numerator is passed on every advance rather than stored, so a bar that
/// shrinks while a later beat is active recovers on the next tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BeatCycle {
    current: u32,
}

impl BeatCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn advance(&mut self, numerator: u32) -> u32 {
        self.current = (self.current + 1) % numerator.max(MIN_SIGNATURE_VALUE);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }
}

#[derive(Debug)]
struct TickerState {
    period: Option<Duration>,
    next: Instant,
    closed: bool,
}

/// Recurring timer shared by the tempo clock, which arms it, and the scheduler
/// worker, which blocks on it.
///
/// Rearming restarts the period from the moment of the call. Firings that are
/// missed while nobody waits are coalesced into a single pending one.
#[derive(Debug, Clone)]
pub struct Ticker {
    shared: Arc<(Mutex<TickerState>, Condvar)>,
}

impl Ticker {
    /// Creates a disarmed ticker.
    pub fn new() -> Self {
        let state = TickerState {
            period: None,
            next: Instant::now(),
            closed: false,
        };
        Self {
            shared: Arc::new((Mutex::new(state), Condvar::new())),
        }
    }

    /// Arms the ticker so it next fires one `period` from now. Periods
    /// shorter than a millisecond are raised to one.
    pub fn reset(&self, period: Duration) {
        let period = period.max(MIN_TICK_PERIOD);
        let mut state = self.lock();
        state.period = Some(period);
        state.next = Instant::now() + period;
        self.shared.1.notify_all();
    }

    /// Disarms the ticker. Waiters stay blocked until it is rearmed.
    pub fn stop(&self) {
        self.lock().period = None;
        self.shared.1.notify_all();
    }

    /// Permanently closes the ticker and releases every waiter.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.period = None;
        self.shared.1.notify_all();
    }

    pub fn is_armed(&self) -> bool {
        self.lock().period.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.lock().period
    }

    /// Blocks until the next firing and returns its scheduled instant, or
    /// `None` once the ticker has been shut down.
    pub fn wait(&self) -> Option<Instant> {
        let cvar = &self.shared.1;
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            let Some(period) = state.period else {
                state = cvar.wait(state).unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let now = Instant::now();
            if now >= state.next {
                let fired = state.next;
                while state.next <= now {
                    state.next += period;
                }
                return Some(fired);
            }

            let timeout = state.next - now;
            state = match cvar.wait_timeout(state, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    // The state is plain data, so a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, TickerState> {
        self.shared.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}
