use std::time::Instant;

use crate::config::AppConfig;
use crate::input::{Command, Key};
use crate::render::{ProgressBar, Snapshot};
use crate::scheduler::SchedulerEvent;
use crate::screen::{Effect, Field, Screen, ScreenState};
use crate::tap::TapTempo;
use crate::tempo::{TempoClock, MAX_BPM};
use crate::timeline::{BeatCycle, Ticker, TimeSignature};
use crate::{MetronomeError, Result};

/// Everything that can change the session, delivered one at a time.
#[derive(Debug)]
pub enum Event {
    Key(Key, Instant),
    Resize(u16),
    /// Fixed-rate UI refresh, independent of the tempo.
    Frame,
    MetronomeTick,
    SchedulerFailed(MetronomeError),
}

impl From<SchedulerEvent> for Event {
    fn from(event: SchedulerEvent) -> Self {
        match event {
            SchedulerEvent::Tick => Self::MetronomeTick,
            SchedulerEvent::Failed(err) => Self::SchedulerFailed(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Sole owner of the metronome state.
///
/// Input, frame and scheduler events all funnel through [`Session::handle`],
/// so no state is mutated from more than one place.
#[derive(Debug)]
pub struct Session {
    clock: TempoClock,
    taps: TapTempo,
    beat: BeatCycle,
    signature: TimeSignature,
    screen: ScreenState,
    show_help: bool,
    width: u16,
    progress: ProgressBar,
}

impl Session {
    /// Builds the startup state and arms `ticker` at the configured tempo.
    pub fn new(config: &AppConfig, ticker: Ticker) -> Self {
        let tempo = &config.tempo;
        let mut clock = TempoClock::new(tempo.bpm, ticker);
        clock.start();

        Self {
            clock,
            taps: TapTempo::new(),
            beat: BeatCycle::new(),
            signature: TimeSignature::new(tempo.numerator, tempo.denominator),
            screen: ScreenState::new(),
            show_help: false,
            width: 0,
            progress: ProgressBar::new(),
        }
    }

    pub fn bpm(&self) -> u32 {
        self.clock.bpm()
    }

    pub fn signature(&self) -> TimeSignature {
        self.signature
    }

    pub fn beat(&self) -> u32 {
        self.beat.current()
    }

    pub fn screen(&self) -> Screen {
        self.screen.screen()
    }

    pub fn selection(&self) -> Option<Field> {
        self.screen.selection()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn handle(&mut self, event: Event) -> Result<Control> {
        match event {
            Event::Key(key, at) => {
                let Some(command) = Command::decode(self.screen(), key) else {
                    return Ok(Control::Continue);
                };
                return Ok(self.dispatch(command, at));
            }
            Event::Resize(width) => self.width = width,
            Event::Frame => {
                if self.screen() == Screen::Main {
                    self.progress
                        .animate(f64::from(self.bpm()) / f64::from(MAX_BPM));
                }
            }
            // A tick queued before the clock stopped must not move the beat.
            Event::MetronomeTick if self.clock.is_running() => {
                self.beat.advance(self.signature.numerator());
            }
            Event::MetronomeTick => {}
            Event::SchedulerFailed(err) => return Err(err),
        }
        Ok(Control::Continue)
    }

    fn dispatch(&mut self, command: Command, at: Instant) -> Control {
        let previous = self.screen.screen();
        let transition = self.screen.apply(command);
        self.screen = transition.state;
        if previous != self.screen.screen() {
            tracing::debug!(from = ?previous, to = ?self.screen.screen(), "screen changed");
        }

        let mut control = Control::Continue;
        for effect in transition.effects {
            match effect {
                Effect::Quit => control = Control::Quit,
                Effect::StartClock => self.clock.start(),
                Effect::StopClock => self.clock.stop(),
                Effect::ToggleRun => self.clock.toggle(),
                Effect::ToggleHelp => self.show_help = !self.show_help,
                Effect::ResetBeat => self.beat.reset(),
                Effect::Tap => {
                    if let Some(bpm) = self.taps.record_tap(at) {
                        self.clock.set_bpm(bpm);
                    }
                }
                Effect::Adjust(field, step) => match field {
                    Field::Numerator => self
                        .signature
                        .set_numerator(step.apply(self.signature.numerator())),
                    Field::Denominator => self
                        .signature
                        .set_denominator(step.apply(self.signature.denominator())),
                    Field::Bpm => self.clock.set_bpm(step.apply(self.clock.bpm())),
                },
            }
        }
        control
    }

    /// Copies out everything the renderer needs.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            bpm: self.bpm(),
            signature: self.signature,
            beat: self.beat(),
            screen: self.screen(),
            selection: self.selection(),
            running: self.is_running(),
            width: self.width,
            show_help: self.show_help,
            progress: self.progress.percent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session() -> (Session, Ticker) {
        let ticker = Ticker::new();
        (Session::new(&AppConfig::default(), ticker.clone()), ticker)
    }

    fn press(session: &mut Session, key: Key) -> Control {
        session.handle(Event::Key(key, Instant::now())).unwrap()
    }

    fn open_settings(session: &mut Session) {
        press(session, Key::Char('s'));
    }

    #[test]
    fn starts_with_fixed_defaults() {
        let (session, ticker) = session();
        assert_eq!(session.bpm(), 60);
        assert_eq!(session.signature(), TimeSignature::new(4, 4));
        assert_eq!(session.beat(), 0);
        assert_eq!(session.screen(), Screen::Main);
        assert_eq!(session.selection(), None);
        assert!(session.is_running());
        assert_eq!(ticker.period(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn metronome_ticks_walk_the_bar() {
        let (mut session, _) = session();
        let beats: Vec<u32> = (0..4)
            .map(|_| {
                session.handle(Event::MetronomeTick).unwrap();
                session.beat()
            })
            .collect();
        assert_eq!(beats, vec![1, 2, 3, 0]);
    }

    #[test]
    fn space_toggles_the_clock_on_main() {
        let (mut session, ticker) = session();
        press(&mut session, Key::Char(' '));
        assert!(!session.is_running());
        assert!(!ticker.is_armed());

        press(&mut session, Key::Char(' '));
        assert!(session.is_running());
        assert_eq!(ticker.period(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn settings_round_trip_stops_and_restarts() {
        let (mut session, ticker) = session();
        session.handle(Event::MetronomeTick).unwrap();

        open_settings(&mut session);
        assert_eq!(session.screen(), Screen::Settings);
        assert_eq!(session.selection(), Some(Field::Numerator));
        assert_eq!(session.beat(), 0);
        assert!(!session.is_running());
        assert!(!ticker.is_armed());

        press(&mut session, Key::Char(' '));
        assert!(!session.is_running());

        press(&mut session, Key::Esc);
        assert_eq!(session.screen(), Screen::Main);
        assert_eq!(session.selection(), None);
        assert!(session.is_running());
        assert!(ticker.is_armed());
    }

    #[test]
    fn bpm_edits_saturate_and_apply_on_return() {
        let (mut session, ticker) = session();
        open_settings(&mut session);
        press(&mut session, Key::Tab);
        press(&mut session, Key::Tab);
        assert_eq!(session.selection(), Some(Field::Bpm));

        for _ in 0..300 {
            press(&mut session, Key::Up);
        }
        assert_eq!(session.bpm(), 240);
        press(&mut session, Key::Char('k'));
        assert_eq!(session.bpm(), 240);

        press(&mut session, Key::Esc);
        assert_eq!(ticker.period(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn numerator_edits_keep_the_beat_in_range() {
        let (mut session, _) = session();
        for _ in 0..3 {
            session.handle(Event::MetronomeTick).unwrap();
        }
        open_settings(&mut session);
        press(&mut session, Key::Down);
        press(&mut session, Key::Down);
        assert_eq!(session.signature().numerator(), 2);

        press(&mut session, Key::Esc);
        session.handle(Event::MetronomeTick).unwrap();
        assert!(session.beat() < 2);
    }

    #[test]
    fn denominator_is_clamped_independently() {
        let (mut session, _) = session();
        open_settings(&mut session);
        press(&mut session, Key::Tab);
        for _ in 0..20 {
            press(&mut session, Key::Char('j'));
        }
        assert_eq!(session.signature(), TimeSignature::new(4, 1));
    }

    #[test]
    fn tapping_sets_tempo_and_rearms() {
        let (mut session, ticker) = session();
        let start = Instant::now();
        for i in 0..5 {
            let at = start + Duration::from_millis(500) * i;
            session.handle(Event::Key(Key::Char('t'), at)).unwrap();
        }
        assert_eq!(session.bpm(), 120);
        assert_eq!(ticker.period(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn tapping_while_editing_keeps_the_clock_stopped() {
        let (mut session, ticker) = session();
        open_settings(&mut session);

        let start = Instant::now();
        for i in 0..5 {
            let at = start + Duration::from_millis(400) * i;
            session.handle(Event::Key(Key::Char('t'), at)).unwrap();
        }
        assert_eq!(session.bpm(), 150);
        assert!(!session.is_running());
        assert!(!ticker.is_armed());

        press(&mut session, Key::Esc);
        assert_eq!(ticker.period(), Some(Duration::from_millis(400)));
    }

    #[test]
    fn idle_tap_leaves_tempo_unchanged() {
        let (mut session, ticker) = session();
        let start = Instant::now();
        for i in 0..5 {
            let at = start + Duration::from_millis(500) * i;
            session.handle(Event::Key(Key::Char('t'), at)).unwrap();
        }
        assert_eq!(session.bpm(), 120);

        let idle = start + Duration::from_secs(302);
        session.handle(Event::Key(Key::Char('t'), idle)).unwrap();
        assert_eq!(session.bpm(), 120);
        assert_eq!(ticker.period(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn queued_tick_after_entering_settings_is_ignored() {
        let (mut session, _) = session();
        session.handle(Event::MetronomeTick).unwrap();
        open_settings(&mut session);

        session.handle(Event::MetronomeTick).unwrap();
        assert_eq!(session.beat(), 0);

        press(&mut session, Key::Esc);
        session.handle(Event::MetronomeTick).unwrap();
        assert_eq!(session.beat(), 1);
    }

    #[test]
    fn fast_tapping_clamps_and_still_rearms() {
        let (mut session, ticker) = session();
        let start = Instant::now();
        for i in 0..5 {
            let at = start + Duration::from_millis(50) * i;
            session.handle(Event::Key(Key::Char('T'), at)).unwrap();
        }
        assert_eq!(session.bpm(), 240);
        assert_eq!(ticker.period(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn escape_on_main_and_interrupt_quit() {
        let (mut session, _) = session();
        assert_eq!(press(&mut session, Key::Esc), Control::Quit);

        open_settings(&mut session);
        assert_eq!(press(&mut session, Key::Interrupt), Control::Quit);
    }

    #[test]
    fn help_flag_and_width_follow_events() {
        let (mut session, _) = session();
        press(&mut session, Key::Char('?'));
        session.handle(Event::Resize(120)).unwrap();

        let snapshot = session.snapshot();
        assert!(snapshot.show_help);
        assert_eq!(snapshot.width, 120);
    }

    #[test]
    fn progress_animates_only_on_main() {
        let (mut session, _) = session();
        session.handle(Event::Frame).unwrap();
        let after_one = session.snapshot().progress;
        assert!(after_one > 0.0);

        open_settings(&mut session);
        session.handle(Event::Frame).unwrap();
        assert_eq!(session.snapshot().progress, after_one);
    }

    #[test]
    fn scheduler_failure_is_fatal() {
        let (mut session, _) = session();
        let event = Event::from(SchedulerEvent::Failed(MetronomeError::Rewind("gone".into())));
        assert!(matches!(session.handle(event), Err(MetronomeError::Rewind(_))));
    }
}
