//! Core library for the terminal metronome.
//!
//! Each module owns one piece of the engine: the tempo clock and tap
//! estimator, the beat cycle and shared ticker, the screen state machine, the
//! click scheduler that runs beside the UI, and the renderer that turns a
//! session snapshot into a text frame. [`Session`] ties them together as the
//! single owner of mutable state.

pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod render;
pub mod scheduler;
pub mod screen;
pub mod session;
pub mod tap;
pub mod tempo;
pub mod timeline;

pub use audio::{ClickPlayer, ClickSample, Speaker};
pub use config::{AppConfig, AudioConfig, DisplayConfig, TempoConfig};
pub use error::{MetronomeError, Result};
pub use input::{Command, Key, KeyMap, MainCommand, SettingsCommand};
pub use render::{Frame, Renderer, Snapshot, Span, Style};
pub use scheduler::{MetronomeScheduler, SchedulerEvent};
pub use screen::{Field, Screen, ScreenState};
pub use session::{Control, Event, Session};
pub use tap::TapTempo;
pub use tempo::{TempoClock, MAX_BPM, MIN_BPM};
pub use timeline::{BeatCycle, Ticker, TimeSignature};
