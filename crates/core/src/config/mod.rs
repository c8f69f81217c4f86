use serde::{Deserialize, Serialize};

use crate::tempo::{MAX_BPM, MIN_BPM};
use crate::timeline::TimeSignature;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub tempo: TempoConfig,
    pub display: DisplayConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Returns a copy with every tempo field saturated into its valid range.
    pub fn normalized(mut self) -> Self {
        self.tempo.bpm = self.tempo.bpm.clamp(MIN_BPM, MAX_BPM);
        let signature = TimeSignature::new(self.tempo.numerator, self.tempo.denominator);
        self.tempo.numerator = signature.numerator();
        self.tempo.denominator = signature.denominator();
        self.display.refresh_hz = self.display.refresh_hz.max(1);
        self.audio.buffer_divisor = self.audio.buffer_divisor.max(1);
        self
    }
}

/// Startup tempo and time signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    pub bpm: u32,
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bpm: 60,
            numerator: 4,
            denominator: 4,
        }
    }
}

/// Layout constants and redraw rate of the terminal view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Upper bound for the progress bar and beat visualizer width.
    pub max_width: u16,
    pub padding: u16,
    /// Frames per second of the UI redraw cycle, independent of the tempo.
    pub refresh_hz: u32,
    pub visualizer_height: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_width: 80,
            padding: 2,
            refresh_hz: 10,
            visualizer_height: 5,
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// The output buffer holds `sample_rate / buffer_divisor` frames.
    pub buffer_divisor: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { buffer_divisor: 50 }
    }
}
