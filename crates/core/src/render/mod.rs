//! Text frame rendering for the metronome view.
//!
//! The renderer is terminal-agnostic: it produces lines of styled spans and
//! leaves colors and escape sequences to the caller.

use crate::config::DisplayConfig;
use crate::input::{KeyMap, MainCommand, SettingsCommand};
use crate::screen::{Field, Screen};
use crate::timeline::TimeSignature;

const FULL_GLYPH: char = '█';
const EMPTY_GLYPH: char = '░';
/// Columns reserved next to the progress bar for the tempo readout.
const READOUT_WIDTH: u16 = 8;
const EASING: f64 = 0.5;
const HELP_SEPARATOR: &str = " • ";
const HELP_COLUMN_GAP: &str = "    ";
const PAUSED_MARKER: &str = "  paused";

/// Renderer input, copied from the session after every event.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bpm: u32,
    pub signature: TimeSignature,
    pub beat: u32,
    pub screen: Screen,
    pub selection: Option<Field>,
    pub running: bool,
    pub width: u16,
    pub show_help: bool,
    /// Animated fill of the tempo bar in `0.0..=1.0`.
    pub progress: f64,
}

/// Eased fill level of the tempo bar.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressBar {
    percent: f64,
}

impl ProgressBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Moves one animation frame toward `target`.
    pub fn animate(&mut self, target: f64) {
        let target = target.clamp(0.0, 1.0);
        self.percent += (target - self.percent) * EASING;
        if (target - self.percent).abs() < 1e-3 {
            self.percent = target;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    /// Active beat block.
    Filled,
    /// Inactive beat block.
    Empty,
    /// Selected settings field.
    Highlight,
    /// Filled part of the tempo bar.
    Bar,
    /// Unfilled part of the tempo bar.
    Track,
    HelpKey,
    HelpDescription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::Plain)
    }
}

pub type Line = Vec<Span>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<Line>,
}

impl Frame {
    /// The frame with all styling dropped.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|span| span.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    display: DisplayConfig,
}

impl Renderer {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    /// Width shared by the tempo bar and the beat visualizer.
    pub fn content_width(&self, terminal_width: u16) -> u16 {
        terminal_width
            .saturating_sub(self.display.padding * 2 + READOUT_WIDTH)
            .min(self.display.max_width)
    }

    pub fn render(&self, snapshot: &Snapshot) -> Frame {
        let width = usize::from(self.content_width(snapshot.width));
        let mut lines: Vec<Line> = vec![Vec::new(), Vec::new()];

        lines.extend(self.visualizer(snapshot, width));
        lines.push(Vec::new());
        lines.push(self.tempo_line(snapshot, width));
        lines.push(Vec::new());

        let help = match snapshot.screen {
            Screen::Main => help_lines::<MainCommand>(snapshot.show_help),
            Screen::Settings => help_lines::<SettingsCommand>(snapshot.show_help),
        };
        let pad = self.pad();
        lines.extend(help.into_iter().map(|mut line| {
            line.insert(0, Span::plain(pad.clone()));
            line
        }));

        Frame { lines }
    }

    fn pad(&self) -> String {
        " ".repeat(usize::from(self.display.padding))
    }

    fn visualizer(&self, snapshot: &Snapshot, width: usize) -> Vec<Line> {
        let padding = usize::from(self.display.padding);
        let beats = snapshot.signature.numerator() as usize;
        let block_width = (width / beats).saturating_sub(padding);
        let trailing = (width + padding * 2).saturating_sub((block_width + padding) * beats);

        let height = self.display.visualizer_height;
        let middle = height / 2 + 1;

        (1..=height)
            .map(|row| {
                let mut line = Line::new();
                for beat in 0..beats {
                    line.push(Span::plain(self.pad()));
                    let (glyph, style) = if snapshot.beat as usize == beat {
                        (FULL_GLYPH, Style::Filled)
                    } else {
                        (EMPTY_GLYPH, Style::Empty)
                    };
                    line.push(Span::new(glyph.to_string().repeat(block_width), style));
                }
                line.push(Span::plain(" ".repeat(trailing)));

                if row == middle {
                    line.push(Span::plain("-"));
                } else if row + 1 == middle {
                    line.push(field_span(
                        snapshot.signature.numerator().to_string(),
                        snapshot.selection == Some(Field::Numerator),
                    ));
                } else if row == middle + 1 {
                    line.push(field_span(
                        snapshot.signature.denominator().to_string(),
                        snapshot.selection == Some(Field::Denominator),
                    ));
                }
                line
            })
            .collect()
    }

    fn tempo_line(&self, snapshot: &Snapshot, width: usize) -> Line {
        let filled = ((width as f64) * snapshot.progress.clamp(0.0, 1.0)).round() as usize;
        let mut line = vec![
            Span::plain(self.pad()),
            Span::new(FULL_GLYPH.to_string().repeat(filled), Style::Bar),
            Span::new(EMPTY_GLYPH.to_string().repeat(width - filled), Style::Track),
            Span::plain(self.pad()),
            field_span(
                format!("BPM: {}", snapshot.bpm),
                snapshot.selection == Some(Field::Bpm),
            ),
        ];
        // The settings screen always stops the clock, so only flag it on main.
        if !snapshot.running && snapshot.screen == Screen::Main {
            line.push(Span::new(PAUSED_MARKER, Style::HelpDescription));
        }
        line
    }
}

fn field_span(text: String, selected: bool) -> Span {
    let style = if selected {
        Style::Highlight
    } else {
        Style::Plain
    };
    Span::new(text, style)
}

fn help_entry<K: KeyMap>(command: K) -> Vec<Span> {
    let binding = command.binding();
    vec![
        Span::new(binding.label, Style::HelpKey),
        Span::new(format!(" {}", binding.description), Style::HelpDescription),
    ]
}

/// Short help on one line, or the full listing laid out in columns.
pub fn help_lines<K: KeyMap>(show_all: bool) -> Vec<Line> {
    if !show_all {
        let mut line = Line::new();
        for (i, &command) in K::short_help().iter().enumerate() {
            if i > 0 {
                line.push(Span::new(HELP_SEPARATOR, Style::HelpDescription));
            }
            line.extend(help_entry(command));
        }
        return vec![line];
    }

    let columns = K::full_help();
    let rows = columns.iter().map(|column| column.len()).max().unwrap_or(0);
    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            column
                .iter()
                .map(|&command| entry_width(command))
                .max()
                .unwrap_or(0)
        })
        .collect();

    (0..rows)
        .map(|row| {
            let mut line = Line::new();
            for (index, column) in columns.iter().enumerate() {
                if index > 0 {
                    line.push(Span::plain(HELP_COLUMN_GAP));
                }
                let used = match column.get(row) {
                    Some(&command) => {
                        line.extend(help_entry(command));
                        entry_width(command)
                    }
                    None => 0,
                };
                if index + 1 < columns.len() {
                    line.push(Span::plain(" ".repeat(widths[index] - used)));
                }
            }
            line
        })
        .collect()
}

fn entry_width<K: KeyMap>(command: K) -> usize {
    let binding = command.binding();
    binding.label.chars().count() + 1 + binding.description.chars().count()
}
