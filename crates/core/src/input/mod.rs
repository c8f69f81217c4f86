//! Keyboard commands for each screen.
//!
//! The two screens share most bindings but interpret them differently, so
//! each one gets its own command enum and help listing. Terminal backends map
//! their native key events into [`Key`] and decode them with
//! [`Command::decode`].

use crate::screen::Screen;

/// Terminal-independent key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Tab,
    Esc,
    /// Ctrl+C, honoured on every screen.
    Interrupt,
}

/// Keys, display label and description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub keys: &'static [Key],
    pub label: &'static str,
    pub description: &'static str,
}

impl Binding {
    const fn new(keys: &'static [Key], label: &'static str, description: &'static str) -> Self {
        Self {
            keys,
            label,
            description,
        }
    }

    pub fn matches(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }
}

const HELP: Binding = Binding::new(&[Key::Char('?')], "?", "Toggle Help");
const START_STOP: Binding = Binding::new(&[Key::Char(' ')], "Space", "Start/Stop");
const ESCAPE: Binding = Binding::new(&[Key::Esc], "Esc", "Exit/Back");
const TAP: Binding = Binding::new(&[Key::Char('t'), Key::Char('T')], "T", "Tap Speed");

/// A set of commands that can be bound to keys and listed as help.
pub trait KeyMap: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn binding(self) -> Binding;

    /// Compact one-line help.
    fn short_help() -> &'static [Self];

    /// Expanded help, one slice per column.
    fn full_help() -> &'static [&'static [Self]];

    fn from_key(key: Key) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.binding().matches(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainCommand {
    ToggleHelp,
    ToggleRun,
    Escape,
    Configure,
    Tap,
}

impl KeyMap for MainCommand {
    const ALL: &'static [Self] = &[
        Self::ToggleHelp,
        Self::ToggleRun,
        Self::Escape,
        Self::Configure,
        Self::Tap,
    ];

    fn binding(self) -> Binding {
        match self {
            Self::ToggleHelp => HELP,
            Self::ToggleRun => START_STOP,
            Self::Escape => ESCAPE,
            Self::Configure => Binding::new(&[Key::Char('s'), Key::Char('S')], "S", "Configure"),
            Self::Tap => TAP,
        }
    }

    fn short_help() -> &'static [Self] {
        &[Self::Escape, Self::ToggleHelp]
    }

    fn full_help() -> &'static [&'static [Self]] {
        &[
            &[Self::ToggleRun, Self::Escape],
            &[Self::Tap, Self::Configure],
            &[Self::ToggleHelp],
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsCommand {
    ToggleHelp,
    ToggleRun,
    Increment,
    Decrement,
    NextField,
    Escape,
    Tap,
}

impl KeyMap for SettingsCommand {
    const ALL: &'static [Self] = &[
        Self::ToggleHelp,
        Self::ToggleRun,
        Self::Increment,
        Self::Decrement,
        Self::NextField,
        Self::Escape,
        Self::Tap,
    ];

    fn binding(self) -> Binding {
        match self {
            Self::ToggleHelp => HELP,
            Self::ToggleRun => START_STOP,
            Self::Increment => {
                Binding::new(&[Key::Up, Key::Char('k')], "↑", "Increment Value")
            }
            Self::Decrement => {
                Binding::new(&[Key::Down, Key::Char('j')], "↓", "Decrement Value")
            }
            Self::NextField => Binding::new(&[Key::Tab], "Tab", "Move Selection"),
            Self::Escape => ESCAPE,
            Self::Tap => TAP,
        }
    }

    fn short_help() -> &'static [Self] {
        &[Self::Escape, Self::ToggleHelp]
    }

    fn full_help() -> &'static [&'static [Self]] {
        &[
            &[Self::ToggleRun, Self::Escape],
            &[Self::Tap, Self::NextField],
            &[Self::Increment, Self::Decrement],
            &[Self::ToggleHelp],
        ]
    }
}

/// A key press resolved against the active screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Main(MainCommand),
    Settings(SettingsCommand),
    Quit,
}

impl Command {
    pub fn decode(screen: Screen, key: Key) -> Option<Self> {
        if key == Key::Interrupt {
            return Some(Self::Quit);
        }
        match screen {
            Screen::Main => MainCommand::from_key(key).map(Self::Main),
            Screen::Settings => SettingsCommand::from_key(key).map(Self::Settings),
        }
    }
}
