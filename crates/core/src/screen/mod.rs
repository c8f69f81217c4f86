use crate::input::{Command, MainCommand, SettingsCommand};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Main,
    Settings,
}

/// Editable field on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Numerator,
    Denominator,
    Bpm,
}

impl Field {
    pub const FIRST: Field = Field::Numerator;

    pub fn next(self) -> Self {
        match self {
            Self::Numerator => Self::Denominator,
            Self::Denominator => Self::Bpm,
            Self::Bpm => Self::Numerator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Increment,
    Decrement,
}

impl Step {
    pub fn apply(self, value: u32) -> u32 {
        match self {
            Self::Increment => value.saturating_add(1),
            Self::Decrement => value.saturating_sub(1),
        }
    }
}

/// Side effect requested by a screen transition, carried out by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Quit,
    StartClock,
    StopClock,
    ToggleRun,
    ToggleHelp,
    Tap,
    ResetBeat,
    Adjust(Field, Step),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ScreenState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: ScreenState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }
}

/// Active screen plus the selected settings field.
///
/// A selection exists exactly while the settings screen is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenState {
    screen: Screen,
    selection: Option<Field>,
}

impl ScreenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn selection(&self) -> Option<Field> {
        self.selection
    }

    pub fn apply(self, command: Command) -> Transition {
        match (self.screen, command) {
            (_, Command::Quit) => Transition::stay(self, vec![Effect::Quit]),
            (Screen::Main, Command::Main(command)) => self.apply_main(command),
            (Screen::Settings, Command::Settings(command)) => self.apply_settings(command),
            // Decoded against a screen that is no longer active.
            _ => Transition::stay(self, Vec::new()),
        }
    }

    fn apply_main(self, command: MainCommand) -> Transition {
        match command {
            MainCommand::ToggleHelp => Transition::stay(self, vec![Effect::ToggleHelp]),
            MainCommand::ToggleRun => Transition::stay(self, vec![Effect::ToggleRun]),
            MainCommand::Escape => Transition::stay(self, vec![Effect::Quit]),
            MainCommand::Tap => Transition::stay(self, vec![Effect::Tap]),
            MainCommand::Configure => Transition {
                state: Self {
                    screen: Screen::Settings,
                    selection: Some(Field::FIRST),
                },
                effects: vec![Effect::StopClock, Effect::ResetBeat],
            },
        }
    }

    fn apply_settings(self, command: SettingsCommand) -> Transition {
        let field = self.selection.unwrap_or(Field::FIRST);
        match command {
            SettingsCommand::ToggleHelp => Transition::stay(self, vec![Effect::ToggleHelp]),
            // Editing implies the clock is stopped.
            SettingsCommand::ToggleRun => Transition::stay(self, Vec::new()),
            SettingsCommand::Tap => Transition::stay(self, vec![Effect::Tap]),
            SettingsCommand::Increment => {
                Transition::stay(self, vec![Effect::Adjust(field, Step::Increment)])
            }
            SettingsCommand::Decrement => {
                Transition::stay(self, vec![Effect::Adjust(field, Step::Decrement)])
            }
            SettingsCommand::NextField => Transition::stay(
                Self {
                    selection: Some(field.next()),
                    ..self
                },
                Vec::new(),
            ),
            SettingsCommand::Escape => Transition {
                state: Self::new(),
                effects: vec![Effect::StartClock],
            },
        }
    }
}
