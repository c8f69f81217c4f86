use std::io::{self, Stdout, Write};
use std::panic;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::{Attribute, Color, PrintStyledContent, Stylize};
use crossterm::{cursor, execute, queue, terminal};
use metronome_core::{Frame, Key, Span, Style};

const FILLED_COLOR: Color = Color::Rgb {
    r: 0xFF,
    g: 0xFE,
    b: 0x83,
};
const EMPTY_COLOR: Color = Color::Rgb {
    r: 0x60,
    g: 0x60,
    b: 0x60,
};
const GRADIENT_START: (u8, u8, u8) = (0x5A, 0x56, 0xE0);
const GRADIENT_END: (u8, u8, u8) = (0xEE, 0x6F, 0xF8);
const HELP_KEY_COLOR: Color = Color::Rgb {
    r: 0x90,
    g: 0x90,
    b: 0x90,
};
const HELP_DESCRIPTION_COLOR: Color = Color::Rgb {
    r: 0x62,
    g: 0x62,
    b: 0x62,
};

/// Raw-mode alternate screen, restored when dropped or on panic.
pub struct Terminal {
    stdout: Stdout,
}

impl Terminal {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;

        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore();
            original_hook(info);
        }));

        Ok(Self { stdout })
    }

    pub fn width(&self) -> io::Result<u16> {
        terminal::size().map(|(columns, _)| columns)
    }

    pub fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        draw_frame(&mut self.stdout, frame)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        restore();
    }
}

fn restore() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Redraws in place. Each line clears its own tail and the rows below the
/// frame are cleared last.
fn draw_frame(out: &mut impl Write, frame: &Frame) -> io::Result<()> {
    queue!(out, cursor::MoveTo(0, 0))?;
    for line in &frame.lines {
        for span in line {
            write_span(out, span)?;
        }
        queue!(
            out,
            terminal::Clear(terminal::ClearType::UntilNewLine),
            cursor::MoveToNextLine(1)
        )?;
    }
    queue!(out, terminal::Clear(terminal::ClearType::FromCursorDown))?;
    out.flush()
}

fn write_span(out: &mut impl Write, span: &Span) -> io::Result<()> {
    let text = span.text.as_str();
    match span.style {
        Style::Plain => queue!(out, PrintStyledContent(text.stylize())),
        Style::Filled => queue!(out, PrintStyledContent(text.with(FILLED_COLOR))),
        Style::Empty | Style::Track => queue!(out, PrintStyledContent(text.with(EMPTY_COLOR))),
        Style::Highlight => queue!(out, PrintStyledContent(text.attribute(Attribute::Reverse))),
        Style::HelpKey => queue!(out, PrintStyledContent(text.with(HELP_KEY_COLOR))),
        Style::HelpDescription => {
            queue!(out, PrintStyledContent(text.with(HELP_DESCRIPTION_COLOR)))
        }
        Style::Bar => {
            let cells = text.chars().count();
            for (index, glyph) in text.chars().enumerate() {
                queue!(out, PrintStyledContent(glyph.with(gradient(index, cells))))?;
            }
            Ok(())
        }
    }
}

fn gradient(index: usize, cells: usize) -> Color {
    let t = if cells > 1 {
        index as f32 / (cells - 1) as f32
    } else {
        0.0
    };
    let mix = |from: u8, to: u8| {
        let (from, to) = (f32::from(from), f32::from(to));
        (from + (to - from) * t).round() as u8
    };
    Color::Rgb {
        r: mix(GRADIENT_START.0, GRADIENT_END.0),
        g: mix(GRADIENT_START.1, GRADIENT_END.1),
        b: mix(GRADIENT_START.2, GRADIENT_END.2),
    }
}

/// Translates a crossterm key press into the core key set.
pub fn map_key(event: KeyEvent) -> Option<Key> {
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Interrupt)
        }
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Tab => Some(Key::Tab),
        KeyCode::Esc => Some(Key::Esc),
        _ => None,
    }
}
