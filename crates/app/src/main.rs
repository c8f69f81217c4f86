mod terminal;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use metronome_core::{
    AppConfig, ClickSample, Control, Event, MetronomeScheduler, Renderer, Session, Speaker,
    TempoConfig, Ticker,
};
use tracing_subscriber::EnvFilter;

use crate::terminal::Terminal;

const INPUT_POLL: Duration = Duration::from_millis(50);

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("failed to open log file: {err}");
        return ExitCode::FAILURE;
    }

    let config = cli.config();
    if cli.print_config {
        return match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "metronome terminated");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: AppConfig) -> metronome_core::Result<()> {
    tracing::info!(
        bpm = config.tempo.bpm,
        numerator = config.tempo.numerator,
        denominator = config.tempo.denominator,
        "starting metronome"
    );

    let click = ClickSample::wood_block()?;
    let buffer_divisor = config.audio.buffer_divisor;
    let (events_tx, events_rx) = mpsc::channel::<Event>();

    let mut scheduler = MetronomeScheduler::spawn(
        move || Speaker::open(click, buffer_divisor),
        Ticker::new(),
        events_tx.clone(),
    )?;
    let mut session = Session::new(&config, scheduler.ticker());
    let renderer = Renderer::new(config.display.clone());

    let mut terminal = Terminal::enter()?;
    session.handle(Event::Resize(terminal.width()?))?;

    let stop = Arc::new(AtomicBool::new(false));
    let refresh = Duration::from_secs(1) / config.display.refresh_hz.max(1);
    let workers = [
        spawn_input(events_tx.clone(), stop.clone())?,
        spawn_frames(events_tx, stop.clone(), refresh)?,
    ];

    let outcome = event_loop(&mut session, &events_rx, &mut terminal, &renderer);

    stop.store(true, Ordering::SeqCst);
    scheduler.shutdown();
    for worker in workers {
        if worker.join().is_err() {
            tracing::error!("ui worker panicked");
        }
    }
    drop(terminal);

    tracing::info!("metronome stopped");
    outcome
}

fn event_loop(
    session: &mut Session,
    events: &Receiver<Event>,
    terminal: &mut Terminal,
    renderer: &Renderer,
) -> metronome_core::Result<()> {
    terminal.draw(&renderer.render(&session.snapshot()))?;
    for event in events {
        match session.handle(event)? {
            Control::Quit => break,
            Control::Continue => terminal.draw(&renderer.render(&session.snapshot()))?,
        }
    }
    Ok(())
}

fn spawn_input(events: Sender<Event>, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match event::poll(INPUT_POLL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(err) => {
                        tracing::error!(%err, "failed to poll terminal input");
                        return;
                    }
                }
                let forwarded = match event::read() {
                    Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        terminal::map_key(key).map(|key| Event::Key(key, Instant::now()))
                    }
                    Ok(TermEvent::Resize(columns, _)) => Some(Event::Resize(columns)),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::error!(%err, "failed to read terminal input");
                        return;
                    }
                };
                if let Some(event) = forwarded {
                    if events.send(event).is_err() {
                        return;
                    }
                }
            }
        })
}

fn spawn_frames(
    events: Sender<Event>,
    stop: Arc<AtomicBool>,
    period: Duration,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("frames".into())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(period);
                if events.send(Event::Frame).is_err() {
                    return;
                }
            }
        })
}

fn init_tracing(log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env();
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter.unwrap_or_else(|_| EnvFilter::new("info")))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        // The UI owns stdout, so stderr logging is opt-in through RUST_LOG.
        None => {
            if let Ok(filter) = filter {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .try_init();
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal metronome with tap tempo", long_about = None)]
struct Cli {
    /// Starting tempo in beats per minute (1-240).
    #[arg(short, long, default_value_t = 60)]
    bpm: u32,
    /// Starting time signature, e.g. `3/4` (each part 1-16).
    #[arg(short, long, default_value = "4/4", value_parser = parse_signature)]
    time_signature: (u32, u32),
    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Print the resolved configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn config(&self) -> AppConfig {
        let (numerator, denominator) = self.time_signature;
        AppConfig {
            tempo: TempoConfig {
                bpm: self.bpm,
                numerator,
                denominator,
            },
            ..AppConfig::default()
        }
        .normalized()
    }
}

fn parse_signature(value: &str) -> Result<(u32, u32), String> {
    let (numerator, denominator) = value
        .split_once('/')
        .ok_or_else(|| format!("expected NUMERATOR/DENOMINATOR, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid time signature `{value}`: {err}"))
    };
    Ok((parse(numerator)?, parse(denominator)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_startup_state() {
        let cli = Cli::try_parse_from(["metronome"]).unwrap();
        assert_eq!(cli.config(), AppConfig::default());
        assert!(!cli.print_config);
    }

    #[test]
    fn parses_tempo_and_signature() {
        let cli = Cli::try_parse_from(["metronome", "--bpm", "132", "-t", "7/8"]).unwrap();
        let config = cli.config();
        assert_eq!(config.tempo.bpm, 132);
        assert_eq!((config.tempo.numerator, config.tempo.denominator), (7, 8));
    }

    #[test]
    fn out_of_range_values_are_saturated() {
        let cli = Cli::try_parse_from(["metronome", "--bpm", "500", "-t", "0/99"]).unwrap();
        let config = cli.config();
        assert_eq!(config.tempo.bpm, 240);
        assert_eq!((config.tempo.numerator, config.tempo.denominator), (1, 16));
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert!(Cli::try_parse_from(["metronome", "-t", "four"]).is_err());
        assert!(Cli::try_parse_from(["metronome", "-t", "4/x"]).is_err());
    }
}
