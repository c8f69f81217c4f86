use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::audio::ClickPlayer;
use crate::timeline::Ticker;
use crate::{MetronomeError, Result};

/// Message emitted by the scheduler worker into the event stream.
#[derive(Debug)]
pub enum SchedulerEvent {
    /// The ticker fired after a click finished playing.
    Tick,
    /// Playback or rewinding failed; the worker has exited.
    Failed(MetronomeError),
}

/// Runs the click-then-wait loop on a dedicated worker thread.
///
/// The worker owns the [`ClickPlayer`] and only talks to the rest of the
/// program by sending [`SchedulerEvent`]s, so a blocked click never stalls
/// input handling or rendering.
#[derive(Debug)]
pub struct MetronomeScheduler {
    ticker: Ticker,
    worker: Option<JoinHandle<()>>,
}

impl MetronomeScheduler {
    /// Starts the worker. `open_player` runs on the worker thread and any
    /// error it returns is reported here before the loop starts.
    pub fn spawn<P, F, E>(open_player: F, ticker: Ticker, events: Sender<E>) -> Result<Self>
    where
        P: ClickPlayer,
        F: FnOnce() -> Result<P> + Send + 'static,
        E: From<SchedulerEvent> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel();
        let worker_ticker = ticker.clone();

        let worker = thread::Builder::new()
            .name("metronome-scheduler".into())
            .spawn(move || {
                let player = match open_player() {
                    Ok(player) => {
                        let _ = ready_tx.send(Ok(()));
                        player
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                run(player, &worker_ticker, &events);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = worker.join();
                return Err(err);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(MetronomeError::msg("scheduler worker exited during startup"));
            }
        }

        tracing::info!("metronome scheduler started");
        Ok(Self {
            ticker,
            worker: Some(worker),
        })
    }

    /// Handle to the timer the worker waits on.
    pub fn ticker(&self) -> Ticker {
        self.ticker.clone()
    }

    /// Closes the ticker and waits for the worker to finish its current click.
    pub fn shutdown(&mut self) {
        self.ticker.shutdown();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("metronome scheduler panicked");
            }
            tracing::info!("metronome scheduler stopped");
        }
    }
}

impl Drop for MetronomeScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<P, E>(mut player: P, ticker: &Ticker, events: &Sender<E>)
where
    P: ClickPlayer,
    E: From<SchedulerEvent>,
{
    loop {
        if let Err(err) = player.play().and_then(|()| player.rewind()) {
            tracing::error!(%err, "click playback failed");
            let _ = events.send(SchedulerEvent::Failed(err).into());
            return;
        }

        if ticker.wait().is_none() {
            return;
        }
        if events.send(SchedulerEvent::Tick.into()).is_err() {
            // Nobody is listening anymore.
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    struct CountingPlayer {
        plays: Arc<AtomicUsize>,
        rewinds: Arc<AtomicUsize>,
        fail_rewind_after: Option<usize>,
    }

    impl ClickPlayer for CountingPlayer {
        fn play(&mut self) -> Result<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rewind(&mut self) -> Result<()> {
            let rewound = self.rewinds.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_rewind_after {
                Some(limit) if rewound > limit => {
                    Err(MetronomeError::Rewind("seek failed".into()))
                }
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn emits_a_tick_after_each_click() {
        let player = CountingPlayer::default();
        let plays = player.plays.clone();
        let ticker = Ticker::new();
        ticker.reset(Duration::from_millis(5));

        let (tx, rx) = mpsc::channel::<SchedulerEvent>();
        let mut scheduler = MetronomeScheduler::spawn(move || Ok(player), ticker, tx).unwrap();

        for _ in 0..3 {
            let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(matches!(event, SchedulerEvent::Tick));
        }
        scheduler.shutdown();
        assert!(plays.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn disarmed_ticker_plays_once_then_waits() {
        let player = CountingPlayer::default();
        let plays = player.plays.clone();
        let (tx, rx) = mpsc::channel::<SchedulerEvent>();
        let mut scheduler =
            MetronomeScheduler::spawn(move || Ok(player), Ticker::new(), tx).unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(plays.load(Ordering::SeqCst), 1);

        scheduler.ticker().reset(Duration::from_millis(5));
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        scheduler.shutdown();
    }

    #[test]
    fn rewind_failure_is_reported_and_stops_the_worker() {
        let player = CountingPlayer {
            fail_rewind_after: Some(1),
            ..CountingPlayer::default()
        };
        let ticker = Ticker::new();
        ticker.reset(Duration::from_millis(5));

        let (tx, rx) = mpsc::channel::<SchedulerEvent>();
        let mut scheduler = MetronomeScheduler::spawn(move || Ok(player), ticker, tx).unwrap();

        let events: Vec<SchedulerEvent> = rx.iter().take(2).collect();
        assert!(matches!(events[0], SchedulerEvent::Tick));
        assert!(matches!(events[1], SchedulerEvent::Failed(MetronomeError::Rewind(_))));
        scheduler.shutdown();
    }

    #[test]
    fn player_open_failure_is_returned_from_spawn() {
        let (tx, _rx) = mpsc::channel::<SchedulerEvent>();
        let result = MetronomeScheduler::spawn(
            || -> Result<CountingPlayer> { Err(MetronomeError::AudioInit("no device".into())) },
            Ticker::new(),
            tx,
        );
        assert!(matches!(result, Err(MetronomeError::AudioInit(_))));
    }

    #[test]
    fn shutdown_joins_a_waiting_worker() {
        let (tx, _rx) = mpsc::channel::<SchedulerEvent>();
        let mut scheduler =
            MetronomeScheduler::spawn(|| Ok(CountingPlayer::default()), Ticker::new(), tx).unwrap();
        scheduler.shutdown();
        assert!(scheduler.worker.is_none());
    }
}
