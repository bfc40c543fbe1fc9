//! Silent playback clock.
//!
//! Stands in for mpv when no audio backend is available: it only advances a
//! position and reports it on every tick, which is enough to drive lyrics.

use crate::app::events::{Event, PlayerEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug)]
enum ClockCommand {
    Load,
    TogglePause,
    Seek(f64),
}

#[derive(Debug, Clone)]
pub struct ClockHandle {
    tx: mpsc::Sender<ClockCommand>,
}

impl ClockHandle {
    pub fn spawn(event_tx: mpsc::Sender<Event>, tick: Duration) -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(run_clock(rx, event_tx, tick.max(Duration::from_millis(10))));
        Self { tx }
    }

    /// Restart from zero, playing.
    pub async fn load(&self) -> anyhow::Result<()> {
        self.send(ClockCommand::Load).await
    }

    pub async fn toggle_pause(&self) -> anyhow::Result<()> {
        self.send(ClockCommand::TogglePause).await
    }

    pub async fn seek_relative(&self, seconds: f64) -> anyhow::Result<()> {
        self.send(ClockCommand::Seek(seconds)).await
    }

    async fn send(&self, cmd: ClockCommand) -> anyhow::Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| anyhow::anyhow!("playback clock stopped"))
    }
}

/// Position bookkeeping, separate from the task so it can be tested with
/// explicit instants.
#[derive(Debug, Clone, Copy)]
struct Position {
    base: f64,
    started: Option<Instant>,
}

impl Position {
    fn stopped() -> Self {
        Self { base: 0.0, started: None }
    }

    fn at(&self, now: Instant) -> f64 {
        match self.started {
            Some(t) => self.base + now.saturating_duration_since(t).as_secs_f64(),
            None => self.base,
        }
    }

    fn is_running(&self) -> bool {
        self.started.is_some()
    }

    fn restart(&mut self, now: Instant) {
        self.base = 0.0;
        self.started = Some(now);
    }

    fn toggle(&mut self, now: Instant) {
        if self.is_running() {
            self.base = self.at(now);
            self.started = None;
        } else {
            self.started = Some(now);
        }
    }

    fn seek(&mut self, delta: f64, now: Instant) {
        self.base = (self.at(now) + delta).max(0.0);
        if self.is_running() {
            self.started = Some(now);
        }
    }
}

async fn run_clock(mut rx: mpsc::Receiver<ClockCommand>, event_tx: mpsc::Sender<Event>, tick: Duration) {
    let mut position = Position::stopped();
    let mut loaded = false;
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    return;
                };
                let now = Instant::now();
                match cmd {
                    ClockCommand::Load => {
                        loaded = true;
                        position.restart(now);
                        Some(PlayerEvent::Started)
                    }
                    ClockCommand::TogglePause if loaded => {
                        position.toggle(now);
                        Some(if position.is_running() { PlayerEvent::Started } else { PlayerEvent::Paused })
                    }
                    ClockCommand::TogglePause => None,
                    ClockCommand::Seek(delta) => {
                        position.seek(delta, now);
                        Some(PlayerEvent::Position { seconds: position.at(now) })
                    }
                }
            }
            _ = interval.tick() => {
                position
                    .is_running()
                    .then(|| PlayerEvent::Position { seconds: position.at(Instant::now()) })
            }
        };

        if let Some(ev) = event
            && event_tx.send(Event::Player(ev)).await.is_err()
        {
            return;
        }
    }
}
