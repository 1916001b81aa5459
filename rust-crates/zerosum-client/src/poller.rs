//! Keeps one game view fresh.
//!
//! A spawned worker re-reads the game on a cadence that depends on its lifecycle state, ticks
//! a local turn countdown between reads and pushes everything a front end needs as
//! [`PollEvent`]s. The worker stops on its own once the game is finished.

use crate::{
    chain::ChainReader,
    config::PollConfig,
    countdown::Countdown,
    projector::ViewFlags,
    reader::{
        GameLookup,
        ReadAdapter,
    },
    types::{
        ContractFamily,
        GameSnapshot,
        GameStatus,
        PlayerView,
    },
};
use alloy::primitives::Address;
use std::{
    fmt,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        Instant,
        Interval,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollState {
    Initial,
    PollingWaiting,
    PollingActive,
    IdleTerminal,
}

impl PollState {
    fn for_status(status: GameStatus) -> Self {
        match status {
            GameStatus::Waiting => PollState::PollingWaiting,
            GameStatus::Active => PollState::PollingActive,
            GameStatus::Finished => PollState::IdleTerminal,
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Initial => "initial",
            PollState::PollingWaiting => "polling-waiting",
            PollState::PollingActive => "polling-active",
            PollState::IdleTerminal => "idle-terminal",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollCommand {
    /// Fetch now, e.g. after a confirmed write or as a manual retry.
    RefreshNow,
    /// Recompute flags for another wallet without touching the chain.
    SetWallet(Option<Address>),
    Shutdown,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollEvent {
    Snapshot {
        snapshot: GameSnapshot,
        flags: ViewFlags,
        /// The wallet's own view, mystery games only.
        player_view: Option<PlayerView>,
    },
    Flags(ViewFlags),
    Transition {
        from: PollState,
        to: PollState,
    },
    Countdown(u64),
    CountdownExpired,
    NotFound(u64),
    Unavailable(u64),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FetchTrigger {
    Requested,
    Scheduled,
}

struct FetchOutcome {
    seq: u64,
    trigger: FetchTrigger,
    lookup: GameLookup,
    player_view: Option<PlayerView>,
}

struct InFlight {
    seq: u64,
    task: JoinHandle<()>,
}

/// Owner side of a running poller. Dropping it stops the worker.
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<PollCommand>,
    events: mpsc::UnboundedReceiver<PollEvent>,
    worker: JoinHandle<()>,
}

impl PollerHandle {
    /// Returns `false` once the worker has stopped.
    pub fn send(&self, command: PollCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn refresh(&self) -> bool {
        self.send(PollCommand::RefreshNow)
    }

    pub fn set_wallet(&self, wallet: Option<Address>) -> bool {
        self.send(PollCommand::SetWallet(wallet))
    }

    /// `None` once the worker has stopped and every event was drained.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<PollEvent> {
        self.events.try_recv().ok()
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(PollCommand::Shutdown);
        if let Err(err) = self.worker.await {
            warn!(?err, "poller worker did not stop cleanly");
        }
    }
}

pub fn spawn_poller<C: ChainReader>(
    reader: Arc<ReadAdapter<C>>,
    game_id: u64,
    wallet: Option<Address>,
    config: PollConfig,
) -> PollerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let poller = Poller::new(reader, game_id, wallet, config, event_tx);
    let worker = tokio::spawn(poller.run(command_rx));
    PollerHandle {
        commands: command_tx,
        events: event_rx,
        worker,
    }
}

fn repeating(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn fetch<C: ChainReader>(
    reader: &ReadAdapter<C>,
    game_id: u64,
    wallet: Option<Address>,
) -> (GameLookup, Option<PlayerView>) {
    match wallet.filter(|_| reader.family() == ContractFamily::Mystery) {
        Some(wallet) => tokio::join!(reader.game(game_id), reader.player_view(game_id, wallet)),
        None => (reader.game(game_id).await, None),
    }
}

struct Poller<C> {
    reader: Arc<ReadAdapter<C>>,
    game_id: u64,
    wallet: Option<Address>,
    config: PollConfig,
    state: PollState,
    snapshot: Option<GameSnapshot>,
    countdown: Countdown,
    expiry_reported: bool,
    // an unavailable first read is retried on the waiting cadence; not-found waits for a refresh
    retry_on_tick: bool,
    next_seq: u64,
    committed_seq: u64,
    in_flight: Option<InFlight>,
    poll_timer: Interval,
    tick_timer: Interval,
    events: mpsc::UnboundedSender<PollEvent>,
}

impl<C: ChainReader> Poller<C> {
    fn new(
        reader: Arc<ReadAdapter<C>>,
        game_id: u64,
        wallet: Option<Address>,
        config: PollConfig,
        events: mpsc::UnboundedSender<PollEvent>,
    ) -> Self {
        let poll_timer = repeating(config.waiting_interval());
        let tick_timer = repeating(config.tick_interval());
        Self {
            reader,
            game_id,
            wallet,
            config,
            state: PollState::Initial,
            snapshot: None,
            countdown: Countdown::default(),
            expiry_reported: false,
            retry_on_tick: false,
            next_seq: 0,
            committed_seq: 0,
            in_flight: None,
            poll_timer,
            tick_timer,
            events,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<PollCommand>) {
        let (result_tx, mut results) = mpsc::unbounded_channel();
        info!(game_id = self.game_id, "poller started");
        self.start_fetch(FetchTrigger::Requested, &result_tx);

        while self.state != PollState::IdleTerminal {
            let scheduled = self.polls_on_schedule();
            let ticking = self.state == PollState::PollingActive;
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(PollCommand::RefreshNow) => {
                            self.start_fetch(FetchTrigger::Requested, &result_tx)
                        }
                        Some(PollCommand::SetWallet(wallet)) => self.set_wallet(wallet),
                        Some(PollCommand::Shutdown) | None => break,
                    }
                }
                Some(outcome) = results.recv() => self.commit(outcome),
                _ = self.poll_timer.tick(), if scheduled => {
                    self.start_fetch(FetchTrigger::Scheduled, &result_tx)
                }
                _ = self.tick_timer.tick(), if ticking => self.tick_countdown(),
            }
        }
        self.teardown();
    }

    fn polls_on_schedule(&self) -> bool {
        match self.state {
            PollState::Initial => self.retry_on_tick,
            PollState::PollingWaiting | PollState::PollingActive => true,
            PollState::IdleTerminal => false,
        }
    }

    fn start_fetch(
        &mut self,
        trigger: FetchTrigger,
        results: &mpsc::UnboundedSender<FetchOutcome>,
    ) {
        if let Some(in_flight) = &self.in_flight
            && !in_flight.task.is_finished()
        {
            debug!(
                game_id = self.game_id,
                seq = in_flight.seq,
                ?trigger,
                "fetch already in flight; dropping refresh"
            );
            return;
        }
        self.next_seq += 1;
        let seq = self.next_seq;
        let reader = self.reader.clone();
        let game_id = self.game_id;
        let wallet = self.wallet;
        let results = results.clone();
        let task = tokio::spawn(async move {
            let (lookup, player_view) = fetch(&reader, game_id, wallet).await;
            let _ = results.send(FetchOutcome {
                seq,
                trigger,
                lookup,
                player_view,
            });
        });
        self.in_flight = Some(InFlight { seq, task });
    }

    fn commit(&mut self, outcome: FetchOutcome) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.seq == outcome.seq)
        {
            self.in_flight = None;
        }
        if outcome.seq <= self.committed_seq {
            debug!(
                game_id = self.game_id,
                seq = outcome.seq,
                committed = self.committed_seq,
                "discarding stale fetch result"
            );
            return;
        }
        self.committed_seq = outcome.seq;

        match outcome.lookup {
            GameLookup::Found(snapshot) => {
                self.apply(snapshot, outcome.player_view, outcome.trigger)
            }
            GameLookup::NotFound => {
                if self.state == PollState::Initial {
                    self.retry_on_tick = false;
                }
                self.emit(PollEvent::NotFound(self.game_id));
            }
            GameLookup::Unavailable => {
                if self.state == PollState::Initial {
                    self.retry_on_tick = true;
                }
                self.emit(PollEvent::Unavailable(self.game_id));
            }
        }
    }

    fn apply(
        &mut self,
        snapshot: GameSnapshot,
        player_view: Option<PlayerView>,
        trigger: FetchTrigger,
    ) {
        let flags = ViewFlags::project(&snapshot, self.wallet.as_ref());
        let next = PollState::for_status(snapshot.status);
        let time_left = snapshot.time_left;
        self.emit(PollEvent::Snapshot {
            snapshot: snapshot.clone(),
            flags,
            player_view,
        });
        self.snapshot = Some(snapshot);

        if next != self.state {
            self.transition(next, time_left);
        } else if self.state == PollState::PollingActive {
            self.reconcile(time_left, trigger);
        }
    }

    fn transition(&mut self, to: PollState, time_left: u64) {
        let from = self.state;
        self.state = to;
        self.retry_on_tick = false;
        info!(game_id = self.game_id, %from, %to, "poll state changed");
        self.emit(PollEvent::Transition { from, to });

        match to {
            PollState::PollingWaiting => {
                self.poll_timer = repeating(self.config.waiting_interval());
            }
            PollState::PollingActive => {
                self.poll_timer = repeating(self.config.active_interval());
                self.tick_timer = repeating(self.config.tick_interval());
                self.countdown = Countdown::new(time_left);
                self.expiry_reported = false;
                self.emit(PollEvent::Countdown(time_left));
                self.report_expiry();
            }
            PollState::Initial | PollState::IdleTerminal => {}
        }
    }

    fn reconcile(&mut self, time_left: u64, trigger: FetchTrigger) {
        let threshold = match trigger {
            FetchTrigger::Scheduled => self.config.resync_drift_threshold_secs,
            FetchTrigger::Requested => self.config.tick_drift_threshold_secs,
        };
        let local = self.countdown.remaining();
        if self.countdown.reconcile(time_left, threshold) {
            debug!(
                game_id = self.game_id,
                local,
                authoritative = time_left,
                threshold,
                "countdown drifted; snapping to chain"
            );
            self.emit(PollEvent::Countdown(time_left));
            self.report_expiry();
        }
    }

    fn tick_countdown(&mut self) {
        if self.countdown.is_expired() {
            return;
        }
        let remaining = self.countdown.elapse(self.config.tick_interval().as_secs());
        self.emit(PollEvent::Countdown(remaining));
        self.report_expiry();
    }

    fn report_expiry(&mut self) {
        if !self.countdown.is_expired() {
            self.expiry_reported = false;
        } else if !self.expiry_reported {
            self.expiry_reported = true;
            self.emit(PollEvent::CountdownExpired);
        }
    }

    fn set_wallet(&mut self, wallet: Option<Address>) {
        self.wallet = wallet;
        if let Some(snapshot) = &self.snapshot {
            let flags = ViewFlags::project(snapshot, wallet.as_ref());
            self.emit(PollEvent::Flags(flags));
        }
    }

    fn emit(&self, event: PollEvent) {
        if self.events.send(event).is_err() {
            debug!(game_id = self.game_id, "poll event receiver dropped");
        }
    }

    fn teardown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
        info!(game_id = self.game_id, state = %self.state, "poller stopped");
    }
}
