#![allow(non_snake_case)]

use super::*;
use crate::test_helpers::{
    ALICE,
    BOB,
    FakeChain,
    active_game,
    waiting_game,
};

fn start(chain: &FakeChain, game_id: u64, wallet: Option<Address>) -> PollerHandle {
    let reader = Arc::new(ReadAdapter::new(Arc::new(chain.clone())));
    spawn_poller(reader, game_id, wallet, PollConfig::default())
}

async fn next(handle: &mut PollerHandle) -> PollEvent {
    handle.next_event().await.expect("poller stopped early")
}

/// Skips ticks and other noise until a snapshot arrives.
async fn next_snapshot(handle: &mut PollerHandle) -> (GameSnapshot, ViewFlags) {
    loop {
        if let PollEvent::Snapshot { snapshot, flags, .. } = next(handle).await {
            return (snapshot, flags);
        }
    }
}

fn transition(from: PollState, to: PollState) -> PollEvent {
    PollEvent::Transition { from, to }
}

#[tokio::test(start_paused = true)]
async fn poller__waiting_game_redirects_to_active_when_it_starts() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(waiting_game(5), vec![ALICE]);
    let mut handle = start(&chain, 5, Some(BOB));

    // when
    let (snapshot, flags) = next_snapshot(&mut handle).await;
    assert_eq!(snapshot.status, GameStatus::Waiting);
    assert!(flags.can_join);
    assert_eq!(
        next(&mut handle).await,
        transition(PollState::Initial, PollState::PollingWaiting)
    );
    let started = Instant::now();
    chain.update_game(5, |record, players| {
        *record = active_game(5, ALICE);
        players.push(BOB);
    });

    // then
    let (snapshot, flags) = next_snapshot(&mut handle).await;
    assert!(started.elapsed() >= PollConfig::default().waiting_interval());
    assert_eq!(snapshot.status, GameStatus::Active);
    assert!(flags.is_user_in_game);
    assert!(!flags.is_my_turn);
    assert_eq!(
        next(&mut handle).await,
        transition(PollState::PollingWaiting, PollState::PollingActive)
    );
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(60));
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(59));
}

#[tokio::test(start_paused = true)]
async fn poller__finished_game_goes_idle_and_stops() {
    // given
    let chain = FakeChain::new();
    let mut finished = active_game(3, ALICE);
    finished.status = GameStatus::Finished;
    finished.winner = Some(ALICE);
    chain.insert_game(finished, vec![ALICE, BOB]);

    // when
    let mut handle = start(&chain, 3, Some(ALICE));

    // then
    let (snapshot, _) = next_snapshot(&mut handle).await;
    assert_eq!(snapshot.winner, Some(ALICE));
    assert_eq!(
        next(&mut handle).await,
        transition(PollState::Initial, PollState::IdleTerminal)
    );
    assert_eq!(handle.next_event().await, None);
    assert!(!handle.refresh());
}

#[tokio::test(start_paused = true)]
async fn poller__not_found_waits_for_manual_refresh() {
    // given
    let chain = FakeChain::new();
    let mut handle = start(&chain, 9, None);
    assert_eq!(next(&mut handle).await, PollEvent::NotFound(9));

    // when
    chain.insert_game(waiting_game(9), vec![ALICE]);
    time::sleep(Duration::from_secs(60)).await;

    // then
    assert_eq!(handle.try_next_event(), None);
    assert!(handle.refresh());
    let (snapshot, _) = next_snapshot(&mut handle).await;
    assert_eq!(snapshot.game_id, 9);
}

#[tokio::test(start_paused = true)]
async fn poller__unavailable_first_read_retries_on_waiting_cadence() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(waiting_game(5), vec![ALICE]);
    chain.fail_call("gameCounter");
    let started = Instant::now();
    let mut handle = start(&chain, 5, None);

    // when
    assert_eq!(next(&mut handle).await, PollEvent::Unavailable(5));
    chain.restore_call("gameCounter");

    // then
    let (snapshot, _) = next_snapshot(&mut handle).await;
    assert_eq!(snapshot.game_id, 5);
    assert!(started.elapsed() >= PollConfig::default().waiting_interval());
}

#[tokio::test(start_paused = true)]
async fn poller__refresh_during_in_flight_fetch_is_dropped() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(waiting_game(5), vec![ALICE]);
    chain.set_read_delay(Duration::from_secs(5));
    let mut handle = start(&chain, 5, None);

    // when
    assert!(handle.refresh());
    assert!(handle.refresh());
    next_snapshot(&mut handle).await;

    // then
    assert_eq!(chain.game_record_reads(), 1);
    assert_eq!(
        next(&mut handle).await,
        transition(PollState::Initial, PollState::PollingWaiting)
    );
}

#[tokio::test(start_paused = true)]
async fn poller__wallet_change_recomputes_flags_without_fetching() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(waiting_game(5), vec![ALICE]);
    let mut handle = start(&chain, 5, None);
    let (_, flags) = next_snapshot(&mut handle).await;
    assert_eq!(flags, ViewFlags::default());
    next(&mut handle).await;

    // when
    assert!(handle.set_wallet(Some(ALICE)));

    // then
    let PollEvent::Flags(flags) = next(&mut handle).await else {
        panic!("expected a flags event");
    };
    assert!(flags.is_user_creator);
    assert!(!flags.can_join);
    assert_eq!(chain.game_record_reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn poller__countdown_expires_once() {
    // given
    let chain = FakeChain::new();
    let mut game = active_game(5, BOB);
    game.time_left = 2;
    chain.insert_game(game, vec![ALICE, BOB]);

    // when
    let mut handle = start(&chain, 5, Some(BOB));
    let (_, flags) = next_snapshot(&mut handle).await;

    // then
    assert!(flags.is_my_turn);
    assert_eq!(
        next(&mut handle).await,
        transition(PollState::Initial, PollState::PollingActive)
    );
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(2));
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(1));
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(0));
    assert_eq!(next(&mut handle).await, PollEvent::CountdownExpired);
    // the next event is the scheduled resync, not another expiry
    assert!(matches!(next(&mut handle).await, PollEvent::Snapshot { .. }));
}

#[tokio::test(start_paused = true)]
async fn poller__requested_refresh_snaps_countdown_past_tick_threshold() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(active_game(5, BOB), vec![ALICE, BOB]);
    let mut handle = start(&chain, 5, None);
    next_snapshot(&mut handle).await;
    next(&mut handle).await;
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(60));

    // when
    chain.update_game(5, |record, _| record.time_left = 30);
    assert!(handle.refresh());

    // then
    next_snapshot(&mut handle).await;
    assert_eq!(next(&mut handle).await, PollEvent::Countdown(30));
}

#[tokio::test(start_paused = true)]
async fn poller__finishing_game_stops_the_worker() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(active_game(5, BOB), vec![ALICE, BOB]);
    let mut handle = start(&chain, 5, None);
    next_snapshot(&mut handle).await;

    // when
    chain.update_game(5, |record, _| {
        record.status = GameStatus::Finished;
        record.winner = Some(BOB);
    });
    assert!(handle.refresh());

    // then
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    assert!(events.contains(&transition(PollState::PollingActive, PollState::IdleTerminal)));
}

#[tokio::test(start_paused = true)]
async fn shutdown__aborts_in_flight_fetch() {
    // given
    let chain = FakeChain::new();
    chain.insert_game(waiting_game(5), vec![ALICE]);
    chain.set_read_delay(Duration::from_secs(30));
    let handle = start(&chain, 5, None);
    tokio::task::yield_now().await;

    // when
    handle.shutdown().await;
    time::sleep(Duration::from_secs(60)).await;

    // then
    assert!(chain.game_record_reads() <= 1);
}

#[tokio::test]
async fn commit__discards_responses_older_than_the_last_committed() {
    // given
    let chain = FakeChain::new();
    let reader = Arc::new(ReadAdapter::new(Arc::new(chain)));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut poller = Poller::new(reader, 5, None, PollConfig::default(), event_tx);
    let newer = waiting_game(5).into_snapshot(vec![ALICE]);
    let mut older = newer.clone();
    older.players.clear();

    // when
    poller.commit(FetchOutcome {
        seq: 2,
        trigger: FetchTrigger::Requested,
        lookup: GameLookup::Found(newer.clone()),
        player_view: None,
    });
    poller.commit(FetchOutcome {
        seq: 1,
        trigger: FetchTrigger::Requested,
        lookup: GameLookup::Found(older),
        player_view: None,
    });

    // then
    assert_eq!(poller.snapshot, Some(newer));
    assert!(matches!(event_rx.try_recv(), Ok(PollEvent::Snapshot { .. })));
    assert!(matches!(event_rx.try_recv(), Ok(PollEvent::Transition { .. })));
    assert!(event_rx.try_recv().is_err());
}

fn active_poller(time_left: u64) -> (Poller<FakeChain>, mpsc::UnboundedReceiver<PollEvent>) {
    let reader = Arc::new(ReadAdapter::new(Arc::new(FakeChain::new())));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut poller = Poller::new(reader, 5, None, PollConfig::default(), event_tx);
    poller.commit(active_outcome(1, FetchTrigger::Requested, time_left));
    assert!(matches!(event_rx.try_recv(), Ok(PollEvent::Snapshot { .. })));
    assert_eq!(
        event_rx.try_recv(),
        Ok(transition(PollState::Initial, PollState::PollingActive))
    );
    assert_eq!(event_rx.try_recv(), Ok(PollEvent::Countdown(time_left)));
    (poller, event_rx)
}

fn active_outcome(seq: u64, trigger: FetchTrigger, time_left: u64) -> FetchOutcome {
    let mut record = active_game(5, BOB);
    record.time_left = time_left;
    FetchOutcome {
        seq,
        trigger,
        lookup: GameLookup::Found(record.into_snapshot(vec![ALICE, BOB])),
        player_view: None,
    }
}

/// Drains queued events and returns the countdown values among them.
fn countdowns(events: &mut mpsc::UnboundedReceiver<PollEvent>) -> Vec<u64> {
    let mut values = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let PollEvent::Countdown(secs) = event {
            values.push(secs);
        }
    }
    values
}

#[tokio::test(start_paused = true)]
async fn reconcile__scheduled_resync_tolerates_drift_within_ten_seconds() {
    // given
    let (mut poller, mut events) = active_poller(60);

    // when
    poller.commit(active_outcome(2, FetchTrigger::Scheduled, 55));

    // then
    assert_eq!(countdowns(&mut events), Vec::<u64>::new());
    assert_eq!(poller.countdown.remaining(), 60);
}

#[tokio::test(start_paused = true)]
async fn reconcile__scheduled_resync_snaps_drift_past_ten_seconds() {
    // given
    let (mut poller, mut events) = active_poller(60);

    // when
    poller.commit(active_outcome(2, FetchTrigger::Scheduled, 49));

    // then
    assert_eq!(countdowns(&mut events), vec![49]);
    assert_eq!(poller.countdown.remaining(), 49);
}

#[tokio::test(start_paused = true)]
async fn reconcile__requested_refresh_tolerates_drift_within_two_seconds() {
    // given
    let (mut poller, mut events) = active_poller(60);

    // when
    poller.commit(active_outcome(2, FetchTrigger::Requested, 58));

    // then
    assert_eq!(countdowns(&mut events), Vec::<u64>::new());
    assert_eq!(poller.countdown.remaining(), 60);
}

#[tokio::test(start_paused = true)]
async fn reconcile__requested_refresh_snaps_drift_a_resync_would_keep() {
    // given
    let (mut poller, mut events) = active_poller(60);

    // when
    poller.commit(active_outcome(2, FetchTrigger::Requested, 55));

    // then
    assert_eq!(countdowns(&mut events), vec![55]);
    assert_eq!(poller.countdown.remaining(), 55);
}
