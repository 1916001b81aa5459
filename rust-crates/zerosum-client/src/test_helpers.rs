//! In-memory fakes of the chain seams, shared by unit tests and downstream crates.

use crate::{
    chain::{
        ChainReader,
        ChainWriter,
        GameRecord,
        TxConfirmation,
        TxRequest,
    },
    types::{
        BetRecord,
        BettingInfo,
        ContractFamily,
        GameMode,
        GameStatus,
        PlayerView,
    },
    writer::{
        Notice,
        Notifier,
    },
};
use alloy::primitives::{
    Address,
    B256,
    U256,
    address,
};
use anyhow::bail;
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Duration,
};

pub const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
pub const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

pub fn waiting_game(game_id: u64) -> GameRecord {
    GameRecord {
        game_id,
        mode: GameMode::QuickDraw,
        status: GameStatus::Waiting,
        current_player: None,
        winner: None,
        max_players: 2,
        entry_fee: U256::from(1_000u64),
        prize_pool: U256::from(1_000u64),
        move_count: 0,
        time_left: 0,
        current_number: Some(U256::from(100u64)),
    }
}

pub fn active_game(game_id: u64, current_player: Address) -> GameRecord {
    GameRecord {
        status: GameStatus::Active,
        current_player: Some(current_player),
        prize_pool: U256::from(2_000u64),
        time_left: 60,
        ..waiting_game(game_id)
    }
}

fn zero_record(game_id: u64) -> GameRecord {
    GameRecord {
        game_id,
        mode: GameMode::QuickDraw,
        status: GameStatus::Waiting,
        current_player: None,
        winner: None,
        max_players: 0,
        entry_fee: U256::ZERO,
        prize_pool: U256::ZERO,
        move_count: 0,
        time_left: 0,
        current_number: None,
    }
}

#[derive(Default)]
struct FakeState {
    counter: u64,
    games: HashMap<u64, (GameRecord, Vec<Address>)>,
    player_views: HashMap<(u64, Address), PlayerView>,
    betting: HashMap<u64, BettingInfo>,
    bets: HashMap<Address, Vec<BetRecord>>,
    failing: HashSet<String>,
    read_delay: Option<Duration>,
    record_reads: usize,
    signer: Option<Address>,
    submit_rejection: Option<String>,
    submit_attempts: usize,
    submitted: Vec<TxRequest>,
    fail_next_receipt: bool,
    next_created_game_id: Option<u64>,
}

/// A chain that lives in memory. Clones share state, so a test can keep one handle to script
/// the chain while the code under test owns another.
#[derive(Clone)]
pub struct FakeChain {
    family: ContractFamily,
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChain {
    pub fn new() -> Self {
        Self::for_family(ContractFamily::Standard)
    }

    pub fn for_family(family: ContractFamily) -> Self {
        Self {
            family,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    pub fn with_signer(self, signer: Address) -> Self {
        self.state().signer = Some(signer);
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Stores a game and bumps the counter to cover its id.
    pub fn insert_game(&self, record: GameRecord, players: Vec<Address>) {
        let mut state = self.state();
        state.counter = state.counter.max(record.game_id);
        state.games.insert(record.game_id, (record, players));
    }

    pub fn update_game(&self, game_id: u64, update: impl FnOnce(&mut GameRecord, &mut Vec<Address>)) {
        let mut state = self.state();
        if let Some((record, players)) = state.games.get_mut(&game_id) {
            update(record, players);
        }
    }

    pub fn set_counter(&self, counter: u64) {
        self.state().counter = counter;
    }

    pub fn insert_player_view(&self, game_id: u64, player: Address, view: PlayerView) {
        self.state().player_views.insert((game_id, player), view);
    }

    pub fn set_betting_info(&self, game_id: u64, info: BettingInfo) {
        self.state().betting.insert(game_id, info);
    }

    pub fn insert_bet(&self, bettor: Address, bet: BetRecord) {
        self.state().bets.entry(bettor).or_default().push(bet);
    }

    /// Makes every later call to the named contract function fail.
    pub fn fail_call(&self, function: &str) {
        self.state().failing.insert(function.to_string());
    }

    pub fn restore_call(&self, function: &str) {
        self.state().failing.remove(function);
    }

    /// Delays every `getGame` read, measured on the tokio clock.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state().read_delay = Some(delay);
    }

    pub fn game_record_reads(&self) -> usize {
        self.state().record_reads
    }

    pub fn reject_next_submit(&self, message: &str) {
        self.state().submit_rejection = Some(message.to_string());
    }

    pub fn fail_next_receipt(&self) {
        self.state().fail_next_receipt = true;
    }

    pub fn set_next_created_game_id(&self, game_id: u64) {
        self.state().next_created_game_id = Some(game_id);
    }

    pub fn submit_attempts(&self) -> usize {
        self.state().submit_attempts
    }

    /// Requests that made it past submission.
    pub fn submitted(&self) -> Vec<TxRequest> {
        self.state().submitted.clone()
    }

    fn check(&self, function: &str) -> anyhow::Result<()> {
        if self.state().failing.contains(function) {
            bail!("{function} call failed: connection refused");
        }
        Ok(())
    }
}

impl ChainReader for FakeChain {
    fn family(&self) -> ContractFamily {
        self.family
    }

    async fn game_counter(&self) -> anyhow::Result<u64> {
        self.check("gameCounter")?;
        Ok(self.state().counter)
    }

    async fn game_record(&self, game_id: u64) -> anyhow::Result<GameRecord> {
        let delay = {
            let mut state = self.state();
            state.record_reads += 1;
            state.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check("getGame")?;
        let state = self.state();
        Ok(state
            .games
            .get(&game_id)
            .map(|(record, _)| record.clone())
            .unwrap_or_else(|| zero_record(game_id)))
    }

    async fn players(&self, game_id: u64) -> anyhow::Result<Vec<Address>> {
        self.check("getPlayers")?;
        let state = self.state();
        Ok(state
            .games
            .get(&game_id)
            .map(|(_, players)| players.clone())
            .unwrap_or_default())
    }

    async fn player_view(
        &self,
        game_id: u64,
        player: Address,
    ) -> anyhow::Result<Option<PlayerView>> {
        self.check("getPlayerView")?;
        if self.family == ContractFamily::Standard {
            return Ok(None);
        }
        Ok(self.state().player_views.get(&(game_id, player)).cloned())
    }

    async fn is_game_bettable(&self, game_id: u64) -> anyhow::Result<bool> {
        self.check("isGameBettable")?;
        let state = self.state();
        Ok(state
            .games
            .get(&game_id)
            .is_some_and(|(record, _)| record.status != GameStatus::Finished))
    }

    async fn betting_info(&self, game_id: u64) -> anyhow::Result<BettingInfo> {
        self.check("getGameBettingInfo")?;
        Ok(self.state().betting.get(&game_id).cloned().unwrap_or_default())
    }

    async fn has_user_bet(&self, game_id: u64, user: Address) -> anyhow::Result<bool> {
        self.check("hasUserBetOnGame")?;
        Ok(self.user_bet_now(game_id, user).is_some())
    }

    async fn user_bet(&self, game_id: u64, user: Address) -> anyhow::Result<Option<BetRecord>> {
        self.check("getUserBetInfo")?;
        Ok(self.user_bet_now(game_id, user))
    }

    async fn betting_history(&self, user: Address) -> anyhow::Result<Vec<BetRecord>> {
        self.check("getUserBettingHistoryDetailed")?;
        Ok(self.state().bets.get(&user).cloned().unwrap_or_default())
    }
}

impl FakeChain {
    fn user_bet_now(&self, game_id: u64, user: Address) -> Option<BetRecord> {
        self.state()
            .bets
            .get(&user)
            .and_then(|bets| bets.iter().find(|bet| bet.game_id == game_id).cloned())
    }
}

/// Receipt the fake hands back from `submit` for `confirm` to resolve.
#[derive(Clone, Debug)]
pub struct FakePending {
    confirmation: TxConfirmation,
}

impl ChainWriter for FakeChain {
    type Pending = FakePending;

    fn signer(&self) -> Option<Address> {
        self.state().signer
    }

    async fn submit(&self, request: &TxRequest) -> anyhow::Result<(B256, FakePending)> {
        let mut state = self.state();
        state.submit_attempts += 1;
        if let Some(message) = state.submit_rejection.take() {
            bail!("{message}");
        }
        state.submitted.push(request.clone());
        let tx_hash = B256::with_last_byte(state.submitted.len() as u8);
        let created_game_id = match request {
            TxRequest::CreateGame { .. } => state.next_created_game_id.take(),
            _ => None,
        };
        let succeeded = !std::mem::take(&mut state.fail_next_receipt);
        Ok((
            tx_hash,
            FakePending {
                confirmation: TxConfirmation {
                    tx_hash,
                    succeeded,
                    created_game_id,
                },
            },
        ))
    }

    async fn confirm(&self, pending: FakePending) -> anyhow::Result<TxConfirmation> {
        Ok(pending.confirmation)
    }
}

/// Keeps every notice so tests can assert on what the user would have seen.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
