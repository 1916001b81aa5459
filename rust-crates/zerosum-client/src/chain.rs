//! Seams between the adapters and whatever actually talks to the chain.

use crate::types::{
    BetRecord,
    BettingInfo,
    ContractFamily,
    GameMode,
    GameSnapshot,
    GameStatus,
    PlayerView,
};
use alloy::primitives::{
    Address,
    B256,
    U256,
};
use std::fmt;

/// A game record as returned by `getGame`, before the player list is joined in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameRecord {
    pub game_id: u64,
    pub mode: GameMode,
    pub status: GameStatus,
    pub current_player: Option<Address>,
    pub winner: Option<Address>,
    pub max_players: usize,
    pub entry_fee: U256,
    pub prize_pool: U256,
    pub move_count: u64,
    pub time_left: u64,
    pub current_number: Option<U256>,
}

impl GameRecord {
    /// Contracts answer unknown ids with a zeroed struct rather than a revert.
    pub fn is_zero_value(&self) -> bool {
        self.status == GameStatus::Waiting
            && self.current_player.is_none()
            && self.winner.is_none()
            && self.entry_fee.is_zero()
            && self.prize_pool.is_zero()
            && self.move_count == 0
            && self.max_players == 0
    }

    pub fn into_snapshot(self, players: Vec<Address>) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id,
            mode: self.mode,
            status: self.status,
            current_player: self.current_player,
            players,
            max_players: self.max_players,
            entry_fee: self.entry_fee,
            prize_pool: self.prize_pool,
            winner: self.winner,
            move_count: self.move_count,
            time_left: self.time_left,
            current_number: self.current_number,
        }
    }
}

pub trait ChainReader: Send + Sync + 'static {
    fn family(&self) -> ContractFamily;

    /// Number of games created so far; ids run from 1 to this value.
    fn game_counter(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    fn game_record(
        &self,
        game_id: u64,
    ) -> impl Future<Output = anyhow::Result<GameRecord>> + Send;

    fn players(
        &self,
        game_id: u64,
    ) -> impl Future<Output = anyhow::Result<Vec<Address>>> + Send;

    /// `Ok(None)` for families that have no per-player view.
    fn player_view(
        &self,
        game_id: u64,
        player: Address,
    ) -> impl Future<Output = anyhow::Result<Option<PlayerView>>> + Send;

    fn is_game_bettable(
        &self,
        game_id: u64,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn betting_info(
        &self,
        game_id: u64,
    ) -> impl Future<Output = anyhow::Result<BettingInfo>> + Send;

    fn has_user_bet(
        &self,
        game_id: u64,
        user: Address,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// `Ok(None)` when the user has no bet on the game.
    fn user_bet(
        &self,
        game_id: u64,
        user: Address,
    ) -> impl Future<Output = anyhow::Result<Option<BetRecord>>> + Send;

    fn betting_history(
        &self,
        user: Address,
    ) -> impl Future<Output = anyhow::Result<Vec<BetRecord>>> + Send;
}

/// A state-changing contract call: function, arguments and attached value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxRequest {
    CreateGame {
        mode: GameMode,
        entry_fee: U256,
        max_players: Option<u8>,
    },
    JoinGame {
        game_id: u64,
        entry_fee: U256,
    },
    MakeMove {
        game_id: u64,
        subtraction: U256,
    },
    HandleTimeout {
        game_id: u64,
    },
    CancelWaitingGame {
        game_id: u64,
    },
    Withdraw,
    PlaceBet {
        game_id: u64,
        predicted_winner: Address,
        amount: U256,
    },
    ClaimBettingWinnings {
        game_id: u64,
    },
    WithdrawSpectatorBalance,
}

impl TxRequest {
    pub fn function_name(&self) -> &'static str {
        match self {
            TxRequest::CreateGame { mode, .. } => match mode {
                GameMode::QuickDraw | GameMode::Strategic => "createGame",
                GameMode::HardcoreMystery => "createHardcoreMysteryGame",
                GameMode::LastStand => "createLastStandGame",
            },
            TxRequest::JoinGame { .. } => "joinGame",
            TxRequest::MakeMove { .. } => "makeMove",
            TxRequest::HandleTimeout { .. } => "handleTimeout",
            TxRequest::CancelWaitingGame { .. } => "cancelWaitingGame",
            TxRequest::Withdraw => "withdraw",
            TxRequest::PlaceBet { .. } => "placeBet",
            TxRequest::ClaimBettingWinnings { .. } => "claimBettingWinnings",
            TxRequest::WithdrawSpectatorBalance => "withdrawSpectatorBalance",
        }
    }

    /// Native value sent along with the call.
    pub fn value(&self) -> U256 {
        match self {
            TxRequest::CreateGame { entry_fee, .. }
            | TxRequest::JoinGame { entry_fee, .. } => *entry_fee,
            TxRequest::PlaceBet { amount, .. } => *amount,
            _ => U256::ZERO,
        }
    }

    pub fn game_id(&self) -> Option<u64> {
        match self {
            TxRequest::JoinGame { game_id, .. }
            | TxRequest::MakeMove { game_id, .. }
            | TxRequest::HandleTimeout { game_id }
            | TxRequest::CancelWaitingGame { game_id }
            | TxRequest::PlaceBet { game_id, .. }
            | TxRequest::ClaimBettingWinnings { game_id } => Some(*game_id),
            TxRequest::CreateGame { .. }
            | TxRequest::Withdraw
            | TxRequest::WithdrawSpectatorBalance => None,
        }
    }
}

impl fmt::Display for TxRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.function_name();
        match self {
            TxRequest::CreateGame { mode, .. } => write!(f, "{name}({mode})"),
            TxRequest::MakeMove {
                game_id,
                subtraction,
            } => write!(f, "{name}({game_id}, {subtraction})"),
            TxRequest::PlaceBet {
                game_id,
                predicted_winner,
                ..
            } => write!(f, "{name}({game_id}, {predicted_winner})"),
            other => match other.game_id() {
                Some(game_id) => write!(f, "{name}({game_id})"),
                None => write!(f, "{name}()"),
            },
        }
    }
}

/// Outcome of a mined transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxConfirmation {
    pub tx_hash: B256,
    pub succeeded: bool,
    pub created_game_id: Option<u64>,
}

pub trait ChainWriter: Send + Sync + 'static {
    type Pending: Send;

    /// Address of the connected signer, if any.
    fn signer(&self) -> Option<Address>;

    /// Broadcasts the call and returns its hash together with a handle to await it.
    fn submit(
        &self,
        request: &TxRequest,
    ) -> impl Future<Output = anyhow::Result<(B256, Self::Pending)>> + Send;

    fn confirm(
        &self,
        pending: Self::Pending,
    ) -> impl Future<Output = anyhow::Result<TxConfirmation>> + Send;
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn tx_request__describes_call_with_arguments() {
        let request = TxRequest::MakeMove {
            game_id: 5,
            subtraction: U256::from(3),
        };
        assert_eq!(request.to_string(), "makeMove(5, 3)");
        assert_eq!(TxRequest::Withdraw.to_string(), "withdraw()");
        assert_eq!(
            TxRequest::HandleTimeout { game_id: 9 }.to_string(),
            "handleTimeout(9)"
        );
    }

    #[test]
    fn tx_request__carries_value_only_for_payable_calls() {
        let fee = U256::from(1_000u64);
        assert_eq!(
            TxRequest::JoinGame {
                game_id: 1,
                entry_fee: fee
            }
            .value(),
            fee
        );
        assert_eq!(TxRequest::ClaimBettingWinnings { game_id: 1 }.value(), U256::ZERO);
    }

    #[test]
    fn game_record__zeroed_struct_is_zero_value() {
        let record = GameRecord {
            game_id: 0,
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
        };
        assert!(record.is_zero_value());
        let live = GameRecord {
            max_players: 2,
            ..record
        };
        assert!(!live.is_zero_value());
    }
}
