use crate::{
    bet_cache::BetCache,
    chain::{
        ChainWriter,
        TxRequest,
    },
    types::{
        BetRecord,
        GameMode,
    },
};
use alloy::{
    primitives::{
        Address,
        B256,
        U256,
    },
    transports::TransportError,
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{
    error,
    info,
    warn,
};

/// Why a transaction did not go through. `Display` is the message shown to the user.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TxFailure {
    #[error("Please connect your wallet")]
    NoSigner,
    #[error("Transaction cancelled by user")]
    UserRejected,
    #[error("Insufficient funds for this transaction")]
    InsufficientFunds,
    #[error("{}", .0.as_deref().unwrap_or("Transaction reverted"))]
    Reverted(Option<String>),
    #[error("Transaction failed")]
    Unknown(String),
}

impl TxFailure {
    /// Maps a wallet, provider or contract error onto the user-facing taxonomy.
    pub fn classify(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("user rejected")
            || lowered.contains("user denied")
            || lowered.contains("rejected by user")
            || lowered.contains("code 4001")
            || lowered.contains("code: 4001")
            || rpc_error_code(err) == Some(USER_REJECTED_CODE)
        {
            return TxFailure::UserRejected;
        }
        if lowered.contains("insufficient funds") {
            return TxFailure::InsufficientFunds;
        }
        if lowered.contains("revert") {
            return TxFailure::Reverted(revert_reason(&message));
        }
        TxFailure::Unknown(message)
    }
}

/// EIP-1193 code a wallet returns when the user declines a request.
const USER_REJECTED_CODE: i64 = 4001;

fn rpc_error_code(err: &anyhow::Error) -> Option<i64> {
    err.chain().find_map(|cause| {
        let transport = match cause.downcast_ref::<alloy::contract::Error>() {
            Some(alloy::contract::Error::TransportError(transport)) => transport,
            _ => cause.downcast_ref::<TransportError>()?,
        };
        transport.as_error_resp().map(|payload| payload.code)
    })
}

fn revert_reason(message: &str) -> Option<String> {
    // ascii lower-casing keeps byte offsets aligned with the original text
    let lowered = message.to_ascii_lowercase();
    const REASON_STRING: &str = "reverted with reason string '";
    if let Some(start) = lowered.find(REASON_STRING) {
        let rest = &message[start + REASON_STRING.len()..];
        let reason = rest.split('\'').next().unwrap_or_default().trim();
        return (!reason.is_empty()).then(|| reason.to_string());
    }
    const EXECUTION_REVERTED: &str = "execution reverted:";
    if let Some(start) = lowered.find(EXECUTION_REVERTED) {
        let rest = &message[start + EXECUTION_REVERTED.len()..];
        let rest = rest.split('\n').next().unwrap_or_default();
        let rest = rest.rsplit_once(", data:").map_or(rest, |(reason, _)| reason);
        let reason = rest.trim().trim_matches('"');
        return (!reason.is_empty()).then(|| reason.to_string());
    }
    None
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxSuccess {
    pub tx_hash: B256,
    /// Id of the game a creation call produced, read from the emitted logs.
    pub game_id: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    Submitted { action: String, tx_hash: B256 },
    Confirmed { action: String, tx_hash: B256 },
    Failed { action: String, message: String },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Reports notices through `tracing` only.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Submitted { action, tx_hash } => {
                info!(%action, %tx_hash, "transaction submitted")
            }
            Notice::Confirmed { action, tx_hash } => {
                info!(%action, %tx_hash, "transaction confirmed")
            }
            Notice::Failed { action, message } => {
                error!(%action, %message, "transaction failed")
            }
        }
    }
}

/// Submits transactions and reports their progress. Never retries.
pub struct WriteAdapter<W, N> {
    chain: Arc<W>,
    notifier: N,
    bet_cache: Option<BetCache>,
}

impl<W: ChainWriter, N: Notifier> WriteAdapter<W, N> {
    pub fn new(chain: Arc<W>, notifier: N) -> Self {
        Self {
            chain,
            notifier,
            bet_cache: None,
        }
    }

    /// Successful bets are mirrored into `cache` for the betting-history fallback.
    pub fn with_bet_cache(mut self, cache: BetCache) -> Self {
        self.bet_cache = Some(cache);
        self
    }

    pub fn signer(&self) -> Option<Address> {
        self.chain.signer()
    }

    pub async fn execute(&self, request: TxRequest) -> Result<TxSuccess, TxFailure> {
        let action = request.to_string();
        let Some(signer) = self.chain.signer() else {
            return Err(self.fail(&action, TxFailure::NoSigner));
        };

        let (tx_hash, pending) = match self.chain.submit(&request).await {
            Ok(submitted) => submitted,
            Err(err) => {
                warn!(%action, ?err, "transaction submission failed");
                return Err(self.fail(&action, TxFailure::classify(&err)));
            }
        };
        self.notifier.notify(Notice::Submitted {
            action: action.clone(),
            tx_hash,
        });

        let confirmation = match self.chain.confirm(pending).await {
            Ok(confirmation) => confirmation,
            Err(err) => {
                warn!(%action, %tx_hash, ?err, "transaction confirmation failed");
                return Err(self.fail(&action, TxFailure::classify(&err)));
            }
        };
        if !confirmation.succeeded {
            return Err(self.fail(&action, TxFailure::Reverted(None)));
        }

        self.notifier.notify(Notice::Confirmed {
            action,
            tx_hash: confirmation.tx_hash,
        });
        if let TxRequest::PlaceBet {
            game_id,
            predicted_winner,
            amount,
        } = request
        {
            self.remember_bet(signer, game_id, predicted_winner, amount);
        }
        Ok(TxSuccess {
            tx_hash: confirmation.tx_hash,
            game_id: confirmation.created_game_id.or(request.game_id()),
        })
    }

    pub async fn create_game(
        &self,
        mode: GameMode,
        entry_fee: U256,
        max_players: Option<u8>,
    ) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::CreateGame {
            mode,
            entry_fee,
            max_players,
        })
        .await
    }

    pub async fn join_game(&self, game_id: u64, entry_fee: U256) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::JoinGame { game_id, entry_fee }).await
    }

    pub async fn make_move(&self, game_id: u64, subtraction: U256) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::MakeMove {
            game_id,
            subtraction,
        })
        .await
    }

    pub async fn handle_timeout(&self, game_id: u64) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::HandleTimeout { game_id }).await
    }

    pub async fn cancel_waiting_game(&self, game_id: u64) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::CancelWaitingGame { game_id }).await
    }

    pub async fn withdraw(&self) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::Withdraw).await
    }

    pub async fn place_bet(
        &self,
        game_id: u64,
        predicted_winner: Address,
        amount: U256,
    ) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::PlaceBet {
            game_id,
            predicted_winner,
            amount,
        })
        .await
    }

    pub async fn claim_betting_winnings(&self, game_id: u64) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::ClaimBettingWinnings { game_id }).await
    }

    pub async fn withdraw_spectator_balance(&self) -> Result<TxSuccess, TxFailure> {
        self.execute(TxRequest::WithdrawSpectatorBalance).await
    }

    fn fail(&self, action: &str, failure: TxFailure) -> TxFailure {
        self.notifier.notify(Notice::Failed {
            action: action.to_string(),
            message: failure.to_string(),
        });
        failure
    }

    fn remember_bet(&self, bettor: Address, game_id: u64, predicted_winner: Address, amount: U256) {
        let Some(cache) = &self.bet_cache else {
            return;
        };
        let bet = BetRecord {
            game_id,
            amount,
            predicted_winner,
            claimed: false,
            timestamp: Utc::now(),
        };
        if let Err(err) = cache.record(&bettor, &bet) {
            warn!(game_id, ?err, "failed to mirror bet into local cache");
        }
    }
}
