//! JSON-RPC backed implementation of the chain seams.

use crate::{
    abi::{
        MysteryGame,
        SpectatorBetting,
        StandardGame,
    },
    chain::{
        ChainReader,
        ChainWriter,
        GameRecord,
        TxConfirmation,
        TxRequest,
    },
    config::ContractAddresses,
    types::{
        BetRecord,
        BettingInfo,
        ContractFamily,
        GameMode,
        GameStatus,
        PlayerView,
        non_zero,
        timestamp_from_secs,
    },
};
use alloy::{
    network::{
        Ethereum,
        EthereumWallet,
        ReceiptResponse,
    },
    primitives::{
        Address,
        B256,
        U256,
    },
    providers::{
        DynProvider,
        PendingTransactionBuilder,
        Provider,
        ProviderBuilder,
    },
    rpc::types::Log,
    signers::local::PrivateKeySigner,
};
use anyhow::{
    Context,
    Result,
    anyhow,
    bail,
};
use tracing::info;

/// Default seat count requested for Last Stand games.
pub const DEFAULT_LAST_STAND_PLAYERS: u8 = 4;

/// Game contract binding for the family a view was opened on.
#[derive(Clone)]
pub enum FamilyContract {
    Standard(StandardGame::StandardGameInstance<DynProvider>),
    Mystery(MysteryGame::MysteryGameInstance<DynProvider>),
}

impl FamilyContract {
    pub fn family(&self) -> ContractFamily {
        match self {
            FamilyContract::Standard(_) => ContractFamily::Standard,
            FamilyContract::Mystery(_) => ContractFamily::Mystery,
        }
    }
}

// Both bindings expose the same lifecycle calls under the same names.
macro_rules! on_game_contract {
    ($family:expr, $contract:ident => $body:expr) => {
        match $family {
            FamilyContract::Standard($contract) => $body,
            FamilyContract::Mystery($contract) => $body,
        }
    };
}

/// Contract bindings resolved once per view. Immutable after construction.
#[derive(Clone)]
pub struct EvmChain {
    game: FamilyContract,
    betting: Option<SpectatorBetting::SpectatorBettingInstance<DynProvider>>,
    signer: Option<Address>,
}

impl EvmChain {
    pub async fn connect(
        rpc_url: &str,
        family: ContractFamily,
        addresses: ContractAddresses,
        signer: Option<PrivateKeySigner>,
    ) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .with_context(|| format!("invalid RPC URL '{rpc_url}'"))?;
        let signer_address = signer.as_ref().map(|s| s.address());
        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };
        let chain_id = provider
            .get_chain_id()
            .await
            .with_context(|| format!("Failed to connect to provider at {rpc_url}"))?;
        info!(
            chain_id,
            %family,
            game = %addresses.game,
            signer = ?signer_address,
            "connected to provider"
        );
        Ok(Self::from_provider(provider, family, addresses, signer_address))
    }

    pub fn from_provider(
        provider: DynProvider,
        family: ContractFamily,
        addresses: ContractAddresses,
        signer: Option<Address>,
    ) -> Self {
        let game = match family {
            ContractFamily::Standard => FamilyContract::Standard(StandardGame::new(
                addresses.game,
                provider.clone(),
            )),
            ContractFamily::Mystery => FamilyContract::Mystery(MysteryGame::new(
                addresses.game,
                provider.clone(),
            )),
        };
        let betting = addresses
            .betting
            .map(|address| SpectatorBetting::new(address, provider));
        Self {
            game,
            betting,
            signer,
        }
    }

    fn betting(&self) -> Result<&SpectatorBetting::SpectatorBettingInstance<DynProvider>> {
        self.betting.as_ref().ok_or_else(|| {
            anyhow!(
                "no spectator betting contract configured for the {} family",
                self.game.family()
            )
        })
    }

    fn created_game_id(&self, logs: &[Log]) -> Option<u64> {
        logs.iter().find_map(|log| match &self.game {
            FamilyContract::Standard(_) => log
                .log_decode::<StandardGame::GameCreated>()
                .ok()
                .map(|decoded| decoded.inner.data.gameId.saturating_to::<u64>()),
            FamilyContract::Mystery(_) => log
                .log_decode::<MysteryGame::GameCreated>()
                .ok()
                .map(|decoded| decoded.inner.data.gameId.saturating_to::<u64>()),
        })
    }
}

fn standard_record(view: crate::abi::StandardGameView) -> Result<GameRecord> {
    let mode = GameMode::from_raw(ContractFamily::Standard, view.mode)
        .ok_or_else(|| anyhow!("unknown standard game mode {}", view.mode))?;
    Ok(GameRecord {
        game_id: view.gameId.saturating_to(),
        mode,
        status: GameStatus::from_raw(view.status),
        current_player: non_zero(view.currentPlayer),
        winner: non_zero(view.winner),
        max_players: usize::from(view.maxPlayers),
        entry_fee: view.entryFee,
        prize_pool: view.prizePool,
        move_count: view.moveCount.saturating_to(),
        time_left: view.timeLeft.saturating_to(),
        current_number: Some(view.currentNumber),
    })
}

fn mystery_record(view: crate::abi::MysteryGameView) -> Result<GameRecord> {
    let mode = GameMode::from_raw(ContractFamily::Mystery, view.mode)
        .ok_or_else(|| anyhow!("unknown mystery game mode {}", view.mode))?;
    Ok(GameRecord {
        game_id: view.gameId.saturating_to(),
        mode,
        status: GameStatus::from_raw(view.status),
        current_player: non_zero(view.currentPlayer),
        winner: non_zero(view.winner),
        max_players: usize::from(view.maxPlayers),
        entry_fee: view.entryFee,
        prize_pool: view.prizePool,
        move_count: view.moveCount.saturating_to(),
        time_left: view.timeLeft.saturating_to(),
        current_number: None,
    })
}

impl ChainReader for EvmChain {
    fn family(&self) -> ContractFamily {
        self.game.family()
    }

    async fn game_counter(&self) -> Result<u64> {
        let counter = on_game_contract!(&self.game, contract => contract
            .gameCounter()
            .call()
            .await
            .context("gameCounter call failed")?);
        Ok(counter.saturating_to())
    }

    async fn game_record(&self, game_id: u64) -> Result<GameRecord> {
        let id = U256::from(game_id);
        match &self.game {
            FamilyContract::Standard(contract) => {
                let view = contract
                    .getGame(id)
                    .call()
                    .await
                    .context("getGame call failed")?;
                standard_record(view)
            }
            FamilyContract::Mystery(contract) => {
                let view = contract
                    .getGame(id)
                    .call()
                    .await
                    .context("getGame call failed")?;
                mystery_record(view)
            }
        }
    }

    async fn players(&self, game_id: u64) -> Result<Vec<Address>> {
        let id = U256::from(game_id);
        let players = on_game_contract!(&self.game, contract => contract
            .getPlayers(id)
            .call()
            .await
            .context("getPlayers call failed")?);
        Ok(players)
    }

    async fn player_view(&self, game_id: u64, player: Address) -> Result<Option<PlayerView>> {
        let FamilyContract::Mystery(contract) = &self.game else {
            return Ok(None);
        };
        let view = contract
            .getPlayerView(U256::from(game_id), player)
            .call()
            .await
            .context("getPlayerView call failed")?;
        Ok(Some(PlayerView {
            displayed_number: view.numberRevealed.then_some(view.displayedNumber),
            is_active: view.isActive,
            moves_made: view.movesMade.saturating_to(),
        }))
    }

    async fn is_game_bettable(&self, game_id: u64) -> Result<bool> {
        let id = U256::from(game_id);
        let bettable = on_game_contract!(&self.game, contract => contract
            .isGameBettable(id)
            .call()
            .await
            .context("isGameBettable call failed")?);
        Ok(bettable)
    }

    async fn betting_info(&self, game_id: u64) -> Result<BettingInfo> {
        let pool = self
            .betting()?
            .getGameBettingInfo(U256::from(game_id))
            .call()
            .await
            .context("getGameBettingInfo call failed")?;
        Ok(BettingInfo {
            total_pool: pool.totalPool,
            bet_count: pool.betCount.saturating_to(),
            betting_open: pool.bettingOpen,
            settled: pool.settled,
        })
    }

    async fn has_user_bet(&self, game_id: u64, user: Address) -> Result<bool> {
        let has_bet = self
            .betting()?
            .hasUserBetOnGame(U256::from(game_id), user)
            .call()
            .await
            .context("hasUserBetOnGame call failed")?;
        Ok(has_bet)
    }

    async fn user_bet(&self, game_id: u64, user: Address) -> Result<Option<BetRecord>> {
        let bet = self
            .betting()?
            .getUserBetInfo(U256::from(game_id), user)
            .call()
            .await
            .context("getUserBetInfo call failed")?;
        if bet.amount.is_zero() {
            return Ok(None);
        }
        Ok(Some(BetRecord {
            game_id,
            amount: bet.amount,
            predicted_winner: bet.predictedWinner,
            claimed: bet.claimed,
            timestamp: timestamp_from_secs(bet.timestamp),
        }))
    }

    async fn betting_history(&self, user: Address) -> Result<Vec<BetRecord>> {
        let entries = self
            .betting()?
            .getUserBettingHistoryDetailed(user)
            .call()
            .await
            .context("getUserBettingHistoryDetailed call failed")?;
        Ok(entries
            .into_iter()
            .map(|entry| BetRecord {
                game_id: entry.gameId.saturating_to(),
                amount: entry.amount,
                predicted_winner: entry.predictedWinner,
                claimed: entry.claimed,
                timestamp: timestamp_from_secs(entry.timestamp),
            })
            .collect())
    }
}

impl ChainWriter for EvmChain {
    type Pending = PendingTransactionBuilder<Ethereum>;

    fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn submit(&self, request: &TxRequest) -> Result<(B256, Self::Pending)> {
        let pending = match (&self.game, request) {
            (
                FamilyContract::Standard(contract),
                TxRequest::CreateGame {
                    mode: mode @ (GameMode::QuickDraw | GameMode::Strategic),
                    entry_fee,
                    ..
                },
            ) => {
                contract
                    .createGame(mode.raw())
                    .value(*entry_fee)
                    .send()
                    .await?
            }
            (
                FamilyContract::Mystery(contract),
                TxRequest::CreateGame {
                    mode: GameMode::HardcoreMystery,
                    entry_fee,
                    ..
                },
            ) => {
                contract
                    .createHardcoreMysteryGame()
                    .value(*entry_fee)
                    .send()
                    .await?
            }
            (
                FamilyContract::Mystery(contract),
                TxRequest::CreateGame {
                    mode: GameMode::LastStand,
                    entry_fee,
                    max_players,
                },
            ) => {
                contract
                    .createLastStandGame(max_players.unwrap_or(DEFAULT_LAST_STAND_PLAYERS))
                    .value(*entry_fee)
                    .send()
                    .await?
            }
            (game, TxRequest::CreateGame { mode, .. }) => {
                bail!(
                    "{mode} games are not served by the {} contract family",
                    game.family()
                )
            }
            (game, TxRequest::JoinGame { game_id, entry_fee }) => {
                on_game_contract!(game, contract => contract
                    .joinGame(U256::from(*game_id))
                    .value(*entry_fee)
                    .send()
                    .await?)
            }
            (
                game,
                TxRequest::MakeMove {
                    game_id,
                    subtraction,
                },
            ) => {
                on_game_contract!(game, contract => contract
                    .makeMove(U256::from(*game_id), *subtraction)
                    .send()
                    .await?)
            }
            (game, TxRequest::HandleTimeout { game_id }) => {
                on_game_contract!(game, contract => contract
                    .handleTimeout(U256::from(*game_id))
                    .send()
                    .await?)
            }
            (game, TxRequest::CancelWaitingGame { game_id }) => {
                on_game_contract!(game, contract => contract
                    .cancelWaitingGame(U256::from(*game_id))
                    .send()
                    .await?)
            }
            (game, TxRequest::Withdraw) => {
                on_game_contract!(game, contract => contract.withdraw().send().await?)
            }
            (
                _,
                TxRequest::PlaceBet {
                    game_id,
                    predicted_winner,
                    amount,
                },
            ) => {
                self.betting()?
                    .placeBet(U256::from(*game_id), *predicted_winner)
                    .value(*amount)
                    .send()
                    .await?
            }
            (_, TxRequest::ClaimBettingWinnings { game_id }) => {
                self.betting()?
                    .claimBettingWinnings(U256::from(*game_id))
                    .send()
                    .await?
            }
            (_, TxRequest::WithdrawSpectatorBalance) => {
                self.betting()?.withdrawSpectatorBalance().send().await?
            }
        };
        Ok((*pending.tx_hash(), pending))
    }

    async fn confirm(&self, pending: Self::Pending) -> Result<TxConfirmation> {
        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .context("waiting for transaction receipt failed")?;
        let created_game_id = self.created_game_id(receipt.inner.logs());
        Ok(TxConfirmation {
            tx_hash: receipt.transaction_hash,
            succeeded: ReceiptResponse::status(&receipt),
            created_game_id,
        })
    }
}
