use crate::{
    bet_cache::BetCache,
    chain::ChainReader,
    types::{
        BetRecord,
        BettingInfo,
        ContractFamily,
        GameSnapshot,
        PlayerView,
    },
};
use alloy::primitives::Address;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{
    debug,
    warn,
};

/// Result of looking a game up. Reads never fail outright.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GameLookup {
    Found(GameSnapshot),
    /// The id is past the on-chain counter or the contract answered with an empty record.
    NotFound,
    /// The provider or contract could not be reached.
    Unavailable,
}

impl GameLookup {
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        match self {
            GameLookup::Found(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Read-only view of the game contracts that substitutes safe defaults for failures.
pub struct ReadAdapter<C> {
    chain: Arc<C>,
    bet_cache: Option<BetCache>,
}

impl<C> Clone for ReadAdapter<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            bet_cache: self.bet_cache.clone(),
        }
    }
}

impl<C: ChainReader> ReadAdapter<C> {
    pub fn new(chain: Arc<C>) -> Self {
        Self {
            chain,
            bet_cache: None,
        }
    }

    pub fn with_bet_cache(mut self, cache: BetCache) -> Self {
        self.bet_cache = Some(cache);
        self
    }

    pub fn family(&self) -> ContractFamily {
        self.chain.family()
    }

    pub async fn game(&self, game_id: u64) -> GameLookup {
        if game_id == 0 {
            return GameLookup::NotFound;
        }
        let counter = match self.chain.game_counter().await {
            Ok(counter) => counter,
            Err(err) => {
                warn!(game_id, ?err, "gameCounter read failed");
                return GameLookup::Unavailable;
            }
        };
        if game_id > counter {
            debug!(game_id, counter, "game id past on-chain counter");
            return GameLookup::NotFound;
        }

        let (record, players) =
            tokio::join!(self.chain.game_record(game_id), self.players(game_id));
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(game_id, ?err, "getGame read failed");
                return GameLookup::Unavailable;
            }
        };
        if record.is_zero_value() && players.is_empty() {
            return GameLookup::NotFound;
        }
        GameLookup::Found(record.into_snapshot(players))
    }

    pub async fn players(&self, game_id: u64) -> Vec<Address> {
        self.chain
            .players(game_id)
            .await
            .unwrap_or_else(|err| {
                warn!(game_id, ?err, "getPlayers read failed");
                Vec::new()
            })
    }

    pub async fn player_view(&self, game_id: u64, player: Address) -> Option<PlayerView> {
        self.chain
            .player_view(game_id, player)
            .await
            .unwrap_or_else(|err| {
                warn!(game_id, %player, ?err, "getPlayerView read failed");
                None
            })
    }

    /// Per-player views for every listed player, read concurrently.
    pub async fn player_views(
        &self,
        game_id: u64,
        players: &[Address],
    ) -> Vec<(Address, Option<PlayerView>)> {
        let views = join_all(
            players
                .iter()
                .map(|player| self.player_view(game_id, *player)),
        )
        .await;
        players.iter().copied().zip(views).collect()
    }

    pub async fn is_game_bettable(&self, game_id: u64) -> bool {
        self.chain
            .is_game_bettable(game_id)
            .await
            .unwrap_or_else(|err| {
                warn!(game_id, ?err, "isGameBettable read failed");
                false
            })
    }

    pub async fn betting_info(&self, game_id: u64) -> BettingInfo {
        self.chain
            .betting_info(game_id)
            .await
            .unwrap_or_else(|err| {
                warn!(game_id, ?err, "getGameBettingInfo read failed");
                BettingInfo::default()
            })
    }

    pub async fn has_user_bet(&self, game_id: u64, user: Address) -> bool {
        self.chain
            .has_user_bet(game_id, user)
            .await
            .unwrap_or_else(|err| {
                warn!(game_id, %user, ?err, "hasUserBetOnGame read failed");
                false
            })
    }

    pub async fn user_bet(&self, game_id: u64, user: Address) -> Option<BetRecord> {
        self.chain
            .user_bet(game_id, user)
            .await
            .unwrap_or_else(|err| {
                warn!(game_id, %user, ?err, "getUserBetInfo read failed");
                None
            })
    }

    /// Contract history, or the local fallback store when the contract call fails.
    pub async fn betting_history(&self, user: Address) -> Vec<BetRecord> {
        let err = match self.chain.betting_history(user).await {
            Ok(history) => return history,
            Err(err) => err,
        };
        warn!(%user, ?err, "betting history read failed; falling back to local cache");
        let Some(cache) = &self.bet_cache else {
            return Vec::new();
        };
        cache.scan(&user).unwrap_or_else(|err| {
            warn!(path = %cache.path().display(), ?err, "bet cache scan failed");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        projector::ViewFlags,
        test_helpers::{
            ALICE,
            BOB,
            FakeChain,
            active_game,
            waiting_game,
        },
        types::GameStatus,
    };
    use alloy::primitives::U256;
    use chrono::DateTime;

    fn adapter(chain: &FakeChain) -> ReadAdapter<FakeChain> {
        ReadAdapter::new(Arc::new(chain.clone()))
    }

    #[tokio::test]
    async fn game__assembles_record_and_players() {
        // given
        let chain = FakeChain::new();
        chain.insert_game(waiting_game(5), vec![ALICE]);

        // when
        let lookup = adapter(&chain).game(5).await;

        // then
        let snapshot = lookup.snapshot().expect("game should be found");
        assert_eq!(snapshot.game_id, 5);
        assert_eq!(snapshot.players, vec![ALICE]);
        assert_eq!(snapshot.status, GameStatus::Waiting);
    }

    #[tokio::test]
    async fn game__past_counter_or_zero_id_is_not_found() {
        // given
        let chain = FakeChain::new();
        chain.insert_game(waiting_game(1), vec![ALICE]);
        let adapter = adapter(&chain);

        // then
        assert_eq!(adapter.game(0).await, GameLookup::NotFound);
        assert_eq!(adapter.game(2).await, GameLookup::NotFound);
    }

    #[tokio::test]
    async fn game__zero_value_record_is_not_found() {
        // given
        let chain = FakeChain::new();
        chain.set_counter(3);

        // when
        let lookup = adapter(&chain).game(2).await;

        // then
        assert_eq!(lookup, GameLookup::NotFound);
    }

    #[tokio::test]
    async fn game__unreachable_provider_is_unavailable() {
        // given
        let chain = FakeChain::new();
        chain.insert_game(waiting_game(5), vec![ALICE]);
        chain.fail_call("gameCounter");

        // when
        let lookup = adapter(&chain).game(5).await;

        // then
        assert_eq!(lookup, GameLookup::Unavailable);
    }

    #[tokio::test]
    async fn game__failed_players_read_degrades_to_unjoinable_snapshot() {
        // given
        let chain = FakeChain::new();
        chain.insert_game(waiting_game(5), vec![ALICE]);
        chain.fail_call("getPlayers");
        let adapter = adapter(&chain);

        // when
        let players = adapter.players(5).await;
        let lookup = adapter.game(5).await;

        // then
        assert!(players.is_empty());
        let snapshot = lookup.snapshot().expect("record read still succeeds");
        assert!(snapshot.players.is_empty());
        let flags = ViewFlags::project(snapshot, Some(&BOB));
        assert!(!flags.can_join);
    }

    #[tokio::test]
    async fn player_views__pairs_each_player_with_its_view() {
        // given
        let chain = FakeChain::for_family(ContractFamily::Mystery);
        chain.insert_game(waiting_game(2), vec![ALICE, BOB]);
        let view = PlayerView {
            displayed_number: None,
            is_active: true,
            moves_made: 3,
        };
        chain.insert_player_view(2, BOB, view.clone());

        // when
        let views = adapter(&chain).player_views(2, &[ALICE, BOB]).await;

        // then
        assert_eq!(views, vec![(ALICE, None), (BOB, Some(view))]);
    }

    #[tokio::test]
    async fn betting_info__reports_the_contract_pool() {
        // given
        let chain = FakeChain::new();
        chain.insert_game(active_game(4, ALICE), vec![ALICE, BOB]);
        let info = BettingInfo {
            total_pool: U256::from(3_000u64),
            bet_count: 2,
            betting_open: true,
            settled: false,
        };
        chain.set_betting_info(4, info.clone());
        let adapter = adapter(&chain);

        // then
        assert_eq!(adapter.betting_info(4).await, info);
        assert!(adapter.is_game_bettable(4).await);
    }

    #[tokio::test]
    async fn betting_reads__fall_back_to_defaults() {
        // given
        let chain = FakeChain::new();
        for call in [
            "getGameBettingInfo",
            "isGameBettable",
            "hasUserBetOnGame",
            "getUserBetInfo",
            "getPlayerView",
        ] {
            chain.fail_call(call);
        }
        let adapter = adapter(&chain);

        // then
        assert_eq!(adapter.betting_info(1).await, BettingInfo::default());
        assert!(!adapter.is_game_bettable(1).await);
        assert!(!adapter.has_user_bet(1, BOB).await);
        assert!(adapter.user_bet(1, BOB).await.is_none());
        assert!(adapter.player_view(1, BOB).await.is_none());
    }

    #[tokio::test]
    async fn betting_history__uses_local_cache_when_contract_fails() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let cache = BetCache::new(dir.path().join("bets.json"));
        let cached = BetRecord {
            game_id: 4,
            amount: U256::from(10u64),
            predicted_winner: ALICE,
            claimed: false,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        cache.record(&BOB, &cached).unwrap();
        let chain = FakeChain::new();
        chain.fail_call("getUserBettingHistoryDetailed");
        let adapter = adapter(&chain).with_bet_cache(cache);

        // when
        let history = adapter.betting_history(BOB).await;

        // then
        assert_eq!(history, vec![cached]);
    }

    #[tokio::test]
    async fn betting_history__prefers_contract_over_cache() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let cache = BetCache::new(dir.path().join("bets.json"));
        let on_chain = BetRecord {
            game_id: 8,
            amount: U256::from(3u64),
            predicted_winner: ALICE,
            claimed: true,
            timestamp: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
        };
        cache
            .record(
                &BOB,
                &BetRecord {
                    game_id: 1,
                    ..on_chain.clone()
                },
            )
            .unwrap();
        let chain = FakeChain::new();
        chain.insert_bet(BOB, on_chain.clone());
        let adapter = adapter(&chain).with_bet_cache(cache);

        // when
        let history = adapter.betting_history(BOB).await;

        // then
        assert_eq!(history, vec![on_chain]);
    }
}
