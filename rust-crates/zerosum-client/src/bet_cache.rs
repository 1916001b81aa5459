//! Local fallback store of spectator bets.
//!
//! Entries are keyed `bet_<gameId>_<address>` (address lower-cased). The store is only read
//! when the betting contract's history call fails; the contract stays the source of truth.

use crate::types::BetRecord;
use alloy::primitives::{
    Address,
    U256,
};
use anyhow::{
    Context,
    Result,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};
use tracing::warn;

const KEY_PREFIX: &str = "bet_";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredBet {
    amount_wei: String,
    predicted_winner: String,
    #[serde(default)]
    claimed: bool,
    timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct BetCache {
    path: PathBuf,
}

pub fn bet_key(game_id: u64, bettor: &Address) -> String {
    format!("{KEY_PREFIX}{game_id}_{}", bettor.to_string().to_lowercase())
}

fn parse_key(key: &str) -> Option<(u64, &str)> {
    let rest = key.strip_prefix(KEY_PREFIX)?;
    let (game_id, address) = rest.split_once('_')?;
    Some((game_id.parse().ok()?, address))
}

impl BetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, bettor: &Address, bet: &BetRecord) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(
            bet_key(bet.game_id, bettor),
            StoredBet {
                amount_wei: bet.amount.to_string(),
                predicted_winner: bet.predicted_winner.to_string(),
                claimed: bet.claimed,
                timestamp: bet.timestamp,
            },
        );
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create bet cache directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_vec_pretty(&entries)
            .context("Failed to serialize bet cache")?;
        fs::write(&self.path, json).context("Failed to write bet cache")?;
        Ok(())
    }

    /// All cached bets placed by `bettor`, ordered by game id.
    pub fn scan(&self, bettor: &Address) -> Result<Vec<BetRecord>> {
        let wanted = bettor.to_string();
        let mut bets = Vec::new();
        for (key, stored) in self.load()? {
            let Some((game_id, address)) = parse_key(&key) else {
                continue;
            };
            if !address.eq_ignore_ascii_case(&wanted) {
                continue;
            }
            match Self::decode(game_id, &stored) {
                Ok(bet) => bets.push(bet),
                Err(err) => warn!(%key, ?err, "skipping malformed cached bet"),
            }
        }
        bets.sort_by_key(|bet| bet.game_id);
        Ok(bets)
    }

    fn decode(game_id: u64, stored: &StoredBet) -> Result<BetRecord> {
        Ok(BetRecord {
            game_id,
            amount: U256::from_str(&stored.amount_wei).context("invalid cached amount")?,
            predicted_winner: Address::from_str(&stored.predicted_winner)
                .context("invalid cached predicted winner")?,
            claimed: stored.claimed,
            timestamp: stored.timestamp,
        })
    }

    fn load(&self) -> Result<BTreeMap<String, StoredBet>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read(&self.path).context("Failed to read bet cache")?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&data).context("Failed to parse bet cache JSON")
    }
}
