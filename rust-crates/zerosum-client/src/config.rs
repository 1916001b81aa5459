use alloy::primitives::Address;
use anyhow::{
    Context,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
    time::Duration,
};

/// How often a waiting game is re-read to detect the second player joining.
pub const DEFAULT_WAITING_POLL_SECS: u64 = 15;
/// How often an active game's time-left and players are re-read.
pub const DEFAULT_ACTIVE_POLL_SECS: u64 = 10;
/// Local countdown resolution.
pub const DEFAULT_TICK_SECS: u64 = 1;
/// Drift tolerated before a refresh-driven snapshot snaps the countdown.
pub const DEFAULT_TICK_DRIFT_SECS: u64 = 2;
/// Drift tolerated before the periodic resync snaps the countdown.
pub const DEFAULT_RESYNC_DRIFT_SECS: u64 = 10;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub waiting_poll_secs: u64,
    pub active_poll_secs: u64,
    pub tick_secs: u64,
    pub tick_drift_threshold_secs: u64,
    pub resync_drift_threshold_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            waiting_poll_secs: DEFAULT_WAITING_POLL_SECS,
            active_poll_secs: DEFAULT_ACTIVE_POLL_SECS,
            tick_secs: DEFAULT_TICK_SECS,
            tick_drift_threshold_secs: DEFAULT_TICK_DRIFT_SECS,
            resync_drift_threshold_secs: DEFAULT_RESYNC_DRIFT_SECS,
        }
    }
}

impl PollConfig {
    // tokio intervals panic on a zero period
    pub fn waiting_interval(&self) -> Duration {
        Duration::from_secs(self.waiting_poll_secs.max(1))
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_secs(self.active_poll_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }
}

/// Settings a user may override from a JSON file passed with `--config`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc_url: Option<String>,
    pub bet_cache_path: Option<PathBuf>,
    pub poll: PollConfig,
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid client configuration JSON")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

/// Addresses of the contracts serving one family on the selected network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContractAddresses {
    pub game: Address,
    pub betting: Option<Address>,
}

impl ContractAddresses {
    pub fn parse(game: &str, betting: Option<&str>) -> Result<Self> {
        let game = Address::from_str(game.trim())
            .with_context(|| format!("invalid game contract address '{game}'"))?;
        let betting = betting
            .map(|raw| {
                Address::from_str(raw.trim())
                    .with_context(|| format!("invalid betting contract address '{raw}'"))
            })
            .transpose()?;
        Ok(Self { game, betting })
    }
}
