use alloy::primitives::{
    Address,
    U256,
    utils::{
        format_ether,
        parse_ether,
    },
};
use anyhow::{
    Context,
    anyhow,
};
use chrono::{
    DateTime,
    Utc,
};
use std::{
    fmt,
    str::FromStr,
};

/// Which deployed contract serves a game mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ContractFamily {
    Standard,
    Mystery,
}

impl fmt::Display for ContractFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractFamily::Standard => "standard",
            ContractFamily::Mystery => "mystery",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum GameMode {
    #[default]
    QuickDraw,
    Strategic,
    HardcoreMystery,
    LastStand,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::QuickDraw,
        GameMode::Strategic,
        GameMode::HardcoreMystery,
        GameMode::LastStand,
    ];

    pub fn family(self) -> ContractFamily {
        match self {
            GameMode::QuickDraw | GameMode::Strategic => ContractFamily::Standard,
            GameMode::HardcoreMystery | GameMode::LastStand => ContractFamily::Mystery,
        }
    }

    /// Mode discriminant as stored by the owning contract.
    pub fn raw(self) -> u8 {
        match self {
            GameMode::QuickDraw | GameMode::HardcoreMystery => 0,
            GameMode::Strategic | GameMode::LastStand => 1,
        }
    }

    pub fn from_raw(family: ContractFamily, raw: u8) -> Option<Self> {
        match (family, raw) {
            (ContractFamily::Standard, 0) => Some(GameMode::QuickDraw),
            (ContractFamily::Standard, 1) => Some(GameMode::Strategic),
            (ContractFamily::Mystery, 0) => Some(GameMode::HardcoreMystery),
            (ContractFamily::Mystery, 1) => Some(GameMode::LastStand),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            GameMode::QuickDraw => "quick-draw",
            GameMode::Strategic => "strategic",
            GameMode::HardcoreMystery => "hardcore-mystery",
            GameMode::LastStand => "last-stand",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameMode::QuickDraw => "Quick Draw",
            GameMode::Strategic => "Strategic",
            GameMode::HardcoreMystery => "Hardcore Mystery",
            GameMode::LastStand => "Last Stand",
        };
        write!(f, "{name}")
    }
}

impl FromStr for GameMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        GameMode::ALL
            .into_iter()
            .find(|mode| mode.slug() == normalized)
            .or(match normalized.as_str() {
                "quickdraw" => Some(GameMode::QuickDraw),
                "hardcore" | "mystery" => Some(GameMode::HardcoreMystery),
                "laststand" => Some(GameMode::LastStand),
                _ => None,
            })
            .ok_or_else(|| anyhow!("unknown game mode '{raw}'"))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

impl GameStatus {
    /// Anything past `Active` (finished, cancelled) is terminal for the client.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => GameStatus::Waiting,
            1 => GameStatus::Active,
            _ => GameStatus::Finished,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        };
        write!(f, "{name}")
    }
}

/// One fetched view of a game's on-chain state. Replaced wholesale on every poll.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameSnapshot {
    pub game_id: u64,
    pub mode: GameMode,
    pub status: GameStatus,
    pub current_player: Option<Address>,
    pub players: Vec<Address>,
    pub max_players: usize,
    pub entry_fee: U256,
    pub prize_pool: U256,
    pub winner: Option<Address>,
    pub move_count: u64,
    pub time_left: u64,
    /// Hidden by the mystery family.
    pub current_number: Option<U256>,
}

impl GameSnapshot {
    pub fn creator(&self) -> Option<&Address> {
        self.players.first()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerView {
    pub displayed_number: Option<U256>,
    pub is_active: bool,
    pub moves_made: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BettingInfo {
    pub total_pool: U256,
    pub bet_count: u64,
    pub betting_open: bool,
    pub settled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BetRecord {
    pub game_id: u64,
    pub amount: U256,
    pub predicted_winner: Address,
    pub claimed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Zero address means "unset" on chain.
pub fn non_zero(address: Address) -> Option<Address> {
    (!address.is_zero()).then_some(address)
}

pub fn timestamp_from_secs(secs: U256) -> DateTime<Utc> {
    let secs = i64::try_from(secs.saturating_to::<u64>()).unwrap_or(i64::MAX);
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Formats a wei amount as a decimal ether string.
pub fn format_amount(wei: U256) -> String {
    format_ether(wei)
}

/// Parses a decimal ether string into wei.
pub fn parse_amount(raw: &str) -> anyhow::Result<U256> {
    parse_ether(raw.trim()).with_context(|| format!("invalid amount '{raw}'"))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn game_mode__round_trips_through_raw_discriminant_per_family() {
        for mode in GameMode::ALL {
            assert_eq!(GameMode::from_raw(mode.family(), mode.raw()), Some(mode));
        }
        assert_eq!(GameMode::from_raw(ContractFamily::Standard, 7), None);
    }

    #[test]
    fn game_mode__parses_slugs_and_aliases() {
        assert_eq!("last-stand".parse::<GameMode>().unwrap(), GameMode::LastStand);
        assert_eq!("Hardcore_Mystery".parse::<GameMode>().unwrap(), GameMode::HardcoreMystery);
        assert_eq!("quickdraw".parse::<GameMode>().unwrap(), GameMode::QuickDraw);
        assert!("roulette".parse::<GameMode>().is_err());
    }

    #[test]
    fn game_status__treats_unknown_discriminants_as_finished() {
        assert_eq!(GameStatus::from_raw(0), GameStatus::Waiting);
        assert_eq!(GameStatus::from_raw(1), GameStatus::Active);
        assert_eq!(GameStatus::from_raw(3), GameStatus::Finished);
    }

    #[test]
    fn parse_amount__reads_decimal_ether_into_wei() {
        let wei = parse_amount(" 0.05 ").unwrap();
        assert_eq!(wei, U256::from(50_000_000_000_000_000u64));
        assert_eq!(format_amount(wei), "0.050000000000000000");
        assert!(parse_amount("five").is_err());
    }
}
