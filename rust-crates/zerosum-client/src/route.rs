use crate::types::{
    ContractFamily,
    GameMode,
};
use anyhow::{
    Context,
    Result,
    anyhow,
    bail,
};
use std::{
    fmt,
    str::FromStr,
};
use url::Url;

const ROUTE_BASE: &str = "http://zerosum.local/";

/// A game view address: `/game/<id>?mode=<slug>`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GameRoute {
    pub game_id: u64,
    pub mode: GameMode,
}

impl GameRoute {
    pub fn new(game_id: u64, mode: GameMode) -> Self {
        Self { game_id, mode }
    }

    pub fn family(&self) -> ContractFamily {
        self.mode.family()
    }
}

impl fmt::Display for GameRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/game/{}?mode={}", self.game_id, self.mode.slug())
    }
}

impl FromStr for GameRoute {
    type Err = anyhow::Error;

    /// Accepts a bare id, a path, or a full URL. A missing mode means Quick Draw.
    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(game_id) = raw.parse::<u64>() {
            return Ok(Self::new(game_id, GameMode::default()));
        }

        let base = Url::parse(ROUTE_BASE)?;
        let url = base
            .join(raw)
            .with_context(|| format!("invalid game route '{raw}'"))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let game_id = match segments.as_slice() {
            ["game", id] => id
                .parse::<u64>()
                .with_context(|| format!("invalid game id '{id}'"))?,
            _ => bail!("expected a route like /game/<id>, got '{raw}'"),
        };
        let mode = url
            .query_pairs()
            .find(|(key, _)| key == "mode")
            .map(|(_, value)| value.parse::<GameMode>())
            .transpose()
            .map_err(|err| anyhow!("invalid mode in route '{raw}': {err}"))?
            .unwrap_or_default();
        Ok(Self::new(game_id, mode))
    }
}
