use crate::{
    GlobalArgs,
    wallets,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    DeploymentRecord,
    DeploymentStore,
    FamilyAddresses,
};
use std::{
    path::PathBuf,
    sync::Arc,
};
use tracing::info;
use zerosum_client::{
    Address,
    bet_cache::BetCache,
    config::{
        ClientConfig,
        ContractAddresses,
        PollConfig,
    },
    evm::EvmChain,
    reader::ReadAdapter,
    types::ContractFamily,
    writer::{
        Notice,
        Notifier,
        WriteAdapter,
    },
};

const DEFAULT_BET_CACHE: &str = "~/.zerosum/bets.json";

/// Prints transaction progress for the person at the terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    fn line(notice: &Notice) -> String {
        match notice {
            Notice::Submitted { action, tx_hash } => format!("{action} submitted ({tx_hash})"),
            Notice::Confirmed { action, tx_hash } => format!("{action} confirmed ({tx_hash})"),
            Notice::Failed { action, message } => format!("{action} failed: {message}"),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        if let Notice::Failed { action, message } = &notice {
            tracing::error!(%action, %message, "transaction failed");
        }
        println!("{}", Self::line(&notice));
    }
}

pub fn family_addresses(
    record: &DeploymentRecord,
    family: ContractFamily,
) -> Option<&FamilyAddresses> {
    match family {
        ContractFamily::Standard => record.standard.as_ref(),
        ContractFamily::Mystery => record.mystery.as_ref(),
    }
}

pub fn load_config(global: &GlobalArgs) -> Result<ClientConfig> {
    match &global.config {
        Some(path) => ClientConfig::from_json_file(path).map_err(|e| eyre!("{e:#}")),
        None => Ok(ClientConfig::default()),
    }
}

/// Everything one command needs, wired for a single contract family.
pub struct Session {
    pub reader: Arc<ReadAdapter<EvmChain>>,
    pub writer: WriteAdapter<EvmChain, ConsoleNotifier>,
    pub identity: Option<Address>,
    pub poll: PollConfig,
}

impl Session {
    pub async fn open(global: &GlobalArgs, family: ContractFamily) -> Result<Self> {
        let config = load_config(global)?;
        let env = global.env();
        let store = DeploymentStore::new(env).map_err(|e| eyre!(e))?;
        let record = store
            .load()
            .map_err(|e| eyre!(e))?
            .ok_or_else(|| {
                eyre!("No {env} deployment recorded; run `zerosum deployments set` first")
            })?;
        let family_addresses = family_addresses(&record, family)
            .ok_or_else(|| eyre!("No {family} contracts recorded for {env}"))?;
        let addresses =
            ContractAddresses::parse(&family_addresses.game, family_addresses.betting.as_deref())
                .map_err(|e| eyre!("{e:#}"))?;

        let rpc_url = global
            .rpc_url
            .clone()
            .or(config.rpc_url.clone())
            .unwrap_or_else(|| global.default_rpc_url().to_string());

        let signer = match &global.wallet {
            Some(name) => {
                let dir = wallets::resolve_wallet_dir(global.wallet_dir.as_deref())?;
                let descriptor = wallets::find_wallet(&dir, name)?;
                Some(wallets::unlock_wallet(&descriptor)?)
            }
            None => None,
        };
        let signer_address = signer.as_ref().map(|s| s.address());
        let identity = signer_address.or(global.address);

        let chain = EvmChain::connect(&rpc_url, family, addresses, signer)
            .await
            .map_err(|e| eyre!("{e:#}"))
            .wrap_err_with(|| format!("connecting to {env} at {rpc_url} failed"))?;
        let chain = Arc::new(chain);

        let cache_path = config.bet_cache_path.clone().unwrap_or_else(|| {
            PathBuf::from(shellexpand::tilde(DEFAULT_BET_CACHE).into_owned())
        });
        let cache = BetCache::new(cache_path);
        info!(%family, identity = ?identity, cache = %cache.path().display(), "session ready");

        Ok(Self {
            reader: Arc::new(ReadAdapter::new(chain.clone()).with_bet_cache(cache.clone())),
            writer: WriteAdapter::new(chain, ConsoleNotifier).with_bet_cache(cache),
            identity,
            poll: config.poll,
        })
    }

    pub fn require_identity(&self) -> Result<Address> {
        self.identity
            .ok_or_else(|| eyre!("Pass --wallet or --address to choose whose data to show"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn family_addresses__picks_the_requested_family() {
        // given
        let mut record = DeploymentRecord::new("http://localhost:8545");
        record.mystery = Some(FamilyAddresses {
            game: "0x00000000000000000000000000000000000000aa".into(),
            betting: Some("0x00000000000000000000000000000000000000bb".into()),
        });

        // then
        assert!(family_addresses(&record, ContractFamily::Standard).is_none());
        assert_eq!(
            family_addresses(&record, ContractFamily::Mystery)
                .and_then(|a| a.betting.as_deref()),
            Some("0x00000000000000000000000000000000000000bb")
        );
    }

    #[test]
    fn console_notifier__prints_plain_status_lines() {
        // given
        let failed = Notice::Failed {
            action: "Join game".into(),
            message: "Transaction cancelled by user".into(),
        };
        let confirmed = Notice::Confirmed {
            action: "Join game".into(),
            tx_hash: alloy::primitives::B256::ZERO,
        };

        // then
        assert_eq!(
            ConsoleNotifier::line(&failed),
            "Join game failed: Transaction cancelled by user"
        );
        assert!(ConsoleNotifier::line(&confirmed).starts_with("Join game confirmed (0x0000"));
        assert!(ConsoleNotifier::line(&confirmed).is_ascii());
    }
}
