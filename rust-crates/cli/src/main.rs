mod commands;
mod session;
mod wallets;
mod watch;

use clap::{
    ArgGroup,
    Args,
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use deployments::DeploymentEnv;
use std::path::PathBuf;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
    prelude::*,
};
use zerosum_client::{
    Address,
    route::GameRoute,
    types::{
        ContractFamily,
        GameMode,
    },
};

pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_TESTNET_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

#[derive(Parser, Debug)]
#[command(
    name = "zerosum",
    about = "Watch, play and bet on ZeroSum games from the terminal",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("network").args(["local", "testnet"])))]
pub struct GlobalArgs {
    /// Use a local node (the default)
    #[arg(long, global = true)]
    pub local: bool,

    /// Use the public testnet
    #[arg(long, global = true)]
    pub testnet: bool,

    /// Override the RPC URL for the selected network
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Keystore wallet used to sign transactions
    #[arg(long, global = true)]
    pub wallet: Option<String>,

    /// Override the keystore directory (defaults to ~/.zerosum/wallets)
    #[arg(long, global = true)]
    pub wallet_dir: Option<String>,

    /// Watch-only identity used for flags and bet history when no wallet is unlocked
    #[arg(long, global = true)]
    pub address: Option<Address>,

    /// JSON file overriding poll intervals, thresholds and the bet cache path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn env(&self) -> DeploymentEnv {
        if self.testnet {
            DeploymentEnv::Test
        } else {
            DeploymentEnv::Local
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self.env() {
            DeploymentEnv::Test => DEFAULT_TESTNET_RPC_URL,
            DeploymentEnv::Local => DEFAULT_LOCAL_RPC_URL,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow a game until it finishes; type `help` for interactive actions
    Watch { route: GameRoute },
    /// Print one snapshot of a game with wallet flags and betting info
    Show { route: GameRoute },
    /// Create a game
    Create {
        #[arg(long, default_value = "quick-draw")]
        mode: GameMode,
        /// Entry fee in ether
        #[arg(long)]
        fee: String,
        /// Seats for Last Stand games
        #[arg(long)]
        max_players: Option<u8>,
    },
    /// Join a waiting game, paying its entry fee
    Join { route: GameRoute },
    /// Subtract from the current number on your turn
    Move { route: GameRoute, subtraction: u64 },
    /// Claim a win after the opponent ran out of time
    Timeout { route: GameRoute },
    /// Cancel your own game while it is still waiting
    Cancel { route: GameRoute },
    /// Withdraw winnings held by a game contract
    Withdraw {
        #[arg(long, default_value = "standard", value_parser = parse_family)]
        family: ContractFamily,
    },
    /// Bet on who wins a game
    Bet {
        route: GameRoute,
        #[arg(long)]
        winner: Address,
        /// Stake in ether
        #[arg(long)]
        amount: String,
    },
    /// Claim winnings from a settled bet
    Claim { route: GameRoute },
    /// Withdraw the spectator balance held by a betting contract
    WithdrawWinnings {
        #[arg(long, default_value = "standard", value_parser = parse_family)]
        family: ContractFamily,
    },
    /// List bets placed by the wallet or --address
    Bets {
        #[arg(long, default_value = "standard", value_parser = parse_family)]
        family: ContractFamily,
    },
    /// Inspect or record contract addresses for the selected network
    #[command(subcommand)]
    Deployments(DeploymentsCommand),
}

#[derive(Subcommand, Debug)]
pub enum DeploymentsCommand {
    Show,
    Set {
        #[arg(long, value_parser = parse_family)]
        family: ContractFamily,
        #[arg(long)]
        game: Address,
        #[arg(long)]
        betting: Option<Address>,
    },
}

fn parse_family(raw: &str) -> Result<ContractFamily, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "standard" => Ok(ContractFamily::Standard),
        "mystery" => Ok(ContractFamily::Mystery),
        other => Err(format!("unknown contract family '{other}' (standard|mystery)")),
    }
}

fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_writer(std::io::stderr).with_filter(filter());
    match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, "zerosum.log"));
            let file = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            let _ = tracing_subscriber::registry().with(console).with(file).try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry().with(console).try_init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.global.log_dir.as_ref());
    tracing::info!(network = %cli.global.env(), "starting zerosum client");
    deployments::ensure_structure()
        .map_err(|e| color_eyre::eyre::eyre!(e))
        .wrap_err("preparing deployment store failed")?;
    commands::run(cli.global, cli.command).await
}
