use crate::{
    Command,
    DeploymentsCommand,
    GlobalArgs,
    session::{
        Session,
        family_addresses,
    },
    watch,
};
use color_eyre::eyre::{
    Result,
    bail,
    eyre,
};
use deployments::{
    DeploymentRecord,
    DeploymentStore,
    FamilyAddresses,
};
use zerosum_client::{
    U256,
    evm::EvmChain,
    projector::ViewFlags,
    reader::{
        GameLookup,
        ReadAdapter,
    },
    route::GameRoute,
    types::{
        BetRecord,
        ContractFamily,
        GameSnapshot,
        format_amount,
        parse_amount,
    },
    writer::{
        TxFailure,
        TxSuccess,
    },
};

pub async fn run(global: GlobalArgs, command: Command) -> Result<()> {
    match command {
        Command::Watch { route } => {
            let session = Session::open(&global, route.family()).await?;
            watch::run(session, route).await
        }
        Command::Show { route } => {
            let session = Session::open(&global, route.family()).await?;
            show(&session, route).await
        }
        Command::Create {
            mode,
            fee,
            max_players,
        } => {
            let session = Session::open(&global, mode.family()).await?;
            let fee = parse_amount(&fee).map_err(|e| eyre!("{e:#}"))?;
            let success = session.writer.create_game(mode, fee, max_players).await;
            let success = report(success)?;
            match success.game_id {
                Some(game_id) => println!("Created {}", GameRoute::new(game_id, mode)),
                None => println!("Game created, but no GameCreated event was found"),
            }
            Ok(())
        }
        Command::Join { route } => {
            let session = Session::open(&global, route.family()).await?;
            let snapshot = found(&session.reader, route).await?;
            report(session.writer.join_game(route.game_id, snapshot.entry_fee).await)
                .map(drop)
        }
        Command::Move { route, subtraction } => {
            let session = Session::open(&global, route.family()).await?;
            report(
                session
                    .writer
                    .make_move(route.game_id, U256::from(subtraction))
                    .await,
            )
            .map(drop)
        }
        Command::Timeout { route } => {
            let session = Session::open(&global, route.family()).await?;
            report(session.writer.handle_timeout(route.game_id).await).map(drop)
        }
        Command::Cancel { route } => {
            let session = Session::open(&global, route.family()).await?;
            report(session.writer.cancel_waiting_game(route.game_id).await).map(drop)
        }
        Command::Withdraw { family } => {
            let session = Session::open(&global, family).await?;
            report(session.writer.withdraw().await).map(drop)
        }
        Command::Bet {
            route,
            winner,
            amount,
        } => {
            let session = Session::open(&global, route.family()).await?;
            let amount = parse_amount(&amount).map_err(|e| eyre!("{e:#}"))?;
            if !session.reader.is_game_bettable(route.game_id).await {
                bail!("Game {} is not open for betting", route.game_id);
            }
            report(session.writer.place_bet(route.game_id, winner, amount).await).map(drop)
        }
        Command::Claim { route } => {
            let session = Session::open(&global, route.family()).await?;
            report(session.writer.claim_betting_winnings(route.game_id).await).map(drop)
        }
        Command::WithdrawWinnings { family } => {
            let session = Session::open(&global, family).await?;
            report(session.writer.withdraw_spectator_balance().await).map(drop)
        }
        Command::Bets { family } => {
            let session = Session::open(&global, family).await?;
            let user = session.require_identity()?;
            let bets = session.reader.betting_history(user).await;
            print_bets(&bets);
            Ok(())
        }
        Command::Deployments(command) => deployments(&global, command),
    }
}

/// The notifier has already shown the failure; this only sets the exit status.
pub fn report(result: Result<TxSuccess, TxFailure>) -> Result<TxSuccess> {
    result.map_err(|failure| eyre!("{failure}"))
}

async fn found(reader: &ReadAdapter<EvmChain>, route: GameRoute) -> Result<GameSnapshot> {
    match reader.game(route.game_id).await {
        GameLookup::Found(snapshot) => Ok(snapshot),
        GameLookup::NotFound => bail!("Game {} not found", route.game_id),
        GameLookup::Unavailable => bail!("Could not reach the game contract; try again"),
    }
}

async fn show(session: &Session, route: GameRoute) -> Result<()> {
    let snapshot = found(&session.reader, route).await?;
    let flags = ViewFlags::project(&snapshot, session.identity.as_ref());
    print_snapshot(&snapshot, &flags);

    let (bettable, info) = tokio::join!(
        session.reader.is_game_bettable(route.game_id),
        session.reader.betting_info(route.game_id),
    );
    println!(
        "betting:   {} (pool {} ETH, {} bets{})",
        if bettable { "open" } else { "closed" },
        format_amount(info.total_pool),
        info.bet_count,
        if info.settled { ", settled" } else { "" },
    );

    if route.family() == ContractFamily::Mystery {
        for (player, view) in session
            .reader
            .player_views(route.game_id, &snapshot.players)
            .await
        {
            let Some(view) = view else {
                continue;
            };
            let number = view
                .displayed_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "hidden".to_string());
            println!(
                "  {player}: number {number}, {} moves{}",
                view.moves_made,
                if view.is_active { "" } else { ", eliminated" }
            );
        }
    }

    if let Some(user) = session.identity
        && let Some(bet) = session.reader.user_bet(route.game_id, user).await
    {
        println!(
            "your bet:  {} ETH on {}{}",
            format_amount(bet.amount),
            bet.predicted_winner,
            if bet.claimed { " (claimed)" } else { "" }
        );
    }
    Ok(())
}

pub fn print_snapshot(snapshot: &GameSnapshot, flags: &ViewFlags) {
    println!(
        "{} #{} [{}]",
        snapshot.mode, snapshot.game_id, snapshot.status
    );
    println!(
        "players:   {}/{} {}",
        snapshot.players.len(),
        snapshot.max_players,
        snapshot
            .players
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "stakes:    entry {} ETH, pool {} ETH",
        format_amount(snapshot.entry_fee),
        format_amount(snapshot.prize_pool)
    );
    if let Some(number) = snapshot.current_number {
        println!("number:    {number}");
    }
    if let Some(current) = snapshot.current_player {
        println!(
            "turn:      {current} ({}s left, {} moves so far)",
            snapshot.time_left, snapshot.move_count
        );
    }
    if let Some(winner) = snapshot.winner {
        println!("winner:    {winner}");
    }
    println!(
        "you:       in game {}, creator {}, your turn {}, can join {}",
        flags.is_user_in_game, flags.is_user_creator, flags.is_my_turn, flags.can_join
    );
}

fn print_bets(bets: &[BetRecord]) {
    if bets.is_empty() {
        println!("No bets found");
        return;
    }
    for bet in bets {
        println!(
            "game #{:<5} {} ETH on {} at {}{}",
            bet.game_id,
            format_amount(bet.amount),
            bet.predicted_winner,
            bet.timestamp.format("%Y-%m-%d %H:%M"),
            if bet.claimed { " (claimed)" } else { "" }
        );
    }
}

fn deployments(global: &GlobalArgs, command: DeploymentsCommand) -> Result<()> {
    let env = global.env();
    let store = DeploymentStore::new(env).map_err(|e| eyre!(e))?;
    let existing = store.load().map_err(|e| eyre!(e))?;
    match command {
        DeploymentsCommand::Show => {
            let Some(record) = existing else {
                println!("No {env} deployment recorded at {}", store.path().display());
                return Ok(());
            };
            println!("{env} deployment ({}), recorded {}", record.network_url, record.recorded_at);
            for family in [ContractFamily::Standard, ContractFamily::Mystery] {
                match family_addresses(&record, family) {
                    Some(addresses) => println!(
                        "  {family}: game {}, betting {}",
                        addresses.game,
                        addresses.betting.as_deref().unwrap_or("-")
                    ),
                    None => println!("  {family}: not recorded"),
                }
            }
            Ok(())
        }
        DeploymentsCommand::Set {
            family,
            game,
            betting,
        } => {
            let rpc_url = global
                .rpc_url
                .clone()
                .unwrap_or_else(|| global.default_rpc_url().to_string());
            let mut record = existing
                .filter(|record| record.is_for_network(&rpc_url))
                .unwrap_or_else(|| DeploymentRecord::new(rpc_url.clone()));
            let addresses = Some(FamilyAddresses {
                game: game.to_string(),
                betting: betting.map(|b| b.to_string()),
            });
            match family {
                ContractFamily::Standard => record.standard = addresses,
                ContractFamily::Mystery => record.mystery = addresses,
            }
            record.recorded_at = chrono::Utc::now().to_rfc3339();
            store.save(record).map_err(|e| eyre!(e))?;
            println!("Recorded {family} contracts for {env} at {}", store.path().display());
            Ok(())
        }
    }
}
