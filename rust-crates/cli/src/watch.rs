use crate::{
    commands::print_snapshot,
    session::Session,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::str::FromStr;
use tokio::io::{
    AsyncBufReadExt,
    BufReader,
};
use tracing::info;
use zerosum_client::{
    Address,
    U256,
    poller::{
        PollEvent,
        PollState,
        PollerHandle,
        spawn_poller,
    },
    route::GameRoute,
    types::{
        GameSnapshot,
        parse_amount,
    },
    writer::{
        TxFailure,
        TxSuccess,
    },
};

const HELP: &str = "actions: refresh | join | move <n> | timeout | cancel | \
                    bet <address> <eth> | claim | wallet <address|none> | quit";

#[derive(Clone, Debug, Eq, PartialEq)]
enum WatchAction {
    Refresh,
    Join,
    Move(U256),
    Timeout,
    Cancel,
    Bet { winner: Address, amount: U256 },
    Claim,
    Wallet(Option<Address>),
    Help,
    Quit,
}

impl FromStr for WatchAction {
    type Err = color_eyre::eyre::Report;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or("help").to_ascii_lowercase();
        let mut arg = |name: &str| {
            words
                .next()
                .ok_or_else(|| eyre!("`{verb}` needs {name}"))
                .map(str::to_owned)
        };
        let action = match verb.as_str() {
            "r" | "refresh" => WatchAction::Refresh,
            "join" => WatchAction::Join,
            "move" => {
                let raw = arg("an amount to subtract")?;
                let n = raw
                    .parse::<u64>()
                    .wrap_err_with(|| format!("invalid subtraction '{raw}'"))?;
                WatchAction::Move(U256::from(n))
            }
            "timeout" => WatchAction::Timeout,
            "cancel" => WatchAction::Cancel,
            "bet" => {
                let winner = arg("a predicted winner")?;
                let amount = arg("a stake")?;
                WatchAction::Bet {
                    winner: winner
                        .parse()
                        .wrap_err_with(|| format!("invalid address '{winner}'"))?,
                    amount: parse_amount(&amount).map_err(|e| eyre!("{e:#}"))?,
                }
            }
            "claim" => WatchAction::Claim,
            "wallet" => {
                let raw = arg("an address or `none`")?;
                if raw.eq_ignore_ascii_case("none") {
                    WatchAction::Wallet(None)
                } else {
                    WatchAction::Wallet(Some(
                        raw.parse()
                            .wrap_err_with(|| format!("invalid address '{raw}'"))?,
                    ))
                }
            }
            "help" | "?" => WatchAction::Help,
            "q" | "quit" | "exit" => WatchAction::Quit,
            other => return Err(eyre!("unknown action '{other}'; {HELP}")),
        };
        Ok(action)
    }
}

pub async fn run(session: Session, route: GameRoute) -> Result<()> {
    let mut poller = spawn_poller(
        session.reader.clone(),
        route.game_id,
        session.identity,
        session.poll.clone(),
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut wallet = session.identity;
    let mut latest: Option<GameSnapshot> = None;
    println!("Watching {route}; type `help` for actions");

    loop {
        tokio::select! {
            event = poller.next_event() => {
                let Some(event) = event else {
                    println!("Stopped watching game {}", route.game_id);
                    break;
                };
                render(event, wallet, &mut latest);
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.wrap_err("reading stdin failed")? else {
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let action = match line.parse::<WatchAction>() {
                    Ok(action) => action,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                if action == WatchAction::Quit {
                    break;
                }
                if let WatchAction::Wallet(next) = action {
                    wallet = next;
                }
                act(&session, &poller, route, latest.as_ref(), action).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    poller.shutdown().await;
    Ok(())
}

async fn act(
    session: &Session,
    poller: &PollerHandle,
    route: GameRoute,
    latest: Option<&GameSnapshot>,
    action: WatchAction,
) {
    let game_id = route.game_id;
    let writer = &session.writer;
    let result = match action {
        WatchAction::Refresh => {
            poller.refresh();
            return;
        }
        WatchAction::Wallet(wallet) => {
            poller.set_wallet(wallet);
            return;
        }
        WatchAction::Help => {
            println!("{HELP}");
            return;
        }
        WatchAction::Quit => return,
        WatchAction::Join => {
            let Some(snapshot) = latest else {
                println!("No snapshot yet; wait for the first refresh");
                return;
            };
            writer.join_game(game_id, snapshot.entry_fee).await
        }
        WatchAction::Move(subtraction) => writer.make_move(game_id, subtraction).await,
        WatchAction::Timeout => writer.handle_timeout(game_id).await,
        WatchAction::Cancel => writer.cancel_waiting_game(game_id).await,
        WatchAction::Bet { winner, amount } => writer.place_bet(game_id, winner, amount).await,
        WatchAction::Claim => writer.claim_betting_winnings(game_id).await,
    };
    after_write(poller, result);
}

fn after_write(poller: &PollerHandle, result: Result<TxSuccess, TxFailure>) {
    if result.is_ok() {
        poller.refresh();
    }
}

fn render(event: PollEvent, wallet: Option<Address>, latest: &mut Option<GameSnapshot>) {
    match event {
        PollEvent::Snapshot {
            snapshot,
            flags,
            player_view,
        } => {
            if latest.as_ref() != Some(&snapshot) {
                print_snapshot(&snapshot, &flags);
                if let Some(view) = player_view {
                    let number = view
                        .displayed_number
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "hidden".to_string());
                    println!("your view: number {number}, {} moves", view.moves_made);
                }
            }
            *latest = Some(snapshot);
        }
        PollEvent::Flags(flags) => {
            let who = wallet.map(|w| w.to_string()).unwrap_or_else(|| "nobody".into());
            println!(
                "as {who}: in game {}, creator {}, your turn {}, can join {}",
                flags.is_user_in_game, flags.is_user_creator, flags.is_my_turn, flags.can_join
            );
        }
        PollEvent::Transition { to, .. } => match to {
            PollState::PollingActive => println!("Game started"),
            PollState::IdleTerminal => println!("Game over"),
            PollState::PollingWaiting => println!("Waiting for players"),
            PollState::Initial => {}
        },
        PollEvent::Countdown(secs) => {
            if secs % 10 == 0 || secs <= 5 {
                println!("{secs}s left in this turn");
            }
        }
        PollEvent::CountdownExpired => {
            println!("Turn timer expired; `timeout` claims the win if the opponent stalled")
        }
        PollEvent::NotFound(id) => println!("Game {id} not found; `refresh` to retry"),
        PollEvent::Unavailable(id) => {
            println!("Could not reach the contract for game {id}; retrying")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use zerosum_client::test_helpers::ALICE;

    #[test]
    fn from_str__parses_actions_with_arguments() {
        assert_eq!("move 7".parse::<WatchAction>().unwrap(), WatchAction::Move(U256::from(7)));
        assert_eq!(
            format!("bet {ALICE} 0.5").parse::<WatchAction>().unwrap(),
            WatchAction::Bet {
                winner: ALICE,
                amount: U256::from(500_000_000_000_000_000u64),
            }
        );
        assert_eq!("wallet none".parse::<WatchAction>().unwrap(), WatchAction::Wallet(None));
        assert_eq!("Q".parse::<WatchAction>().unwrap(), WatchAction::Quit);
    }

    #[test]
    fn from_str__rejects_missing_or_bad_arguments() {
        assert!("move".parse::<WatchAction>().is_err());
        assert!("move lots".parse::<WatchAction>().is_err());
        assert!("bet 0x12 1".parse::<WatchAction>().is_err());
        assert!("dance".parse::<WatchAction>().is_err());
    }
}
