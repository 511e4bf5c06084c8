use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use leilao_lib::api::{ApiError, GatewayClient, StatusMessage};
use leilao_lib::config::ClientConfig;
use leilao_lib::notifications::{NotificationFeed, NotificationPump, SharedFeed};
use leilao_lib::render::{format_auctions, format_status, TerminalSink};
use leilao_lib::session::SessionContext;
use leilao_lib::stream::{ConnectionState, EventStreamClient, HttpStreamTransport};
use leilao_lib::{init_tracing, open_session, AppError};

#[derive(Debug, PartialEq)]
enum Command {
    Watch { show_feed: bool },
    Create { desc: String, ends_at: String },
    List,
    Bid { auction: String, value: f64 },
    Follow { auction: String },
    Unfollow { auction: String },
    WhoAmI,
    Help,
}

#[tokio::main]
async fn main() {
    init_tracing();

    match run().await {
        Ok(()) => {}
        // Status line already printed.
        Err(AppError::Api(_)) => std::process::exit(1),
        Err(error) => {
            eprintln!("leilao: {error}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<(), AppError> {
    let command = parse_args(std::env::args().skip(1)).map_err(AppError::Usage)?;
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let config = ClientConfig::from_env()?;
    let session = open_session(&config)?;

    match command {
        Command::Watch { show_feed } => watch(&config, session, show_feed).await,
        Command::WhoAmI => {
            println!("{session}");
            Ok(())
        }
        Command::Create { desc, ends_at } => {
            let gateway = gateway(&config, session)?;
            println!("{}", format_status(&StatusMessage::creating_auction()));
            match gateway.create_auction(&desc, &ends_at).await {
                Ok(auction) => {
                    println!("{}", format_status(&StatusMessage::auction_created(&auction)));
                    Ok(())
                }
                Err(e) => fail(StatusMessage::auction_failed(&e), e),
            }
        }
        Command::List => {
            let gateway = gateway(&config, session)?;
            match gateway.list_active_auctions().await {
                Ok(auctions) => {
                    println!("{}", format_auctions(&auctions));
                    Ok(())
                }
                Err(e) => fail(StatusMessage::request_failed(&e), e),
            }
        }
        Command::Bid { auction, value } => {
            let gateway = gateway(&config, session)?;
            println!("{}", format_status(&StatusMessage::sending_bid()));
            match gateway.place_bid(&auction, value).await {
                Ok(_) => {
                    println!("{}", format_status(&StatusMessage::bid_sent(&auction, value)));
                    Ok(())
                }
                Err(e) => fail(StatusMessage::bid_failed(&e), e),
            }
        }
        Command::Follow { auction } => {
            let gateway = gateway(&config, session)?;
            match gateway.follow(&auction).await {
                Ok(()) => {
                    println!("{}", format_status(&StatusMessage::followed(&auction)));
                    Ok(())
                }
                Err(e) => fail(StatusMessage::request_failed(&e), e),
            }
        }
        Command::Unfollow { auction } => {
            let gateway = gateway(&config, session)?;
            match gateway.unfollow(&auction).await {
                Ok(()) => {
                    println!("{}", format_status(&StatusMessage::unfollowed(&auction)));
                    Ok(())
                }
                Err(e) => fail(StatusMessage::request_failed(&e), e),
            }
        }
        Command::Help => Ok(()),
    }
}

fn gateway(config: &ClientConfig, session: SessionContext) -> Result<GatewayClient, AppError> {
    GatewayClient::new(config.api_url.clone(), session, config.request_timeout).map_err(|e| {
        eprintln!("{}", format_status(&StatusMessage::request_failed(&e)));
        AppError::Api(e)
    })
}

fn fail(status: StatusMessage, error: ApiError) -> Result<(), AppError> {
    eprintln!("{}", format_status(&status));
    Err(AppError::Api(error))
}

async fn watch(
    config: &ClientConfig,
    session: SessionContext,
    show_feed: bool,
) -> Result<(), AppError> {
    let transport = Arc::new(HttpStreamTransport::new(&session)?);
    let client = EventStreamClient::new(config.stream_config(), transport);

    let feed: SharedFeed = Arc::new(Mutex::new(NotificationFeed::new()));
    let pump = NotificationPump::start(
        client.subscribe(),
        session.clone(),
        feed,
        Arc::new(TerminalSink { show_feed }),
    );

    client.connect().await?;
    println!(
        "Ouvindo {} como {} (Ctrl-C para sair)",
        config.stream_url, session
    );

    let mut state = client.watch_state();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, closing stream");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                info!("stream state: {}", current);
                if current == ConnectionState::Closed {
                    warn!("stream closed; exiting");
                    break;
                }
            }
        }
    }

    client.disconnect().await;
    drop(client);
    if let Err(e) = pump.await {
        warn!("notification pump ended abnormally: {}", e);
    }
    Ok(())
}

fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(name) = args.next() else {
        return Ok(Command::Help);
    };

    let mut desc: Option<String> = None;
    let mut ends_at: Option<String> = None;
    let mut auction: Option<String> = None;
    let mut value: Option<f64> = None;
    let mut show_feed = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(Command::Help);
        }

        if arg == "--feed" {
            show_feed = true;
            continue;
        }

        if let Some(v) = arg.strip_prefix("--desc=") {
            desc = Some(v.to_string());
            continue;
        }
        if arg == "--desc" {
            desc = Some(
                args.next()
                    .ok_or_else(|| "--desc requires a value".to_string())?,
            );
            continue;
        }

        if let Some(v) = arg.strip_prefix("--ends-at=") {
            ends_at = Some(v.to_string());
            continue;
        }
        if arg == "--ends-at" {
            ends_at = Some(
                args.next()
                    .ok_or_else(|| "--ends-at requires a value".to_string())?,
            );
            continue;
        }

        if let Some(v) = arg.strip_prefix("--auction=") {
            auction = Some(v.to_string());
            continue;
        }
        if arg == "--auction" {
            auction = Some(
                args.next()
                    .ok_or_else(|| "--auction requires a value".to_string())?,
            );
            continue;
        }

        if let Some(v) = arg.strip_prefix("--value=") {
            value = Some(parse_value(v)?);
            continue;
        }
        if arg == "--value" {
            let v = args
                .next()
                .ok_or_else(|| "--value requires a value".to_string())?;
            value = Some(parse_value(&v)?);
            continue;
        }

        return Err(format!("unknown argument: {arg}"));
    }

    let require = |flag: &str, v: Option<String>| {
        v.ok_or_else(|| format!("{name} requires --{flag}"))
    };

    match name.as_str() {
        "watch" => Ok(Command::Watch { show_feed }),
        "create" => Ok(Command::Create {
            desc: require("desc", desc)?,
            ends_at: require("ends-at", ends_at)?,
        }),
        "list" => Ok(Command::List),
        "bid" => Ok(Command::Bid {
            auction: require("auction", auction)?,
            value: value.ok_or_else(|| "bid requires --value".to_string())?,
        }),
        "follow" => Ok(Command::Follow {
            auction: require("auction", auction)?,
        }),
        "unfollow" => Ok(Command::Unfollow {
            auction: require("auction", auction)?,
        }),
        "whoami" => Ok(Command::WhoAmI),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Accepts a decimal comma as well (`150,50`).
fn parse_value(raw: &str) -> Result<f64, String> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| format!("invalid --value: {raw}"))
}

fn print_help() {
    println!(
        "leilao: real-time auction client

Usage:
  leilao watch [--feed]
  leilao create --desc <text> --ends-at <YYYY-MM-DDTHH:MM>
  leilao list
  leilao bid --auction <id> --value <amount>
  leilao follow --auction <id>
  leilao unfollow --auction <id>
  leilao whoami

Environment:
  LEILAO_API_URL             gateway base url (default http://localhost:5000)
  LEILAO_STREAM_URL          stream url (default {{api}}/events/stream?channel={{channel}})
  LEILAO_STREAM_CHANNEL      stream channel (default \"default\")
  LEILAO_RETRY_MS            reconnect delay in ms (default 3000)
  LEILAO_MAX_RETRIES         consecutive reconnect attempts (default unlimited)
  LEILAO_REQUEST_TIMEOUT_MS  REST timeout in ms (default 10000)
  LEILAO_SESSION_FILE        file that persists the session id
  RUST_LOG                   log filter (default leilao=info,warn)"
    );
}
