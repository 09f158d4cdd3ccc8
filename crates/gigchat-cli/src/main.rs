//! gigchat terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Chat namespace, token from the environment
//! GIGCHAT_TOKEN=... gigchat-cli --endpoint ws://localhost:3000 --user-id 17
//!
//! # Notification feed
//! gigchat-cli --namespace notification --token ... --user-id 17
//! ```
//!
//! Commands: `/join <id>`, `/leave`, `/read`, `/online`, `/chats`,
//! `/notifications`, `/reconnect`, `/quit`. Any other line is sent to the
//! current conversation.

use std::time::Duration;

use clap::Parser;
use gigchat_app::{ConnectionManager, Lease, RuntimeConfig};
use gigchat_cli::{Input, WsConnector, render};
use gigchat_client::SendStatus;
use gigchat_core::ConnectionConfig;
use gigchat_proto::Namespace;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// gigchat terminal client
#[derive(Parser, Debug)]
#[command(name = "gigchat-cli")]
#[command(about = "Line-oriented client for the gigchat realtime service")]
#[command(version)]
struct Args {
    /// Realtime endpoint
    #[arg(short, long, default_value = "ws://localhost:3000")]
    endpoint: String,

    /// Access token
    #[arg(short, long, env = "GIGCHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Own user id
    #[arg(short, long)]
    user_id: String,

    /// Namespace to join (chat, notification)
    #[arg(short, long, default_value = "chat")]
    namespace: Namespace,

    /// Give up on a handshake after this many seconds (0 waits forever)
    #[arg(long, default_value = "20")]
    handshake_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

type Manager = ConnectionManager<WsConnector>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let handshake_timeout =
        (args.handshake_timeout_secs > 0).then(|| Duration::from_secs(args.handshake_timeout_secs));
    let config = RuntimeConfig {
        connection: ConnectionConfig { handshake_timeout },
        ..RuntimeConfig::default()
    };

    let manager = Manager::new(WsConnector::new(args.endpoint.as_str()), args.user_id.as_str(), config);
    let token = args.token.unwrap_or_default();
    let Some(lease) = manager.acquire(args.namespace, &token) else {
        return Err("no token: pass --token or set GIGCHAT_TOKEN".into());
    };
    tracing::info!(endpoint = %args.endpoint, namespace = %args.namespace, "connecting");

    let mut events = lease.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => handle_input(&lease, input, &mut out).await?,
                    Err(e) => write_line(&mut out, &format!("? {e}")).await?,
                }
            },
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Some(line) = render::event_line(&event) {
                    write_line(&mut out, &line).await?;
                }
            },
        }

        if lease.is_stopped() {
            write_line(&mut out, "* connection closed").await?;
            break;
        }
    }

    drop(events);
    drop(lease);
    manager.release(args.namespace);
    Ok(())
}

async fn handle_input(
    lease: &Lease<WsConnector>,
    input: Input,
    out: &mut Stdout,
) -> Result<(), Box<dyn std::error::Error>> {
    match input {
        Input::Join(chat_id) => lease.select_chat(Some(chat_id)).await?,
        Input::Leave => lease.select_chat(None).await?,
        Input::Read => {
            let current = lease.snapshot().current_chat.unwrap_or_default();
            report(lease.mark_as_read(current, Vec::new()).await, out).await?;
        },
        Input::Online => write_line(out, &render::online_line(&lease.snapshot())).await?,
        Input::Chats => write_line(out, &render::chat_list(&lease.snapshot())).await?,
        Input::Notifications => {
            write_line(out, &render::notification_list(&lease.snapshot())).await?;
            lease.mark_notifications_read().await?;
        },
        Input::Reconnect => lease.reconnect().await?,
        Input::Say(body) => {
            let current = lease.snapshot().current_chat.unwrap_or_default();
            report(lease.send_message(current, body).await, out).await?;
        },
        Input::Quit | Input::Empty => {},
    }
    Ok(())
}

async fn report(status: SendStatus, out: &mut Stdout) -> std::io::Result<()> {
    match status {
        SendStatus::Sent(_) => Ok(()),
        SendStatus::Dropped(reason) => write_line(out, &format!("? not sent: {reason}")).await,
    }
}

async fn write_line(out: &mut Stdout, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
