use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blog_client::account::Account;
use blog_client::api::LoginForm;
use blog_client::chat::{ChatState, ChatSync};
use blog_client::config::Config;
use blog_client::storage::{FileStorage, Storage};
use blog_client::Context;

const HELP: &str = "commands: /users  /open <name>  /close  /more  /search <text>  /quit\n\
                    anything else is sent to the open conversation (start with // to send a leading /)";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting blog-chat");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(api_base_url = %config.api_base_url, "Configuration loaded");

    if let Some(parent) = config.storage_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create storage directory: {}", parent.display())
        })?;
    }
    let storage: Arc<dyn Storage> = Arc::new(
        FileStorage::open(&config.storage_path).context("Failed to open local storage")?,
    );

    let ctx = Context::new(config, storage).context("Failed to build API client")?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if ctx.session.load().is_none() {
        login(&ctx, &mut input).await?;
    }

    let mut chat = ChatSync::new(&ctx).context("Not logged in")?;
    info!(username = %chat.me().username, "Logged in");
    chat.start().await;

    print_users(&chat.state()).await;
    if let Some(partner) = ctx.config.chat_partner.as_deref() {
        match chat.select_by_name(partner).await {
            Ok(true) => {}
            Ok(false) => warn!(partner, "CHAT_PARTNER is not in the chat list"),
            Err(e) => warn!(partner, "Failed to open conversation: {e}"),
        }
    }
    println!("{HELP}");

    let render_cancel = CancellationToken::new();
    let render_handle = tokio::spawn(render_loop(
        chat.state(),
        chat.me().id,
        ctx.config.chat_messages_interval,
        render_cancel.clone(),
    ));

    tokio::select! {
        result = command_loop(&ctx, &mut chat, &mut input) => {
            if let Err(e) = result {
                error!("Input error: {e:#}");
            }
        }
        () = shutdown_signal() => {}
    }

    info!("Shutting down...");

    render_cancel.cancel();
    let _ = render_handle.await;
    chat.shutdown().await;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,blog_client=debug"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // Logs go to stderr so the conversation on stdout stays readable.
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn prompt(input: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<String> {
    println!("{label}:");
    input
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .context("stdin closed")
}

/// Interactive login. The captcha image is written next to the storage file.
async fn login(ctx: &Context, input: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    let account = Account::new(ctx.clone());
    let captcha_path = ctx.config.storage_path.with_file_name("captcha.png");

    loop {
        let captcha = account.captcha().await.context("Failed to fetch captcha")?;
        tokio::fs::write(&captcha_path, &captcha.image)
            .await
            .with_context(|| format!("Failed to write {}", captcha_path.display()))?;
        println!("captcha saved to {}", captcha_path.display());

        let form = LoginForm {
            email: prompt(input, "email").await?,
            password: prompt(input, "password").await?,
            captcha: prompt(input, "captcha").await?,
        };

        match account.login(&form).await {
            Ok(user) => {
                info!(user_id = user.id, "Login succeeded");
                return Ok(());
            }
            Err(_) => {
                for notice in ctx.notifier.drain() {
                    println!("{}", notice.message);
                }
            }
        }
    }
}

/// One line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Quit,
    Help,
    Users,
    Search(&'a str),
    Open(&'a str),
    Close,
    More,
    Unknown(&'a str),
    Send(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if line.starts_with("//") {
            return Self::Send(&line[1..]);
        }
        if !line.starts_with('/') {
            return Self::Send(line);
        }

        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();
        match command {
            "/quit" => Self::Quit,
            "/help" => Self::Help,
            "/users" => Self::Users,
            "/search" => Self::Search(arg),
            "/open" => Self::Open(arg),
            "/close" => Self::Close,
            "/more" => Self::More,
            other => Self::Unknown(other),
        }
    }
}

async fn command_loop(
    ctx: &Context,
    chat: &mut ChatSync,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    while let Some(line) = input.next_line().await? {
        let outcome = match Command::parse(&line) {
            Command::Empty => Ok(()),
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                Ok(())
            }
            Command::Unknown(command) => {
                println!("unknown command {command}");
                println!("{HELP}");
                Ok(())
            }
            Command::Users => {
                print_users(&chat.state()).await;
                Ok(())
            }
            Command::Search(query) => chat.search(query).await.map(|_| ()),
            Command::Open(name) => match chat.select_by_name(name).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    println!("no chat partner named {name:?}");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Command::Close => {
                chat.deselect().await;
                Ok(())
            }
            Command::More => chat.load_more_messages().await.map(|added| {
                println!("loaded {added} older messages");
            }),
            Command::Send(text) => chat.send(text).await.map(|_| ()),
        };

        let notices = ctx.notifier.drain();
        for notice in &notices {
            println!("{}", notice.message);
        }
        if let Err(e) = outcome {
            if notices.is_empty() {
                println!("error: {e}");
            }
        }
    }
    Ok(())
}

async fn print_users(state: &RwLock<ChatState>) {
    let state = state.read().await;
    if state.users().is_empty() {
        println!("no conversations yet");
        return;
    }
    for user in state.users() {
        let unread = if user.unread_count > 0 {
            format!(" ({} unread)", user.unread_count)
        } else {
            String::new()
        };
        println!("{} [{}]{unread}", user.username, user.presence());
    }
}

/// Print messages as they land in the open conversation. Switching
/// conversation reprints from the top.
async fn render_loop(
    state: Arc<RwLock<ChatState>>,
    me: i64,
    period: std::time::Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period.min(std::time::Duration::from_secs(1)));
    let mut shown: HashSet<i64> = HashSet::new();
    let mut ticket = None;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let state = state.read().await;
        if state.ticket() != ticket {
            ticket = state.ticket();
            shown.clear();
            if let Some(partner) = state.selected() {
                println!("--- {} [{}] ---", partner.username, partner.presence());
            }
        }
        for message in state.messages() {
            // An optimistic copy is replaced by the server's under a new id.
            if state.is_pending(message.id) || !shown.insert(message.id) {
                continue;
            }
            let who = if message.sender_id == me {
                "me"
            } else {
                message.sender_username.as_str()
            };
            println!("[{}] {who}: {}", message.created_at, message.message);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
