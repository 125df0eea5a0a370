use std::io::Write;
use std::sync::Arc;

use ragstream_client::RagClient;
use ragstream_chat::{
    command::{Command, HELP},
    render,
    ChatApp, ChatError, ChatUpdate, Config, LoggingConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);

    tracing::info!(base_url = %config.server.base_url, "Starting ragstream chat");

    let client = RagClient::from_config(&config.server)?;
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(Arc::new(client.clone()), &config.chat, updates_tx)?;

    let renderer = tokio::spawn(render_updates(updates_rx));

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut quit = false;
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => {
                quit = true;
                break;
            }
            Command::Help => println!("{}", HELP),
            Command::Cancel => app.cancel().await,
            Command::Clear => {
                app.clear().await?;
                println!("Conversation cleared.");
            }
            Command::History => {
                let history = app.history().await;
                if history.is_empty() {
                    println!("No questions yet.");
                } else {
                    println!("{}", render::format_transcript(&history));
                }
            }
            Command::Health => match client.health().await {
                Ok(health) => println!("{}", render::format_health(&health)),
                Err(e) => println!("Backend unavailable: {}", e),
            },
            Command::Ask(question) => match app.ask(&question).await {
                Ok(()) => {}
                Err(ChatError::SlotBusy) => {
                    println!("Still answering the previous question (use /cancel).")
                }
                Err(e) => return Err(e.into()),
            },
        }
    }

    // End of input lets a piped question finish; /quit does not wait for it
    if quit {
        app.shutdown().await;
    } else {
        app.wait().await;
    }
    drop(app);
    renderer.await?;

    tracing::info!("Bye");
    Ok(())
}

async fn render_updates(mut updates: mpsc::UnboundedReceiver<ChatUpdate>) {
    let mut stdout = std::io::stdout();

    while let Some(update) = updates.recv().await {
        match update {
            ChatUpdate::Chunk(text) => {
                print!("{}", text);
                let _ = stdout.flush();
            }
            ChatUpdate::Sources(sources) if !sources.is_empty() => {
                println!("\n\n{}", render::format_sources(&sources));
            }
            ChatUpdate::Images(paths) if !paths.is_empty() => {
                println!("\n{}", render::format_images(&paths));
            }
            ChatUpdate::Sources(_) | ChatUpdate::Images(_) => {}
            ChatUpdate::Finished => println!(),
            ChatUpdate::Failed(message) => println!("\n{}", message),
            ChatUpdate::Cancelled => println!(" [cancelled]"),
        }
    }
}

/// Logs go to stderr so streamed answers on stdout stay readable
fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
