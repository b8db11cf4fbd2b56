use anyhow::Result;
use clap::Parser;
use skyway_core::config::API_URL_ENV;
use skyway_core::{AgentClient, ChatHistory, Config, Conversation, Flow};
use uuid::Uuid;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "skyway")]
#[command(about = "Chat with the SkyWay AI travel assistant")]
#[command(version)]
struct Cli {
    /// Base URL of the travel agent service (overrides SKYWAY_API_URL)
    #[arg(long)]
    api_url: Option<String>,
    /// Conversation id sent to the agent so it can keep memory across turns
    #[arg(long, conflicts_with = "new_conversation")]
    conversation_id: Option<Uuid>,
    /// Start a new agent conversation and remember its id
    #[arg(long)]
    new_conversation: bool,
    /// Do not load or save local chat history
    #[arg(long)]
    no_history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is best effort; the chat works without it
    let log_path = logging::init().ok();

    let file_config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config file");
        Config::new()
    });

    let conversation_id = if cli.new_conversation {
        Some(Config::save_new_conversation_id()?)
    } else {
        cli.conversation_id
    };

    let config = file_config
        .with_env_api_url(std::env::var(API_URL_ENV).ok())
        .with_overrides(cli.api_url, conversation_id);

    let agent_config = config.agent_config();
    if agent_config.base_url.is_empty() {
        tracing::warn!("no agent URL configured, requests will use a relative path");
    }
    tracing::info!(
        base_url = %agent_config.base_url,
        conversation_id = ?agent_config.conversation_id,
        log = ?log_path,
        "starting SkyWay chat"
    );

    let history = if cli.no_history {
        None
    } else {
        match ChatHistory::default_location(config.storage_key()) {
            Ok(history) => Some(history.with_max_entries(config.max_history_entries())),
            Err(e) => {
                tracing::warn!(error = %e, "chat history disabled");
                None
            }
        }
    };

    let conversation = Conversation::new(Flow::travel_agent(AgentClient::new(&agent_config)));
    let mut app = App::new(conversation, history);
    app.start().await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await,
            None => break,
        }
        app.poll_reply().await;
    }
    Ok(())
}
