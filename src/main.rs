use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;

mod app;
mod cli;
mod commands;
mod config;
mod core;
mod gateway;
mod persona;
mod providers;
mod session;
mod transport;

use crate::app::Application;
use crate::cli::{Args, Mode};
use crate::commands::{CommandDispatcher, CommandParser, dispatcher::create_command_dispatcher};
use crate::config::Config;
use crate::core::error::AibudError;
use crate::core::logging::init_logging;
use crate::gateway::CompletionGateway;
use crate::persona::PersonaCatalog;
use crate::providers::factory::ProviderFactory;
use crate::session::SessionStore;
use crate::transport::{Transport, console::ConsoleTransport, discord::DiscordTransport};

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        eprintln!("{}", console::style(format!("Error: {}", e)).red());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AibudError> {
    let config = Config::load(args.config.as_deref())?;

    let catalog = PersonaCatalog::resolve(config.prompts_path.as_deref(), &config.default_persona)?;
    tracing::info!(personas = catalog.len(), "Loaded prompts");

    let store = Arc::new(SessionStore::new(
        Arc::new(catalog),
        config.session_defaults(),
    ));
    let gateway = Arc::new(CompletionGateway::new(
        ProviderFactory::from_config(&config)?,
        &config.assistant_label,
    ));

    match args.mode {
        Mode::Discord => {
            let token = config.discord.token.clone().ok_or_else(|| {
                AibudError::Config("DISCORD_BOT_TOKEN is not set".to_string())
            })?;
            let mut discord = DiscordTransport::new(
                token,
                config.discord.bot_user_id.clone(),
                config.discord.guild_id.clone(),
            );

            let bot_user_id = match config.discord.bot_user_id.clone() {
                Some(id) => Some(id),
                None => match discord.fetch_bot_user_id().await {
                    Ok(id) => {
                        discord.set_bot_user_id(id.clone());
                        Some(id)
                    }
                    Err(e) => {
                        tracing::warn!("Mention trigger disabled: {}", e);
                        None
                    }
                },
            };

            let parser = bot_user_id
                .as_deref()
                .map(CommandParser::with_mention)
                .unwrap_or_default();
            let dispatcher = create_command_dispatcher(parser, store, gateway);
            serve(dispatcher, Arc::new(discord)).await
        }
        Mode::Console { room, name } => {
            let dispatcher = create_command_dispatcher(CommandParser::new(), store, gateway);
            let console = ConsoleTransport::new(
                &room,
                &name,
                &config.assistant_label,
                dispatcher.get_command_names(),
            );
            serve(dispatcher, Arc::new(console)).await
        }
    }
}

async fn serve(dispatcher: CommandDispatcher, transport: Arc<dyn Transport>) -> Result<(), AibudError> {
    tracing::info!(transport = transport.name(), "Starting");
    Application::new(dispatcher, transport).run().await
}
