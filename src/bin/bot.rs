use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chime::commands::{
    register_global_commands, register_guild_commands, CommandContext, CommandRegistry,
    ReminderHandler,
};
use chime::core::Config;
use chime::database::{Database, GuildStore, ReminderStore};
use chime::features::reminders::{
    DiscordSender, RecoveryLoader, ReminderService, ScheduleRegistry,
};

struct Handler {
    ctx: Arc<CommandContext>,
    commands: CommandRegistry,
    recovery: Arc<RecoveryLoader>,
    guild_id: Option<GuildId>,
    // Serenity fires Ready again on every gateway reconnect; triggers
    // must only be rehydrated once per process.
    first_ready: AtomicBool,
}

impl Handler {
    fn new(
        ctx: Arc<CommandContext>,
        commands: CommandRegistry,
        recovery: Arc<RecoveryLoader>,
        guild_id: Option<GuildId>,
    ) -> Self {
        Handler {
            ctx,
            commands,
            recovery,
            guild_id,
            first_ready: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());

        // Guild commands for development (instant), global for production
        if let Some(guild_id) = self.guild_id {
            info!("🔧 Development mode: registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("❌ Failed to register guild slash commands: {e}");
            }
        } else if let Err(e) = register_global_commands(&ctx).await {
            error!("❌ Failed to register global slash commands: {e}");
        }

        if !self.first_ready.swap(true, Ordering::SeqCst) {
            match self.recovery.load().await {
                Ok(count) => info!("⏰ {count} reminders scheduled from storage"),
                Err(e) => error!("❌ Reminder recovery failed: {e}"),
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::ApplicationCommand(command) = interaction {
            let name = command.data.name.clone();
            let Some(handler) = self.commands.get(&name) else {
                warn!("no handler registered for /{name}");
                return;
            };

            if let Err(e) = handler.handle(Arc::clone(&self.ctx), &ctx, &command).await {
                error!("/{name} failed: {e}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!(
        "Starting Chime reminder bot v{}...",
        chime::features::get_bot_version()
    );

    let database = Database::new(&config.database_path).await?;
    info!("Database ready at {}", config.database_path);

    // The sender gets its own HTTP client so the service exists before the
    // gateway client does.
    let http = Arc::new(Http::new(&config.discord_token));
    let registry = Arc::new(ScheduleRegistry::new());
    let service = Arc::new(ReminderService::new(
        Arc::new(database.clone()) as Arc<dyn ReminderStore>,
        Arc::new(database.clone()) as Arc<dyn GuildStore>,
        Arc::clone(&registry),
        Arc::new(DiscordSender::new(http)),
    ));
    let recovery = Arc::new(RecoveryLoader::new(
        Arc::new(database) as Arc<dyn ReminderStore>,
        Arc::clone(&service),
    ));

    let mut commands = CommandRegistry::new();
    commands.register(Arc::new(ReminderHandler));

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler::new(
        Arc::new(CommandContext::new(Arc::clone(&service))),
        commands,
        recovery,
        guild_id,
    );

    let intents = GatewayIntents::GUILDS;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    // Stop every live trigger before the gateway goes down
    let shard_manager = client.shard_manager.clone();
    let shutdown_registry = Arc::clone(&registry);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
            return;
        }
        info!("Shutdown signal received, stopping {} triggers", shutdown_registry.len());
        shutdown_registry.stop_all();
        shard_manager.lock().await.shutdown_all().await;
    });

    info!("Bot configured successfully. Connecting to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
