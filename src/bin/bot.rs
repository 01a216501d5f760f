use anyhow::Result;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

use reminder_bot::commands::{
    create_all_handlers, register_global_commands, register_guild_commands, CommandContext,
    CommandRegistry,
};
use reminder_bot::core::{Config, StoreBackend};
use reminder_bot::database::Database;
use reminder_bot::features::reminders::{
    DiscordMessenger, MemoryStore, ReminderManager, ReminderScheduler, ReminderStore, TimeParser,
};

struct Handler {
    registry: CommandRegistry,
    context: Arc<CommandContext>,
    guild_id: Option<GuildId>,
}

impl Handler {
    fn new(context: CommandContext, guild_id: Option<GuildId>) -> Self {
        Handler {
            registry: CommandRegistry::with_handlers(create_all_handlers()),
            context: Arc::new(context),
            guild_id,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        // Register slash commands - use guild commands for development (instant), global for production
        if let Some(guild_id) = self.guild_id {
            info!("🔧 Development mode: Registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("❌ Failed to register guild slash commands: {e}");
            } else {
                info!("✅ Successfully registered slash commands for guild {guild_id} (instant update)");
            }
        } else {
            info!("🌍 Production mode: Registering commands globally");
            if let Err(e) = register_global_commands(&ctx).await {
                error!("❌ Failed to register global slash commands: {e}");
            } else {
                info!("✅ Successfully registered slash commands globally (may take up to 1 hour to propagate)");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        let Some(handler) = self.registry.get(&command.data.name) else {
            warn!("No handler registered for slash command '{}'", command.data.name);
            return;
        };

        if let Err(e) = handler
            .handle(Arc::clone(&self.context), &ctx, &command)
            .await
        {
            error!(
                "Error handling slash command '{}': {}",
                command.data.name, e
            );

            let error_message =
                "❌ Sorry, I encountered an error processing your command. Please try again.";
            let _ = command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content(error_message))
                })
                .await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Reminder Discord Bot...");

    let store: Arc<dyn ReminderStore> = match config.store_backend {
        StoreBackend::Sqlite => Arc::new(Database::new(&config.database_path).await?),
        StoreBackend::Memory => {
            warn!("🧠 Using in-memory reminder store; reminders are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let manager = ReminderManager::new(
        Arc::clone(&store),
        TimeParser::new(config.timezone),
        config.store_timeout,
    );

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler::new(CommandContext::new(manager), guild_id);

    let intents = GatewayIntents::GUILDS;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    // Start the reminder scheduler
    let messenger = Arc::new(DiscordMessenger::new(client.cache_and_http.http.clone()));
    let scheduler = ReminderScheduler::new(
        store,
        messenger,
        config.timezone,
        config.scheduler_settings(),
    );
    tokio::spawn(async move {
        scheduler.run().await;
    });

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
