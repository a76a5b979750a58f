mod commands;
mod config;
mod domain;
mod infrastructure;
mod services;

use std::sync::Arc;
use std::time::Instant;

use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use tracing_subscriber::EnvFilter;

use config::Config;
use infrastructure::notifier::{self, DiscordNotifier};
use infrastructure::resolver::YoutubeResolver;
use infrastructure::voice::SongbirdTransport;
use services::music_service::MusicService;
use services::registry::SessionRegistry;

pub struct Data {
    pub music: MusicService<SongbirdTransport>,
    pub started_at: Instant,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

async fn handle_event(ctx: &serenity::Context, event: &serenity::FullEvent, data: &Data) {
    match event {
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Some(component) = interaction.as_message_component() {
                if component.data.custom_id.starts_with("np_") {
                    commands::now_playing::handle_now_playing_interaction(ctx, component, data)
                        .await;
                }
            }
        }
        // Kicked or moved out of voice by someone else.
        serenity::FullEvent::VoiceStateUpdate { new, .. } => {
            let is_self = new.user_id == ctx.cache.current_user().id;
            if !is_self || new.channel_id.is_some() {
                return;
            }
            if let Some(guild_id) = new.guild_id {
                if data.music.destroy(guild_id).await {
                    tracing::info!(guild_id = %guild_id, "removed from voice, session destroyed");
                }
            }
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let http_client = reqwest::Client::new();
    let manager = Songbird::serenity();

    let resolver = Arc::new(YoutubeResolver::new(
        http_client,
        config.youtube_api_key.clone(),
    ));
    let (discord_notifier, notices) = DiscordNotifier::channel();
    let registry = SessionRegistry::new(
        Arc::new(SongbirdTransport::new(manager.clone())),
        resolver.clone(),
        Arc::new(discord_notifier),
        config.music,
    );
    let music = MusicService::new(registry, resolver);
    let shutdown_music = music.clone();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::play::play(),
                commands::pause::pause(),
                commands::pause::resume(),
                commands::skip::skip(),
                commands::stop::stop(),
                commands::volume::volume(),
                commands::list::queue(),
                commands::now_playing::now_playing(),
                commands::modes::loop_mode(),
                commands::modes::shuffle(),
                commands::general::help(),
                commands::general::ping(),
                commands::general::info(),
            ],
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    handle_event(ctx, event, data).await;
                    Ok(())
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            let msg = error.to_string();
                            tracing::warn!(command = %ctx.command().name, "Command error: {msg}");
                            let _ = ctx.say(format!("❌ {msg}")).await;
                        }
                        other => {
                            if let Err(e) = poise::builtins::on_error(other).await {
                                tracing::error!("Error handling error: {e}");
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Bot is ready!");
                Ok(Data {
                    music,
                    started_at: Instant::now(),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird_with(manager)
        .await?;
    notifier::spawn_notice_worker(client.http.clone(), notices);

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        tracing::info!("Shutdown requested, leaving all voice channels");
        shutdown_music.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await?;
    Ok(())
}
