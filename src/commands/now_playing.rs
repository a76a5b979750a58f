use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ComponentInteraction, CreateActionRow, CreateButton,
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage, GuildId,
};

use crate::commands::list::queue_embeds;
use crate::commands::play::{linked_title, YOUTUBE_COLOR};
use crate::domain::player::PlayerState;
use crate::domain::track::Track;
use crate::services::error::MusicError;
use crate::services::music_service::PauseOutcome;
use crate::{Context, Data, Error};

pub fn now_playing_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("Now playing")
        .description(format!("{} - `{}`", linked_title(track), track.duration_label()))
        .colour(YOUTUBE_COLOR);

    if let Some(url) = &track.thumbnail {
        embed = embed.thumbnail(url);
    }

    embed
}

pub fn build_now_playing_components(guild_id: GuildId, paused: bool) -> Vec<CreateActionRow> {
    let pause_label = if paused { "▶ Resume" } else { "⏸ Pause" };

    let row = CreateActionRow::Buttons(vec![
        CreateButton::new(format!("np_pause_{guild_id}"))
            .label(pause_label)
            .style(ButtonStyle::Primary),
        CreateButton::new(format!("np_skip_{guild_id}"))
            .label("⏭ Skip")
            .style(ButtonStyle::Secondary),
        CreateButton::new(format!("np_stop_{guild_id}"))
            .label("⏹ Stop")
            .style(ButtonStyle::Danger),
        CreateButton::new(format!("np_queue_{guild_id}"))
            .label("📜 Queue")
            .style(ButtonStyle::Secondary),
    ]);

    vec![row]
}

fn parse_custom_id(custom_id: &str) -> Option<(&str, GuildId)> {
    // Format: np_{action}_{guild_id}
    let rest = custom_id.strip_prefix("np_")?;
    let (action, guild_id_str) = rest.rsplit_once('_')?;
    let guild_id: u64 = guild_id_str.parse().ok()?;
    Some((action, GuildId::new(guild_id)))
}

pub async fn handle_now_playing_interaction(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) {
    let Some((action, guild_id)) = parse_custom_id(&component.data.custom_id) else {
        return;
    };
    if component.guild_id != Some(guild_id) {
        return;
    }

    let music = &data.music;
    let response = match action {
        "pause" => match music.toggle_pause(guild_id).await {
            Ok(outcome) => {
                let paused = matches!(outcome, PauseOutcome::Paused(_));
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .components(build_now_playing_components(guild_id, paused)),
                )
            }
            Err(e) => ephemeral(format!("❌ {e}")),
        },
        "skip" => match music.skip(guild_id).await {
            Ok(track) => ephemeral(format!("⏭ Skipped **{}**", track.title)),
            Err(e) => ephemeral(format!("❌ {e}")),
        },
        "stop" => match music.stop(guild_id).await {
            Ok(()) => ephemeral("⏹ Stopped playback and left the voice channel.".to_string()),
            Err(e) => ephemeral(format!("❌ {e}")),
        },
        "queue" => match music.queue_snapshot(guild_id).await {
            Ok(snapshot) => CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embeds(queue_embeds(&snapshot))
                    .ephemeral(true),
            ),
            Err(e) => ephemeral(format!("❌ {e}")),
        },
        _ => return,
    };

    if let Err(e) = component.create_response(&ctx.http, response).await {
        tracing::warn!(action, "Failed to respond to component interaction: {e}");
    }
}

fn ephemeral(content: String) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

/// Show the track that is playing right now
#[poise::command(slash_command, guild_only, rename = "nowplaying")]
pub async fn now_playing(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let (track, player) = ctx
        .data()
        .music
        .current_track(guild_id)
        .await?
        .ok_or(MusicError::InvalidState("Nothing is playing right now"))?;
    let paused = player == PlayerState::Paused;

    let reply = poise::CreateReply::default()
        .embed(now_playing_embed(&track))
        .components(build_now_playing_components(guild_id, paused));
    ctx.send(reply).await?;
    Ok(())
}
