use poise::serenity_prelude::{ChannelId, Colour, CreateEmbed, CreateEmbedAuthor};

use crate::domain::track::Track;
use crate::services::error::MusicError;
use crate::services::music_service::PlayOutcome;
use crate::services::transport::JoinParams;
use crate::{Context, Error};

pub const YOUTUBE_ICON: &str =
    "https://www.gstatic.com/images/branding/product/2x/youtube_64dp.png";
pub const YOUTUBE_COLOR: Colour = Colour::new(0xFF0000);

pub fn linked_title(track: &Track) -> String {
    if track.locator.is_empty() {
        format!("**{}** - {}", track.title, track.source_label)
    } else {
        format!(
            "[**{}**]({}) - {}",
            track.title, track.locator, track.source_label
        )
    }
}

fn enqueue_embed(track: &Track, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new("Added to queue").icon_url(YOUTUBE_ICON))
        .description(format!(
            "{} - `{}`\n\nPosition in queue: `{position}`",
            linked_title(track),
            track.duration_label()
        ))
        .colour(YOUTUBE_COLOR);

    if let Some(url) = &track.thumbnail {
        embed = embed.thumbnail(url);
    }

    embed
}

fn started_embed(track: &Track) -> CreateEmbed {
    CreateEmbed::new()
        .author(CreateEmbedAuthor::new("Starting playback").icon_url(YOUTUBE_ICON))
        .description(format!("{} - `{}`", linked_title(track), track.duration_label()))
        .colour(YOUTUBE_COLOR)
}

fn playlist_embed(title: &str, added: usize, rejected: usize) -> CreateEmbed {
    let mut description = format!("Added **{title}** with `{added}` tracks to the queue.");
    if rejected > 0 {
        description.push_str(&format!(
            "\n⚠️ `{rejected}` tracks were left out because the queue is full."
        ));
    }

    CreateEmbed::new()
        .author(CreateEmbedAuthor::new("YouTube").icon_url(YOUTUBE_ICON))
        .description(description)
        .colour(YOUTUBE_COLOR)
}

/// The caller's current voice channel, from the guild cache.
pub fn author_voice_channel(ctx: Context<'_>) -> Result<ChannelId, MusicError> {
    let guild = ctx.guild().ok_or(MusicError::NotInGuild)?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id)
        .ok_or(MusicError::NotInVoiceChannel)
}

/// Play a song or playlist from YouTube
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "YouTube URL, playlist URL or search query"] query: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let voice_channel = author_voice_channel(ctx)?;

    ctx.defer().await?;

    let music = &ctx.data().music;
    music
        .join(
            guild_id,
            JoinParams {
                voice_channel,
                text_channel: ctx.channel_id(),
            },
        )
        .await?;

    let embed = match music.enqueue(guild_id, &query).await? {
        PlayOutcome::Started(track) => started_embed(&track),
        PlayOutcome::Queued { track, position } => enqueue_embed(&track, position),
        PlayOutcome::Playlist {
            title,
            added,
            rejected,
        } => playlist_embed(&title, added, rejected),
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
