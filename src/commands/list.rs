use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

use crate::commands::play::{linked_title, YOUTUBE_COLOR};
use crate::domain::player::PlayerState;
use crate::domain::track::format_duration;
use crate::services::error::MusicError;
use crate::services::session::QueueSnapshot;
use crate::{Context, Error};

const QUEUE_COLOR: Colour = Colour::new(0x5865F2);
const MAX_DISPLAY: usize = 10;

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

/// Renders a snapshot as a "now playing" embed plus an "up next" embed when
/// tracks are pending.
pub fn queue_embeds(snapshot: &QueueSnapshot) -> Vec<CreateEmbed> {
    let mut embeds = Vec::with_capacity(2);

    let status = match snapshot.player {
        PlayerState::Paused => " (paused)",
        PlayerState::Buffering => " (loading)",
        _ => "",
    };
    let now_playing = match &snapshot.current {
        Some(track) => CreateEmbed::new()
            .title(format!("Now playing{status}"))
            .description(format!("{} - `{}`", linked_title(track), track.duration_label()))
            .colour(YOUTUBE_COLOR),
        None => {
            let mut desc = "Nothing is playing right now.".to_string();
            if snapshot.idle_timer_armed {
                desc.push_str(" I'll leave the voice channel soon unless something is queued.");
            }
            CreateEmbed::new()
                .title("Now playing")
                .description(desc)
                .colour(YOUTUBE_COLOR)
        }
    };
    embeds.push(now_playing);

    if !snapshot.pending.is_empty() {
        let mut desc = String::new();
        for (i, track) in snapshot.pending.iter().take(MAX_DISPLAY).enumerate() {
            desc.push_str(&format!(
                "`{}.` {} - `{}`\n",
                i + 1,
                linked_title(track),
                track.duration_label()
            ));
        }

        let remaining = snapshot.pending.len().saturating_sub(MAX_DISPLAY);
        if remaining > 0 {
            desc.push_str(&format!("... and {remaining} more"));
        }

        let footer = format!(
            "{} tracks in queue · {} total · volume {} · loop {} · shuffle {}",
            snapshot.pending.len(),
            format_duration(snapshot.total_duration_secs),
            snapshot.volume,
            on_off(snapshot.loop_enabled),
            on_off(snapshot.shuffle_enabled),
        );

        embeds.push(
            CreateEmbed::new()
                .title("Up next")
                .description(desc)
                .colour(QUEUE_COLOR)
                .footer(CreateEmbedFooter::new(footer)),
        );
    }

    embeds
}

/// Show the current music queue
#[poise::command(slash_command, guild_only)]
pub async fn queue(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let snapshot = ctx.data().music.queue_snapshot(guild_id).await?;
    if snapshot.current.is_none() && snapshot.pending.is_empty() {
        ctx.say("📭 The queue is empty.").await?;
        return Ok(());
    }

    let mut reply = poise::CreateReply::default();
    for embed in queue_embeds(&snapshot) {
        reply = reply.embed(embed);
    }
    ctx.send(reply).await?;
    Ok(())
}
