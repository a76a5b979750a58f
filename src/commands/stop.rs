use crate::services::error::MusicError;
use crate::{Context, Error};

/// Stop playback, clear the queue, and leave the voice channel
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    ctx.data().music.stop(guild_id).await?;
    ctx.say("⏹ Stopped playback and left the voice channel.").await?;
    Ok(())
}
