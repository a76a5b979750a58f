use crate::services::error::MusicError;
use crate::{Context, Error};

/// Toggle looping of the queue
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn loop_mode(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let enabled = ctx.data().music.toggle_loop(guild_id).await?;
    let msg = if enabled {
        "🔁 Loop enabled. Finished tracks go back to the end of the queue."
    } else {
        "➡️ Loop disabled."
    };
    ctx.say(msg).await?;
    Ok(())
}

/// Toggle shuffled playback order
#[poise::command(slash_command, guild_only)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let enabled = ctx.data().music.toggle_shuffle(guild_id).await?;
    let msg = if enabled {
        "🔀 Shuffle enabled."
    } else {
        "➡️ Shuffle disabled. Tracks play in queue order."
    };
    ctx.say(msg).await?;
    Ok(())
}
