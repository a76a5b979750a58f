use crate::services::error::MusicError;
use crate::{Context, Error};

/// Skip the current track
#[poise::command(slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let skipped = ctx.data().music.skip(guild_id).await?;
    ctx.say(format!("⏭ Skipped **{}**", skipped.title)).await?;
    Ok(())
}
