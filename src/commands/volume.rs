use crate::services::error::MusicError;
use crate::{Context, Error};

/// Set the playback volume
#[poise::command(slash_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume percentage"]
    #[min = 0]
    #[max = 100]
    percent: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let applied = ctx.data().music.set_volume(guild_id, percent).await?;
    if i64::from(applied.percent()) != percent {
        ctx.say(format!("🔊 Volume set to **{applied}** (limited from {percent}%)"))
            .await?;
    } else {
        ctx.say(format!("🔊 Volume set to **{applied}**")).await?;
    }
    Ok(())
}
