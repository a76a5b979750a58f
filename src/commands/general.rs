use std::time::Duration;

use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

use crate::{Context, Error};

const INFO_COLOR: Colour = Colour::new(0x5865F2);

/// One line per command, `/name - description`, in registration order.
fn command_lines<'a>(commands: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> String {
    commands
        .into_iter()
        .map(|(name, description)| match description {
            Some(description) => format!("`/{name}` - {description}"),
            None => format!("`/{name}`"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Xd Xh Xm Xs`
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!(
        "{}d {}h {}m {}s",
        secs / 86_400,
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// List the available commands
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let commands = &ctx.framework().options().commands;
    let lines = command_lines(
        commands
            .iter()
            .map(|c| (c.name.as_str(), c.description.as_deref())),
    );

    let embed = CreateEmbed::new()
        .title("🎵 Commands")
        .description(lines)
        .field(
            "How to use",
            "Join a voice channel, then use `/play` with a song name or a YouTube link.",
            false,
        )
        .colour(INFO_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the gateway latency
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    // Zero until the shard has seen its first heartbeat ack.
    if latency.is_zero() {
        ctx.say("🏓 Pong! Gateway latency is not measured yet.").await?;
    } else {
        ctx.say(format!("🏓 Pong! Gateway latency: **{}ms**", latency.as_millis()))
            .await?;
    }
    Ok(())
}

/// Show information about the bot
#[poise::command(slash_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let guilds = ctx.cache().guild_count();
    let uptime = format_uptime(ctx.data().started_at.elapsed());

    let embed = CreateEmbed::new()
        .title("🤖 Bot info")
        .field("Servers", guilds.to_string(), true)
        .field("Uptime", uptime, true)
        .field("Version", env!("CARGO_PKG_VERSION"), true)
        .footer(CreateEmbedFooter::new(format!(
            "Requested by {}",
            ctx.author().name
        )))
        .colour(INFO_COLOR);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_commands_with_descriptions() {
        let lines = command_lines([("play", Some("Play a track")), ("ping", None)]);
        assert_eq!(lines, "`/play` - Play a track\n`/ping`");
    }

    #[test]
    fn formats_uptime_in_days() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 0h 0m 0s");
        assert_eq!(format_uptime(Duration::from_secs(3725)), "0d 1h 2m 5s");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 59)),
            "2d 0h 0m 59s"
        );
    }
}
