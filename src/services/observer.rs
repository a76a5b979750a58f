use poise::serenity_prelude::{ChannelId, GuildId};

use crate::domain::track::Track;

/// Receives user-visible session milestones. Called while the session is
/// locked, so implementations must not block.
pub trait SessionObserver: Send + Sync {
    fn track_started(&self, guild_id: GuildId, text_channel: ChannelId, track: &Track);

    fn idle_left(&self, guild_id: GuildId, text_channel: ChannelId);

    /// The session was torn down, for whatever reason.
    fn session_closed(&self, guild_id: GuildId);
}
