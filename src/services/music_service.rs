use std::sync::Arc;

use poise::serenity_prelude::GuildId;
use tracing::debug;

use crate::domain::player::PlayerState;
use crate::domain::track::Track;
use crate::domain::volume::Volume;
use crate::services::error::MusicError;
use crate::services::registry::SessionRegistry;
use crate::services::resolver::{ResolveError, Resolved, TrackResolver};
use crate::services::session::{QueueSnapshot, Session};
use crate::services::transport::{JoinParams, VoiceTransport};

/// What `enqueue` did with the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started(Track),
    Queued { track: Track, position: usize },
    Playlist {
        title: String,
        added: usize,
        rejected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused(Track),
    Resumed(Track),
}

/// Typed entry point for command handlers. Every operation returns a
/// `MusicError` instead of panicking so replies can be rendered directly.
pub struct MusicService<T: VoiceTransport> {
    registry: SessionRegistry<T>,
    resolver: Arc<dyn TrackResolver<Stream = T::Stream>>,
}

impl<T: VoiceTransport> Clone for MusicService<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<T: VoiceTransport> MusicService<T> {
    pub fn new(
        registry: SessionRegistry<T>,
        resolver: Arc<dyn TrackResolver<Stream = T::Stream>>,
    ) -> Self {
        Self { registry, resolver }
    }

    pub async fn join(&self, guild_id: GuildId, params: JoinParams) -> Result<(), MusicError> {
        self.registry.get_or_create(guild_id, params).await?;
        Ok(())
    }

    /// Resolves `query` and appends the result. The session must already be
    /// joined; nothing is resolved otherwise.
    pub async fn enqueue(&self, guild_id: GuildId, query: &str) -> Result<PlayOutcome, MusicError> {
        let session = self.session(guild_id).await?;

        match self.resolver.resolve(query).await? {
            Resolved::Track(track) => {
                let enqueued = session.enqueue(vec![track.clone()]).await?;
                if enqueued.started {
                    Ok(PlayOutcome::Started(track))
                } else {
                    Ok(PlayOutcome::Queued {
                        track,
                        position: enqueued.position,
                    })
                }
            }
            Resolved::Playlist { title, tracks } => {
                if tracks.is_empty() {
                    return Err(ResolveError::NotFound.into());
                }
                let enqueued = session.enqueue(tracks).await?;
                debug!(
                    guild_id = %guild_id,
                    playlist = %title,
                    added = enqueued.added,
                    rejected = enqueued.rejected,
                    "playlist enqueued"
                );
                Ok(PlayOutcome::Playlist {
                    title,
                    added: enqueued.added,
                    rejected: enqueued.rejected,
                })
            }
        }
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<Track, MusicError> {
        self.session(guild_id).await?.pause().await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<Track, MusicError> {
        self.session(guild_id).await?.resume().await
    }

    pub async fn toggle_pause(&self, guild_id: GuildId) -> Result<PauseOutcome, MusicError> {
        let (track, paused) = self.session(guild_id).await?.toggle_pause().await?;
        Ok(if paused {
            PauseOutcome::Paused(track)
        } else {
            PauseOutcome::Resumed(track)
        })
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Track, MusicError> {
        self.session(guild_id).await?.skip().await
    }

    pub async fn stop(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.session(guild_id).await?.stop().await
    }

    /// Clamps `percent` into `[0, MAX_VOLUME]` before storing it.
    pub async fn set_volume(&self, guild_id: GuildId, percent: i64) -> Result<Volume, MusicError> {
        let volume = Volume::clamped(percent, self.registry.config().max_volume);
        self.session(guild_id).await?.set_volume(volume).await
    }

    pub async fn toggle_loop(&self, guild_id: GuildId) -> Result<bool, MusicError> {
        self.session(guild_id).await?.toggle_loop().await
    }

    pub async fn toggle_shuffle(&self, guild_id: GuildId) -> Result<bool, MusicError> {
        self.session(guild_id).await?.toggle_shuffle().await
    }

    pub async fn queue_snapshot(&self, guild_id: GuildId) -> Result<QueueSnapshot, MusicError> {
        self.session(guild_id).await?.snapshot().await
    }

    pub async fn current_track(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<(Track, PlayerState)>, MusicError> {
        self.session(guild_id).await?.current_track().await
    }

    /// Drops the guild's session without requiring it to be live.
    pub async fn destroy(&self, guild_id: GuildId) -> bool {
        self.registry.destroy(guild_id).await
    }

    pub async fn shutdown(&self) {
        self.registry.shutdown_all().await;
    }

    async fn session(&self, guild_id: GuildId) -> Result<Arc<Session<T>>, MusicError> {
        self.registry
            .get(guild_id)
            .await
            .ok_or(MusicError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::MusicConfig;
    use crate::services::testing::{
        guild, harness, join_params, settle, track, FakeTransport, Harness,
    };

    fn service(h: &Harness) -> MusicService<FakeTransport> {
        MusicService::new(h.registry.clone(), h.resolver.clone())
    }

    #[tokio::test]
    async fn enqueue_without_session_is_not_connected() {
        let h = harness(MusicConfig::default());
        let music = service(&h);
        h.resolver.add("song a", Resolved::Track(track("Song A")));

        let err = music.enqueue(guild(), "song a").await.unwrap_err();
        assert!(matches!(err, MusicError::NotConnected));
        assert!(matches!(
            music.queue_snapshot(guild()).await,
            Err(MusicError::NotConnected)
        ));
        assert_eq!(h.transport.connects(), 0);
    }

    #[tokio::test]
    async fn first_track_starts_and_later_ones_queue() {
        let h = harness(MusicConfig::default());
        let music = service(&h);
        h.resolver.add("a", Resolved::Track(track("Song A")));
        h.resolver.add("b", Resolved::Track(track("Song B")));
        music.join(guild(), join_params()).await.unwrap();

        assert_eq!(
            music.enqueue(guild(), "a").await.unwrap(),
            PlayOutcome::Started(track("Song A"))
        );
        assert_eq!(
            music.enqueue(guild(), "b").await.unwrap(),
            PlayOutcome::Queued {
                track: track("Song B"),
                position: 1
            }
        );
        assert_eq!(
            music.current_track(guild()).await.unwrap(),
            Some((track("Song A"), PlayerState::Playing))
        );
    }

    #[tokio::test]
    async fn unresolvable_query_is_not_enqueued() {
        let h = harness(MusicConfig::default());
        let music = service(&h);
        music.join(guild(), join_params()).await.unwrap();

        let err = music.enqueue(guild(), "nothing").await.unwrap_err();
        assert!(matches!(
            err,
            MusicError::ResolveFailure(ResolveError::NotFound)
        ));

        let snapshot = music.queue_snapshot(guild()).await.unwrap();
        assert!(snapshot.current.is_none());
        assert!(snapshot.pending.is_empty());
    }

    #[tokio::test]
    async fn volume_out_of_range_is_clamped() {
        let h = harness(MusicConfig::default());
        let music = service(&h);
        music.join(guild(), join_params()).await.unwrap();

        assert_eq!(music.set_volume(guild(), 150).await.unwrap().percent(), 100);
        assert_eq!(music.set_volume(guild(), -5).await.unwrap().percent(), 0);
        assert_eq!(
            music.queue_snapshot(guild()).await.unwrap().volume.percent(),
            0
        );
    }

    #[tokio::test]
    async fn playlist_fills_remaining_room_and_reports_the_rest() {
        let config = MusicConfig {
            max_queue_size: 3,
            ..MusicConfig::default()
        };
        let h = harness(config);
        let music = service(&h);
        let tracks = (1..=5).map(|i| track(&format!("t{i}"))).collect();
        h.resolver.add(
            "mix",
            Resolved::Playlist {
                title: "Mix".to_string(),
                tracks,
            },
        );
        music.join(guild(), join_params()).await.unwrap();

        let outcome = music.enqueue(guild(), "mix").await.unwrap();
        assert_eq!(
            outcome,
            PlayOutcome::Playlist {
                title: "Mix".to_string(),
                added: 3,
                rejected: 2
            }
        );

        // The first track moved out of pending, leaving room for one more.
        let snapshot = music.queue_snapshot(guild()).await.unwrap();
        assert_eq!(snapshot.current.unwrap().title, "t1");
        assert_eq!(snapshot.pending.len(), 2);
    }

    #[tokio::test]
    async fn toggle_pause_reports_direction() {
        let h = harness(MusicConfig::default());
        let music = service(&h);
        h.resolver.add("a", Resolved::Track(track("a")));
        music.join(guild(), join_params()).await.unwrap();
        music.enqueue(guild(), "a").await.unwrap();

        assert_eq!(
            music.toggle_pause(guild()).await.unwrap(),
            PauseOutcome::Paused(track("a"))
        );
        assert_eq!(
            music.toggle_pause(guild()).await.unwrap(),
            PauseOutcome::Resumed(track("a"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_expiry_leaves_snapshot_not_connected() {
        let config = MusicConfig {
            leave_timeout: Duration::from_secs(120),
            ..MusicConfig::default()
        };
        let h = harness(config);
        let music = service(&h);
        h.resolver.add("a", Resolved::Track(track("Song A")));
        music.join(guild(), join_params()).await.unwrap();
        music.enqueue(guild(), "a").await.unwrap();

        h.transport.call(guild()).finish_current();
        settle().await;
        assert!(music.queue_snapshot(guild()).await.unwrap().idle_timer_armed);

        tokio::time::sleep(Duration::from_secs(121)).await;
        settle().await;

        assert!(h.transport.call(guild()).disconnected());
        assert!(matches!(
            music.queue_snapshot(guild()).await,
            Err(MusicError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn stop_then_control_ops_are_not_connected() {
        let h = harness(MusicConfig::default());
        let music = service(&h);
        music.join(guild(), join_params()).await.unwrap();

        music.stop(guild()).await.unwrap();

        assert!(matches!(music.skip(guild()).await, Err(MusicError::NotConnected)));
        assert!(matches!(music.pause(guild()).await, Err(MusicError::NotConnected)));
        assert!(!music.destroy(guild()).await);
    }
}
