use std::collections::HashMap;
use std::sync::Arc;

use poise::serenity_prelude::GuildId;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::MusicConfig;
use crate::domain::player::PlayerState;
use crate::domain::queue::MusicQueue;
use crate::domain::track::Track;
use crate::domain::volume::Volume;
use crate::infrastructure::inactivity::IdleTimer;
use crate::services::error::MusicError;
use crate::services::observer::SessionObserver;
use crate::services::resolver::TrackResolver;
use crate::services::transport::{JoinParams, PlaybackId, VoiceConnection, VoiceTransport};

pub type SessionMap<T> = Arc<RwLock<HashMap<GuildId, Arc<Session<T>>>>>;

/// One guild's playback unit: queue, player state, voice connection and
/// idle timer. Every mutation goes through `state`, which serializes
/// commands against transport notifications.
pub struct Session<T: VoiceTransport> {
    guild_id: GuildId,
    params: JoinParams,
    pub(super) config: MusicConfig,
    pub(super) resolver: Arc<dyn TrackResolver<Stream = T::Stream>>,
    pub(super) observer: Arc<dyn SessionObserver>,
    sessions: SessionMap<T>,
    pub(super) state: Mutex<SessionState<T::Connection>>,
}

pub(super) struct SessionState<C> {
    pub(super) queue: MusicQueue,
    pub(super) player: PlayerState,
    /// `None` once the session has been torn down.
    pub(super) connection: Option<C>,
    pub(super) connected: bool,
    pub(super) playback: PlaybackId,
    pub(super) idle: Option<IdleTimer>,
    pub(super) timer_seq: u64,
}

impl<C: VoiceConnection> SessionState<C> {
    fn connection_mut(&mut self) -> Result<&mut C, MusicError> {
        self.connection.as_mut().ok_or(MusicError::NotConnected)
    }

    fn ensure_live(&self) -> Result<(), MusicError> {
        match self.connection {
            Some(_) => Ok(()),
            None => Err(MusicError::NotConnected),
        }
    }

    fn current_track(&self) -> Result<Track, MusicError> {
        self.queue
            .current()
            .cloned()
            .ok_or(MusicError::InvalidState("Nothing is playing right now"))
    }
}

/// A point-in-time copy of a session's queue for rendering.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub pending: Vec<Track>,
    pub player: PlayerState,
    pub volume: Volume,
    pub loop_enabled: bool,
    pub shuffle_enabled: bool,
    pub total_duration_secs: u64,
    pub idle_timer_armed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    pub added: usize,
    pub rejected: usize,
    /// 1-based pending position of the first added track.
    pub position: usize,
    /// Whether this call started playback from idle.
    pub started: bool,
}

impl<T: VoiceTransport> Session<T> {
    pub(super) fn new(
        guild_id: GuildId,
        params: JoinParams,
        config: MusicConfig,
        resolver: Arc<dyn TrackResolver<Stream = T::Stream>>,
        observer: Arc<dyn SessionObserver>,
        sessions: SessionMap<T>,
        connection: T::Connection,
    ) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            params,
            config,
            resolver,
            observer,
            sessions,
            state: Mutex::new(SessionState {
                queue: MusicQueue::new(config.max_queue_size, config.default_volume),
                player: PlayerState::Idle,
                connection: Some(connection),
                connected: true,
                playback: PlaybackId::default(),
                idle: None,
                timer_seq: 0,
            }),
        })
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn params(&self) -> JoinParams {
        self.params
    }

    /// Arms the idle timer for a freshly joined, empty session.
    pub(super) async fn start(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        self.sync_idle_timer(&mut state);
    }

    pub async fn is_destroyed(&self) -> bool {
        self.state.lock().await.connection.is_none()
    }

    /// Appends tracks in order until the queue is full. Fails only when not
    /// a single track fits. Starts playback if the session was idle.
    pub async fn enqueue(self: &Arc<Self>, tracks: Vec<Track>) -> Result<Enqueued, MusicError> {
        let total = tracks.len();
        let (outcome, candidate) = {
            let mut state = self.state.lock().await;
            state.ensure_live()?;

            let mut added = 0;
            let mut position = 0;
            for track in tracks {
                match state.queue.push(track) {
                    Ok(pos) => {
                        if added == 0 {
                            position = pos;
                        }
                        added += 1;
                    }
                    Err(full) if added == 0 => return Err(full.into()),
                    Err(_) => break,
                }
            }

            let candidate = if state.player == PlayerState::Idle && state.queue.current().is_none()
            {
                self.next_candidate(&mut state)
            } else {
                self.sync_idle_timer(&mut state);
                None
            };

            info!(
                guild_id = %self.guild_id,
                added,
                queue_len = state.queue.len(),
                "tracks enqueued"
            );

            let outcome = Enqueued {
                added,
                rejected: total - added,
                position,
                started: candidate.is_some(),
            };
            (outcome, candidate)
        };

        if let Some(candidate) = candidate {
            self.play_candidates(candidate).await;
        }
        Ok(outcome)
    }

    pub async fn pause(self: &Arc<Self>) -> Result<Track, MusicError> {
        let mut state = self.state.lock().await;
        self.set_paused(&mut state, true).await
    }

    pub async fn resume(self: &Arc<Self>) -> Result<Track, MusicError> {
        let mut state = self.state.lock().await;
        self.set_paused(&mut state, false).await
    }

    /// Pauses when playing, resumes when paused. Returns whether playback is
    /// now paused.
    pub async fn toggle_pause(self: &Arc<Self>) -> Result<(Track, bool), MusicError> {
        let mut state = self.state.lock().await;
        let pause = state.player != PlayerState::Paused;
        let track = self.set_paused(&mut state, pause).await?;
        Ok((track, pause))
    }

    async fn set_paused(
        self: &Arc<Self>,
        state: &mut SessionState<T::Connection>,
        pause: bool,
    ) -> Result<Track, MusicError> {
        state.ensure_live()?;
        match (pause, state.player) {
            (true, PlayerState::Playing) => state.connection_mut()?.pause().await?,
            (false, PlayerState::Paused) => state.connection_mut()?.resume().await?,
            (true, PlayerState::Paused) => {
                return Err(MusicError::InvalidState("Playback is already paused"));
            }
            (false, PlayerState::Playing) => {
                return Err(MusicError::InvalidState("Playback is not paused"));
            }
            _ => return Err(MusicError::InvalidState("Nothing is playing right now")),
        }

        state.player = if pause {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        };
        self.sync_idle_timer(state);
        debug!(guild_id = %self.guild_id, player = %state.player, "pause toggled");
        state.current_track()
    }

    /// Stops the current track and moves on. Follows the same path as a
    /// natural finish, so loop mode re-queues the skipped track.
    pub async fn skip(self: &Arc<Self>) -> Result<Track, MusicError> {
        let (skipped, candidate) = {
            let mut state = self.state.lock().await;
            state.ensure_live()?;
            let skipped = state.current_track()?;

            if state.player.is_streaming() {
                state.connection_mut()?.stop().await;
            }
            self.finish_current(&mut state);
            (skipped, self.next_candidate(&mut state))
        };

        info!(guild_id = %self.guild_id, track = %skipped.title, "track skipped");
        if let Some(candidate) = candidate {
            self.play_candidates(candidate).await;
        }
        Ok(skipped)
    }

    /// Clears everything and tears the session down.
    pub async fn stop(&self) -> Result<(), MusicError> {
        let mut state = self.state.lock().await;
        state.ensure_live()?;
        self.teardown(&mut state).await;
        Ok(())
    }

    pub async fn set_volume(&self, volume: Volume) -> Result<Volume, MusicError> {
        let volume = volume.min(self.config.max_volume);
        let mut state = self.state.lock().await;
        state.ensure_live()?;

        state.queue.set_volume(volume);
        if state.player.is_streaming() {
            state.connection_mut()?.set_volume(volume).await;
        }
        debug!(guild_id = %self.guild_id, %volume, "volume set");
        Ok(volume)
    }

    pub async fn toggle_loop(&self) -> Result<bool, MusicError> {
        let mut state = self.state.lock().await;
        state.ensure_live()?;
        Ok(state.queue.toggle_loop())
    }

    pub async fn toggle_shuffle(&self) -> Result<bool, MusicError> {
        let mut state = self.state.lock().await;
        state.ensure_live()?;
        Ok(state.queue.toggle_shuffle())
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot, MusicError> {
        let state = self.state.lock().await;
        state.ensure_live()?;
        Ok(QueueSnapshot {
            current: state.queue.current().cloned(),
            pending: state.queue.list().iter().cloned().collect(),
            player: state.player,
            volume: state.queue.volume(),
            loop_enabled: state.queue.loop_enabled(),
            shuffle_enabled: state.queue.shuffle_enabled(),
            total_duration_secs: state.queue.total_duration_secs(),
            idle_timer_armed: state.idle.is_some(),
        })
    }

    /// The current track with the player state it is in.
    pub async fn current_track(&self) -> Result<Option<(Track, PlayerState)>, MusicError> {
        let state = self.state.lock().await;
        state.ensure_live()?;
        Ok(state.queue.current().cloned().map(|t| (t, state.player)))
    }

    /// Tears the session down if it is still live. Waits for any in-flight
    /// operation on this session first.
    pub async fn shutdown(&self) -> bool {
        let mut state = self.state.lock().await;
        self.teardown(&mut state).await
    }

    /// Fired by the idle timer. Does nothing if `timer_id` was disarmed or
    /// replaced while the timer was waking up.
    pub(super) async fn expire(&self, timer_id: u64) {
        let mut state = self.state.lock().await;
        if state.idle.as_ref().map(IdleTimer::id) != Some(timer_id) {
            debug!(guild_id = %self.guild_id, timer_id, "stale idle timer ignored");
            return;
        }
        state.idle = None;

        info!(guild_id = %self.guild_id, "leaving voice channel after inactivity");
        self.observer.idle_left(self.guild_id, self.params.text_channel);
        self.teardown(&mut state).await;
    }

    async fn teardown(&self, state: &mut SessionState<T::Connection>) -> bool {
        let Some(mut connection) = state.connection.take() else {
            return false;
        };

        state.playback = state.playback.next();
        state.queue.clear();
        state.player = PlayerState::Idle;
        state.idle = None;

        connection.stop().await;
        connection.disconnect().await;

        let mut sessions = self.sessions.write().await;
        let is_registered = sessions
            .get(&self.guild_id)
            .is_some_and(|s| std::ptr::eq(Arc::as_ptr(s), self));
        if is_registered {
            sessions.remove(&self.guild_id);
        }

        self.observer.session_closed(self.guild_id);
        info!(guild_id = %self.guild_id, "session destroyed");
        true
    }
}
