//! Decides what plays next. Reacts to transport notifications and to the
//! session's own operations, applying the loop, shuffle and failure-skip
//! policies.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::player::PlayerState;
use crate::domain::track::Track;
use crate::infrastructure::inactivity::IdleTimer;
use crate::services::error::MusicError;
use crate::services::session::{Session, SessionState};
use crate::services::transport::{
    ConnectionState, PlaybackId, TransportEvent, VoiceConnection, VoiceTransport,
};

/// A track that has been moved into `current` and is waiting for its stream.
pub(super) struct Candidate {
    track: Track,
    playback: PlaybackId,
}

/// Feeds transport notifications into the session one at a time. Exits once
/// the session is gone or the transport drops its sender.
pub(super) fn spawn_event_pump<T: VoiceTransport>(
    session: Weak<Session<T>>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            session.handle_event(event).await;
            if session.is_destroyed().await {
                break;
            }
        }
    });
}

impl<T: VoiceTransport> Session<T> {
    async fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::TrackEnded(playback) => self.on_track_finished(playback).await,
            TransportEvent::TrackErrored(playback, reason) => {
                self.on_track_errored(playback, reason).await
            }
            TransportEvent::Connection(connection) => self.on_connection(connection).await,
        }
    }

    async fn on_track_finished(self: &Arc<Self>, playback: PlaybackId) {
        let candidate = {
            let mut state = self.state.lock().await;
            if !is_live_playback(&state, playback) {
                debug!(guild_id = %self.guild_id(), %playback, "stale track end ignored");
                return;
            }
            self.finish_current(&mut state);
            self.next_candidate(&mut state)
        };

        if let Some(candidate) = candidate {
            self.play_candidates(candidate).await;
        }
    }

    async fn on_track_errored(self: &Arc<Self>, playback: PlaybackId, reason: String) {
        let candidate = {
            let mut state = self.state.lock().await;
            if !is_live_playback(&state, playback) {
                debug!(guild_id = %self.guild_id(), %playback, "stale track error ignored");
                return;
            }

            state.player = PlayerState::Errored;
            let track = state.queue.take_current();
            warn!(
                guild_id = %self.guild_id(),
                track = ?track.map(|t| t.title),
                error = %reason,
                "playback error, advancing"
            );
            self.next_candidate(&mut state)
        };

        if let Some(candidate) = candidate {
            self.play_candidates(candidate).await;
        }
    }

    async fn on_connection(self: &Arc<Self>, connection: ConnectionState) {
        if connection == ConnectionState::Destroyed {
            if self.shutdown().await {
                info!(guild_id = %self.guild_id(), "voice connection destroyed");
            }
            return;
        }

        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            return;
        }

        state.connected = connection == ConnectionState::Ready;
        if state.connected {
            info!(guild_id = %self.guild_id(), "voice connection ready");
        } else {
            warn!(
                guild_id = %self.guild_id(),
                grace = ?self.config.leave_timeout,
                "voice connection lost, waiting for reconnect"
            );
        }
        self.sync_idle_timer(&mut state);
    }

    /// Drops the current track, re-appending it to the tail in loop mode.
    pub(super) fn finish_current(&self, state: &mut SessionState<T::Connection>) {
        if let Some(track) = state.queue.take_current() {
            if state.queue.loop_enabled() {
                state.queue.requeue(track);
            }
        }
    }

    /// Pulls the next track into `current` and marks the player buffering, or
    /// goes idle when nothing is pending. Any stream still resolving for an
    /// older playback is superseded.
    pub(super) fn next_candidate(
        self: &Arc<Self>,
        state: &mut SessionState<T::Connection>,
    ) -> Option<Candidate> {
        state.playback = state.playback.next();
        let candidate = match state.queue.advance() {
            Some(track) => {
                state.player = PlayerState::Buffering;
                Some(Candidate {
                    track: track.clone(),
                    playback: state.playback,
                })
            }
            None => {
                state.player = PlayerState::Idle;
                debug!(guild_id = %self.guild_id(), "queue exhausted");
                None
            }
        };
        self.sync_idle_timer(state);
        candidate
    }

    /// Opens the candidate's stream outside the lock and starts it. On
    /// failure the track is dropped and the next one tried, so every pass
    /// consumes a pending track and the loop ends once the queue drains.
    pub(super) async fn play_candidates(self: &Arc<Self>, mut candidate: Candidate) {
        loop {
            let opened = self.resolver.open_stream(&candidate.track.locator).await;

            let mut state = self.state.lock().await;
            if state.connection.is_none() || state.playback != candidate.playback {
                debug!(
                    guild_id = %self.guild_id(),
                    track = %candidate.track.title,
                    "stream resolution superseded"
                );
                return;
            }

            let failure = match opened {
                Ok(stream) => {
                    let volume = state.queue.volume();
                    let Some(connection) = state.connection.as_mut() else {
                        return;
                    };
                    let played = connection.play(stream, candidate.playback, volume).await;
                    match played {
                        Ok(()) => {
                            state.player = PlayerState::Playing;
                            self.sync_idle_timer(&mut state);
                            info!(
                                guild_id = %self.guild_id(),
                                track = %candidate.track.title,
                                playback = %candidate.playback,
                                queue_len = state.queue.len(),
                                "now playing"
                            );
                            self.observer.track_started(
                                self.guild_id(),
                                self.params().text_channel,
                                &candidate.track,
                            );
                            return;
                        }
                        Err(e) => MusicError::TransportFailure(e),
                    }
                }
                Err(e) => MusicError::StreamFailure(e),
            };

            warn!(
                guild_id = %self.guild_id(),
                track = %candidate.track.title,
                error = %failure,
                "skipping unplayable track"
            );
            state.queue.take_current();
            match self.next_candidate(&mut state) {
                Some(next) => candidate = next,
                None => return,
            }
        }
    }

    /// Keeps the idle timer armed exactly while the session is idle with an
    /// empty queue, or while the voice connection is down.
    pub(super) fn sync_idle_timer(self: &Arc<Self>, state: &mut SessionState<T::Connection>) {
        let should_arm = state.connection.is_some()
            && (!state.connected
                || (state.player == PlayerState::Idle && state.queue.is_empty()));
        if should_arm == state.idle.is_some() {
            return;
        }

        if should_arm {
            state.timer_seq += 1;
            let timer_id = state.timer_seq;
            let session = Arc::downgrade(self);
            state.idle = Some(IdleTimer::spawn(
                timer_id,
                self.config.leave_timeout,
                move || async move {
                    if let Some(session) = session.upgrade() {
                        session.expire(timer_id).await;
                    }
                },
            ));
            debug!(guild_id = %self.guild_id(), timer_id, "idle timer armed");
        } else {
            state.idle = None;
            debug!(guild_id = %self.guild_id(), "idle timer disarmed");
        }
    }
}

fn is_live_playback<C: VoiceConnection>(state: &SessionState<C>, playback: PlaybackId) -> bool {
    state.connection.is_some() && state.playback == playback && state.player.is_streaming()
}
