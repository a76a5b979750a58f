use std::collections::HashMap;
use std::sync::Arc;

use poise::serenity_prelude::GuildId;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::info;

use crate::config::MusicConfig;
use crate::services::coordinator::spawn_event_pump;
use crate::services::error::MusicError;
use crate::services::observer::SessionObserver;
use crate::services::resolver::TrackResolver;
use crate::services::session::{Session, SessionMap};
use crate::services::transport::{JoinParams, VoiceTransport};

pub type JoinLocks = Arc<RwLock<HashMap<GuildId, Arc<Mutex<()>>>>>;

/// Owns every live session, at most one per guild.
pub struct SessionRegistry<T: VoiceTransport> {
    transport: Arc<T>,
    resolver: Arc<dyn TrackResolver<Stream = T::Stream>>,
    observer: Arc<dyn SessionObserver>,
    config: MusicConfig,
    sessions: SessionMap<T>,
    join_locks: JoinLocks,
}

impl<T: VoiceTransport> Clone for SessionRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            resolver: self.resolver.clone(),
            observer: self.observer.clone(),
            config: self.config,
            sessions: self.sessions.clone(),
            join_locks: self.join_locks.clone(),
        }
    }
}

impl<T: VoiceTransport> SessionRegistry<T> {
    pub fn new(
        transport: Arc<T>,
        resolver: Arc<dyn TrackResolver<Stream = T::Stream>>,
        observer: Arc<dyn SessionObserver>,
        config: MusicConfig,
    ) -> Self {
        Self {
            transport,
            resolver,
            observer,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            join_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> MusicConfig {
        self.config
    }

    pub async fn get(&self, guild_id: GuildId) -> Option<Arc<Session<T>>> {
        let session = self.sessions.read().await.get(&guild_id).cloned()?;
        if session.is_destroyed().await {
            return None;
        }
        Some(session)
    }

    /// Returns the guild's session, joining `params.voice_channel` first if
    /// there is none. Concurrent callers for one guild share a single join.
    pub async fn get_or_create(
        &self,
        guild_id: GuildId,
        params: JoinParams,
    ) -> Result<Arc<Session<T>>, MusicError> {
        if let Some(session) = self.get(guild_id).await {
            return Ok(session);
        }

        let lock = {
            let mut locks = self.join_locks.write().await;
            locks
                .entry(guild_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        if let Some(session) = self.get(guild_id).await {
            return Ok(session);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = self
            .transport
            .connect(guild_id, &params, events_tx)
            .await?;

        let session = Session::new(
            guild_id,
            params,
            self.config,
            self.resolver.clone(),
            self.observer.clone(),
            self.sessions.clone(),
            connection,
        );
        spawn_event_pump(Arc::downgrade(&session), events_rx);

        self.sessions
            .write()
            .await
            .insert(guild_id, session.clone());
        session.start().await;

        info!(
            guild_id = %guild_id,
            voice_channel = %params.voice_channel,
            "session created"
        );
        Ok(session)
    }

    /// Tears down the guild's session. Returns whether there was one.
    pub async fn destroy(&self, guild_id: GuildId) -> bool {
        let session = self.sessions.read().await.get(&guild_id).cloned();
        match session {
            Some(session) => session.shutdown().await,
            None => false,
        }
    }

    pub async fn shutdown_all(&self) {
        let sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        if sessions.is_empty() {
            return;
        }

        info!(count = sessions.len(), "shutting down all sessions");
        futures::future::join_all(sessions.iter().map(|s| s.shutdown())).await;
    }
}
