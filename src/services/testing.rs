//! In-memory transport, resolver and observer for exercising sessions
//! without Discord.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use tokio::sync::Notify;

use crate::config::MusicConfig;
use crate::domain::track::Track;
use crate::domain::volume::Volume;
use crate::services::observer::SessionObserver;
use crate::services::registry::SessionRegistry;
use crate::services::resolver::{ResolveError, Resolved, StreamError, TrackResolver};
use crate::services::session::Session;
use crate::services::transport::{
    EventSender, JoinParams, PlaybackId, TransportError, TransportEvent, VoiceConnection,
    VoiceTransport,
};

pub fn guild() -> GuildId {
    GuildId::new(1)
}

pub fn join_params() -> JoinParams {
    JoinParams {
        voice_channel: ChannelId::new(10),
        text_channel: ChannelId::new(20),
    }
}

pub fn track(title: &str) -> Track {
    Track {
        title: title.to_string(),
        locator: format!("fake://{title}"),
        duration_secs: 200,
        source_label: "Fake".to_string(),
        thumbnail: None,
    }
}

/// Lets spawned tasks (event pumps, timers) run to quiescence.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug)]
pub struct FakeStream(pub String);

#[derive(Default)]
struct CallLog {
    plays: Vec<(String, PlaybackId)>,
    paused: bool,
    stops: usize,
    volume: Option<Volume>,
    disconnected: bool,
}

/// What a connection has been asked to do, plus a handle for injecting
/// transport notifications.
#[derive(Clone)]
pub struct FakeCall {
    log: Arc<Mutex<CallLog>>,
    events: EventSender,
}

impl FakeCall {
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Reports the most recent stream as having played to the end.
    pub fn finish_current(&self) {
        if let Some(playback) = self.last_playback() {
            self.emit(TransportEvent::TrackEnded(playback));
        }
    }

    pub fn played(&self) -> Vec<String> {
        let log = self.log.lock().unwrap();
        log.plays.iter().map(|(locator, _)| locator.clone()).collect()
    }

    pub fn last_playback(&self) -> Option<PlaybackId> {
        self.log.lock().unwrap().plays.last().map(|(_, id)| *id)
    }

    pub fn paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }

    pub fn stops(&self) -> usize {
        self.log.lock().unwrap().stops
    }

    pub fn volume(&self) -> Option<Volume> {
        self.log.lock().unwrap().volume
    }

    pub fn disconnected(&self) -> bool {
        self.log.lock().unwrap().disconnected
    }
}

pub struct FakeConnection {
    call: FakeCall,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    type Stream = FakeStream;

    async fn play(
        &mut self,
        stream: FakeStream,
        playback: PlaybackId,
        volume: Volume,
    ) -> Result<(), TransportError> {
        let mut log = self.call.log.lock().unwrap();
        log.plays.push((stream.0, playback));
        log.paused = false;
        log.volume = Some(volume);
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.call.log.lock().unwrap().paused = true;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), TransportError> {
        self.call.log.lock().unwrap().paused = false;
        Ok(())
    }

    async fn stop(&mut self) {
        self.call.log.lock().unwrap().stops += 1;
        // A real driver reports the stopped stream as ended.
        self.call.finish_current();
    }

    async fn set_volume(&mut self, volume: Volume) {
        self.call.log.lock().unwrap().volume = Some(volume);
    }

    async fn disconnect(&mut self) {
        self.call.log.lock().unwrap().disconnected = true;
    }
}

#[derive(Default)]
pub struct FakeTransport {
    connects: AtomicUsize,
    calls: Mutex<HashMap<GuildId, FakeCall>>,
}

impl FakeTransport {
    /// The most recent connection made for `guild_id`.
    pub fn call(&self, guild_id: GuildId) -> FakeCall {
        self.calls.lock().unwrap()[&guild_id].clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    type Stream = FakeStream;
    type Connection = FakeConnection;

    async fn connect(
        &self,
        guild_id: GuildId,
        _params: &JoinParams,
        events: EventSender,
    ) -> Result<FakeConnection, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        // Widen the window for racing joins.
        tokio::task::yield_now().await;

        let call = FakeCall {
            log: Arc::default(),
            events,
        };
        self.calls.lock().unwrap().insert(guild_id, call.clone());
        Ok(FakeConnection { call })
    }
}

#[derive(Default)]
pub struct FakeResolver {
    catalog: Mutex<HashMap<String, Resolved>>,
    broken_streams: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeResolver {
    pub fn add(&self, query: &str, resolved: Resolved) {
        self.catalog
            .lock()
            .unwrap()
            .insert(query.to_string(), resolved);
    }

    pub fn break_stream(&self, locator: &str) {
        self.broken_streams
            .lock()
            .unwrap()
            .insert(locator.to_string());
    }

    /// Holds `open_stream(locator)` until the returned gate is notified.
    pub fn gate(&self, locator: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(locator.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl TrackResolver for FakeResolver {
    type Stream = FakeStream;

    async fn resolve(&self, query: &str) -> Result<Resolved, ResolveError> {
        self.catalog
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }

    async fn open_stream(&self, locator: &str) -> Result<FakeStream, StreamError> {
        let gate = self.gates.lock().unwrap().get(locator).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.broken_streams.lock().unwrap().contains(locator) {
            return Err(StreamError(format!("{locator} is unavailable")));
        }
        Ok(FakeStream(locator.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<String>>,
    idle_left: AtomicUsize,
    closed: AtomicUsize,
}

impl RecordingObserver {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn idle_left(&self) -> usize {
        self.idle_left.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl SessionObserver for RecordingObserver {
    fn track_started(&self, _guild_id: GuildId, _text_channel: ChannelId, track: &Track) {
        self.started.lock().unwrap().push(track.title.clone());
    }

    fn idle_left(&self, _guild_id: GuildId, _text_channel: ChannelId) {
        self.idle_left.fetch_add(1, Ordering::SeqCst);
    }

    fn session_closed(&self, _guild_id: GuildId) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub resolver: Arc<FakeResolver>,
    pub observer: Arc<RecordingObserver>,
    pub registry: SessionRegistry<FakeTransport>,
}

impl Harness {
    pub async fn join(&self) -> Arc<Session<FakeTransport>> {
        self.registry
            .get_or_create(guild(), join_params())
            .await
            .unwrap()
    }
}

pub fn harness(config: MusicConfig) -> Harness {
    let transport = Arc::new(FakeTransport::default());
    let resolver = Arc::new(FakeResolver::default());
    let observer = Arc::new(RecordingObserver::default());
    let registry = SessionRegistry::new(
        transport.clone(),
        resolver.clone(),
        observer.clone(),
        config,
    );

    Harness {
        transport,
        resolver,
        observer,
        registry,
    }
}
