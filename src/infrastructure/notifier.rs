use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId, CreateMessage, GuildId, Http, MessageId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::commands::now_playing::{build_now_playing_components, now_playing_embed};
use crate::domain::track::Track;
use crate::services::observer::SessionObserver;

pub enum Notice {
    Started {
        guild_id: GuildId,
        channel: ChannelId,
        track: Track,
    },
    IdleLeft {
        guild_id: GuildId,
        channel: ChannelId,
    },
    Closed {
        guild_id: GuildId,
    },
}

pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Where notices end up. Discord in production.
#[async_trait]
pub trait MessageSink: Send + Sync + 'static {
    async fn post_now_playing(
        &self,
        guild_id: GuildId,
        channel: ChannelId,
        track: &Track,
    ) -> Result<MessageId, serenity::Error>;

    async fn post_text(&self, channel: ChannelId, content: &str) -> Result<(), serenity::Error>;

    async fn delete(&self, channel: ChannelId, message: MessageId) -> Result<(), serenity::Error>;
}

struct HttpSink {
    http: Arc<Http>,
}

#[async_trait]
impl MessageSink for HttpSink {
    async fn post_now_playing(
        &self,
        guild_id: GuildId,
        channel: ChannelId,
        track: &Track,
    ) -> Result<MessageId, serenity::Error> {
        let message = CreateMessage::new()
            .embed(now_playing_embed(track))
            .components(build_now_playing_components(guild_id, false));
        let sent = channel.send_message(&*self.http, message).await?;
        Ok(sent.id)
    }

    async fn post_text(&self, channel: ChannelId, content: &str) -> Result<(), serenity::Error> {
        channel
            .send_message(&*self.http, CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn delete(&self, channel: ChannelId, message: MessageId) -> Result<(), serenity::Error> {
        channel.delete_message(&*self.http, message).await
    }
}

/// Posts session milestones to the guild's bound text channel. The session
/// is locked while it notifies, so notices are queued here and delivered
/// in order by a single worker.
pub struct DiscordNotifier {
    notices: mpsc::UnboundedSender<Notice>,
}

impl DiscordNotifier {
    pub fn channel() -> (Self, NoticeReceiver) {
        let (notices, rx) = mpsc::unbounded_channel();
        (Self { notices }, rx)
    }

    fn send(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            tracing::debug!("notice worker is gone, dropping notice");
        }
    }
}

impl SessionObserver for DiscordNotifier {
    fn track_started(&self, guild_id: GuildId, text_channel: ChannelId, track: &Track) {
        self.send(Notice::Started {
            guild_id,
            channel: text_channel,
            track: track.clone(),
        });
    }

    fn idle_left(&self, guild_id: GuildId, text_channel: ChannelId) {
        self.send(Notice::IdleLeft {
            guild_id,
            channel: text_channel,
        });
    }

    fn session_closed(&self, guild_id: GuildId) {
        self.send(Notice::Closed { guild_id });
    }
}

/// Starts delivering queued notices through the client's HTTP handle.
pub fn spawn_notice_worker(http: Arc<Http>, notices: NoticeReceiver) -> JoinHandle<()> {
    tokio::spawn(deliver(HttpSink { http }, notices))
}

async fn deliver<S: MessageSink>(sink: S, mut notices: NoticeReceiver) {
    // At most one now-playing message per guild.
    let mut now_playing: HashMap<GuildId, (ChannelId, MessageId)> = HashMap::new();

    while let Some(notice) = notices.recv().await {
        match notice {
            Notice::Started {
                guild_id,
                channel,
                track,
            } => {
                if let Some((old_channel, old)) = now_playing.remove(&guild_id) {
                    let _ = sink.delete(old_channel, old).await;
                }
                match sink.post_now_playing(guild_id, channel, &track).await {
                    Ok(id) => {
                        now_playing.insert(guild_id, (channel, id));
                    }
                    Err(e) => tracing::warn!(
                        guild_id = %guild_id,
                        "Failed to send Now Playing message: {e}"
                    ),
                }
            }
            Notice::IdleLeft { guild_id, channel } => {
                if let Err(e) = sink.post_text(channel, "Disconnected due to inactivity.").await {
                    tracing::warn!(guild_id = %guild_id, "Failed to send inactivity notice: {e}");
                }
            }
            Notice::Closed { guild_id } => {
                if let Some((channel, message)) = now_playing.remove(&guild_id) {
                    let _ = sink.delete(channel, message).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::services::testing::{guild, track};

    #[derive(Debug, PartialEq, Eq)]
    enum Sent {
        NowPlaying(u64),
        Text(String),
        Deleted(u64),
    }

    #[derive(Default)]
    struct RecordingSink {
        log: Arc<Mutex<Vec<Sent>>>,
        next_id: AtomicU64,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn post_now_playing(
            &self,
            _guild_id: GuildId,
            _channel: ChannelId,
            _track: &Track,
        ) -> Result<MessageId, serenity::Error> {
            // Slow enough that a close would overtake an unordered send.
            tokio::time::sleep(Duration::from_millis(200)).await;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.log.lock().unwrap().push(Sent::NowPlaying(id));
            Ok(MessageId::new(id))
        }

        async fn post_text(
            &self,
            _channel: ChannelId,
            content: &str,
        ) -> Result<(), serenity::Error> {
            self.log
                .lock()
                .unwrap()
                .push(Sent::Text(content.to_string()));
            Ok(())
        }

        async fn delete(
            &self,
            _channel: ChannelId,
            message: MessageId,
        ) -> Result<(), serenity::Error> {
            self.log.lock().unwrap().push(Sent::Deleted(message.get()));
            Ok(())
        }
    }

    fn start_worker() -> (DiscordNotifier, Arc<Mutex<Vec<Sent>>>, JoinHandle<()>) {
        let (notifier, notices) = DiscordNotifier::channel();
        let sink = RecordingSink::default();
        let log = sink.log.clone();
        (notifier, log, tokio::spawn(deliver(sink, notices)))
    }

    #[tokio::test(start_paused = true)]
    async fn close_right_after_start_removes_the_message() {
        let (notifier, log, worker) = start_worker();

        notifier.track_started(guild(), ChannelId::new(10), &track("a"));
        notifier.session_closed(guild());
        drop(notifier);
        worker.await.unwrap();

        assert_eq!(*log.lock().unwrap(), [Sent::NowPlaying(1), Sent::Deleted(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn each_track_replaces_the_previous_message() {
        let (notifier, log, worker) = start_worker();

        notifier.track_started(guild(), ChannelId::new(10), &track("a"));
        notifier.track_started(guild(), ChannelId::new(10), &track("b"));
        notifier.idle_left(guild(), ChannelId::new(10));
        notifier.session_closed(guild());
        drop(notifier);
        worker.await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                Sent::NowPlaying(1),
                Sent::Deleted(1),
                Sent::NowPlaying(2),
                Sent::Text("Disconnected due to inactivity.".to_string()),
                Sent::Deleted(2),
            ]
        );
    }

    #[tokio::test]
    async fn close_without_message_sends_nothing() {
        let (notifier, log, worker) = start_worker();

        notifier.session_closed(guild());
        drop(notifier);
        worker.await.unwrap();

        assert!(log.lock().unwrap().is_empty());
    }
}
