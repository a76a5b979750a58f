use std::collections::VecDeque;

use rand::Rng;

use super::track::Track;
use super::volume::Volume;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("The queue is full (max {max} tracks)")]
pub struct QueueFull {
    pub max: usize,
}

/// Pending tracks plus the one currently playing for a single guild.
#[derive(Debug)]
pub struct MusicQueue {
    tracks: VecDeque<Track>,
    current: Option<Track>,
    volume: Volume,
    loop_enabled: bool,
    shuffle_enabled: bool,
    max_size: usize,
}

impl MusicQueue {
    pub fn new(max_size: usize, volume: Volume) -> Self {
        Self {
            tracks: VecDeque::new(),
            current: None,
            volume,
            loop_enabled: false,
            shuffle_enabled: false,
            max_size,
        }
    }

    /// Appends to the pending queue and returns the track's 1-based position.
    pub fn push(&mut self, track: Track) -> Result<usize, QueueFull> {
        if self.tracks.len() >= self.max_size {
            return Err(QueueFull { max: self.max_size });
        }
        self.tracks.push_back(track);
        Ok(self.tracks.len())
    }

    /// Re-appends a track that already belonged to this queue. Bypasses the
    /// capacity check since the track left the pending queue moments ago.
    pub fn requeue(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    /// Moves the next pending track into `current`: the head in FIFO mode,
    /// a uniformly random element while shuffle is on.
    pub fn advance(&mut self) -> Option<&Track> {
        let next = if self.shuffle_enabled && !self.tracks.is_empty() {
            let index = rand::thread_rng().gen_range(0..self.tracks.len());
            self.tracks.remove(index)
        } else {
            self.tracks.pop_front()
        };
        self.current = next;
        self.current.as_ref()
    }

    pub fn take_current(&mut self) -> Option<Track> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Drops both the current track and everything pending.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    pub fn list(&self) -> &VecDeque<Track> {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn set_volume(&mut self, volume: Volume) {
        self.volume = volume;
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.loop_enabled = !self.loop_enabled;
        self.loop_enabled
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle_enabled = !self.shuffle_enabled;
        self.shuffle_enabled
    }

    /// Seconds of audio left, counting the current track in full.
    pub fn total_duration_secs(&self) -> u64 {
        let pending: u64 = self.tracks.iter().map(|t| t.duration_secs).sum();
        pending + self.current.as_ref().map_or(0, |t| t.duration_secs)
    }
}
