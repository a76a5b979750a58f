use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
    /// Only ever observed in logs; the session recovers within the same step.
    Errored,
}

impl PlayerState {
    /// States in which the queue holds a current track.
    pub fn has_track(self) -> bool {
        matches!(
            self,
            PlayerState::Buffering | PlayerState::Playing | PlayerState::Paused
        )
    }

    /// States in which a stream is live on the transport.
    pub fn is_streaming(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerState::Idle => "idle",
            PlayerState::Buffering => "buffering",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Errored => "errored",
        };
        f.write_str(label)
    }
}
