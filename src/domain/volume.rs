use std::fmt;

/// Playback volume as a percentage. Always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Volume = Volume(100);

    /// Clamps `requested` into `0..=ceiling`, with `ceiling` itself capped at 100.
    pub fn clamped(requested: i64, ceiling: Volume) -> Self {
        let ceiling = ceiling.min(Self::MAX);
        Self(requested.clamp(0, i64::from(ceiling.0)) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Linear gain for the audio driver, where 100% maps to unity.
    pub fn gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(50)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
