/// An immutable descriptor of a playable media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    /// Canonical media locator handed back to the resolver when opening a stream.
    pub locator: String,
    pub duration_secs: u64,
    /// Channel or author the track was published by.
    pub source_label: String,
    pub thumbnail: Option<String>,
}

impl Track {
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_secs)
    }
}

/// `m:ss` below an hour, `h:mm:ss` above.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
