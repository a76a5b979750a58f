use reqwest::Client;
use songbird::input::{Compose, Input, LiveInput, YoutubeDl};

use crate::services::resolver::StreamError;

fn best_audio_args() -> Vec<String> {
    vec!["-f".to_string(), "bestaudio".to_string()]
}

pub struct AudioSource;

impl AudioSource {
    /// Runs yt-dlp for `url` and returns an already-open input, so a dead
    /// link fails here instead of inside the driver.
    pub async fn open(http: Client, url: &str) -> Result<Input, StreamError> {
        let mut source = YoutubeDl::new(http, url.to_string()).user_args(best_audio_args());

        let stream = source
            .create_async()
            .await
            .map_err(|e| StreamError(format!("{url}: {e}")))?;

        Ok(Input::Live(LiveInput::Raw(stream), Some(Box::new(source))))
    }
}
