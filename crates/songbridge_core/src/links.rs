use serde::Serialize;

/// Best-known audio links for one generation job.
///
/// Both URLs absent means "not ready yet", which is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioLinks {
    pub stream_url: Option<String>,
    pub audio_url: Option<String>,
    pub status: Option<String>,
}

impl AudioLinks {
    /// Builds links from the provider's raw fields.
    ///
    /// Streaming prefers the stream URL, download prefers the audio file; each
    /// falls back to the other. Blank strings count as absent.
    pub fn from_provider(
        stream_audio_url: Option<&str>,
        audio_url: Option<&str>,
        status: Option<&str>,
    ) -> Self {
        let stream = stream_audio_url.map(str::trim).filter(|url| !url.is_empty());
        let audio = audio_url.map(str::trim).filter(|url| !url.is_empty());
        Self {
            stream_url: stream.or(audio).map(str::to_string),
            audio_url: audio.or(stream).map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.stream_url.is_some() || self.audio_url.is_some()
    }
}
