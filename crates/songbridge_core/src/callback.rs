use serde::Serialize;
use serde_json::Value;

use crate::gateway::Schema;
use crate::issue::{PayloadFamily, ValidationError};
use crate::reader::{field_path, index_path, FieldReader, Object, ROOT};

/// Provider code for a successful callback.
pub const PROVIDER_OK: i64 = 200;

/// Stage a callback reports. Ordered by progress; `Error` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStage {
    /// Lyrics/text generated.
    Text,
    /// First track playable.
    First,
    /// All tracks finished.
    Complete,
    Error,
}

impl CallbackStage {
    pub const NAMES: &'static [&'static str] = &["text", "first", "complete", "error"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(CallbackStage::Text),
            "first" => Some(CallbackStage::First),
            "complete" => Some(CallbackStage::Complete),
            "error" => Some(CallbackStage::Error),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallbackStage::Complete | CallbackStage::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CallbackTrack {
    pub id: String,
    pub audio_url: Option<String>,
    pub source_audio_url: Option<String>,
    pub stream_audio_url: Option<String>,
    pub source_stream_audio_url: Option<String>,
    pub image_url: Option<String>,
    pub prompt: Option<String>,
    pub model_name: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
    pub create_time: Option<String>,
    pub duration: Option<f64>,
}

/// A provider callback that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedCallback {
    pub code: i64,
    pub msg: String,
    pub stage: CallbackStage,
    pub task_id: String,
    pub tracks: Vec<CallbackTrack>,
}

impl ValidatedCallback {
    pub fn is_success(&self) -> bool {
        self.code == PROVIDER_OK && self.stage != CallbackStage::Error
    }
}

impl Schema for ValidatedCallback {
    const FAMILY: PayloadFamily = PayloadFamily::Callback;

    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::FAMILY);
        let mut callback = ValidatedCallback {
            code: 0,
            msg: String::new(),
            stage: CallbackStage::Error,
            task_id: String::new(),
            tracks: Vec::new(),
        };
        let Some(obj) = reader.root(payload) else {
            return reader.finish(callback);
        };

        callback.code = reader.required_i64(obj, ROOT, "code");
        callback.msg = reader.required_str(obj, ROOT, "msg");

        if let Some(data) = reader.required_object(obj, ROOT, "data") {
            let raw_stage = reader.str_field(data, "data", "callbackType", true);
            if let Some(stage) = reader.one_of(
                "data.callbackType",
                raw_stage,
                CallbackStage::NAMES,
                CallbackStage::parse,
            ) {
                callback.stage = stage;
            }
            callback.task_id = reader.required_text(data, "data", "task_id");

            let tracks_path = field_path("data", "data");
            for (index, item) in reader.optional_array(data, "data", "data").iter().enumerate() {
                let path = index_path(&tracks_path, index);
                if let Some(track) = reader.element(item, &path) {
                    callback.tracks.push(read_track(&mut reader, track, &path));
                }
            }
        }

        reader.finish(callback)
    }
}

fn read_track(reader: &mut FieldReader, track: &Object, path: &str) -> CallbackTrack {
    CallbackTrack {
        id: reader.required_str(track, path, "id"),
        audio_url: reader.optional_non_empty(track, path, "audio_url"),
        source_audio_url: reader.optional_non_empty(track, path, "source_audio_url"),
        stream_audio_url: reader.optional_non_empty(track, path, "stream_audio_url"),
        source_stream_audio_url: reader.optional_non_empty(track, path, "source_stream_audio_url"),
        image_url: reader.optional_non_empty(track, path, "image_url"),
        prompt: reader.optional_non_empty(track, path, "prompt"),
        model_name: reader.optional_non_empty(track, path, "model_name"),
        title: reader.optional_non_empty(track, path, "title"),
        tags: reader.optional_non_empty(track, path, "tags"),
        create_time: reader.optional_scalar_text(track, path, "createTime"),
        duration: reader.optional_f64(track, path, "duration"),
    }
}
