use serde::Serialize;
use serde_json::Value;

use crate::gateway::Schema;
use crate::issue::{IssueCode, PayloadFamily, ValidationError};
use crate::reader::{field_path, FieldReader, ROOT};

/// Prompt limit outside custom mode, where the prompt is a free description.
pub const DESCRIPTION_PROMPT_LIMIT: usize = 500;
pub const TITLE_LIMIT: usize = 80;

/// Provider model generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Model {
    #[serde(rename = "V3_5")]
    V3_5,
    #[serde(rename = "V4")]
    V4,
    #[default]
    #[serde(rename = "V4_5")]
    V4_5,
    #[serde(rename = "V4_5PLUS")]
    V4_5Plus,
    #[serde(rename = "V5")]
    V5,
}

impl Model {
    pub const NAMES: &'static [&'static str] = &["V3_5", "V4", "V4_5", "V4_5PLUS", "V5"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "V3_5" => Some(Model::V3_5),
            "V4" => Some(Model::V4),
            "V4_5" => Some(Model::V4_5),
            "V4_5PLUS" => Some(Model::V4_5Plus),
            "V5" => Some(Model::V5),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Model::V3_5 => "V3_5",
            Model::V4 => "V4",
            Model::V4_5 => "V4_5",
            Model::V4_5Plus => "V4_5PLUS",
            Model::V5 => "V5",
        }
    }

    fn is_legacy(self) -> bool {
        matches!(self, Model::V3_5 | Model::V4)
    }

    /// Longest lyrics prompt accepted in custom mode.
    pub fn lyrics_limit(self) -> usize {
        if self.is_legacy() {
            3000
        } else {
            5000
        }
    }

    pub fn style_limit(self) -> usize {
        if self.is_legacy() {
            200
        } else {
            1000
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VocalGender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl VocalGender {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "m" => Some(VocalGender::Male),
            "f" => Some(VocalGender::Female),
            _ => None,
        }
    }
}

/// A generation request that passed validation. Serializes back to the
/// provider's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRequest {
    pub custom_mode: bool,
    pub instrumental: bool,
    pub model: Model,
    #[serde(rename = "callBackUrl")]
    pub callback_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_gender: Option<VocalGender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weirdness_constraint: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_weight: Option<f64>,
}

impl Schema for ValidatedRequest {
    const FAMILY: PayloadFamily = PayloadFamily::GenerationRequest;

    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut reader = FieldReader::new(Self::FAMILY);
        let Some(obj) = reader.root(payload) else {
            return reader.finish(placeholder());
        };

        let custom_mode = reader.required_bool(obj, ROOT, "customMode");
        let instrumental = reader.required_bool(obj, ROOT, "instrumental");
        let raw_model = reader.str_field(obj, ROOT, "model", true);
        let model = reader
            .one_of("model", raw_model, Model::NAMES, Model::parse)
            .unwrap_or_default();
        let callback_url = reader.str_field(obj, ROOT, "callBackUrl", true);
        reader.http_url("callBackUrl", callback_url.as_deref());

        let prompt = reader.optional_str(obj, ROOT, "prompt");
        let style = reader.optional_str(obj, ROOT, "style");
        let title = reader.optional_str(obj, ROOT, "title");
        let negative_tags = reader.optional_non_empty(obj, ROOT, "negativeTags");
        let raw_gender = reader.optional_str(obj, ROOT, "vocalGender");
        let vocal_gender = reader.one_of("vocalGender", raw_gender, &["m", "f"], VocalGender::parse);
        let style_weight = reader.optional_f64(obj, ROOT, "styleWeight");
        let weirdness_constraint = reader.optional_f64(obj, ROOT, "weirdnessConstraint");
        let audio_weight = reader.optional_f64(obj, ROOT, "audioWeight");

        reader.unit_interval("styleWeight", style_weight);
        reader.unit_interval("weirdnessConstraint", weirdness_constraint);
        reader.unit_interval("audioWeight", audio_weight);

        // Which text fields are mandatory depends on the mode.
        let prompt_required = !(custom_mode && instrumental);
        check_text(&mut reader, "prompt", prompt.as_deref(), prompt_required);
        check_text(&mut reader, "style", style.as_deref(), custom_mode);
        check_text(&mut reader, "title", title.as_deref(), custom_mode);

        let prompt_limit = if custom_mode {
            model.lyrics_limit()
        } else {
            DESCRIPTION_PROMPT_LIMIT
        };
        reader.max_chars("prompt", prompt.as_deref(), prompt_limit);
        reader.max_chars("style", style.as_deref(), model.style_limit());
        reader.max_chars("title", title.as_deref(), TITLE_LIMIT);

        reader.finish(ValidatedRequest {
            custom_mode,
            instrumental,
            model,
            callback_url: callback_url.unwrap_or_default(),
            prompt: prompt.filter(|p| !p.trim().is_empty()),
            style: style.filter(|s| !s.trim().is_empty()),
            title: title.filter(|t| !t.trim().is_empty()),
            negative_tags,
            vocal_gender,
            style_weight,
            weirdness_constraint,
            audio_weight,
        })
    }
}

fn check_text(reader: &mut FieldReader, key: &str, text: Option<&str>, required: bool) {
    match text {
        Some(text) if text.trim().is_empty() => {
            reader.push(field_path(ROOT, key), IssueCode::Empty, "must not be blank");
        }
        Some(_) => {}
        None if required => {
            reader.push(field_path(ROOT, key), IssueCode::Required, "field is required");
        }
        None => {}
    }
}

fn placeholder() -> ValidatedRequest {
    ValidatedRequest {
        custom_mode: false,
        instrumental: false,
        model: Model::default(),
        callback_url: String::new(),
        prompt: None,
        style: None,
        title: None,
        negative_tags: None,
        vocal_gender: None,
        style_weight: None,
        weirdness_constraint: None,
        audio_weight: None,
    }
}
