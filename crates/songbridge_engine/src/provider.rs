use std::time::Duration;

use serde::Deserialize;
use songbridge_core::{ValidatedConfig, ValidatedRequest, PROVIDER_OK};
use songbridge_logging::{bridge_debug, bridge_info, bridge_trace};

use crate::{FailureKind, JobDetail, JobDetailData, JobId, ProviderError};

const GENERATE_PATH: &str = "/api/v1/generate";
const RECORD_INFO_PATH: &str = "/api/v1/generate/record-info";

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Without a trailing slash.
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            ..Self::new(config.base_url.clone(), config.api_key.clone())
        }
    }
}

/// The generation provider as seen from this layer.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    /// Submits a generation job and returns the provider's job id.
    async fn submit(&self, request: &ValidatedRequest) -> Result<JobId, ProviderError>;

    /// Looks up the current state of a job.
    async fn job_detail(&self, job_id: &str) -> Result<JobDetail, ProviderError>;
}

/// Envelope every provider endpoint answers with.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitData {
    task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordInfo {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    response: Option<RecordResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordResponse {
    #[serde(default)]
    suno_data: Option<Vec<RecordTrack>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordTrack {
    #[serde(default)]
    stream_audio_url: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
}

impl RecordInfo {
    fn into_detail_data(self) -> JobDetailData {
        let first = self
            .response
            .and_then(|response| response.suno_data)
            .and_then(|tracks| tracks.into_iter().next());
        let (stream_audio_url, audio_url) = match first {
            Some(track) => (track.stream_audio_url, track.audio_url),
            None => (None, None),
        };
        JobDetailData {
            stream_audio_url,
            audio_url,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl HttpProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ProviderError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, ProviderError> {
        reqwest::Url::parse(&format!("{}{}", self.settings.base_url, path))
            .map_err(|err| ProviderError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn read_envelope<T>(response: reqwest::Response) -> Result<Envelope<T>, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        bridge_trace!("{} answered {}", response.url(), status);
        if !status.is_success() {
            return Err(ProviderError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        response
            .json::<Envelope<T>>()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::new(FailureKind::Timeout, err.to_string())
                } else {
                    ProviderError::new(FailureKind::MalformedResponse, err.to_string())
                }
            })
    }
}

#[async_trait::async_trait]
impl ProviderClient for HttpProviderClient {
    async fn submit(&self, request: &ValidatedRequest) -> Result<JobId, ProviderError> {
        let url = self.endpoint(GENERATE_PATH)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.settings.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let envelope: Envelope<SubmitData> = Self::read_envelope(response).await?;
        if envelope.code != PROVIDER_OK {
            return Err(rejected(envelope.code, envelope.msg));
        }
        let task_id = envelope
            .data
            .map(|data| data.task_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::new(FailureKind::MalformedResponse, "missing taskId"))?;
        bridge_info!("Submitted generation job {} (model {})", task_id, request.model.as_str());
        Ok(task_id)
    }

    async fn job_detail(&self, job_id: &str) -> Result<JobDetail, ProviderError> {
        let base = self.endpoint(RECORD_INFO_PATH)?;
        let url = reqwest::Url::parse_with_params(base.as_str(), &[("taskId", job_id)])
            .map_err(|err| ProviderError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.settings.api_key)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let envelope: Envelope<RecordInfo> = Self::read_envelope(response).await?;
        if envelope.code != PROVIDER_OK {
            bridge_debug!(
                "Job detail for {} reported code {}: {}",
                job_id,
                envelope.code,
                envelope.msg.as_deref().unwrap_or("")
            );
            return Ok(JobDetail::unsuccessful());
        }
        Ok(match envelope.data {
            Some(info) => JobDetail::ok(info.into_detail_data()),
            None => JobDetail::unsuccessful(),
        })
    }
}

fn rejected(code: i64, msg: Option<String>) -> ProviderError {
    ProviderError::new(
        FailureKind::Rejected { code },
        msg.unwrap_or_else(|| "no message".to_string()),
    )
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        return ProviderError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ProviderError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ProviderError::new(FailureKind::Network, err.to_string())
}
