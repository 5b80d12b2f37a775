//! Twilio-compatible REST backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderConfig;

use super::{CallClient, CallStatus, PlaceCallRequest, PlacedCall, ProviderError, RecordingRef};

const API_VERSION: &str = "2010-04-01";

/// Twilio REST client.
pub struct TwilioClient {
    client: Client,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct RecordingList {
    #[serde(default)]
    recordings: Vec<RecordingResource>,
}

#[derive(Debug, Deserialize)]
struct RecordingResource {
    sid: String,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl TwilioClient {
    /// Create a new client.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    /// URL of an account-scoped resource.
    fn account_url(&self, resource: &str) -> String {
        format!(
            "{}/{}/Accounts/{}/{}",
            self.base_url(),
            API_VERSION,
            urlencoding::encode(&self.config.account_sid),
            resource
        )
    }

    /// Make an authenticated GET request and decode the JSON body.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await
            .map_err(map_transport_error)?;

        decode(response).await
    }

    /// Resolve a provider-relative URI against the API base.
    fn absolute_uri(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}/{}", self.base_url(), uri.trim_start_matches('/'))
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_connect() {
        ProviderError::ConnectionFailed(e.to_string())
    } else {
        ProviderError::Api(e.to_string())
    }
}

/// Map the HTTP status to an error, or decode the success body.
async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(map_transport_error)?;

    if status.is_success() {
        return serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
    }

    let detail = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(ApiErrorBody {
            code: Some(code),
            message: Some(message),
        }) => format!("HTTP {} (code {}): {}", status, code, message),
        Ok(ApiErrorBody {
            message: Some(message),
            ..
        }) => format!("HTTP {}: {}", status, message),
        _ => format!(
            "HTTP {}: {}",
            status,
            body.chars().take(100).collect::<String>()
        ),
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::AuthenticationFailed(detail)
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail),
        s if s.is_client_error() => ProviderError::InvalidRequest(detail),
        _ => ProviderError::Api(detail),
    })
}

#[async_trait]
impl CallClient for TwilioClient {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn place_call(&self, request: &PlaceCallRequest) -> Result<PlacedCall, ProviderError> {
        let url = self.account_url("Calls.json");
        let record = if request.record { "true" } else { "false" };
        let params = [
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Twiml", request.script.as_str()),
            ("Record", record),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let call: CallResource = decode(response).await?;
        debug!("Twilio accepted call {} ({})", call.sid, call.status);

        Ok(PlacedCall {
            call_id: call.sid,
            status: CallStatus::parse(&call.status),
        })
    }

    async fn call_status(&self, call_id: &str) -> Result<CallStatus, ProviderError> {
        let url = self.account_url(&format!("Calls/{}.json", urlencoding::encode(call_id)));
        let call: CallResource = self.get_json(&url).await?;
        Ok(CallStatus::parse(&call.status))
    }

    async fn list_recordings(&self, call_id: &str) -> Result<Vec<RecordingRef>, ProviderError> {
        let url = self.account_url(&format!(
            "Calls/{}/Recordings.json",
            urlencoding::encode(call_id)
        ));
        let list: RecordingList = self.get_json(&url).await?;

        Ok(list
            .recordings
            .into_iter()
            .map(|r| RecordingRef {
                recording_id: r.sid,
                uri: self.absolute_uri(&r.uri),
            })
            .collect())
    }
}
