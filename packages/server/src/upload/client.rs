use serde::Deserialize;
use serde_json::json;

use crate::config::WorkflowConfig;

/// Failures talking to the external workflow system.
///
/// Every variant carries the failing URL; `Status` also carries the response
/// body so submission failures are diagnosable from the error alone.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("unexpected response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

impl WorkflowError {
    pub fn into_parts(self) -> (String, String) {
        match self {
            Self::Status { url, status, body } => (url, format!("HTTP {status}: {body}")),
            Self::Transport { url, detail } | Self::Decode { url, detail } => (url, detail),
        }
    }
}

/// User record returned by the workflow system's IAM surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUser {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// HTTP client for the external workflow system.
///
/// Bearer tokens ride on the individual request; the shared reqwest client's
/// default headers are never mutated, so the client is safe to share across
/// concurrent submissions.
pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
    step: String,
}

impl WorkflowClient {
    pub fn new(config: &WorkflowConfig) -> Self {
        let mut base_url = config.base_url.clone();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            step: config.step.clone(),
        }
    }

    /// Phase 1: reserve an upload slot. Only the form identifier travels;
    /// the response is a JSON-encoded `uploadId` string.
    pub async fn initiate_upload(
        &self,
        tenant: &str,
        form_id: &str,
        bearer: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let url = format!("{}/API/Upload/{tenant}/{}", self.base_url, self.step);
        let body = json!({ "indexFields": { "formId": form_id } });
        let text = self.send(self.http.post(&url).json(&body), &url, bearer).await?;
        parse_json_string(&url, &text)
    }

    /// Request a signed upload URL for one staged file.
    pub async fn file_upload_url(
        &self,
        tenant: &str,
        upload_id: &str,
        additional_data: &str,
        file_name: &str,
        bearer: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let url = format!("{}/API/Upload/{tenant}/{upload_id}/file/url", self.base_url);
        let request = self.http.get(&url).query(&[
            ("additionalData", additional_data),
            ("fileName", file_name),
            ("fileNumber", "1"),
            ("visible", "true"),
        ]);
        let text = self.send(request, &url, bearer).await?;
        parse_json_string(&url, &text)
    }

    /// PUT staged bytes to a signed upload URL.
    pub async fn put_file(&self, url: &str, bytes: Vec<u8>) -> Result<(), WorkflowError> {
        self.send(self.http.put(url).body(bytes), url, None).await?;
        Ok(())
    }

    /// Phase 3: finalize the upload. The response is a JSON-encoded
    /// `documentId` string; the id does not exist before this call.
    pub async fn complete_upload(
        &self,
        tenant: &str,
        upload_id: &str,
        bearer: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let url = format!(
            "{}/API/Upload/{tenant}/{upload_id}/complete",
            self.base_url
        );
        let request = self.http.get(&url).query(&[("async", "false")]);
        let text = self.send(request, &url, bearer).await?;
        parse_json_string(&url, &text)
    }

    /// Resolve the identity behind a bearer token.
    pub async fn current_user(&self, bearer: &str) -> Result<WorkflowUser, WorkflowError> {
        let url = format!("{}/IAM/Users/CurrentUser", self.base_url);
        let text = self.send(self.http.get(&url), &url, Some(bearer)).await?;
        serde_json::from_str(&text).map_err(|e| WorkflowError::Decode {
            url,
            detail: e.to_string(),
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let request = match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| WorkflowError::Transport {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| WorkflowError::Transport {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(WorkflowError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Upload endpoints answer with a JSON-encoded string (e.g. `"\"U1\""`).
fn parse_json_string(url: &str, body: &str) -> Result<String, WorkflowError> {
    serde_json::from_str::<String>(body).map_err(|_| WorkflowError::Decode {
        url: url.to_string(),
        detail: format!("expected a JSON-encoded string, got: {body}"),
    })
}
