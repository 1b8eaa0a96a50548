//! REST client for the video analysis service.
//!
//! Wraps `POST /process-video` and `GET /status` using [`reqwest`] and
//! folds every failure into a [`PipelineError`] the operator can act on.

use speedtrap_core::error::{PipelineError, GENERIC_SERVER_ERROR};
use speedtrap_core::result::{ErrorBody, ProcessingResult, ServiceStatus};

use crate::request::SubmissionRequest;

/// HTTP client for a single analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisApi {
    client: reqwest::Client,
    api_url: String,
}

impl AnalysisApi {
    /// * `api_url` - Base HTTP URL, e.g. `http://host:5000`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Upload a video with its zones and settings and wait for the
    /// consolidated result.
    ///
    /// No timeout is applied here; the caller owns the deadline.
    pub async fn process_video(
        &self,
        request: SubmissionRequest,
    ) -> Result<ProcessingResult, PipelineError> {
        let form = request.into_form().await?;

        let response = self
            .client
            .post(format!("{}/process-video", self.api_url))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        Self::parse_response(response).await
    }

    /// Health and capability report of the service.
    pub async fn status(&self) -> Result<ServiceStatus, PipelineError> {
        let response = self
            .client
            .get(format!("{}/status", self.api_url))
            .send()
            .await
            .map_err(transport)?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on a success status, otherwise a
    /// [`PipelineError::Server`] carrying the service's own message.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PipelineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(server_error(status.as_u16(), &body));
        }
        Ok(response)
    }

    /// Parse a successful JSON body. A body of the wrong shape is an
    /// unknown failure rather than a transport one.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PipelineError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::Unknown(e.to_string()))
    }
}

/// Classify a non-success response body.
///
/// Uses the body's `error` field when present, the generic server
/// message otherwise.
pub fn server_error(status: u16, body: &str) -> PipelineError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string());
    PipelineError::Server { status, message }
}

fn transport(e: reqwest::Error) -> PipelineError {
    if e.is_decode() {
        PipelineError::Unknown(e.to_string())
    } else {
        PipelineError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_taken_from_error_field() {
        assert_eq!(
            server_error(500, r#"{"error": "invalid codec"}"#),
            PipelineError::Server {
                status: 500,
                message: "invalid codec".into()
            }
        );
    }

    #[test]
    fn unparsable_body_falls_back_to_generic_message() {
        for body in ["<html>502 Bad Gateway</html>", "", "{}", r#"{"error": null}"#] {
            assert_eq!(
                server_error(502, body),
                PipelineError::Server {
                    status: 502,
                    message: GENERIC_SERVER_ERROR.into()
                },
                "body: {body:?}"
            );
        }
    }
}
