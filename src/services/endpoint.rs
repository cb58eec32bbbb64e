use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use strum::{Display, EnumString};
use tokio::time::{sleep, Instant};

/// Lifecycle state of a compute endpoint as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
pub enum EndpointState {
    Creating,
    InService,
    Updating,
    Failed,
    Deleting,
    #[strum(default)]
    Unknown(String),
}

#[derive(Deserialize)]
struct DescribeResponse {
    status: String,
}

/// Thin wrapper over the compute control plane for endpoint lifecycle.
///
/// Create/delete are idempotent from the caller's point of view: an endpoint
/// that already exists (or is already gone) is a warning, not a failure.
/// Any other delete failure is fatal and propagated.
pub struct EndpointControlClient {
    http: Client,
    base_url: String,
}

impl EndpointControlClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Request creation of a compute endpoint.
    pub async fn create(&self, name: &str, config_name: &str) -> Result<(), EndpointError> {
        let url = format!("{}/endpoints", self.base_url);
        let body = serde_json::json!({
            "endpointName": name,
            "endpointConfigName": config_name,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(EndpointError::Http)?;

        match response.status() {
            StatusCode::CONFLICT => {
                tracing::warn!(endpoint = name, "endpoint already exists");
                Ok(())
            }
            status if status.is_success() => {
                tracing::info!(endpoint = name, "endpoint creation requested");
                Ok(())
            }
            status => Err(EndpointError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    pub async fn describe(&self, name: &str) -> Result<EndpointState, EndpointError> {
        let url = format!("{}/endpoints/{}", self.base_url, name);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(EndpointError::Http)?;

        if !response.status().is_success() {
            return Err(EndpointError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let described: DescribeResponse = response.json().await.map_err(EndpointError::Http)?;
        Ok(described
            .status
            .parse()
            .unwrap_or(EndpointState::Unknown(described.status)))
    }

    /// Poll until the endpoint is in service. Returns `Ok(false)` on failure
    /// or timeout rather than erroring; the caller decides what partial
    /// readiness means.
    pub async fn wait_until_ready(
        &self,
        name: &str,
        check_interval: Duration,
        timeout: Duration,
    ) -> Result<bool, EndpointError> {
        let start = Instant::now();

        loop {
            let state = self.describe(name).await?;
            tracing::info!(endpoint = name, state = %state, "endpoint status");

            match state {
                EndpointState::InService => return Ok(true),
                EndpointState::Failed => {
                    tracing::error!(endpoint = name, "endpoint creation failed");
                    return Ok(false);
                }
                _ => {}
            }

            if start.elapsed() > timeout {
                tracing::warn!(
                    endpoint = name,
                    timeout_secs = timeout.as_secs(),
                    "timed out waiting for endpoint"
                );
                return Ok(false);
            }

            sleep(check_interval).await;
        }
    }

    /// Delete a compute endpoint. Already-absent is success-with-warning;
    /// anything else non-success propagates as fatal.
    pub async fn delete(&self, name: &str) -> Result<(), EndpointError> {
        let url = format!("{}/endpoints/{}", self.base_url, name);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(EndpointError::Http)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::warn!(endpoint = name, "endpoint already deleted or never existed");
                Ok(())
            }
            status if status.is_success() => {
                tracing::info!(endpoint = name, "endpoint deleted");
                Ok(())
            }
            status => Err(EndpointError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control plane returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_state_parses_control_plane_strings() {
        assert_eq!(
            "InService".parse::<EndpointState>().unwrap(),
            EndpointState::InService
        );
        assert_eq!(
            "RollingBack".parse::<EndpointState>().unwrap(),
            EndpointState::Unknown("RollingBack".to_string())
        );
    }
}
