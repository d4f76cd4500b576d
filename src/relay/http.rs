//! HTTP relay client for the signal-cli REST API.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::relay::Relay;

/// `reqwest`-backed relay.
pub struct HttpRelay {
    host: String,
    account: String,
    client: reqwest::Client,
}

impl HttpRelay {
    pub fn new(host: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            account: account.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.host)
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RelayError> {
        let resp = request.send().await.map_err(|e| RelayError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(RelayError::Status {
                endpoint: endpoint.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn receive(&self) -> Result<serde_json::Value, RelayError> {
        let endpoint = format!("/v1/receive/{}", self.account);
        let resp = self
            .send(&endpoint, self.client.get(self.api_url(&endpoint)))
            .await?;

        resp.json()
            .await
            .map_err(|e| RelayError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            })
    }

    async fn fetch_attachment(&self, id: &str) -> Result<Vec<u8>, RelayError> {
        let endpoint = format!("/v1/attachments/{id}");
        let resp = self
            .send(&endpoint, self.client.get(self.api_url(&endpoint)))
            .await?;

        let bytes = resp.bytes().await.map_err(|e| RelayError::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn delete_attachment(&self, id: &str) -> Result<(), RelayError> {
        let endpoint = format!("/v1/attachments/{id}");
        self.send(&endpoint, self.client.delete(self.api_url(&endpoint)))
            .await?;
        tracing::debug!(attachment = %id, "Deleted remote attachment");
        Ok(())
    }
}
