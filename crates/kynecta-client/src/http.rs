//! HTTP adapters for the remote contracts.
//!
//! One [`HttpBackend`] implements both [`MessageTransport`] and
//! [`ProfileService`] against the Kynecta backend.  Errors are collapsed
//! into [`SendError`]: network-level failures and server rejections are
//! both "retry on the next drain trigger" to the caller.

use async_trait::async_trait;

use kynecta_shared::{MessagePayload, UserSnapshot};
use kynecta_sync::{MessageTransport, ProfileService, SendError};

/// Client for the Kynecta HTTP backend.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    /// Attach a bearer token obtained from the identity provider.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl MessageTransport for HttpBackend {
    async fn send(&self, payload: &MessagePayload) -> Result<(), SendError> {
        let url = format!("{}/api/v1/messages", self.base_url);

        let response = self
            .request(self.client.post(&url).json(payload))
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SendError::Rejected(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileService for HttpBackend {
    async fn fetch_profile(&self) -> Result<UserSnapshot, SendError> {
        let url = format!("{}/api/v1/profile", self.base_url);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SendError::Rejected(format!("HTTP {}", response.status())));
        }

        response
            .json::<UserSnapshot>()
            .await
            .map_err(|e| SendError::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("https://api.kynecta.app/");
        assert_eq!(backend.base_url, "https://api.kynecta.app");

        let backend = HttpBackend::new("https://api.kynecta.app");
        assert_eq!(backend.base_url, "https://api.kynecta.app");
    }
}
