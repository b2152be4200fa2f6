//! HTTP client that routes every call through the credential middleware.

use std::sync::Arc;

use reqwest::{Method, Request, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use portal_core::RequestId;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::middleware::CredentialMiddleware;

/// API client for the portal backend.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    middleware: CredentialMiddleware,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        middleware: CredentialMiddleware,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self {
            http,
            config,
            middleware,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn middleware(&self) -> &CredentialMiddleware {
        &self.middleware
    }

    /// Start a request for an API path relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, self.config.url(path))
    }

    /// Send a request: attach credential, send, check for 401, then require a
    /// success status.
    #[instrument(
        skip(self, request),
        fields(
            request_id = %RequestId::new(),
            method = %request.method(),
            path = %request.url().path()
        ),
        err
    )]
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let request = self.middleware.attach_credential(request);
        let response = self.http.execute(request).await?;
        let response = self.middleware.detect_unauthorized(response)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), body));
        }
        tracing::debug!("request succeeded with {status}");
        Ok(response)
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let request = self.request(Method::GET, path).build()?;
        let response = self.execute(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET an already-built absolute URL.
    pub async fn get_bytes_at(&self, url: Url) -> Result<Vec<u8>, ClientError> {
        let request = self.http.get(url).build()?;
        let response = self.execute(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.request(Method::GET, path).build()?;
        decode(self.execute(request).await?).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body).build()?;
        decode(self.execute(request).await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
}

/// Shared handle.
pub type SharedClient = Arc<ApiClient>;
