//! Client-side access to the location registry.

use std::future::Future;

use reqwest::StatusCode;

use crate::{
    location::{Location, NewLocation},
    message::{AddResponse, LOCATIONS_PATH},
};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to the registry failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("registry answered with HTTP {0}")]
    Status(StatusCode),
}

/// The two registry operations the sync controller needs.
pub trait RegistryApi {
    fn list(&self) -> impl Future<Output = Result<Vec<Location>, TransportError>> + Send;

    fn add(
        &self,
        location: &NewLocation,
    ) -> impl Future<Output = Result<AddResponse, TransportError>> + Send;
}

/// Talks to a registry server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    http: reqwest::Client,
    locations_url: String,
}

impl HttpRegistryClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            locations_url: format!("{}{LOCATIONS_PATH}", base_url.trim_end_matches('/')),
        }
    }
}

impl RegistryApi for HttpRegistryClient {
    async fn list(&self) -> Result<Vec<Location>, TransportError> {
        let response = self.http.get(&self.locations_url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn add(&self, location: &NewLocation) -> Result<AddResponse, TransportError> {
        // Rejections come back as non-2xx with a JSON body, so the body is read regardless.
        let response = self
            .http
            .post(&self.locations_url)
            .json(location)
            .send()
            .await?;
        Ok(response.json().await?)
    }
}
