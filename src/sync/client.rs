use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Request, RequestBuilder, StatusCode, Url};
use tracing::{debug, instrument};

use crate::error::SyncError;

use super::types::*;

const PINNED_LOCATIONS_PATH: &str = "api/v1/pinned_locations";
const USER_AGENT: &str = concat!("pinmap/", env!("CARGO_PKG_VERSION"));

/// Persistence operations the sync adapter needs
pub trait PinBackend: Clone + Send + Sync + 'static {
    fn create_pin(&self, pin: NewPin) -> impl Future<Output = Result<Pin, SyncError>> + Send;

    fn delete_pin(&self, id: PinId) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// REST client for the pinned-locations resource
#[derive(Clone)]
pub struct PinClient {
    client: Client,
    base_url: Url,
    credential: Option<Credential>,
}

impl PinClient {
    pub fn new(
        base_url: &str,
        credential: Option<Credential>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        // Url::join drops the last segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| SyncError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            credential,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::InvalidUrl(e.to_string()))
    }

    /// Attach JSON negotiation and bearer headers
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        match &self.credential {
            Some(credential) => builder.bearer_auth(credential.token()),
            None => builder,
        }
    }

    pub fn create_request(&self, pin: &NewPin) -> Result<Request, SyncError> {
        let url = self.endpoint(PINNED_LOCATIONS_PATH)?;
        Ok(self.authorized(self.client.post(url)).json(pin).build()?)
    }

    pub fn delete_request(&self, id: PinId) -> Result<Request, SyncError> {
        let url = self.endpoint(&format!("{}/{}", PINNED_LOCATIONS_PATH, id))?;
        Ok(self.authorized(self.client.delete(url)).build()?)
    }

    #[instrument(skip(self, pin), fields(country = %pin.country))]
    async fn send_create(&self, pin: NewPin) -> Result<Pin, SyncError> {
        let request = self.create_request(&pin)?;
        let response = self.client.execute(request).await?;

        if !response.status().is_success() {
            return Err(SyncError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        let created: Pin = serde_json::from_slice(&body)?;
        debug!(id = created.id, "Pin created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn send_delete(&self, id: PinId) -> Result<(), SyncError> {
        let request = self.delete_request(id)?;
        let response = self.client.execute(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Pin already gone on server");
            return Ok(());
        }
        if !status.is_success() {
            return Err(SyncError::HttpStatus(status));
        }

        debug!("Pin deleted");
        Ok(())
    }
}

impl PinBackend for PinClient {
    fn create_pin(&self, pin: NewPin) -> impl Future<Output = Result<Pin, SyncError>> + Send {
        self.send_create(pin)
    }

    fn delete_pin(&self, id: PinId) -> impl Future<Output = Result<(), SyncError>> + Send {
        self.send_delete(id)
    }
}
