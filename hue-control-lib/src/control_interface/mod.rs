use std::time::Duration;

use derivative::Derivative;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::{Map, Value};

use crate::light::light_ref::LightRef;
use crate::light::light_state::LightStateUpdate;
use crate::util::error::HubError;

pub mod response;

pub use response::{classify_response, HubResponse};

/// Default time a single request may take, connection setup included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the hub lives and which access token to present.
///
/// The token is issued by the hub during pairing and never changes afterwards; it is kept out
/// of `Debug` output.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct HubSession {
    pub hub_address: String,
    #[derivative(Debug = "ignore")]
    access_token: Option<String>,
}

impl HubSession {
    /// A session that can only pair.
    pub fn unpaired(hub_address: impl Into<String>) -> Self {
        HubSession {
            hub_address: hub_address.into(),
            access_token: None,
        }
    }

    pub fn new(hub_address: impl Into<String>, access_token: impl Into<String>) -> Self {
        HubSession {
            hub_address: hub_address.into(),
            access_token: Some(access_token.into()),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Base URL of the API. Addresses without a scheme are reached over plain HTTP.
    fn api_base(&self) -> String {
        let address = self.hub_address.trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{}/api/", address)
        } else {
            format!("http://{}/api/", address)
        }
    }
}

/// Executes authenticated requests against the hub and classifies what comes back.
///
/// Calls are never retried here; callers decide what a failure means for them.
#[derive(Debug, Clone)]
pub struct HubClient {
    session: HubSession,
    client: Client,
}

impl HubClient {
    pub fn new(session: HubSession) -> Result<Self, HubError> {
        HubClient::with_timeout(session, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(session: HubSession, timeout: Duration) -> Result<Self, HubError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HubClient { session, client })
    }

    pub fn session(&self) -> &HubSession {
        &self.session
    }

    /// Builds `<base>/api/<token>/<path>`, with leading slashes of `path` removed.
    pub fn resource_url(&self, path: &str) -> Result<String, HubError> {
        let token = self.session.access_token().ok_or(HubError::NotPaired)?;
        Ok(format!(
            "{}{}/{}",
            self.session.api_base(),
            token,
            path.trim_start_matches('/')
        ))
    }

    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HubResponse, HubError> {
        let url = self.resource_url(path)?;
        self.send(method, &url, body).await
    }

    /// Posts to the unauthenticated registration endpoint `POST /api/`.
    pub async fn register(&self, body: &Value) -> Result<HubResponse, HubError> {
        let url = self.session.api_base();
        self.send(Method::POST, &url, Some(body)).await
    }

    /// `url` with the access token segment masked, for logging.
    fn redact(&self, url: &str) -> String {
        match self.session.access_token() {
            Some(token) if !token.is_empty() => {
                url.replace(&format!("/api/{}", token), "/api/<token>")
            }
            _ => url.to_string(),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<HubResponse, HubError> {
        debug!("{} {}", method, self.redact(url));
        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            debug!("  data={}", body);
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let classified = classify_response(&text)?;

        if !status.is_success() {
            return Err(HubError::MalformedResponse(format!(
                "unexpected status {} with body {}",
                status, text
            )));
        }
        Ok(classified)
    }

    /// `GET lights`: metadata for every light, keyed by light id.
    pub async fn get_lights(&self) -> Result<Map<String, Value>, HubError> {
        self.execute(Method::GET, "lights", None)
            .await?
            .into_resource()
    }

    /// `GET sensors/<id>`.
    pub async fn get_sensor(&self, sensor_id: &str) -> Result<Map<String, Value>, HubError> {
        self.execute(Method::GET, &format!("sensors/{}", sensor_id), None)
            .await?
            .into_resource()
    }

    /// `PUT lights/<id>/state` with a single field, forcing the light on.
    pub async fn set_light_state(
        &self,
        light: &LightRef,
        update: LightStateUpdate,
    ) -> Result<Vec<Value>, HubError> {
        self.execute(
            Method::PUT,
            &format!("lights/{}/state", light),
            Some(&update.to_body()),
        )
        .await?
        .into_success()
    }
}
