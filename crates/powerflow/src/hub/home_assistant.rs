use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use reqwest::Response;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::info;

use super::namespace;
use super::protocol::ApiStatus;
use super::protocol::EntityState;
use super::protocol::parse_stream_event;
use super::protocol::API_RUNNING;
use super::sse::SseDecoder;
use super::EventSubscription;
use super::Hub;
use super::HubError;
use super::HubEvent;
use super::SensorReading;

/// Timeout for REST calls. The event stream has none.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Home Assistant REST API client.
pub struct HomeAssistant {
    client: Client,
    base_url: Url,
}

impl HomeAssistant {
    /// Build a client for `url` authenticating with a long-lived access token.
    pub fn try_new(url: &str, token: &str) -> Result<Self, HubError> {
        let base_url = parse_base_url(url)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);
        let headers = HeaderMap::from_iter([(AUTHORIZATION, auth)]);

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| HubError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, HubError> {
        self.base_url.join(path).map_err(|e| HubError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HubError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url.clone())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|source| HubError::Http {
                url: url.to_string(),
                source,
            })?;
        let response = check_status(&url, response)?;

        response.json().await.map_err(|source| HubError::Http {
            url: url.to_string(),
            source,
        })
    }
}

/// Parse the configured URL so that relative API paths join under it.
fn parse_base_url(url: &str) -> Result<Url, HubError> {
    let invalid = |reason: String| HubError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let mut base = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", base.scheme())));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn check_status(url: &Url, response: Response) -> Result<Response, HubError> {
    response.error_for_status().map_err(|source| match source.status() {
        Some(status) => HubError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        },
        None => HubError::Http {
            url: url.to_string(),
            source,
        },
    })
}

#[async_trait]
impl Hub for HomeAssistant {
    type Subscription = HomeAssistantSubscription;

    async fn check_api(&self) -> Result<(), HubError> {
        let status: ApiStatus = self.get_json("api/").await?;
        if status.message != API_RUNNING {
            return Err(HubError::ApiNotRunning(status.message));
        }
        info!("Connected to Home Assistant at {}", self.base_url);
        Ok(())
    }

    async fn filter_states(&self, domain: &str) -> Result<Vec<SensorReading>, HubError> {
        let states: Vec<EntityState> = self.get_json("api/states").await?;
        let readings: Vec<SensorReading> = states
            .into_iter()
            .filter(|s| namespace(&s.entity_id) == domain)
            .map(SensorReading::from)
            .collect();
        debug!("Fetched {} {} states", readings.len(), domain);
        Ok(readings)
    }

    async fn listen_events(&self) -> Result<Self::Subscription, HubError> {
        let url = self.endpoint("api/stream")?;
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| HubError::Http {
                url: url.to_string(),
                source,
            })?;
        let response = check_status(&url, response)?;
        debug!("Opened event stream at {}", url);

        Ok(HomeAssistantSubscription {
            url,
            response: Some(response),
            decoder: SseDecoder::new(),
        })
    }
}

/// Server-sent event subscription to `/api/stream`.
///
/// Dropping the subscription also releases the connection.
pub struct HomeAssistantSubscription {
    url: Url,
    response: Option<Response>,
    decoder: SseDecoder,
}

#[async_trait]
impl EventSubscription for HomeAssistantSubscription {
    async fn next_state_changed(&mut self) -> Result<HubEvent, HubError> {
        loop {
            if let Some(data) = self.decoder.next_data() {
                return Ok(parse_stream_event(&data)?);
            }

            let response = self.response.as_mut().ok_or(HubError::StreamClosed)?;
            let chunk = response.chunk().await.map_err(|source| HubError::Http {
                url: self.url.to_string(),
                source,
            })?;
            match chunk {
                Some(bytes) => self.decoder.push(&bytes)?,
                None => {
                    self.response = None;
                    return Err(HubError::StreamClosed);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), HubError> {
        if self.response.take().is_some() {
            debug!("Closed event stream at {}", self.url);
        }
        Ok(())
    }
}
