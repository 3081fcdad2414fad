//! Home-automation hub access.
//!
//! The synchronizer only talks to the [`Hub`] and [`EventSubscription`] traits;
//! [`HomeAssistant`] is the production implementation.

mod home_assistant;
#[cfg(test)]
pub(crate) mod mock;
mod protocol;
mod sse;

use async_trait::async_trait;

pub use home_assistant::HomeAssistant;
pub use home_assistant::HomeAssistantSubscription;
pub use sse::SseDecoder;

/// Event type carrying entity state changes.
pub const STATE_CHANGED: &str = "state_changed";

/// Entity namespace of numeric sensors.
pub const SENSOR_DOMAIN: &str = "sensor";

/// Current state of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    pub entity_id: String,
    pub raw_value: String,
}

impl SensorReading {
    pub fn new(entity_id: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// A notification pulled from an event subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEvent {
    pub event_type: String,
    pub entity_id: String,
    /// `None` when the entity was removed.
    pub new_state: Option<String>,
}

impl HubEvent {
    pub fn state_changed(entity_id: impl Into<String>, new_state: impl Into<String>) -> Self {
        Self {
            event_type: STATE_CHANGED.to_string(),
            entity_id: entity_id.into(),
            new_state: Some(new_state.into()),
        }
    }
}

/// Text before the first `.` of an entity id, or the whole id if it has none.
pub fn namespace(entity_id: &str) -> &str {
    entity_id
        .split_once('.')
        .map_or(entity_id, |(namespace, _)| namespace)
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("invalid hub URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid access token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("API is not running: {0:?}")]
    ApiNotRunning(String),

    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("event stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("event stream closed by the hub")]
    StreamClosed,
}

/// Snapshot and subscription access to a hub.
#[async_trait]
pub trait Hub: Send + Sync {
    type Subscription: EventSubscription;

    /// Probe connectivity and credentials.
    async fn check_api(&self) -> Result<(), HubError>;

    /// Current state of every entity in the `domain` namespace.
    async fn filter_states(&self, domain: &str) -> Result<Vec<SensorReading>, HubError>;

    /// Open a live feed of hub events.
    async fn listen_events(&self) -> Result<Self::Subscription, HubError>;
}

/// A live, non-restartable sequence of hub events.
#[async_trait]
pub trait EventSubscription: Send {
    /// Wait for the next event.
    ///
    /// Blocks until an event arrives or the connection fails; once this
    /// returns an error the subscription is finished.
    async fn next_state_changed(&mut self) -> Result<HubEvent, HubError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), HubError>;
}
