//! Home Assistant REST and event-stream payloads.

use serde::Deserialize;

use super::HubEvent;
use super::SensorReading;
use super::STATE_CHANGED;

/// Body of `GET /api/` when the API is up.
pub const API_RUNNING: &str = "API running.";

/// Response of `GET /api/`.
#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    pub message: String,
}

/// One entry of `GET /api/states`.
#[derive(Debug, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
}

impl From<EntityState> for SensorReading {
    fn from(state: EntityState) -> Self {
        SensorReading {
            entity_id: state.entity_id,
            raw_value: state.state,
        }
    }
}

/// One `data:` payload of `GET /api/stream`.
///
/// `data` is schemaless across event types and is only interpreted for
/// `state_changed`.
#[derive(Debug, Deserialize)]
pub struct StreamEvent {
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Data of a `state_changed` event.
#[derive(Debug, Default, Deserialize)]
pub struct StateChangedData {
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub new_state: Option<NewState>,
}

#[derive(Debug, Deserialize)]
pub struct NewState {
    pub state: String,
}

impl TryFrom<StreamEvent> for HubEvent {
    type Error = serde_json::Error;

    fn try_from(event: StreamEvent) -> Result<Self, Self::Error> {
        if event.event_type != STATE_CHANGED {
            return Ok(HubEvent {
                event_type: event.event_type,
                entity_id: String::new(),
                new_state: None,
            });
        }

        let data: StateChangedData = serde_json::from_value(event.data)?;
        Ok(HubEvent {
            event_type: event.event_type,
            entity_id: data.entity_id,
            new_state: data.new_state.map(|s| s.state),
        })
    }
}

/// Decode one stream payload.
pub fn parse_stream_event(payload: &str) -> Result<HubEvent, serde_json::Error> {
    serde_json::from_str::<StreamEvent>(payload)?.try_into()
}
