use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::namespace;
use super::EventSubscription;
use super::Hub;
use super::HubError;
use super::HubEvent;
use super::SensorReading;

/// Scripted subscription contents: events in order, then `StreamClosed`
/// unless the hub is held open.
pub type ScriptedEvents = Vec<Result<HubEvent, HubError>>;

/// Recorded calls and scripted responses shared by a [`MockHub`] and its subscriptions.
#[derive(Debug, Default)]
pub struct MockState {
    pub api_down: bool,
    pub snapshots: VecDeque<Result<Vec<SensorReading>, HubError>>,
    pub subscriptions: VecDeque<Result<ScriptedEvents, HubError>>,
    pub snapshot_calls: Vec<Instant>,
    pub listen_calls: usize,
    /// Exhausted subscriptions wait forever instead of ending.
    pub hold_open: bool,
    pub closed: usize,
}

/// Mock hub for testing
///
/// Unscripted snapshots are empty and unscripted subscriptions end immediately.
#[derive(Debug, Clone, Default)]
pub struct MockHub {
    pub state: Arc<Mutex<MockState>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_snapshot(&self, snapshot: Result<Vec<SensorReading>, HubError>) {
        self.state.lock().unwrap().snapshots.push_back(snapshot);
    }

    pub fn push_subscription(&self, events: Result<ScriptedEvents, HubError>) {
        self.state.lock().unwrap().subscriptions.push_back(events);
    }

    pub fn hold_open(&self) {
        self.state.lock().unwrap().hold_open = true;
    }

    pub fn snapshot_calls(&self) -> Vec<Instant> {
        self.state.lock().unwrap().snapshot_calls.clone()
    }

    pub fn listen_calls(&self) -> usize {
        self.state.lock().unwrap().listen_calls
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl Hub for MockHub {
    type Subscription = MockSubscription;

    async fn check_api(&self) -> Result<(), HubError> {
        if self.state.lock().unwrap().api_down {
            return Err(HubError::ApiNotRunning("down".to_string()));
        }
        Ok(())
    }

    async fn filter_states(&self, domain: &str) -> Result<Vec<SensorReading>, HubError> {
        let mut state = self.state.lock().unwrap();
        state.snapshot_calls.push(Instant::now());
        let readings = state.snapshots.pop_front().unwrap_or(Ok(Vec::new()))?;
        Ok(readings
            .into_iter()
            .filter(|r| namespace(&r.entity_id) == domain)
            .collect())
    }

    async fn listen_events(&self) -> Result<MockSubscription, HubError> {
        let mut state = self.state.lock().unwrap();
        state.listen_calls += 1;
        let events = state.subscriptions.pop_front().unwrap_or(Ok(Vec::new()))?;
        Ok(MockSubscription {
            events: events.into(),
            state: self.state.clone(),
        })
    }
}

pub struct MockSubscription {
    events: VecDeque<Result<HubEvent, HubError>>,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl EventSubscription for MockSubscription {
    async fn next_state_changed(&mut self) -> Result<HubEvent, HubError> {
        if let Some(event) = self.events.pop_front() {
            return event;
        }
        let hold_open = self.state.lock().unwrap().hold_open;
        if hold_open {
            std::future::pending::<()>().await;
        }
        Err(HubError::StreamClosed)
    }

    async fn close(&mut self) -> Result<(), HubError> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_api_reports_outage() {
        let hub = MockHub::new();
        assert!(hub.check_api().await.is_ok());

        hub.state.lock().unwrap().api_down = true;
        assert!(matches!(
            hub.check_api().await,
            Err(HubError::ApiNotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_filter_states_by_domain() {
        let hub = MockHub::new();
        hub.push_snapshot(Ok(vec![
            SensorReading::new("sensor.pv", "100"),
            SensorReading::new("switch.pump", "on"),
        ]));

        let readings = hub.filter_states("sensor").await.unwrap();
        assert_eq!(readings, vec![SensorReading::new("sensor.pv", "100")]);
        assert_eq!(hub.snapshot_calls().len(), 1);
    }
}
