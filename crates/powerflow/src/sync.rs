use std::convert::Infallible;

use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::hub::namespace;
use crate::hub::EventSubscription;
use crate::hub::Hub;
use crate::hub::HubError;
use crate::hub::SENSOR_DOMAIN;
use crate::hub::STATE_CHANGED;
use crate::render::Surface;
use crate::translate::Translator;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("getting states: {0}")]
    Snapshot(#[source] HubError),

    #[error("calling listen: {0}")]
    Listen(#[source] HubError),

    #[error("listening for event: {0}")]
    Stream(#[source] HubError),
}

/// Keeps a render surface consistent with the hub's sensor states.
pub struct Synchronizer<H: Hub, S> {
    hub: H,
    surface: S,
    translator: Translator,
    subscription: Option<H::Subscription>,
}

impl<H: Hub, S: Surface> Synchronizer<H, S> {
    pub fn new(hub: H, surface: S, translator: Translator) -> Self {
        Self {
            hub,
            surface,
            translator,
            subscription: None,
        }
    }

    pub fn hub(&self) -> &H {
        &self.hub
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Render the current state of every sensor.
    ///
    /// Returns the number of readings that changed the display. Updates
    /// applied before a failure are kept.
    pub async fn sync_snapshot(&mut self) -> Result<usize, SyncError> {
        let readings = self
            .hub
            .filter_states(SENSOR_DOMAIN)
            .await
            .map_err(SyncError::Snapshot)?;

        let total = readings.len();
        let rendered = readings
            .iter()
            .filter(|r| self.apply(&r.entity_id, &r.raw_value) > 0)
            .count();
        info!("Synced {} of {} sensor states", rendered, total);
        Ok(rendered)
    }

    /// Render state changes as they arrive.
    ///
    /// Only returns once the subscription fails or is closed by the hub. The
    /// subscription is closed before the error is returned. If this future is
    /// dropped instead, the subscription stays open until
    /// [`close_subscription`](Self::close_subscription).
    pub async fn sync_stream(&mut self) -> Result<Infallible, SyncError> {
        self.close_subscription().await;
        let subscription = self.hub.listen_events().await.map_err(SyncError::Listen)?;
        self.subscription = Some(subscription);
        info!("Listening for state changes");

        let err = self.consume().await;

        self.close_subscription().await;
        Err(SyncError::Stream(err))
    }

    /// Close the active subscription, if any.
    pub async fn close_subscription(&mut self) {
        let Some(mut subscription) = self.subscription.take() else {
            return;
        };
        if let Err(e) = subscription.close().await {
            debug!("Failed to close event subscription: {}", e);
        }
    }

    async fn consume(&mut self) -> HubError {
        loop {
            let Some(subscription) = self.subscription.as_mut() else {
                return HubError::StreamClosed;
            };
            let event = match subscription.next_state_changed().await {
                Ok(event) => event,
                Err(e) => return e,
            };

            if event.event_type != STATE_CHANGED {
                continue;
            }
            if namespace(&event.entity_id) != SENSOR_DOMAIN {
                continue;
            }
            let Some(new_state) = event.new_state else {
                trace!("Ignoring removal of {}", event.entity_id);
                continue;
            };

            self.apply(&event.entity_id, &new_state);
        }
    }

    /// Translate one reading and apply it; returns the number of mutations made.
    fn apply(&mut self, entity_id: &str, raw: &str) -> usize {
        let updates = self.translator.translate(entity_id, raw);
        if updates.is_empty() {
            return 0;
        }

        let mut applied = 0;
        for update in &updates {
            if update.apply(&mut self.surface) {
                applied += 1;
            } else {
                trace!("No element matches {:?}", update.selector);
            }
        }
        self.surface.present();

        debug!(
            "Rendered {} = {:?} ({}/{} updates)",
            entity_id,
            raw,
            applied,
            updates.len()
        );
        applied
    }
}
