use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use strum::Display;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::hub::Hub;
use crate::render::Surface;
use crate::sync::Synchronizer;

/// Fixed wait between synchronization attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Where the supervisor loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Init,
    SyncingSnapshot,
    Streaming,
    RetryWait,
}

/// Drives a [`Synchronizer`] forever, restarting it after every failure.
pub struct Supervisor<H: Hub, S> {
    sync: Synchronizer<H, S>,
    backoff: Duration,
    phase: Phase,
}

impl<H: Hub, S: Surface> Supervisor<H, S> {
    pub fn new(sync: Synchronizer<H, S>) -> Self {
        Self {
            sync,
            backoff: RETRY_BACKOFF,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn synchronizer(&self) -> &Synchronizer<H, S> {
        &self.sync
    }

    /// Run until the process is killed.
    pub async fn run(&mut self) -> Infallible {
        let mut first = true;
        loop {
            if !first {
                self.enter(Phase::RetryWait);
                tokio::time::sleep(self.backoff).await;
            }
            first = false;

            self.enter(Phase::SyncingSnapshot);
            if let Err(e) = self.sync.sync_snapshot().await {
                error!("Could not sync states: {}", e);
                continue;
            }

            self.enter(Phase::Streaming);
            if let Err(e) = self.sync.sync_stream().await {
                error!("Could not listen to states: {}", e);
            }
        }
    }

    /// Run until `shutdown` resolves, then close any open subscription.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::select! {
            never = self.run() => match never {},
            () = shutdown => info!("Supervisor stopping"),
        }
        self.sync.close_subscription().await;
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Supervisor phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}
