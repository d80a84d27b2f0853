//! Fleet-wide fan-out with bounded concurrency and failure isolation.
//!
//! One worker per device, gated by a semaphore so fleet size never
//! dictates how many sessions are open at once. Workers share nothing
//! mutable: each owns its descriptor clone and its session, and reports
//! back exactly one [`Outcome`]. A worker's failure, including a panic,
//! never aborts its siblings.

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::{ChangeEngine, Rotation};
use crate::error::EngineError;
use crate::gateway::SessionGateway;
use crate::inventory::DeviceDescriptor;
use crate::outcome::{FleetReport, Outcome};
use crate::probe::ReachabilityProbe;

/// Default cap on concurrently open device sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 16;

/// Runs the change across a whole fleet.
pub struct FleetOrchestrator {
    probe: Arc<dyn ReachabilityProbe>,
    gateway: Arc<dyn SessionGateway>,
    engine: Arc<ChangeEngine>,
    max_sessions: usize,
}

impl FleetOrchestrator {
    /// Create an orchestrator from its collaborators.
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        gateway: Arc<dyn SessionGateway>,
        rotation: Rotation,
    ) -> Self {
        Self {
            probe,
            gateway,
            engine: Arc::new(ChangeEngine::new(rotation)),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Cap the number of concurrently open device sessions.
    pub fn with_max_sessions(mut self, limit: usize) -> Self {
        self.max_sessions = limit.max(1);
        self
    }

    /// Run the change across the fleet: one outcome per descriptor, in
    /// input order, produced after every worker has reached a terminal
    /// state.
    ///
    /// Cancelling `cancel` prompts in-flight workers to abandon further
    /// steps; they still release their session before reporting.
    pub async fn run(
        &self,
        descriptors: Vec<DeviceDescriptor>,
        cancel: CancellationToken,
    ) -> FleetReport {
        info!(
            "starting rotation across {} device(s), {} session(s) max",
            descriptors.len(),
            self.max_sessions
        );

        let permits = Arc::new(Semaphore::new(self.max_sessions));
        let mut handles: Vec<(String, JoinHandle<Outcome>)> =
            Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let probe = Arc::clone(&self.probe);
            let gateway = Arc::clone(&self.gateway);
            let engine = Arc::clone(&self.engine);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            let address = descriptor.address.clone();

            let handle = tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Outcome::cancelled(&descriptor.address),
                };
                rotate_device(&*probe, &*gateway, &engine, &descriptor, &cancel).await
            });
            handles.push((address, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (address, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(fault) => {
                    error!("{address}: worker aborted: {fault}");
                    outcomes.push(Outcome::error(&address, format!("worker aborted: {fault}")));
                }
            }
        }

        let report = FleetReport::new(outcomes);
        info!(
            "rotation finished: {} changed, {} unchanged, {} failed",
            report.changed(),
            report.unchanged(),
            report.failed()
        );
        report
    }
}

/// The full sequence for one device. Every fault is captured here and
/// converted to an [`Outcome`]; nothing propagates past this boundary.
async fn rotate_device(
    probe: &dyn ReachabilityProbe,
    gateway: &dyn SessionGateway,
    engine: &ChangeEngine,
    descriptor: &DeviceDescriptor,
    cancel: &CancellationToken,
) -> Outcome {
    let address = descriptor.address.as_str();

    if cancel.is_cancelled() {
        return Outcome::cancelled(address);
    }

    if !probe.is_reachable(address).await {
        warn!("{address}: not reachable, skipping");
        return Outcome::unreachable(address);
    }

    if cancel.is_cancelled() {
        return Outcome::cancelled(address);
    }

    info!("{address}: connecting");
    let mut session = match gateway.connect(descriptor).await {
        Ok(session) => session,
        Err(err) => {
            error!("{address}: connect failed: {err}");
            return Outcome::from_connect_error(address, &err);
        }
    };

    let result = engine.run(session.as_mut(), descriptor, cancel).await;
    if let Err(err) = &result {
        if !matches!(err, EngineError::Cancelled) {
            error!("{address}: {err}");
        }
    }

    // Release happens on every path, including engine failure.
    if let Err(err) = session.disconnect().await {
        warn!("{address}: disconnect failed: {err}");
    }

    Outcome::from_engine(address, result)
}
