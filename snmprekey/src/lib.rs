//! # snmprekey
//!
//! Concurrent rotation of SNMP community strings across a fleet of
//! network devices.
//!
//! Deprecated community strings are discovered in each device's running
//! configuration, removed, and re-added with their replacement tokens,
//! preserving every other token on the line so existing access-list and
//! view qualifiers survive the rename. Devices are handled
//! concurrently under a bounded session cap, and one device's failure
//! never aborts the rest of the fleet.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, scraped with prompt-pattern matching
//! - Two device families (classic IOS and IOS XR) with their differing
//!   escalation and persistence conventions
//! - Reachability gating ahead of session setup
//! - One typed outcome per device, aggregated in input order
//! - Cooperative cancellation that still releases every open session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use snmprekey::{FleetOrchestrator, PingProbe, Rotation, SshGateway};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmprekey::Error> {
//!     let devices = snmprekey::inventory::load(Path::new("devices.txt"))?;
//!
//!     let orchestrator = FleetOrchestrator::new(
//!         Arc::new(PingProbe::default()),
//!         Arc::new(SshGateway::default()),
//!         Rotation::default(),
//!     );
//!
//!     let report = orchestrator.run(devices, CancellationToken::new()).await;
//!     print!("{}", report.render());
//!     Ok(())
//! }
//! ```

pub mod dialect;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod orchestrator;
pub mod outcome;
pub mod probe;

#[cfg(test)]
pub(crate) mod testkit;

// Re-export main types for convenience
pub use dialect::{Dialect, PromptSet};
pub use engine::{ChangeEngine, ChangeResult, Rotation};
pub use error::{EngineError, Error, InventoryError, SessionError};
pub use gateway::{DeviceSession, SessionGateway, SshGateway};
pub use inventory::DeviceDescriptor;
pub use orchestrator::{DEFAULT_MAX_SESSIONS, FleetOrchestrator};
pub use outcome::{FleetReport, Outcome, Status};
pub use probe::{PingProbe, ReachabilityProbe};
