//! Per-device terminal outcomes and fleet reporting.

use std::fmt;

use serde::Serialize;

use crate::engine::ChangeResult;
use crate::error::{EngineError, SessionError};

/// Terminal status for one device. Exactly one is produced per device
/// per run; `NoChangeNeeded` and `Changed` are the two non-failure
/// terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unreachable,
    AuthFailed,
    Timeout,
    EscalationFailed,
    CommandFailed,
    NoChangeNeeded,
    Changed,
    Cancelled,
    Error,
}

impl Status {
    /// Whether the device still needs attention after this run.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Status::Changed | Status::NoChangeNeeded)
    }

    /// Fixed-width label used in the plain report.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Unreachable => "unreachable",
            Status::AuthFailed => "auth-failed",
            Status::Timeout => "timeout",
            Status::EscalationFailed => "escalation-failed",
            Status::CommandFailed => "command-failed",
            Status::NoChangeNeeded => "no-change-needed",
            Status::Changed => "changed",
            Status::Cancelled => "cancelled",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One terminal result attached to one device for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Management address the result belongs to.
    pub address: String,

    /// Terminal status.
    pub status: Status,

    /// Human-readable detail.
    pub message: String,
}

impl Outcome {
    /// Create an outcome from parts.
    pub fn new(address: &str, status: Status, message: impl Into<String>) -> Self {
        Self {
            address: address.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn unreachable(address: &str) -> Self {
        Self::new(address, Status::Unreachable, "device is not reachable")
    }

    pub fn cancelled(address: &str) -> Self {
        Self::new(address, Status::Cancelled, "run cancelled before completion")
    }

    pub fn error(address: &str, detail: impl Into<String>) -> Self {
        Self::new(address, Status::Error, detail)
    }

    /// Classify a failed connection attempt.
    pub fn from_connect_error(address: &str, err: &SessionError) -> Self {
        let status = match err {
            SessionError::AuthenticationFailed { .. } => Status::AuthFailed,
            SessionError::Timeout(_) => Status::Timeout,
            _ => Status::Error,
        };
        Self::new(address, status, err.to_string())
    }

    /// Classify the engine's terminal result for a device.
    pub fn from_engine(address: &str, result: Result<ChangeResult, EngineError>) -> Self {
        match result {
            Ok(ChangeResult::Rotated { lines }) => Self::new(
                address,
                Status::Changed,
                format!("configuration modified and saved ({lines} line(s))"),
            ),
            Ok(ChangeResult::Unchanged) => Self::new(
                address,
                Status::NoChangeNeeded,
                "no deprecated community strings found",
            ),
            Err(EngineError::EscalationRejected) => Self::new(
                address,
                Status::EscalationFailed,
                "failed to enter privileged mode",
            ),
            Err(EngineError::Cancelled) => Self::cancelled(address),
            Err(EngineError::Session(err)) => {
                let status = match &err {
                    SessionError::Timeout(_) => Status::Timeout,
                    SessionError::CommandRejected { .. } => Status::CommandFailed,
                    SessionError::AuthenticationFailed { .. } => Status::AuthFailed,
                    _ => Status::Error,
                };
                Self::new(address, status, err.to_string())
            }
        }
    }
}

/// Aggregated fleet report, one entry per device in input order.
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub outcomes: Vec<Outcome>,
}

impl FleetReport {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    pub fn changed(&self) -> usize {
        self.count(Status::Changed)
    }

    pub fn unchanged(&self) -> usize {
        self.count(Status::NoChangeNeeded)
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_failure())
            .count()
    }

    fn count(&self, status: Status) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    /// Plain listing: one line per device plus a summary line.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for outcome in &self.outcomes {
            text.push_str(&format!(
                "{:<20} {:<18} {}\n",
                outcome.address,
                outcome.status.label(),
                outcome.message
            ));
        }
        text.push_str(&format!(
            "{} changed, {} unchanged, {} failed\n",
            self.changed(),
            self.unchanged(),
            self.failed()
        ));
        text
    }
}
