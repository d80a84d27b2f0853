//! The per-device configuration change state machine.
//!
//! Given an open session and the device's dialect, the engine walks one
//! fixed sequence: optional privilege escalation, discovery of
//! configuration lines carrying a deprecated community marker, removal
//! of each line, persistence, re-addition of the rewritten lines, and a
//! final persistence. Each step returns a `Result`; the first failure
//! maps straight to a terminal outcome for that device and never
//! unwinds past it.

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::dialect::Dialect;
use crate::error::EngineError;
use crate::gateway::DeviceSession;
use crate::inventory::DeviceDescriptor;

/// The parametrized change pattern: which marker strings identify
/// deprecated community lines and what replaces them.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Deprecated read-only community marker.
    pub readonly_from: String,
    /// Its replacement.
    pub readonly_to: String,
    /// Deprecated read-write community marker.
    pub readwrite_from: String,
    /// Its replacement.
    pub readwrite_to: String,
}

impl Rotation {
    /// Create a rotation with explicit marker pairs.
    pub fn new(
        readonly_from: impl Into<String>,
        readonly_to: impl Into<String>,
        readwrite_from: impl Into<String>,
        readwrite_to: impl Into<String>,
    ) -> Self {
        Self {
            readonly_from: readonly_from.into(),
            readonly_to: readonly_to.into(),
            readwrite_from: readwrite_from.into(),
            readwrite_to: readwrite_to.into(),
        }
    }

    /// Rewrite one discovered line.
    ///
    /// Both substitutions are attempted on every line; a marker that is
    /// absent leaves the line untouched, so every other token (access
    /// lists, views) survives verbatim.
    pub fn replacement_for(&self, line: &str) -> String {
        line.replace(&self.readonly_from, &self.readonly_to)
            .replace(&self.readwrite_from, &self.readwrite_to)
    }

    fn discovery_command(marker: &str) -> String {
        format!("show running-config | include {marker}")
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new("old_snmp_ro", "NEW1RO", "old_snmp_rw", "NEW2RW")
    }
}

/// What the engine did to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeResult {
    /// No line carried a deprecated marker; nothing was touched.
    Unchanged,

    /// Lines were removed, rewritten, re-added, and persisted.
    Rotated {
        /// How many configuration lines were rewritten.
        lines: usize,
    },
}

/// Drives the change sequence against one device at a time.
pub struct ChangeEngine {
    rotation: Rotation,
}

impl ChangeEngine {
    /// Create an engine applying the given rotation.
    pub fn new(rotation: Rotation) -> Self {
        Self { rotation }
    }

    /// The rotation this engine applies.
    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    /// Run the full change sequence against an open session.
    ///
    /// The session is borrowed, not consumed: release stays with the
    /// caller so it happens on every exit path.
    ///
    /// Removal is forward-only. A failure mid-removal leaves already
    /// negated lines gone; the error is surfaced and the device is left
    /// for a re-run, never rolled back.
    pub async fn run(
        &self,
        session: &mut dyn DeviceSession,
        descriptor: &DeviceDescriptor,
        cancel: &CancellationToken,
    ) -> Result<ChangeResult, EngineError> {
        let address = descriptor.address.as_str();
        let dialect = descriptor.dialect;

        checkpoint(cancel)?;
        if dialect.requires_escalation() {
            session.escalate_privilege(&descriptor.enable_secret).await?;
            if !session.has_elevated_privilege().await? {
                warn!("{address}: privileged mode rejected");
                return Err(EngineError::EscalationRejected);
            }
            debug!("{address}: privileged mode entered");
        }

        checkpoint(cancel)?;
        let targets = self.discover(session, address).await?;
        if targets.is_empty() {
            info!("{address}: no deprecated community strings present");
            return Ok(ChangeResult::Unchanged);
        }

        checkpoint(cancel)?;
        session.enter_config_mode().await?;
        for line in &targets {
            info!("{address}: removing '{line}'");
            session.send_config_line(&format!("no {line}")).await?;
        }
        self.persist(session, dialect, address).await?;
        if dialect.reenters_config_after_persist() {
            session.enter_config_mode().await?;
        }

        checkpoint(cancel)?;
        for line in &targets {
            let replacement = self.rotation.replacement_for(line);
            info!("{address}: adding '{replacement}'");
            session.send_config_line(&replacement).await?;
        }
        self.persist(session, dialect, address).await?;
        if dialect.persists_in_config_mode() {
            session.exit_config_mode().await?;
        }

        info!("{address}: rotated {} line(s)", targets.len());
        Ok(ChangeResult::Rotated {
            lines: targets.len(),
        })
    }

    /// Query the running configuration for lines carrying either
    /// deprecated marker: read-only matches first, then read-write, each
    /// in device output order.
    ///
    /// Qualification is an exact, case-sensitive substring test with no
    /// anchoring: a line mentioning the marker anywhere qualifies.
    async fn discover(
        &self,
        session: &mut dyn DeviceSession,
        address: &str,
    ) -> Result<Vec<String>, EngineError> {
        let mut targets = Vec::new();

        for marker in [
            self.rotation.readonly_from.as_str(),
            self.rotation.readwrite_from.as_str(),
        ] {
            let output = session
                .send_command(&Rotation::discovery_command(marker))
                .await?;
            for line in output.lines() {
                let line = line.trim();
                if !line.is_empty() && line.contains(marker) {
                    debug!("{address}: discovered '{line}'");
                    targets.push(line.to_string());
                }
            }
        }

        Ok(targets)
    }

    async fn persist(
        &self,
        session: &mut dyn DeviceSession,
        dialect: Dialect,
        address: &str,
    ) -> Result<(), EngineError> {
        info!(
            "{address}: persisting configuration ('{}')",
            dialect.persist_command()
        );
        if dialect.persists_in_config_mode() {
            session.send_config_line(dialect.persist_command()).await?;
        } else {
            session.exit_config_mode().await?;
            session.send_command(dialect.persist_command()).await?;
        }
        Ok(())
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), EngineError> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}
