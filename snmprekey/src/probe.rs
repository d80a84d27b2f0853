//! Reachability probing ahead of session setup.
//!
//! An SSH handshake against a dead address burns a full connect timeout;
//! an ICMP echo answers in milliseconds. The orchestrator probes first
//! and skips session setup entirely for unreachable devices.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

/// Liveness check against an address before attempting a session.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the address answers. Never fails: every transport-level
    /// fault (timeout, unresolvable, permission) maps to `false`.
    async fn is_reachable(&self, address: &str) -> bool;
}

/// ICMP echo probe shelling out to the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProbe {
    attempts: u32,
    reply_timeout: Duration,
}

impl PingProbe {
    /// Create a probe sending `attempts` echoes, each waiting up to
    /// `reply_timeout` for an answer.
    pub fn new(attempts: u32, reply_timeout: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            reply_timeout,
        }
    }

    fn overall_timeout(&self) -> Duration {
        self.reply_timeout * self.attempts + Duration::from_secs(1)
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(5))
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        let mut command = Command::new("ping");
        command
            .arg("-c")
            .arg(self.attempts.to_string())
            .arg("-W")
            .arg(self.reply_timeout.as_secs().max(1).to_string())
            .arg(address)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match tokio::time::timeout(self.overall_timeout(), command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(err)) => {
                error!("ping probe for {address} could not run: {err}");
                false
            }
            Err(_) => {
                debug!("ping probe for {address} exceeded its overall timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unresolvable_address_is_unreachable() {
        let probe = PingProbe::new(1, Duration::from_secs(1));
        assert!(!probe.is_reachable("host.invalid").await);
    }
}
