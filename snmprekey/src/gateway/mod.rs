//! Session gateway: connect, authenticate, and execute commands against
//! a remote device.
//!
//! The gateway layer hides transport mechanics behind two seams. A
//! [`SessionGateway`] turns a descriptor into a live [`DeviceSession`];
//! the session exposes the handful of operations the change engine
//! needs. Both are traits so tests can substitute recording fakes.

mod buffer;
mod ssh;

pub use buffer::OutputBuffer;
pub use ssh::SshGateway;

use async_trait::async_trait;

use crate::error::SessionError;
use crate::inventory::DeviceDescriptor;

/// A live authenticated channel to one device.
///
/// A session is owned exclusively by the worker handling that device
/// and must be released via [`disconnect`](DeviceSession::disconnect) on
/// every exit path (success, business failure, or fault). Pool sizing
/// assumes one open session per in-flight device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Execute a read-only command and return its output.
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError>;

    /// Enter configuration mode.
    async fn enter_config_mode(&mut self) -> Result<(), SessionError>;

    /// Apply one configuration statement without leaving configuration
    /// mode, so a sequence of calls lands as one configuration session.
    async fn send_config_line(&mut self, line: &str) -> Result<(), SessionError>;

    /// Leave configuration mode.
    async fn exit_config_mode(&mut self) -> Result<(), SessionError>;

    /// Perform privilege elevation.
    ///
    /// A clean return does not mean the device granted elevation;
    /// callers must verify via
    /// [`has_elevated_privilege`](DeviceSession::has_elevated_privilege).
    async fn escalate_privilege(
        &mut self,
        secret: &secrecy::SecretString,
    ) -> Result<(), SessionError>;

    /// Whether the session currently holds the elevated prompt.
    async fn has_elevated_privilege(&mut self) -> Result<bool, SessionError>;

    /// Release the session.
    async fn disconnect(&mut self) -> Result<(), SessionError>;
}

/// Opens authenticated sessions, polymorphic over device dialect.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Connect and authenticate to the described device.
    ///
    /// Fails with [`SessionError::AuthenticationFailed`] when credentials
    /// are rejected and [`SessionError::Timeout`] when the handshake does
    /// not complete within the bounded deadline.
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Box<dyn DeviceSession>, SessionError>;
}
