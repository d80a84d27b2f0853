//! SSH-backed session gateway built on russh.
//!
//! Network device CLIs are scraped, not spoken: a command is written to
//! a PTY shell channel and output is read until the device prompt shows
//! up at the tail of the stream. Mode transitions (configuration mode,
//! privilege escalation) are just commands whose expected prompt
//! differs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use regex::bytes::Regex;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::{ExposeSecret, SecretString};

use super::buffer::OutputBuffer;
use super::{DeviceSession, SessionGateway};
use crate::dialect::PromptSet;
use crate::error::SessionError;
use crate::inventory::DeviceDescriptor;

/// How many trailing bytes to scan for a prompt after each read.
const PROMPT_SEARCH_DEPTH: usize = 1000;

/// Session gateway that opens SSH PTY shells to devices.
#[derive(Debug, Clone)]
pub struct SshGateway {
    port: u16,
    connect_timeout: Duration,
    command_timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
}

impl SshGateway {
    /// Create a gateway with explicit connect and per-command deadlines.
    pub fn new(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
            ..Self::default()
        }
    }

    /// Set the SSH port (default: 22).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set terminal dimensions for the PTY request.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }
}

impl Default for SshGateway {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
        }
    }
}

#[async_trait]
impl SessionGateway for SshGateway {
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Box<dyn DeviceSession>, SessionError> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(self.command_timeout),
            ..Default::default()
        });

        let mut handle = tokio::time::timeout(
            self.connect_timeout,
            client::connect(
                config,
                (descriptor.address.as_str(), self.port),
                ManagementNetworkKeys,
            ),
        )
        .await
        .map_err(|_| SessionError::Timeout(self.connect_timeout))?
        .map_err(|err| match err {
            russh::Error::IO(source) => SessionError::ConnectionFailed {
                host: descriptor.address.clone(),
                port: self.port,
                source,
            },
            other => SessionError::Ssh(other),
        })?;

        let authenticated = handle
            .authenticate_password(
                &descriptor.username,
                descriptor.password.expose_secret(),
            )
            .await?
            .success();
        if !authenticated {
            return Err(SessionError::AuthenticationFailed {
                user: descriptor.username.clone(),
            });
        }

        let channel = handle.channel_open_session().await?;
        channel
            .request_pty(
                true,
                "xterm",
                self.terminal_width,
                self.terminal_height,
                0,
                0,
                &[],
            )
            .await?;
        channel.request_shell(true).await?;

        let mut session = SshSession {
            address: descriptor.address.clone(),
            handle,
            channel,
            buffer: OutputBuffer::new(PROMPT_SEARCH_DEPTH),
            prompts: descriptor.dialect.prompt_set(),
            failure_markers: descriptor.dialect.failure_markers(),
            timeout: self.command_timeout,
        };

        // Login banner and MOTD precede the first prompt.
        let any = session.prompts.any.clone();
        session.read_until(&any).await?;

        // Disable paging so discovery output is never gated on a
        // --More-- prompt.
        session.send_command("terminal length 0").await?;

        info!("session established to {}", descriptor.address);
        Ok(Box::new(session))
    }
}

/// SSH session over a PTY shell channel.
struct SshSession {
    address: String,
    handle: Handle<ManagementNetworkKeys>,
    channel: Channel<Msg>,
    buffer: OutputBuffer,
    prompts: PromptSet,
    failure_markers: &'static [&'static str],
    timeout: Duration,
}

impl SshSession {
    async fn write_line(&mut self, text: &str) -> Result<(), SessionError> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.channel.data(line.as_bytes()).await?;
        Ok(())
    }

    /// Accumulate channel output until `pattern` appears in the tail,
    /// then drain and return everything read.
    async fn read_until(&mut self, pattern: &Regex) -> Result<String, SessionError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            if self.buffer.prompt_seen(pattern) {
                return Ok(self.buffer.drain_text());
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::Timeout(self.timeout));
            }

            match tokio::time::timeout(remaining, self.channel.wait()).await {
                Err(_) => return Err(SessionError::Timeout(self.timeout)),
                Ok(None) => return Err(SessionError::Closed),
                Ok(Some(ChannelMsg::Data { data })) => self.buffer.push(&data),
                Ok(Some(_)) => {}
            }
        }
    }

    /// Send a command, wait for `expect`, and return output with the
    /// command echo and trailing prompt stripped.
    async fn execute(&mut self, command: &str, expect: &Regex) -> Result<String, SessionError> {
        debug!("{}: sending '{command}'", self.address);
        self.write_line(command).await?;
        let raw = self.read_until(expect).await?;
        let output = normalize(&raw, command);

        for marker in self.failure_markers {
            if output.contains(marker) {
                return Err(SessionError::CommandRejected {
                    command: command.to_string(),
                    detail: (*marker).to_string(),
                });
            }
        }

        Ok(output)
    }
}

#[async_trait]
impl DeviceSession for SshSession {
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        let expect = self.prompts.any.clone();
        self.execute(command, &expect).await
    }

    async fn enter_config_mode(&mut self) -> Result<(), SessionError> {
        let expect = self.prompts.config.clone();
        self.execute("configure terminal", &expect).await?;
        Ok(())
    }

    async fn send_config_line(&mut self, line: &str) -> Result<(), SessionError> {
        let expect = self.prompts.config.clone();
        self.execute(line, &expect).await?;
        Ok(())
    }

    async fn exit_config_mode(&mut self) -> Result<(), SessionError> {
        let expect = self.prompts.any.clone();
        self.execute("end", &expect).await?;
        Ok(())
    }

    async fn escalate_privilege(&mut self, secret: &SecretString) -> Result<(), SessionError> {
        self.write_line("enable").await?;

        // The device answers with either a password challenge or, when
        // no enable secret is configured, the elevated prompt directly.
        let challenge = self.prompts.password.clone();
        let gate = self.prompts.escalation.clone();
        let any = self.prompts.any.clone();

        let answer = self.read_until(&gate).await?;
        if challenge.is_match(answer.as_bytes()) {
            self.write_line(secret.expose_secret()).await?;
            let follow_up = self.read_until(&gate).await?;
            if challenge.is_match(follow_up.as_bytes()) {
                // Wrong secret: the device re-issues the challenge.
                // Exhaust the retry so the shell returns to a prompt;
                // the caller's verification query reports the failure.
                self.write_line("").await?;
                self.write_line("").await?;
                let _ = self.read_until(&any).await;
            }
        }

        Ok(())
    }

    async fn has_elevated_privilege(&mut self) -> Result<bool, SessionError> {
        self.write_line("").await?;
        let any = self.prompts.any.clone();
        let raw = self.read_until(&any).await?;

        let prompt = raw
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
            .trim();
        Ok(self.prompts.is_privileged(prompt))
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        let _ = self.channel.eof().await;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        debug!("{}: session closed", self.address);
        Ok(())
    }
}

/// Strip the echoed command from the front and the prompt line from the
/// back of raw PTY output.
fn normalize(raw: &str, command: &str) -> String {
    let body = raw
        .strip_prefix(command)
        .unwrap_or(raw)
        .trim_start_matches(['\r', '\n']);

    match body.rfind('\n') {
        Some(position) => body[..position].trim_end().to_string(),
        // Only the prompt came back.
        None => String::new(),
    }
}

/// Rotation targets live on a trusted management network; host keys are
/// accepted without verification.
struct ManagementNetworkKeys;

impl client::Handler for ManagementNetworkKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}
