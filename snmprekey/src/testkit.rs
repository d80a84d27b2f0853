//! Scripted fakes for engine and orchestrator tests.
//!
//! A [`FakeDevice`] holds a mutable running configuration shared across
//! sessions, so a second rotation against the same device observes the
//! first one's effect. Every call lands in a shared log that tests
//! assert call sequences against.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionError;
use crate::gateway::{DeviceSession, SessionGateway};
use crate::inventory::DeviceDescriptor;
use crate::probe::ReachabilityProbe;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn logged(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// How a fake device answers a connection attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectBehavior {
    #[default]
    Accept,
    Timeout,
    RejectCredentials,
}

/// One simulated device: a running configuration plus failure knobs.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    running_config: Arc<Mutex<Vec<String>>>,
    connect: ConnectBehavior,
    reject_escalation: bool,
}

impl FakeDevice {
    pub fn with_config<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            running_config: Arc::new(Mutex::new(
                lines.into_iter().map(str::to_string).collect(),
            )),
            ..Self::default()
        }
    }

    pub fn connect_behavior(mut self, behavior: ConnectBehavior) -> Self {
        self.connect = behavior;
        self
    }

    pub fn reject_escalation(mut self) -> Self {
        self.reject_escalation = true;
        self
    }

    pub fn config_lines(&self) -> Vec<String> {
        self.running_config.lock().unwrap().clone()
    }
}

/// Recording session bound to one fake device.
pub struct FakeSession {
    #[allow(dead_code)]
    address: String,
    device: FakeDevice,
    log: CallLog,
}

impl FakeSession {
    pub fn new(address: &str, device: &FakeDevice, log: &CallLog) -> Self {
        Self {
            address: address.to_string(),
            device: device.clone(),
            log: Arc::clone(log),
        }
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        self.record(format!("command {command}"));

        if let Some(marker) = command.strip_prefix("show running-config | include ") {
            let config = self.device.running_config.lock().unwrap();
            let matching: Vec<String> = config
                .iter()
                .filter(|line| line.contains(marker))
                .cloned()
                .collect();
            return Ok(matching.join("\n"));
        }

        Ok(String::new())
    }

    async fn enter_config_mode(&mut self) -> Result<(), SessionError> {
        self.record("enter-config".to_string());
        Ok(())
    }

    async fn send_config_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.record(format!("config-line {line}"));

        if line == "commit" {
            return Ok(());
        }

        let mut config = self.device.running_config.lock().unwrap();
        if let Some(removed) = line.strip_prefix("no ") {
            config.retain(|existing| existing != removed);
        } else {
            config.push(line.to_string());
        }
        Ok(())
    }

    async fn exit_config_mode(&mut self) -> Result<(), SessionError> {
        self.record("exit-config".to_string());
        Ok(())
    }

    async fn escalate_privilege(
        &mut self,
        _secret: &secrecy::SecretString,
    ) -> Result<(), SessionError> {
        self.record("escalate".to_string());
        Ok(())
    }

    async fn has_elevated_privilege(&mut self) -> Result<bool, SessionError> {
        self.record("verify-privilege".to_string());
        Ok(!self.device.reject_escalation)
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        self.record("disconnect".to_string());
        Ok(())
    }
}

/// Gateway over a map of fake devices keyed by address.
#[derive(Default)]
pub struct FakeGateway {
    devices: HashMap<String, FakeDevice>,
    log: CallLog,
}

impl FakeGateway {
    pub fn new(log: &CallLog) -> Self {
        Self {
            devices: HashMap::new(),
            log: Arc::clone(log),
        }
    }

    pub fn device(mut self, address: &str, device: FakeDevice) -> Self {
        self.devices.insert(address.to_string(), device);
        self
    }
}

#[async_trait]
impl SessionGateway for FakeGateway {
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Box<dyn DeviceSession>, SessionError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("connect {}", descriptor.address));

        let device = self
            .devices
            .get(&descriptor.address)
            .cloned()
            .unwrap_or_default();

        match device.connect {
            ConnectBehavior::Accept => Ok(Box::new(FakeSession::new(
                &descriptor.address,
                &device,
                &self.log,
            ))),
            ConnectBehavior::Timeout => Err(SessionError::Timeout(Duration::from_secs(15))),
            ConnectBehavior::RejectCredentials => Err(SessionError::AuthenticationFailed {
                user: descriptor.username.clone(),
            }),
        }
    }
}

/// Probe answering from a fixed unreachable set.
#[derive(Default)]
pub struct FakeProbe {
    unreachable: Vec<String>,
    log: CallLog,
}

impl FakeProbe {
    pub fn new(log: &CallLog) -> Self {
        Self {
            unreachable: Vec::new(),
            log: Arc::clone(log),
        }
    }

    pub fn unreachable(mut self, address: &str) -> Self {
        self.unreachable.push(address.to_string());
        self
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        self.log.lock().unwrap().push(format!("probe {address}"));
        !self.unreachable.iter().any(|entry| entry == address)
    }
}
