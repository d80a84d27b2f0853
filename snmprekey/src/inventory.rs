//! Device inventory loading.
//!
//! The inventory is a plain text file, one device per line:
//!
//! ```text
//! # address:dialect:username:password:enable_secret
//! 10.0.0.1:cisco_ios:admin:pw1:secret1
//! 10.0.0.2:cisco_xr:admin:pw2:secret2
//! ```
//!
//! Lines beginning with `#` and blank lines are skipped. A malformed
//! line fails the load: the fleet run never starts from a device list
//! that was only partially understood.

use std::path::Path;

use secrecy::SecretString;

use crate::dialect::Dialect;
use crate::error::InventoryError;

/// Everything needed to open a session to one device.
///
/// Parsed once from the inventory, then cloned into the worker handling
/// the device. Never mutated after load.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Management address (hostname or IP).
    pub address: String,

    /// Command/persistence convention for this device.
    pub dialect: Dialect,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Secret for privilege escalation, where the dialect requires it.
    pub enable_secret: SecretString,
}

/// Load and validate an inventory file.
pub fn load(path: &Path) -> Result<Vec<DeviceDescriptor>, InventoryError> {
    let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text)
}

/// Parse inventory text into validated descriptors.
pub fn parse(text: &str) -> Result<Vec<DeviceDescriptor>, InventoryError> {
    let mut devices = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let number = index + 1;
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 5 {
            return Err(InventoryError::MalformedLine {
                line: number,
                found: fields.len(),
            });
        }

        let dialect =
            Dialect::from_token(fields[1]).ok_or_else(|| InventoryError::UnknownDialect {
                line: number,
                token: fields[1].to_string(),
            })?;

        devices.push(DeviceDescriptor {
            address: fields[0].to_string(),
            dialect,
            username: fields[2].to_string(),
            password: SecretString::from(fields[3].to_string()),
            enable_secret: SecretString::from(fields[4].to_string()),
        });
    }

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_parse_single_device() {
        let devices = parse("10.0.0.1:cisco_ios:admin:pw1:secret1").unwrap();
        assert_eq!(devices.len(), 1);

        let device = &devices[0];
        assert_eq!(device.address, "10.0.0.1");
        assert_eq!(device.dialect, Dialect::Ios);
        assert_eq!(device.username, "admin");
        assert_eq!(device.password.expose_secret(), "pw1");
        assert_eq!(device.enable_secret.expose_secret(), "secret1");
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let text = "\
# fleet inventory
10.0.0.1:cisco_ios:admin:pw1:secret1

  # indented comment
10.0.0.2:cisco_xr:admin:pw2:secret2
";
        let devices = parse(text).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address, "10.0.0.1");
        assert_eq!(devices[1].dialect, Dialect::IosXr);
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let text = "10.0.0.1:cisco_ios:admin:pw1:secret1\n10.0.0.2:cisco_xr:admin\n";
        let err = parse(text).unwrap_err();
        match err {
            InventoryError::MalformedLine { line, found } => {
                assert_eq!(line, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_dialect_is_fatal() {
        let err = parse("10.0.0.1:cisco_nxos:admin:pw1:secret1").unwrap_err();
        match err {
            InventoryError::UnknownDialect { line, token } => {
                assert_eq!(line, 1);
                assert_eq!(token, "cisco_nxos");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/devices.txt")).unwrap_err();
        assert!(matches!(err, InventoryError::Unreadable { .. }));
    }
}
