//! Provider configuration. Every field has a default, so a partial YAML
//! file only needs to spell out what differs from the defaults.

use crate::error::{ConfigParseSnafu, ConfigReadSnafu, Error};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{fs, path::Path};

/// Default location of the spdk json-rpc socket.
pub const SPDK_RPC_SOCKET: &str = "/var/tmp/spdk.sock";
/// Default directory the vhost-blk controller sockets are created in.
pub const VHOST_SOCKET_DIR: &str =
    "/var/run/kata-containers/vhost-user/block/sockets/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Name of the provider, see `ProviderKind`.
    pub provider: String,
    /// The dmsetup binary.
    pub dmsetup_bin: String,
    /// The blockdev binary, used to query the size of a data device.
    pub blockdev_bin: String,
    /// json-rpc socket of the spdk vhost target.
    pub spdk_rpc_socket: String,
    /// Directory holding the vhost-blk controller sockets.
    pub vhost_socket_dir: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            dmsetup_bin: "dmsetup".into(),
            blockdev_bin: "blockdev".into(),
            spdk_rpc_socket: SPDK_RPC_SOCKET.into(),
            vhost_socket_dir: VHOST_SOCKET_DIR.into(),
        }
    }
}

impl ProviderConfig {
    /// Load the configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = fs::read_to_string(path).context(ConfigReadSnafu {
            path: display.clone(),
        })?;
        Self::from_yaml(&text).context(ConfigParseSnafu {
            path: display,
        })
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ProviderConfig::from_yaml(
            "provider: spdkvhost\nspdk_rpc_socket: /run/spdk.sock\n",
        )
        .unwrap();
        assert_eq!(config.provider, "spdkvhost");
        assert_eq!(config.spdk_rpc_socket, "/run/spdk.sock");
        assert_eq!(config.dmsetup_bin, "dmsetup");
        assert_eq!(config.vhost_socket_dir, VHOST_SOCKET_DIR);
    }

    #[test]
    fn empty_config() {
        assert_eq!(
            ProviderConfig::from_yaml("\n").unwrap(),
            ProviderConfig::default()
        );
    }

    #[test]
    fn unreadable_config() {
        let err = ProviderConfig::load("/nonexistent/provider.yaml")
            .unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn malformed_config() {
        assert!(ProviderConfig::from_yaml("provider: [1, 2").is_err());
    }
}
