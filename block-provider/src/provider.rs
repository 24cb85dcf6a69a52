//! The capability set every backend implements, and the selection of a
//! backend from its configured name.

use crate::{
    config::ProviderConfig,
    device::{DeactivateOpt, DeviceInfo, Reported},
    dmsetup::DmProvider,
    error::Error,
    spdkvhost::SpdkProvider,
};
use async_trait::async_trait;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::debug;

/// Pool and thin device lifecycle over one backend mechanism.
///
/// Device ids are chosen by the caller and are unique within their pool.
/// Conflicting calls on the same pool or device must be serialized by the
/// caller.
#[async_trait]
pub trait BlockProvider: Send + Sync {
    /// Name of the backend.
    fn provider_name(&self) -> &'static str;

    /// Release the resources held by the backend.
    fn close(&self);

    /// Create a thin pool on top of `data_file`, with its metadata in
    /// `meta_file` and a data block size of `block_size_sectors`.
    async fn create_pool(
        &self,
        pool_name: &str,
        data_file: &str,
        meta_file: &str,
        block_size_sectors: u32,
    ) -> Result<(), Error>;

    /// Re-apply the configuration of an existing pool, e.g. on restart.
    async fn reload_pool(
        &self,
        pool_name: &str,
        data_file: &str,
        meta_file: &str,
        block_size_sectors: u32,
    ) -> Result<(), Error>;

    /// Tear down a pool.
    async fn remove_pool(
        &self,
        pool_name: &str,
        opts: &[DeactivateOpt],
    ) -> Result<(), Error>;

    /// Allocate a thin device inside the pool, without exposing it.
    async fn create_device(
        &self,
        pool_name: &str,
        device_id: u32,
        size: u64,
    ) -> Result<(), Error>;

    /// Create `device_id` as a snapshot of `base_device_id`. An active
    /// origin must be suspended around this call by the caller.
    async fn create_snapshot(
        &self,
        pool_name: &str,
        device_id: u32,
        base_device_id: u32,
    ) -> Result<(), Error>;

    /// Release the storage of a device. Irreversible.
    async fn delete_device(
        &self,
        pool_name: &str,
        device_id: u32,
    ) -> Result<(), Error>;

    /// Expose `device_id` as `device_name`. A non-empty `external_origin`
    /// makes the device a writable overlay of that read-only block device.
    async fn activate_device(
        &self,
        pool_name: &str,
        device_name: &str,
        device_id: u32,
        size: u64,
        external_origin: &str,
    ) -> Result<(), Error>;

    /// Remove the exposure of a device. Removing an absent device succeeds.
    async fn deactivate_device(
        &self,
        device_name: &str,
        opts: &[DeactivateOpt],
    ) -> Result<(), Error>;

    /// Pause I/O on an active device.
    async fn suspend_device(&self, device_name: &str) -> Result<(), Error>;

    /// Resume I/O on a suspended device.
    async fn resume_device(&self, device_name: &str) -> Result<(), Error>;

    /// Version of the backend tool or service.
    async fn version(&self) -> Result<Reported<String>, Error>;

    /// Path under which an active device is visible. Idempotent.
    fn get_full_device_path(&self, device_name: &str) -> String;

    /// Path of the pool named `pool_name` in `dir`.
    fn get_full_pool_path(&self, dir: &str, pool_name: &str)
        -> Reported<String>;

    /// Information about `device_name`, or about every device when empty.
    async fn info(
        &self,
        device_name: &str,
    ) -> Result<Reported<Vec<DeviceInfo>>, Error>;

    /// Information about a pool.
    async fn info_pool(
        &self,
        pool_name: &str,
    ) -> Result<Reported<Vec<DeviceInfo>>, Error>;

    /// Present a device to the host, returning the path to use if the
    /// backend needs such a step.
    async fn dev_hosting(&self, path: &str) -> Result<Option<String>, Error>;

    /// Undo `dev_hosting`.
    async fn un_dev_hosting(&self, path: &str) -> Result<(), Error>;

    /// Size of a sector in bytes.
    fn sector_size(&self) -> u32;

    /// Bytes in use by a thin device.
    async fn get_usage(&self, device_name: &str)
        -> Result<Reported<u64>, Error>;

    /// Raw backend description of a device.
    async fn table(&self, device_name: &str) -> Result<String, Error>;
}

/// The available backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
pub enum ProviderKind {
    /// The kernel thin provisioning targets, driven through dmsetup.
    #[strum(to_string = "dmsetup", serialize = "")]
    Dmsetup,
    /// Logical volumes of an spdk target, served over vhost-blk.
    #[strum(to_string = "spdkvhost", serialize = "spdk_vhost")]
    SpdkVhost,
}

impl ProviderKind {
    /// Parse a configured provider name.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::from_str(name).map_err(|_| Error::InvalidProvider {
            name: name.to_string(),
        })
    }
}

/// Build the backend named `name`, as found in `ProviderConfig::provider`.
/// The spdk backend checks its json-rpc socket is reachable before it is
/// returned.
pub async fn block_provider(
    name: &str,
    config: &ProviderConfig,
) -> Result<Box<dyn BlockProvider>, Error> {
    let kind = ProviderKind::from_name(name)?;
    debug!("Using block provider {}", kind);

    Ok(match kind {
        ProviderKind::Dmsetup => Box::new(DmProvider::new(config)),
        ProviderKind::SpdkVhost => {
            Box::new(SpdkProvider::connect(config).await?)
        }
    })
}
