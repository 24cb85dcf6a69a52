//! Thin devices as logical volumes of an spdk vhost target.
//!
//! A pool is a logical volume store created on top of an aio bdev which is
//! registered for the data device. Thin devices are thin provisioned
//! logical volumes of the store, named after their device id, and are
//! activated by serving them through a vhost-blk controller whose socket
//! is what the rest of the system consumes.
//!
//! spdk keeps no tables nor any per device counters we could query with the
//! methods used here, so version, usage, pool path and info are reported as
//! placeholders or partial values.

use crate::{
    config::ProviderConfig,
    device::{DeactivateOpt, DeviceInfo, Reported},
    errno,
    error::{Error, RpcConnectSnafu},
    provider::BlockProvider,
};
use async_trait::async_trait;
use rpc::spdk::{
    method,
    BdevAioCreateArgs,
    BdevAioDeleteArgs,
    BdevLvolCreateArgs,
    BdevLvolCreateLvstoreArgs,
    BdevLvolDeleteArgs,
    BdevLvolDeleteLvstoreArgs,
    BdevLvolSnapshotArgs,
    VhostController,
    VhostCreateBlkControllerArgs,
    VhostDeleteControllerArgs,
    VhostGetControllersArgs,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use snafu::ResultExt;
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Prefix of the vhost-blk controller names.
pub const VHOST_BLK_PREFIX: &str = "vhostblk-";
/// Logical block size of the aio bdev registered when creating a pool.
pub const AIO_BLOCK_SIZE: u32 = 512;
/// Logical block size of the aio bdev registered again on reload.
pub const AIO_RELOAD_BLOCK_SIZE: u32 = 4096;

const SECTOR_SIZE: u32 = 512;
const PLACEHOLDER_VERSION: &str = "20.X";
const PLACEHOLDER_POOL_PATH: &str = "/dev/nvme0n1";
const PLACEHOLDER_POOL_BLOCK_DEVICE: &str = "nvme0n1";
const PLACEHOLDER_USAGE: u64 = 10240;

/// The spdk vhost backend.
#[derive(Debug, Clone)]
pub struct SpdkProvider {
    socket: String,
    vhost_socket_dir: String,
}

impl SpdkProvider {
    /// Connect to the json-rpc server of the spdk target.
    pub async fn connect(config: &ProviderConfig) -> Result<Self, Error> {
        jsonrpc::connect(&config.spdk_rpc_socket)
            .await
            .context(RpcConnectSnafu {
                socket: config.spdk_rpc_socket.clone(),
            })?;
        debug!("Connected to spdk at {}", config.spdk_rpc_socket);

        Ok(Self {
            socket: config.spdk_rpc_socket.clone(),
            vhost_socket_dir: config.vhost_socket_dir.clone(),
        })
    }

    /// Call `method`, classifying the errors the target reports either as a
    /// negative errno or with the description of one.
    async fn call<A, R>(&self, method: &str, args: A) -> Result<R, Error>
    where
        A: Serialize,
        R: 'static + DeserializeOwned + Send,
    {
        jsonrpc::call(&self.socket, method, Some(args))
            .await
            .map_err(|source| {
                let errno = source.errno().or_else(|| match &source {
                    jsonrpc::error::Error::RpcError {
                        msg,
                        ..
                    } => errno::lookup(msg),
                    _ => None,
                });
                match errno {
                    Some(errno) => Error::Classified {
                        command: method.to_string(),
                        errno,
                    },
                    None => Error::Rpc {
                        method: method.to_string(),
                        source,
                    },
                }
            })
    }

    /// Call a method whose result is of no interest.
    async fn invoke<A: Serialize>(
        &self,
        method: &str,
        args: A,
    ) -> Result<(), Error> {
        let result: Value = self.call(method, args).await?;
        trace!("{} returned {}", method, result);
        Ok(())
    }

    async fn aio_create(
        &self,
        pool_name: &str,
        data_file: &str,
        block_size: u32,
    ) -> Result<(), Error> {
        self.invoke(
            method::BDEV_AIO_CREATE,
            BdevAioCreateArgs {
                name: pool_name.to_string(),
                filename: data_file.to_string(),
                block_size: Some(block_size),
            },
        )
        .await
    }

    fn controller_name(device_name: &str) -> String {
        format!("{}{}", VHOST_BLK_PREFIX, device_name)
    }

    fn lvol_name(pool_name: &str, device_id: u32) -> String {
        format!("{}/{}", pool_name, device_id)
    }
}

#[async_trait]
impl BlockProvider for SpdkProvider {
    fn provider_name(&self) -> &'static str {
        "spdkvhost"
    }

    fn close(&self) {
        trace!("Closing spdk provider for {}", self.socket);
    }

    async fn create_pool(
        &self,
        pool_name: &str,
        data_file: &str,
        _meta_file: &str,
        block_size_sectors: u32,
    ) -> Result<(), Error> {
        self.aio_create(pool_name, data_file, AIO_BLOCK_SIZE).await?;

        let cluster_sz = match block_size_sectors {
            0 => None,
            sectors => Some(u64::from(sectors) * u64::from(SECTOR_SIZE)),
        };
        self.invoke(
            method::BDEV_LVOL_CREATE_LVSTORE,
            BdevLvolCreateLvstoreArgs {
                bdev_name: pool_name.to_string(),
                lvs_name: pool_name.to_string(),
                cluster_sz,
            },
        )
        .await?;

        info!("Created lvol store {} on {}", pool_name, data_file);
        Ok(())
    }

    async fn reload_pool(
        &self,
        pool_name: &str,
        data_file: &str,
        _meta_file: &str,
        _block_size_sectors: u32,
    ) -> Result<(), Error> {
        // the store is found again by examining the new aio bdev
        self.aio_create(pool_name, data_file, AIO_RELOAD_BLOCK_SIZE)
            .await?;
        info!("Reloaded lvol store {}", pool_name);
        Ok(())
    }

    async fn remove_pool(
        &self,
        pool_name: &str,
        _opts: &[DeactivateOpt],
    ) -> Result<(), Error> {
        let result = self
            .invoke(
                method::BDEV_LVOL_DELETE_LVSTORE,
                BdevLvolDeleteLvstoreArgs {
                    lvs_name: pool_name.to_string(),
                },
            )
            .await;
        match result {
            // gone already when an earlier removal failed on the aio bdev
            Err(error) if error.is_no_such_device() => {
                warn!("Lvol store {} is already gone: {}", pool_name, error);
            }
            result => result?,
        }
        self.invoke(
            method::BDEV_AIO_DELETE,
            BdevAioDeleteArgs {
                name: pool_name.to_string(),
            },
        )
        .await?;

        info!("Removed lvol store {}", pool_name);
        Ok(())
    }

    async fn create_device(
        &self,
        pool_name: &str,
        device_id: u32,
        size: u64,
    ) -> Result<(), Error> {
        self.invoke(
            method::BDEV_LVOL_CREATE,
            BdevLvolCreateArgs {
                lvol_name: device_id.to_string(),
                size_in_mib: size / 1024 / 1024,
                thin_provision: true,
                lvs_name: pool_name.to_string(),
            },
        )
        .await?;

        info!("Created lvol {}", Self::lvol_name(pool_name, device_id));
        Ok(())
    }

    async fn create_snapshot(
        &self,
        pool_name: &str,
        device_id: u32,
        base_device_id: u32,
    ) -> Result<(), Error> {
        self.invoke(
            method::BDEV_LVOL_SNAPSHOT,
            BdevLvolSnapshotArgs {
                lvol_name: Self::lvol_name(pool_name, base_device_id),
                snapshot_name: device_id.to_string(),
            },
        )
        .await?;

        info!(
            "Created snapshot {} of {}",
            Self::lvol_name(pool_name, device_id),
            base_device_id
        );
        Ok(())
    }

    async fn delete_device(
        &self,
        pool_name: &str,
        device_id: u32,
    ) -> Result<(), Error> {
        let name = Self::lvol_name(pool_name, device_id);
        self.invoke(
            method::BDEV_LVOL_DELETE,
            BdevLvolDeleteArgs {
                name: name.clone(),
            },
        )
        .await?;

        info!("Deleted lvol {}", name);
        Ok(())
    }

    async fn activate_device(
        &self,
        pool_name: &str,
        device_name: &str,
        device_id: u32,
        _size: u64,
        external_origin: &str,
    ) -> Result<(), Error> {
        if !external_origin.is_empty() {
            debug!(
                "Ignoring external origin {} of {}",
                external_origin, device_name
            );
        }

        let ctrlr = Self::controller_name(device_name);
        self.invoke(
            method::VHOST_CREATE_BLK_CONTROLLER,
            VhostCreateBlkControllerArgs {
                ctrlr: ctrlr.clone(),
                dev_name: Self::lvol_name(pool_name, device_id),
            },
        )
        .await?;

        info!("Activated {} as controller {}", device_id, ctrlr);
        Ok(())
    }

    async fn deactivate_device(
        &self,
        device_name: &str,
        _opts: &[DeactivateOpt],
    ) -> Result<(), Error> {
        let result = self
            .invoke(
                method::VHOST_DELETE_CONTROLLER,
                VhostDeleteControllerArgs {
                    ctrlr: Self::controller_name(device_name),
                },
            )
            .await;

        match result {
            Err(error) if error.is_no_such_device() => {
                warn!(
                    "Controller of {} is already gone: {}",
                    device_name, error
                );
                Ok(())
            }
            Err(error) => Err(error),
            Ok(()) => {
                debug!("Removed controller of {}", device_name);
                Ok(())
            }
        }
    }

    async fn suspend_device(&self, _device_name: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn resume_device(&self, _device_name: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn version(&self) -> Result<Reported<String>, Error> {
        Ok(Reported::Placeholder(PLACEHOLDER_VERSION.to_string()))
    }

    fn get_full_device_path(&self, device_name: &str) -> String {
        let dir = Path::new(&self.vhost_socket_dir);
        if let Ok(rest) = Path::new(device_name).strip_prefix(dir) {
            let rest = rest.to_string_lossy();
            if rest.starts_with(VHOST_BLK_PREFIX) {
                return device_name.to_string();
            }
        }

        dir.join(Self::controller_name(device_name))
            .to_string_lossy()
            .into_owned()
    }

    fn get_full_pool_path(
        &self,
        _dir: &str,
        _pool_name: &str,
    ) -> Reported<String> {
        Reported::Placeholder(PLACEHOLDER_POOL_PATH.to_string())
    }

    async fn info(
        &self,
        device_name: &str,
    ) -> Result<Reported<Vec<DeviceInfo>>, Error> {
        let lookup: Result<Vec<VhostController>, Error> = self
            .call(
                method::VHOST_GET_CONTROLLERS,
                VhostGetControllersArgs {
                    name: Some(Self::controller_name(device_name)),
                },
            )
            .await;
        if let Err(error) = &lookup {
            debug!("No controller for {}: {}", device_name, error);
        }

        Ok(Reported::Partial(vec![DeviceInfo {
            name: device_name.to_string(),
            table_live: lookup.is_ok(),
            ..Default::default()
        }]))
    }

    async fn info_pool(
        &self,
        pool_name: &str,
    ) -> Result<Reported<Vec<DeviceInfo>>, Error> {
        Ok(Reported::Placeholder(vec![DeviceInfo {
            name: pool_name.to_string(),
            block_device_name: PLACEHOLDER_POOL_BLOCK_DEVICE.to_string(),
            ..Default::default()
        }]))
    }

    async fn dev_hosting(&self, _path: &str) -> Result<Option<String>, Error> {
        Ok(None)
    }

    async fn un_dev_hosting(&self, _path: &str) -> Result<(), Error> {
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        SECTOR_SIZE
    }

    async fn get_usage(
        &self,
        _device_name: &str,
    ) -> Result<Reported<u64>, Error> {
        Ok(Reported::Placeholder(PLACEHOLDER_USAGE))
    }

    async fn table(&self, _device_name: &str) -> Result<String, Error> {
        Err(Error::NotImplemented {
            provider: self.provider_name().to_string(),
            operation: "table".to_string(),
        })
    }
}
