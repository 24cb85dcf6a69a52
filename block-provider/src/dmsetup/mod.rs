//! Thin pools and thin devices backed by the kernel device-mapper targets,
//! managed with the dmsetup command line tool.
//!
//! Pools are device-mapper thin-pool devices, created from a data and a
//! metadata device. Thin devices are allocated inside the pool by messages
//! sent to it, and become visible under /dev/mapper/ once activated with a
//! thin table.

mod cmd;
pub mod parse;
pub mod table;

use crate::{
    config::ProviderConfig,
    device::{DeactivateOpt, DeviceInfo, DeviceStatus, Reported},
    error::{DeviceSizeSnafu, Error, UsageSnafu},
    provider::BlockProvider,
};
use async_trait::async_trait;
use cmd::{combined_output, spawn, DmCmd, DmSubCmd};
use snafu::ResultExt;
use tracing::{debug, info, warn};

/// Directory holding the device nodes of the mapped devices.
pub const DEV_MAPPER_DIR: &str = "/dev/mapper/";
/// Size of a sector as used in device-mapper tables.
pub const SECTOR_SIZE: u32 = 512;

/// Path of a mapped device, e.g. "pool" becomes "/dev/mapper/pool".
/// A name which already is such a path is returned as is.
pub fn full_device_path(name: &str) -> String {
    if name.starts_with(DEV_MAPPER_DIR) {
        name.to_string()
    } else {
        format!("{}{}", DEV_MAPPER_DIR, name)
    }
}

/// The dmsetup backend.
#[derive(Debug, Clone)]
pub struct DmProvider {
    dmsetup_bin: String,
    blockdev_bin: String,
}

impl DmProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            dmsetup_bin: config.dmsetup_bin.clone(),
            blockdev_bin: config.blockdev_bin.clone(),
        }
    }

    fn dm(&self, sub: DmSubCmd) -> DmCmd<'_> {
        DmCmd::new(&self.dmsetup_bin, sub)
    }

    /// Size in bytes of the block device at `path`.
    pub async fn block_device_size(&self, path: &str) -> Result<u64, Error> {
        let args = ["--getsize64", "-q", path];
        let command = format!("{} {}", self.blockdev_bin, args.join(" "));
        let output = spawn(&self.blockdev_bin, args, &command).await?;
        let text = combined_output(&output);

        if !output.status.success() {
            return Err(Error::ToolFailed {
                command,
                output: text,
            });
        }

        let text = text.trim();
        text.parse::<u64>().map_err(|error| Error::Parse {
            what: "block device size".to_string(),
            input: text.to_string(),
            reason: error.to_string(),
        })
    }

    /// Status of the targets of `device_name`.
    pub async fn status(
        &self,
        device_name: &str,
    ) -> Result<DeviceStatus, Error> {
        let output =
            self.dm(DmSubCmd::Status).arg(device_name).output().await?;
        parse::parse_status(&output)
    }

    async fn load_pool(
        &self,
        sub: DmSubCmd,
        pool_name: &str,
        data_file: &str,
        meta_file: &str,
        block_size_sectors: u32,
    ) -> Result<(), Error> {
        let size = self.block_device_size(data_file).await.context(
            DeviceSizeSnafu {
                path: data_file,
            },
        )?;
        let table = table::thin_pool_table(
            size,
            data_file,
            meta_file,
            block_size_sectors,
        );

        self.dm(sub)
            .arg(pool_name)
            .args(["--table", table.as_str()])
            .run()
            .await
    }

    async fn message(
        &self,
        pool_name: &str,
        message: String,
    ) -> Result<(), Error> {
        self.dm(DmSubCmd::Message)
            .arg(pool_name)
            .arg("0")
            .arg(message)
            .run()
            .await
    }
}

#[async_trait]
impl BlockProvider for DmProvider {
    fn provider_name(&self) -> &'static str {
        "dmsetup"
    }

    fn close(&self) {}

    async fn create_pool(
        &self,
        pool_name: &str,
        data_file: &str,
        meta_file: &str,
        block_size_sectors: u32,
    ) -> Result<(), Error> {
        self.load_pool(
            DmSubCmd::Create,
            pool_name,
            data_file,
            meta_file,
            block_size_sectors,
        )
        .await?;
        info!("Created thin-pool {} on {}", pool_name, data_file);
        Ok(())
    }

    async fn reload_pool(
        &self,
        pool_name: &str,
        data_file: &str,
        meta_file: &str,
        block_size_sectors: u32,
    ) -> Result<(), Error> {
        self.load_pool(
            DmSubCmd::Reload,
            pool_name,
            data_file,
            meta_file,
            block_size_sectors,
        )
        .await?;
        info!("Reloaded thin-pool {}", pool_name);
        Ok(())
    }

    async fn remove_pool(
        &self,
        pool_name: &str,
        opts: &[DeactivateOpt],
    ) -> Result<(), Error> {
        self.deactivate_device(pool_name, opts).await
    }

    async fn create_device(
        &self,
        pool_name: &str,
        device_id: u32,
        _size: u64,
    ) -> Result<(), Error> {
        self.message(pool_name, format!("create_thin {}", device_id))
            .await?;
        info!("Created thin device {} in {}", device_id, pool_name);
        Ok(())
    }

    async fn create_snapshot(
        &self,
        pool_name: &str,
        device_id: u32,
        base_device_id: u32,
    ) -> Result<(), Error> {
        self.message(
            pool_name,
            format!("create_snap {} {}", device_id, base_device_id),
        )
        .await?;
        info!(
            "Created snapshot {} of {} in {}",
            device_id, base_device_id, pool_name
        );
        Ok(())
    }

    async fn delete_device(
        &self,
        pool_name: &str,
        device_id: u32,
    ) -> Result<(), Error> {
        self.message(pool_name, format!("delete {}", device_id))
            .await?;
        info!("Deleted thin device {} of {}", device_id, pool_name);
        Ok(())
    }

    async fn activate_device(
        &self,
        pool_name: &str,
        device_name: &str,
        device_id: u32,
        size: u64,
        external_origin: &str,
    ) -> Result<(), Error> {
        let table =
            table::thin_table(pool_name, device_id, size, external_origin);

        self.dm(DmSubCmd::Create)
            .arg(device_name)
            .args(["--table", table.as_str()])
            .run()
            .await?;
        info!("Activated {} as {}", device_id, device_name);
        Ok(())
    }

    async fn deactivate_device(
        &self,
        device_name: &str,
        opts: &[DeactivateOpt],
    ) -> Result<(), Error> {
        let result = self
            .dm(DmSubCmd::Remove)
            .args(opts.iter().map(DeactivateOpt::to_string))
            .arg(full_device_path(device_name))
            .run()
            .await;

        match result {
            // a deferred removal may have completed since it was requested
            Err(error) if error.is_no_such_device() => {
                warn!("Device {} is already gone: {}", device_name, error);
                Ok(())
            }
            Err(error) => Err(error),
            Ok(()) => {
                debug!("Removed {}", device_name);
                Ok(())
            }
        }
    }

    async fn suspend_device(&self, device_name: &str) -> Result<(), Error> {
        self.dm(DmSubCmd::Suspend).arg(device_name).run().await
    }

    async fn resume_device(&self, device_name: &str) -> Result<(), Error> {
        self.dm(DmSubCmd::Resume).arg(device_name).run().await
    }

    async fn version(&self) -> Result<Reported<String>, Error> {
        self.dm(DmSubCmd::Version).output().await.map(Reported::Live)
    }

    fn get_full_device_path(&self, device_name: &str) -> String {
        full_device_path(device_name)
    }

    fn get_full_pool_path(
        &self,
        _dir: &str,
        pool_name: &str,
    ) -> Reported<String> {
        Reported::Live(full_device_path(pool_name))
    }

    async fn info(
        &self,
        device_name: &str,
    ) -> Result<Reported<Vec<DeviceInfo>>, Error> {
        let mut cmd = self.dm(DmSubCmd::Info).args([
            "--columns",
            "--noheadings",
            "-o",
            parse::INFO_COLUMNS,
            "--separator",
            " ",
        ]);
        if !device_name.is_empty() {
            cmd = cmd.arg(device_name);
        }

        let output = cmd.output().await?;
        parse::parse_info(&output).map(Reported::Live)
    }

    async fn info_pool(
        &self,
        pool_name: &str,
    ) -> Result<Reported<Vec<DeviceInfo>>, Error> {
        self.info(pool_name).await
    }

    async fn dev_hosting(&self, path: &str) -> Result<Option<String>, Error> {
        Ok(Some(path.to_string()))
    }

    async fn un_dev_hosting(&self, _path: &str) -> Result<(), Error> {
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        SECTOR_SIZE
    }

    async fn get_usage(
        &self,
        device_name: &str,
    ) -> Result<Reported<u64>, Error> {
        let status = self.status(device_name).await.context(UsageSnafu {
            device: device_name,
        })?;
        let used = parse::used_bytes(&status).context(UsageSnafu {
            device: device_name,
        })?;
        Ok(Reported::Live(used))
    }

    async fn table(&self, device_name: &str) -> Result<String, Error> {
        self.dm(DmSubCmd::Table).arg(device_name).output().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_path() {
        assert_eq!(full_device_path("pool"), "/dev/mapper/pool");
        let once = full_device_path("pool-snap-1");
        assert_eq!(full_device_path(&once), once);
    }

    #[test]
    fn pool_path() {
        let provider = DmProvider::new(&ProviderConfig::default());
        assert_eq!(
            provider.get_full_pool_path("/ignored", "pool"),
            Reported::Live("/dev/mapper/pool".to_string())
        );
        assert_eq!(provider.sector_size(), 512);
        assert_eq!(provider.provider_name(), "dmsetup");
    }
}
