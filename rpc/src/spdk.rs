use serde::{Deserialize, Serialize};

/// Names of the json-rpc methods used to drive the spdk vhost target.
pub mod method {
    pub const BDEV_AIO_CREATE: &str = "bdev_aio_create";
    pub const BDEV_AIO_DELETE: &str = "bdev_aio_delete";
    pub const BDEV_LVOL_CREATE_LVSTORE: &str = "bdev_lvol_create_lvstore";
    pub const BDEV_LVOL_DELETE_LVSTORE: &str = "bdev_lvol_delete_lvstore";
    pub const BDEV_LVOL_CREATE: &str = "bdev_lvol_create";
    pub const BDEV_LVOL_DELETE: &str = "bdev_lvol_delete";
    pub const BDEV_LVOL_SNAPSHOT: &str = "bdev_lvol_snapshot";
    pub const VHOST_CREATE_BLK_CONTROLLER: &str =
        "vhost_create_blk_controller";
    pub const VHOST_DELETE_CONTROLLER: &str = "vhost_delete_controller";
    pub const VHOST_GET_CONTROLLERS: &str = "vhost_get_controllers";
}

/// register a file or block device as an aio bdev
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevAioCreateArgs {
    /// name of the bdev to create
    pub name: String,
    /// path of the backing file or device
    pub filename: String,
    /// logical block size of the bdev in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u32>,
}

/// unregister an aio bdev
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevAioDeleteArgs {
    pub name: String,
}

/// create a logical volume store on top of a bdev
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevLvolCreateLvstoreArgs {
    /// the base bdev
    pub bdev_name: String,
    /// name of the new store
    pub lvs_name: String,
    /// cluster size of the store in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_sz: Option<u64>,
}

/// destroy a logical volume store by name
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevLvolDeleteLvstoreArgs {
    pub lvs_name: String,
}

/// create a logical volume inside a store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevLvolCreateArgs {
    /// name of the volume, unique within the store
    pub lvol_name: String,
    /// size of the volume in MiB
    pub size_in_mib: u64,
    /// allocate clusters on first write only
    pub thin_provision: bool,
    /// name of the store to allocate from
    pub lvs_name: String,
}

/// destroy a logical volume, `name` is `<lvs_name>/<lvol_name>`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevLvolDeleteArgs {
    pub name: String,
}

/// take a read-only snapshot of a logical volume
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BdevLvolSnapshotArgs {
    /// source volume as `<lvs_name>/<lvol_name>`
    pub lvol_name: String,
    /// name of the snapshot volume
    pub snapshot_name: String,
}

/// expose a bdev through a vhost-blk controller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VhostCreateBlkControllerArgs {
    /// controller name, also the name of its socket
    pub ctrlr: String,
    /// the bdev served by the controller
    pub dev_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VhostDeleteControllerArgs {
    pub ctrlr: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VhostGetControllersArgs {
    /// restrict the listing to this controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// representation of a vhost controller
#[derive(Clone, Debug, Deserialize)]
pub struct VhostController {
    pub ctrlr: String,
    #[serde(default)]
    pub cpumask: String,
    #[serde(default)]
    pub socket: Option<String>,
    // ... other fields which are not used by us (i.e. coalescing, etc.)
    #[serde(default)]
    pub backend_specific: serde_json::Value,
}
