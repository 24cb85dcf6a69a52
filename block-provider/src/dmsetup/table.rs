//! Device-mapper table lines for the thin-pool and thin targets.

use super::{full_device_path, SECTOR_SIZE};

/// Low water mark of a thin-pool, in blocks of the pool block size.
/// Picked arbitrarily, might need tuning.
pub const LOW_WATER_MARK: u32 = 32768;
/// Skipping zeroing reduces the latency of device creation.
pub const SKIP_ZEROING: &str = "skip_block_zeroing";

/// Thin-pool table line for a data device of `data_size_bytes` bytes.
///
/// The thin-pool target has the following format:
///     start length thin-pool metadata_dev data_dev data_block_size
///     low_water_mark feature_args_count [feature_args]
/// where start and length are in sectors, data_block_size is in sectors
/// and low_water_mark is in data blocks.
pub fn thin_pool_table(
    data_size_bytes: u64,
    data_file: &str,
    meta_file: &str,
    block_size_sectors: u32,
) -> String {
    let length_sectors = data_size_bytes / SECTOR_SIZE as u64;
    format!(
        "0 {} thin-pool {} {} {} {} 1 {}",
        length_sectors,
        meta_file,
        data_file,
        block_size_sectors,
        LOW_WATER_MARK,
        SKIP_ZEROING
    )
}

/// Thin table line activating `device_id` of `pool_name`.
///
/// The thin target has the following format:
///     start length thin pool_dev dev_id [external_origin_dev]
/// where pool_dev is the thin-pool device, /dev/mapper/pool_name or 253:0,
/// and external_origin_dev an optional block device outside the pool to be
/// treated as a read-only snapshot origin.
pub fn thin_table(
    pool_name: &str,
    device_id: u32,
    size_bytes: u64,
    external_origin: &str,
) -> String {
    let length_sectors = size_bytes / SECTOR_SIZE as u64;
    format!(
        "0 {} thin {} {} {}",
        length_sectors,
        full_device_path(pool_name),
        device_id,
        external_origin
    )
    .trim()
    .to_string()
}
