//! Thin-provisioned block devices used as per-container writable layers.
//!
//! A [`BlockProvider`] exposes the pool and device lifecycle (create pool,
//! create/activate/suspend/resume/delete device, snapshot, introspection and
//! usage) over one of two mechanisms:
//!  - `dmsetup`: the kernel thin-provisioning targets, driven through the
//!    dmsetup command line tool.
//!  - `spdkvhost`: an spdk vhost target, driven through its json-rpc socket,
//!    where pools are logical volume stores and devices are thin logical
//!    volumes served by vhost-blk controllers.
//!
//! Callers serialize conflicting operations on the same pool or device;
//! nothing in here locks, retries or caches.

pub mod config;
pub mod device;
pub mod dmsetup;
mod errno;
pub mod error;
pub mod logger;
pub mod provider;
pub mod spdkvhost;

pub use config::ProviderConfig;
pub use device::{DeactivateOpt, DeviceInfo, DeviceStatus, Reported};
pub use error::{Error, ToErrno};
pub use provider::{block_provider, BlockProvider, ProviderKind};

pub type Result<T, E = Error> = std::result::Result<T, E>;
