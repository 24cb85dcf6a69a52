//! Argument and reply records exchanged with the storage control plane.
//! The records mirror the json schema of the spdk json-rpc methods, field
//! names included, so that they can be handed to `jsonrpc::call` as is.

pub mod spdk;
