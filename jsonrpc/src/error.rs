//! json-rpc error enum which contains all different errors which can happen
//! when sending request and processing reply from json-rpc server.

use nix::errno::Errno;
use snafu::Snafu;
use std::io;

/// Error codes carried in the error object of a json-rpc reply. Servers
/// built on top of spdk report negative errno values next to the codes
/// reserved by json-rpc 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    NotFound,
    AlreadyExists,
    Busy,
}

impl RpcCode {
    /// Map a raw json-rpc error code to the typed code.
    pub fn from_raw(code: i32) -> Self {
        match code {
            -32700 => RpcCode::ParseError,
            -32600 => RpcCode::InvalidRequest,
            -32601 => RpcCode::MethodNotFound,
            -32602 => RpcCode::InvalidParams,
            -32603 => RpcCode::InternalError,
            val => match errno_of(val) {
                Some(Errno::ENOENT | Errno::ENODEV | Errno::ENXIO) => {
                    RpcCode::NotFound
                }
                Some(Errno::EEXIST) => RpcCode::AlreadyExists,
                Some(Errno::EBUSY) => RpcCode::Busy,
                Some(_) => RpcCode::InternalError,
                None => {
                    tracing::error!("Unknown json-rpc error code {}", val);
                    RpcCode::InternalError
                }
            },
        }
    }
}

/// Negative values outside of the reserved json-rpc range are errnos.
pub(crate) fn errno_of(code: i32) -> Option<Errno> {
    if code >= 0 || code <= -32000 {
        return None;
    }
    match Errno::from_i32(-code) {
        Errno::UnknownErrno => None,
        errno => Some(errno),
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid json-rpc version"))]
    InvalidVersion {},
    #[snafu(display("Invalid ID of json-rpc reply"))]
    InvalidReplyId {},
    #[snafu(display("IO error: {}", source))]
    IoError { source: io::Error },
    #[snafu(display("Invalid json reply: {}", source))]
    ParseError { source: serde_json::Error },
    #[snafu(display("Error connecting to {}: {}", sock, source))]
    ConnectError { sock: String, source: io::Error },
    #[snafu(display("Json-rpc error {:?} ({}): {}", code, raw, msg))]
    RpcError { code: RpcCode, raw: i32, msg: String },
}

impl Error {
    /// The errno reported by the server, if the reply carried one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::RpcError {
                raw,
                ..
            } => errno_of(*raw),
            _ => None,
        }
    }

    /// Whether the server replied that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RpcError {
                code: RpcCode::NotFound,
                ..
            }
        )
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::IoError {
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::ParseError {
            source,
        }
    }
}
