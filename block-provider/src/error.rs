use nix::errno::Errno;
use snafu::Snafu;

/// Errors returned by the block providers.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to spawn/wait for {command}: {source}"))]
    ToolSpawn {
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("{command}\nerror: {output}"))]
    ToolFailed { command: String, output: String },
    #[snafu(display("{command}: {errno}"))]
    Classified { command: String, errno: Errno },
    #[snafu(display("Failed to parse {what} {input:?}: {reason}"))]
    Parse {
        what: String,
        input: String,
        reason: String,
    },
    #[snafu(display("Failed to get block device size: {path}: {source}"))]
    DeviceSize {
        path: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
    #[snafu(display("Can't get status for device {device:?}: {source}"))]
    Usage {
        device: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
    #[snafu(display("Failed to reach json-rpc server at {socket}: {source}"))]
    RpcConnect {
        socket: String,
        source: jsonrpc::error::Error,
    },
    #[snafu(display("{method} failed: {source}"))]
    Rpc {
        method: String,
        source: jsonrpc::error::Error,
    },
    #[snafu(display("{operation} is not implemented by {provider}"))]
    NotImplemented {
        provider: String,
        operation: String,
    },
    #[snafu(display("Invalid block provider name {name:?}"))]
    InvalidProvider { name: String },
    #[snafu(display("Failed to read config file {path}: {source}"))]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse config file {path}: {source}"))]
    ConfigParse {
        path: String,
        source: serde_yaml::Error,
    },
}

impl Error {
    /// The system error code the failure was classified as, if any.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::Classified {
                errno,
                ..
            } => Some(*errno),
            Error::DeviceSize {
                source,
                ..
            }
            | Error::Usage {
                source,
                ..
            } => source.errno(),
            _ => None,
        }
    }

    /// The device is absent, which removal treats as done.
    pub fn is_no_such_device(&self) -> bool {
        matches!(self.errno(), Some(Errno::ENXIO | Errno::ENODEV))
    }
}

/// Map an error onto the closest system error code.
pub trait ToErrno {
    fn to_errno(self) -> Errno;
}

impl ToErrno for Error {
    fn to_errno(self) -> Errno {
        match self {
            Error::ToolSpawn {
                ..
            } => Errno::EIO,
            Error::ToolFailed {
                ..
            } => Errno::EIO,
            Error::Classified {
                errno,
                ..
            } => errno,
            Error::Parse {
                ..
            } => Errno::EIO,
            Error::DeviceSize {
                source,
                ..
            } => (*source).to_errno(),
            Error::Usage {
                source,
                ..
            } => (*source).to_errno(),
            Error::RpcConnect {
                ..
            } => Errno::ENOTCONN,
            Error::Rpc {
                source,
                ..
            } => source.errno().unwrap_or(Errno::EIO),
            Error::NotImplemented {
                ..
            } => Errno::ENOSYS,
            Error::InvalidProvider {
                ..
            } => Errno::EINVAL,
            Error::ConfigRead {
                source,
                ..
            } => source
                .raw_os_error()
                .map(Errno::from_i32)
                .unwrap_or(Errno::EIO),
            Error::ConfigParse {
                ..
            } => Errno::EINVAL,
        }
    }
}
