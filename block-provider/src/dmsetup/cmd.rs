use crate::{
    errno,
    error::{Error, ToolSpawnSnafu},
};

use nix::errno::Errno;
use snafu::ResultExt;
use std::{ffi::OsStr, fmt, process::Output};
use strum_macros::{AsRefStr, Display};
use tokio::process::Command;
use tracing::trace;

/// The dmsetup commands used to manage thin pools and thin devices.
#[derive(Debug, Clone, Copy, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub(super) enum DmSubCmd {
    /// Create a device from a table.
    Create,
    /// Load a table into the inactive slot of an existing device.
    Reload,
    /// Remove a device.
    Remove,
    /// Send a message to a target, e.g. to a thin-pool.
    Message,
    /// Suspend I/O on a device.
    Suspend,
    /// Resume I/O, swapping in the inactive table if there is one.
    Resume,
    /// Print the status of the device targets.
    Status,
    /// Print device information.
    Info,
    /// Print the live table of a device.
    Table,
    /// Print the library and driver versions.
    Version,
}

/// dmsetup wrapper which captures the combined output of the command and
/// maps failures onto system error codes where the output allows it.
pub(super) struct DmCmd<'a> {
    bin: &'a str,
    sub: DmSubCmd,
    args: Vec<String>,
}

impl<'a> DmCmd<'a> {
    /// Prepare `sub` to be run with the dmsetup binary `bin`.
    pub(super) fn new(bin: &'a str, sub: DmSubCmd) -> Self {
        Self {
            bin,
            sub,
            args: Vec::new(),
        }
    }
    /// See help for `Command::arg`.
    pub(super) fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }
    /// See help for `Command::args`.
    pub(super) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
    /// Runs the command, discarding its output.
    pub(super) async fn run(self) -> Result<(), Error> {
        self.output().await.map(|_| ())
    }
    /// Runs the command and returns its trimmed output.
    ///
    /// # Errors
    ///
    /// `Error::ToolSpawn` => Failed to execute or await for completion.
    /// `Error::Classified` => Exited with an error the output names.
    /// `Error::ToolFailed` => Exited with any other error.
    pub(super) async fn output(self) -> Result<String, Error> {
        let command = self.to_string();
        let sub: &str = self.sub.as_ref();
        let args = std::iter::once(sub)
            .chain(self.args.iter().map(String::as_str));
        let output = spawn(self.bin, args, &command).await?;
        let text = combined_output(&output);

        if !output.status.success() {
            return Err(match parse_dm_error(&text) {
                Some(errno) => Error::Classified {
                    command,
                    errno,
                },
                None => Error::ToolFailed {
                    command,
                    output: text,
                },
            });
        }

        Ok(text.trim().to_string())
    }
}

impl fmt::Display for DmCmd<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.bin, self.sub)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Spawn `bin` and wait for its exit, capturing stdout and stderr.
pub(super) async fn spawn<I, S>(
    bin: &str,
    args: I,
    command: &str,
) -> Result<Output, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmder = Command::new(bin);
    cmder.args(args);
    trace!("{:?}", cmder);

    cmder.output().await.context(ToolSpawnSnafu {
        command,
    })
}

/// Stdout followed by stderr, the tools only write diagnostics to stderr.
pub(super) fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// dmsetup reports failures in the format:
///     device-mapper: message ioctl on <name> failed: File exists\n
///     Command failed\n
/// The text after the last "failed: " of the first line is looked up as the
/// description of an errno. A first line like
///     Device /dev/mapper/pool-snap-1 not found
/// means the device does not exist.
pub(crate) fn parse_dm_error(output: &str) -> Option<Errno> {
    const FAILED: &str = "failed: ";

    let line = output.split('\n').next().unwrap_or_default();
    if line.ends_with("not found") {
        return Some(Errno::ENXIO);
    }

    let idx = line.rfind(FAILED)?;
    errno::lookup(&line[idx + FAILED.len() ..])
}
