//! Diagnostic utility driving a block provider from the command line, one
//! operation per invocation.

use block_provider::{
    block_provider,
    logger,
    BlockProvider,
    DeactivateOpt,
    ProviderConfig,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(
    name = "thinctl",
    about = "Thin pool and thin device management utility",
    version
)]
struct CliArgs {
    /// YAML configuration file of the provider.
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,
    /// Block provider to use: dmsetup (default) or spdkvhost.
    #[clap(short = 'p', long, env = "BLOCK_PROVIDER")]
    provider: Option<String>,
    /// json-rpc socket of the spdk target.
    #[clap(short = 's', long, env = "SPDK_RPC_SOCKET")]
    socket: Option<String>,
    /// Log level used when RUST_LOG is not set.
    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the version of the backend.
    Version,
    /// Print information about a device, or all devices.
    Info { name: Option<String> },
    /// Print information about a pool.
    InfoPool { name: String },
    /// Print the table of a device.
    Table { name: String },
    /// Print the bytes used by a thin device.
    Usage { name: String },
    /// Create a thin pool.
    CreatePool(PoolArgs),
    /// Reload the table of an existing thin pool.
    ReloadPool(PoolArgs),
    /// Remove a thin pool.
    RemovePool {
        name: String,
        #[clap(flatten)]
        opts: DeactivateArgs,
    },
    /// Allocate a thin device in a pool.
    CreateDevice {
        pool: String,
        id: u32,
        /// Size in bytes.
        size: u64,
    },
    /// Snapshot a thin device.
    CreateSnapshot { pool: String, id: u32, base: u32 },
    /// Release a thin device.
    DeleteDevice { pool: String, id: u32 },
    /// Expose a thin device under a name.
    Activate {
        pool: String,
        name: String,
        id: u32,
        /// Size in bytes.
        size: u64,
        /// Read-only block device the thin device overlays.
        #[clap(long, default_value = "")]
        origin: String,
    },
    /// Remove an exposed device.
    Deactivate {
        name: String,
        #[clap(flatten)]
        opts: DeactivateArgs,
    },
    /// Suspend I/O on a device.
    Suspend { name: String },
    /// Resume I/O on a device.
    Resume { name: String },
    /// Print the full path of a device.
    Path { name: String },
}

#[derive(Debug, clap::Args)]
struct PoolArgs {
    name: String,
    data: String,
    meta: String,
    /// Data block size in sectors.
    #[clap(default_value_t = 128)]
    block_size: u32,
}

#[derive(Debug, clap::Args)]
struct DeactivateArgs {
    #[clap(long)]
    force: bool,
    #[clap(long)]
    retry: bool,
    #[clap(long)]
    deferred: bool,
}

impl DeactivateArgs {
    fn opts(&self) -> Vec<DeactivateOpt> {
        [
            (self.force, DeactivateOpt::Force),
            (self.retry, DeactivateOpt::Retry),
            (self.deferred, DeactivateOpt::Deferred),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, opt)| *opt)
        .collect()
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(
    provider: &dyn BlockProvider,
    cmd: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Version => print_json(&provider.version().await?)?,
        Command::Info {
            name,
        } => print_json(&provider.info(&name.unwrap_or_default()).await?)?,
        Command::InfoPool {
            name,
        } => print_json(&provider.info_pool(&name).await?)?,
        Command::Table {
            name,
        } => println!("{}", provider.table(&name).await?),
        Command::Usage {
            name,
        } => print_json(&provider.get_usage(&name).await?)?,
        Command::CreatePool(args) => {
            let PoolArgs {
                name,
                data,
                meta,
                block_size,
            } = args;
            provider.create_pool(&name, &data, &meta, block_size).await?
        }
        Command::ReloadPool(args) => {
            let PoolArgs {
                name,
                data,
                meta,
                block_size,
            } = args;
            provider.reload_pool(&name, &data, &meta, block_size).await?
        }
        Command::RemovePool {
            name,
            opts,
        } => provider.remove_pool(&name, &opts.opts()).await?,
        Command::CreateDevice {
            pool,
            id,
            size,
        } => provider.create_device(&pool, id, size).await?,
        Command::CreateSnapshot {
            pool,
            id,
            base,
        } => provider.create_snapshot(&pool, id, base).await?,
        Command::DeleteDevice {
            pool,
            id,
        } => provider.delete_device(&pool, id).await?,
        Command::Activate {
            pool,
            name,
            id,
            size,
            origin,
        } => {
            provider
                .activate_device(&pool, &name, id, size, &origin)
                .await?
        }
        Command::Deactivate {
            name,
            opts,
        } => provider.deactivate_device(&name, &opts.opts()).await?,
        Command::Suspend {
            name,
        } => provider.suspend_device(&name).await?,
        Command::Resume {
            name,
        } => provider.resume_device(&name).await?,
        Command::Path {
            name,
        } => println!("{}", provider.get_full_device_path(&name)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    logger::init(&args.log_level);

    let mut config = match &args.config {
        Some(path) => ProviderConfig::load(path)?,
        None => ProviderConfig::default(),
    };
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(socket) = args.socket {
        config.spdk_rpc_socket = socket;
    }

    let provider = block_provider(&config.provider, &config).await?;
    let result = run(provider.as_ref(), args.cmd).await;
    provider.close();
    result
}
