//! Bad Sector Simulator - fault-injecting access to disk images.
//!
//! Opens a disk image through the simulator so reads and writes see the
//! configured bad sectors, and runs one or more operations against it.

use anyhow::{Context, Result};
use badsector_sim::batch::run_script;
use badsector_sim::sector::format_sector_spec;
use badsector_sim::{DeviceConfig, Engine};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "badsector-sim")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Simulate bad sectors on a disk image",
    long_about = "Reads and writes a disk image as if it were a drive with bad sectors. Reads touching a bad sector fail; writes remap bad sectors to a limited reserve."
)]
struct Cli {
    #[command(flatten)]
    device: DeviceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DeviceArgs {
    /// Path to the disk image to filter
    #[arg(short = 'i', long, global = true)]
    disk_image: Option<PathBuf>,

    /// List of bad sectors, use , to delimit and - for ranges (e.g. 10-20,64)
    #[arg(short = 's', long, global = true)]
    bad_sectors: Option<String>,

    /// Number of reserve sectors for reallocation on write (default: 0)
    #[arg(short = 'r', long, global = true)]
    reserve_sectors: Option<u64>,

    /// JSON device configuration; other device flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show device geometry and fault state
    Info,

    /// Read bytes from the device
    Read {
        /// Byte offset to read from
        #[arg(long)]
        offset: u64,

        /// Number of bytes to read
        #[arg(long)]
        length: usize,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the data as hex
        #[arg(long, conflicts_with = "output")]
        hex: bool,
    },

    /// Write bytes to the device
    Write {
        /// Byte offset to write at
        #[arg(long)]
        offset: u64,

        /// Input file to write
        #[arg(long, conflicts_with_all = ["data", "hex_data"])]
        input: Option<PathBuf>,

        /// String data to write
        #[arg(long, conflicts_with = "hex_data")]
        data: Option<String>,

        /// Hex-encoded data to write
        #[arg(long)]
        hex_data: Option<String>,
    },

    /// Run a script of operations in one session
    Batch {
        /// Script file (default: stdin)
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.device.into_config()?;
    let engine = Engine::open(&config)
        .with_context(|| format!("failed to open {}", config.disk_image.display()))?;

    let result = match cli.command {
        Commands::Info => cmd_info(&engine, &config),

        Commands::Read {
            offset,
            length,
            output,
            hex,
        } => cmd_read(&engine, offset, length, output, hex),

        Commands::Write {
            offset,
            input,
            data,
            hex_data,
        } => cmd_write(&engine, offset, input, data, hex_data),

        Commands::Batch { script } => cmd_batch(&engine, script),
    };

    let shutdown = engine.shutdown().context("failed to shut down device");
    result?;
    shutdown
}

impl DeviceArgs {
    fn into_config(self) -> Result<DeviceConfig> {
        let mut config = match &self.config {
            Some(path) => DeviceConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => {
                let disk_image = self
                    .disk_image
                    .clone()
                    .context("a disk image is required (--disk-image or --config)")?;
                DeviceConfig::new(disk_image)
            }
        };

        if let Some(disk_image) = self.disk_image {
            config.disk_image = disk_image;
        }
        if let Some(bad_sectors) = self.bad_sectors {
            config.bad_sectors = bad_sectors;
        }
        if let Some(reserve) = self.reserve_sectors {
            config.reserve_sectors = reserve;
        }

        Ok(config)
    }
}

fn cmd_info(engine: &Engine, config: &DeviceConfig) -> Result<()> {
    let geometry = engine.geometry();
    let stats = engine.stats();
    let bad = engine.bad_sectors();

    println!("Bad Sector Simulator");
    println!("====================");
    println!("Disk image:       {}", config.disk_image.display());
    println!("Device size:      {} bytes", geometry.device_size);
    println!("Sector size:      {} bytes", geometry.sector_size);
    println!("Sectors:          {}", geometry.sector_count());
    println!();
    println!("Faults:");
    println!("  Bad sectors:    {}", stats.bad_sectors);
    if !bad.is_empty() {
        println!("  List:           {}", format_sector_spec(&bad));
    }
    println!("  Reserve:        {}", stats.reserve_remaining);

    Ok(())
}

fn cmd_read(
    engine: &Engine,
    offset: u64,
    length: usize,
    output: Option<PathBuf>,
    as_hex: bool,
) -> Result<()> {
    let data = engine.read(offset, length)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &data)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None if as_hex => println!("{}", hex::encode(&data)),
        None => io::stdout().write_all(&data)?,
    }

    Ok(())
}

fn cmd_write(
    engine: &Engine,
    offset: u64,
    input: Option<PathBuf>,
    data: Option<String>,
    hex_data: Option<String>,
) -> Result<()> {
    let content = match (input, data, hex_data) {
        (Some(path), None, None) => std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, Some(s), None) => s.into_bytes(),
        (None, None, Some(h)) => hex::decode(h.trim()).context("invalid hex data")?,
        (None, None, None) => {
            // Read from stdin
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
        _ => unreachable!("clap rejects conflicting inputs"),
    };

    let written = engine.write(offset, &content)?;
    println!("Wrote {} of {} bytes at offset {}", written, content.len(), offset);

    Ok(())
}

fn cmd_batch(engine: &Engine, script: Option<PathBuf>) -> Result<()> {
    let stdout = io::stdout();
    let summary = match script {
        Some(path) => {
            let file =
                File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
            run_script(engine, BufReader::new(file), stdout.lock())?
        }
        None => run_script(engine, io::stdin().lock(), stdout.lock())?,
    };

    eprintln!(
        "{} operations, {} device faults",
        summary.operations, summary.faults
    );

    Ok(())
}
