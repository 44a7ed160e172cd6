//! # PortalFrame CLI
//!
//! Runs a portal on the host: the display is an in-memory framebuffer that
//! can be mirrored to a PNG file after every frame.
//!
//! ## Usage
//!
//! ```bash
//! # Fetch once and save the resulting frame
//! portalframe fetch --config portal.json --secrets secrets.json --snapshot frame.png
//!
//! # Poll every five minutes
//! portalframe run --config portal.json --secrets secrets.json --interval 300
//!
//! # Render a QR code
//! portalframe qr "https://example.com" --size 128 --png qr.png
//! ```

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use portalframe::{Board, Color, Credentials, Portal, PortalConfig, PortalError, qr};

/// PortalFrame - internet display driver
#[derive(Parser, Debug)]
#[command(name = "portalframe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch once and render
    Fetch {
        /// Portal configuration file
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// WiFi secrets file
        #[arg(long, value_name = "FILE", default_value = "secrets.json")]
        secrets: PathBuf,

        /// Mirror every frame to this PNG file
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },

    /// Fetch on a fixed interval until interrupted
    Run {
        /// Portal configuration file
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// WiFi secrets file
        #[arg(long, value_name = "FILE", default_value = "secrets.json")]
        secrets: PathBuf,

        /// Mirror every frame to this PNG file
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Seconds between fetches
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Render a QR code to PNG
    Qr {
        /// Payload to encode
        data: String,

        /// Edge length in pixels (multiple of 32)
        #[arg(long, default_value = "128")]
        size: usize,

        /// Output file
        #[arg(long, value_name = "FILE")]
        png: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), PortalError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            config,
            secrets,
            snapshot,
        } => {
            let config = load_config(&config)?;
            let credentials = Credentials::load(&secrets)?;
            let mut portal = Portal::new(Board::host(&config, snapshot)?, &config, credentials)?;
            let result = portal.fetch()?;
            println!("{:?}", result);
        }

        Commands::Run {
            config,
            secrets,
            snapshot,
            interval,
        } => {
            let config = load_config(&config)?;
            let credentials = Credentials::load(&secrets)?;
            poll(&config, &credentials, snapshot, Duration::from_secs(interval))?;
        }

        Commands::Qr { data, size, png } => {
            init_logging(false);
            save_qr(&data, size, &png)?;
            println!("Saved to {}", png.display());
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<PortalConfig, PortalError> {
    let config = PortalConfig::load(path)?;
    init_logging(config.debug);
    Ok(config)
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Supervisor loop. Ordinary fetch failures are retried on the next tick;
/// memory exhaustion tears the portal down and brings it up again.
fn poll(
    config: &PortalConfig,
    credentials: &Credentials,
    snapshot: Option<PathBuf>,
    interval: Duration,
) -> Result<(), PortalError> {
    loop {
        let board = Board::host(config, snapshot.clone())?;
        let mut portal = Portal::new(board, config, credentials.clone())?;

        loop {
            match portal.fetch() {
                Ok(result) => info!("Fetched {:?}", result),
                Err(e) if e.requires_restart() => {
                    warn!("{}; restarting", e);
                    break;
                }
                Err(e) => warn!("Fetch failed: {}", e),
            }
            thread::sleep(interval);
        }
    }
}

/// Save a QR code as a black-on-white PNG
fn save_qr(data: &str, size: usize, path: &Path) -> Result<(), PortalError> {
    use image::RgbImage;

    let bitmap = qr::render(data, size)?.with_foreground(Color::BLACK);
    let mut img = RgbImage::new(size as u32, size as u32);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = bitmap.color_at(x as usize, y as usize).to_rgb();
    }

    img.save(path)
        .map_err(|e| PortalError::Display(format!("Failed to save PNG: {}", e)))?;

    Ok(())
}
