use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use uartflash_core::{
    FileImage, FlashConfig, FlashReport, ImageSource, ProtocolEngine, SerialTransport,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "UART bootloader flashing tool", long_about = None)]
struct Args {
    /// Firmware image to flash (raw binary)
    image: PathBuf,

    /// Serial device the bootloader listens on (e.g. /dev/ttyUSB0)
    device: String,

    /// Target base address, hex (0x0800_4000) or decimal
    #[arg(value_parser = parse_address)]
    base_address: u32,

    /// Baud rate, overrides the config file
    #[arg(short, long)]
    baud: Option<u32>,

    /// TOML file with serial and protocol settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_address(s: &str) -> Result<u32, String> {
    let cleaned = s.trim().replace('_', "");
    let parsed = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => cleaned.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn load_config(args: &Args) -> Result<FlashConfig> {
    let mut config = match &args.config {
        Some(path) => FlashConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FlashConfig::default(),
    };
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    Ok(config)
}

fn flash(args: &Args) -> Result<FlashReport> {
    let config = load_config(args)?;

    let image = FileImage::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image.display()))?;
    let transport = SerialTransport::open(&args.device, &config.serial)
        .with_context(|| format!("Failed to open serial device {}", args.device))?;

    let mut engine = ProtocolEngine::new(transport, image, config.protocol)?;
    let report = engine
        .flash(args.base_address)
        .with_context(|| format!("Flashing {} failed", args.image.display()))?;

    // Compare what the target acknowledged with the file on disk.
    let (_, mut image) = engine.into_parts();
    let source_crc = image.crc32().context("Failed to checksum image")?;
    if source_crc != report.image_crc32 {
        warn!(
            delivered = %format!("0x{:08X}", report.image_crc32),
            source = %format!("0x{:08X}", source_crc),
            "Delivered CRC-32 differs from image file"
        );
        anyhow::bail!(
            "CRC-32 mismatch: delivered 0x{:08X}, image file 0x{:08X}",
            report.image_crc32,
            source_crc
        );
    }

    Ok(report)
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(
        image = %args.image.display(),
        device = %args.device,
        base = %format!("0x{:08X}", args.base_address),
        "Starting uartflash"
    );

    match flash(&args) {
        Ok(report) => {
            println!(
                "Flashed {} bytes to 0x{:08X}",
                report.bytes_sent, report.target_base_address
            );
            println!("  frames:  {} ({} resent)", report.frames_sent, report.resends);
            println!("  crc32:   0x{:08X}", report.image_crc32);
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("uartflash: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_hex() {
        assert_eq!(parse_address("0x08004000"), Ok(0x0800_4000));
        assert_eq!(parse_address("0X0800_4000"), Ok(0x0800_4000));
        assert_eq!(parse_address("0xffffffff"), Ok(u32::MAX));
    }

    #[test]
    fn test_parse_address_decimal() {
        assert_eq!(parse_address("134234112"), Ok(0x0800_4000));
        assert_eq!(parse_address("0"), Ok(0));
        assert_eq!(parse_address("1_000"), Ok(1000));
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("0x1_0000_0000").is_err());
        assert!(parse_address("flash").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "uartflash",
            "fw.bin",
            "/dev/ttyUSB0",
            "0x0800_4000",
            "--baud",
            "921600",
        ])
        .unwrap();
        assert_eq!(args.base_address, 0x0800_4000);
        assert_eq!(args.baud, Some(921600));

        let config = load_config(&args).unwrap();
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.protocol, Default::default());
    }
}
