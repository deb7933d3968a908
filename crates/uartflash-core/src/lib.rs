//! uartflash-core: host side of a UART bootloader flashing protocol.
//!
//! Streams a firmware image to a microcontroller bootloader over a serial
//! link: handshake, image metadata, fixed-size chunk frames each carrying a
//! CRC-8, then a jump-to-application signal. Every step is acknowledged by
//! the target and retried within a bounded budget.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Constants, acknowledgement tokens, frame encoding
//! - **Checksum**: CRC-8 per chunk, streaming CRC-32 over the image
//! - **Transport**: Byte-channel abstraction (serial port, mock)
//! - **Image**: Random-access image sources (file, memory)
//! - **State**: Protocol states and their entry actions
//! - **Events**: Observer pattern for UI decoupling
//! - **Engine**: Drives a [`Session`] through the state machine
//!
//! # Example
//!
//! ```no_run
//! use uartflash_core::{FileImage, FlashConfig, ProtocolEngine, SerialTransport};
//!
//! let config = FlashConfig::default();
//! let transport = SerialTransport::open("/dev/ttyUSB0", &config.serial)?;
//! let image = FileImage::open("firmware.bin")?;
//!
//! let mut engine = ProtocolEngine::new(transport, image, config.protocol)?;
//! let report = engine.flash(0x0800_4000)?;
//! println!("sent {} bytes, crc32 0x{:08X}", report.bytes_sent, report.image_crc32);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checksum;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod image;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use checksum::{Crc32, crc8, crc32};
pub use config::{ConfigError, FlashConfig, ProtocolConfig, SerialSettings};
pub use engine::ProtocolEngine;
pub use error::{FlashError, Stage};
pub use events::{FlashEvent, FlashObserver, NullObserver, PacketDirection, TracingObserver};
pub use image::{FileImage, ImageError, ImageSource, MemoryImage};
pub use protocol::{AckKind, Acknowledgement, Chunk};
pub use session::{FlashReport, Session};
pub use state::ProtocolState;
pub use transport::{MockReply, MockTransport, SerialTransport, Transport, TransportError};
