//! Protocol module - wire format definitions.

pub mod ack;
pub mod constants;
pub mod frame;

pub use ack::{ACK_LEN, AckKind, Acknowledgement};
pub use constants::*;
pub use frame::{Chunk, encode_metadata};
