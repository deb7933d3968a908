//! Firmware image sources.
//!
//! The image is an opaque byte blob of known length; it is never parsed.
//! Sources only need to report their size and serve random-access reads.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::checksum::Crc32;

/// Block size used when fingerprinting a whole image.
const CHECKSUM_BLOCK: usize = 4096;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to open image {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("Read of {len} bytes at offset {offset} failed: {source}")]
    Read {
        offset: u64,
        len: usize,
        source: std::io::Error,
    },
    #[error("Read of {len} bytes at offset {offset} is past the end of the image ({size} bytes)")]
    OutOfRange { offset: u64, len: usize, size: u64 },
    #[error("Image is {size} bytes, larger than the protocol's 32-bit length field")]
    TooLarge { size: u64 },
}

/// Finite, randomly-seekable byte sequence.
pub trait ImageSource {
    /// Total length in bytes.
    fn size(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ImageError>;

    /// Whole-image CRC-32, read block by block.
    fn crc32(&mut self) -> Result<u32, ImageError> {
        let size = self.size();
        let mut crc = Crc32::new();
        let mut buf = vec![0u8; CHECKSUM_BLOCK];
        let mut offset = 0u64;
        while offset < size {
            let len = (size - offset).min(CHECKSUM_BLOCK as u64) as usize;
            self.read_at(offset, &mut buf[..len])?;
            crc.update(&buf[..len]);
            offset += len as u64;
        }
        Ok(crc.finalize())
    }
}

fn check_range(offset: u64, len: usize, size: u64) -> Result<(), ImageError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ImageError::OutOfRange { offset, len, size }),
    }
}

/// Image backed by a file on disk.
#[derive(Debug)]
pub struct FileImage {
    file: File,
    size: u64,
}

impl FileImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let open_err = |source| ImageError::Open {
            path: path.display().to_string(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        let size = file.metadata().map_err(open_err)?.len();
        info!(path = %path.display(), size, "Opened image");
        Ok(Self { file, size })
    }
}

impl ImageSource for FileImage {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ImageError> {
        let len = buf.len();
        check_range(offset, len, self.size)?;
        let read_err = |source| ImageError::Read {
            offset,
            len,
            source,
        };
        self.file.seek(SeekFrom::Start(offset)).map_err(read_err)?;
        self.file.read_exact(buf).map_err(read_err)?;
        debug!(offset, len, "Read image range");
        Ok(())
    }
}

/// Image held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    data: Vec<u8>,
    /// Number of `read_at` calls served.
    reads: usize,
}

impl MemoryImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, reads: 0 }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl ImageSource for MemoryImage {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), ImageError> {
        check_range(offset, buf.len(), self.size())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        self.reads += 1;
        Ok(())
    }
}
