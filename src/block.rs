//! Contracts for the stream abstractions the codecs read from and write to.
//!
//! The tar codecs consume fixed 512-byte blocks through `BlockFile`; the
//! zip codec consumes arbitrary byte runs through `CharFile`. Block reads
//! strictly follow archive order and the cursor is never rewound.

use std::io;
use std::io::{Read, Write};

use crate::errors::HeaderError;

/// Size of a single tar record on disk.
pub const BLOCK_SIZE: usize = 512;

/// A 512-byte aligned unit of a tar stream.
pub type Block = [u8; BLOCK_SIZE];

/// Stream of fixed 512-byte blocks with a cursor.
pub trait BlockFile {
    /// The block at the cursor.
    fn current(&mut self) -> Result<Block, HeaderError>;

    /// Advance the cursor one block and yield the new current block.
    fn next(&mut self) -> Result<Block, HeaderError>;

    /// Append a full block at the end of the stream.
    fn append(&mut self, block: &Block) -> Result<(), HeaderError>;

    /// Diagnostic name of the underlying file.
    fn file_name(&self) -> &str;
}

/// Byte-oriented stream with exact reads, used by the zip codec.
pub trait CharFile {
    /// Read exactly `n` bytes from the cursor.
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, HeaderError>;

    /// Write the given bytes at the cursor.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), HeaderError>;
}

impl<T: Read + Write> CharFile for T {
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, HeaderError> {
        let mut buf = vec![0; n];
        let mut got = 0;

        while got < n {
            match self.read(&mut buf[got..]) {
                Ok(0) => return Err(HeaderError::ShortRead { wanted: n, got }),
                Ok(len) => got += len,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(HeaderError::Io(e)),
            }
        }

        Ok(buf)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), HeaderError> {
        self.write_all(bytes)?;

        Ok(())
    }
}

/// In-memory block file over a flat byte buffer.
///
/// Buffers whose length is not a multiple of 512 are padded with zeroes up
/// to the next block boundary, matching how tar streams are framed.
pub struct MemoryBlockFile {
    name: String,
    buffer: Vec<u8>,
    cursor: usize,
}

impl MemoryBlockFile {
    pub fn new(name: &str) -> MemoryBlockFile {
        MemoryBlockFile {
            name: name.to_string(),
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn from_bytes(name: &str, mut bytes: Vec<u8>) -> MemoryBlockFile {
        let partial = bytes.len() % BLOCK_SIZE;

        if partial != 0 {
            bytes.resize(bytes.len() + BLOCK_SIZE - partial, 0);
        }

        MemoryBlockFile {
            name: name.to_string(),
            buffer: bytes,
            cursor: 0,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Reset the cursor to the first block.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn block_at(&self, index: usize) -> Result<Block, HeaderError> {
        let start = index * BLOCK_SIZE;

        if start + BLOCK_SIZE > self.buffer.len() {
            return Err(HeaderError::ShortRead {
                wanted: BLOCK_SIZE,
                got: self.buffer.len().saturating_sub(start),
            });
        }

        let mut block = [0; BLOCK_SIZE];
        block.copy_from_slice(&self.buffer[start..start + BLOCK_SIZE]);

        Ok(block)
    }
}

impl BlockFile for MemoryBlockFile {
    fn current(&mut self) -> Result<Block, HeaderError> {
        self.block_at(self.cursor)
    }

    fn next(&mut self) -> Result<Block, HeaderError> {
        self.cursor += 1;
        self.block_at(self.cursor)
    }

    fn append(&mut self, block: &Block) -> Result<(), HeaderError> {
        self.buffer.extend_from_slice(block);

        Ok(())
    }

    fn file_name(&self) -> &str {
        &self.name
    }
}
