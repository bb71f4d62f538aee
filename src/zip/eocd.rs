//! Read and write the zip end-of-central-directory record.
//!
//! The record sits at the tail of every zip archive: a 4-byte signature,
//! seven little-endian fields totalling 18 bytes, then a free-form
//! comment whose length is the last of those fields.

use log::trace;

use crate::block::CharFile;
use crate::errors::HeaderError;

/// Little-endian signature bytes opening the record.
pub const SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

/// Length of the fixed portion, signature included.
pub const FIXED_LENGTH: usize = 22;

/// The end-of-central-directory record terminating a zip archive.
///
/// This codec targets single-disk archives, so the disk numbers and the
/// per-disk entry count are derived storage: they synchronize whenever
/// the total entry count changes, and the stored comment length always
/// tracks the comment bytes. None of them are independently writable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EndOfCentralDirectory {
    disk_number: u16,
    central_directory_disk: u16,
    entries_on_disk: u16,
    total_entries: u16,
    central_directory_size: u32,
    central_directory_start: u32,
    comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    pub fn new() -> EndOfCentralDirectory {
        EndOfCentralDirectory::default()
    }

    /// True when the given bytes open an end-of-central-directory record.
    pub fn is_signature(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[..4] == SIGNATURE
    }

    /// Read a record from the cursor, verifying the signature first.
    pub fn read(file: &mut dyn CharFile) -> Result<EndOfCentralDirectory, HeaderError> {
        let signature = file.read_bytes(4)?;

        if !EndOfCentralDirectory::is_signature(&signature) {
            return Err(HeaderError::BadSignature);
        }

        EndOfCentralDirectory::read_after_signature(file)
    }

    /// Read a record whose signature has already been consumed.
    pub fn read_after_signature(
        file: &mut dyn CharFile,
    ) -> Result<EndOfCentralDirectory, HeaderError> {
        let fixed = file.read_bytes(FIXED_LENGTH - 4)?;

        let mut record = EndOfCentralDirectory {
            disk_number: le_u16(&fixed[0..2]),
            central_directory_disk: le_u16(&fixed[2..4]),
            entries_on_disk: le_u16(&fixed[4..6]),
            total_entries: le_u16(&fixed[6..8]),
            central_directory_size: le_u32(&fixed[8..12]),
            central_directory_start: le_u32(&fixed[12..16]),
            comment: Vec::new(),
        };

        let comment_length = le_u16(&fixed[16..18]) as usize;
        record.comment = file.read_bytes(comment_length)?;

        trace!(
            "end of central directory: {} entries, {} comment bytes",
            record.total_entries,
            comment_length
        );

        Ok(record)
    }

    /// Write the record at the cursor.
    pub fn write(&self, file: &mut dyn CharFile) -> Result<(), HeaderError> {
        file.write_bytes(&self.encode())
    }

    /// Serialize the record: the 22-byte fixed prefix, then the comment.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_LENGTH + self.comment.len());

        out.extend_from_slice(&SIGNATURE);
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.central_directory_disk.to_le_bytes());
        out.extend_from_slice(&self.entries_on_disk.to_le_bytes());
        out.extend_from_slice(&self.total_entries.to_le_bytes());
        out.extend_from_slice(&self.central_directory_size.to_le_bytes());
        out.extend_from_slice(&self.central_directory_start.to_le_bytes());
        out.extend_from_slice(&self.comment_length().to_le_bytes());
        out.extend_from_slice(&self.comment);

        out
    }

    /// Set the central directory entry count.
    ///
    /// Forces the single-disk shape: both disk numbers go to zero and the
    /// per-disk count tracks the total.
    pub fn set_total_entries(&mut self, entries: u16) {
        self.disk_number = 0;
        self.central_directory_disk = 0;
        self.entries_on_disk = entries;
        self.total_entries = entries;
    }

    /// Replace the archive comment.
    ///
    /// Comments are clipped to what the 16-bit length field can frame.
    pub fn set_comment(&mut self, comment: &[u8]) {
        let clipped = comment.len().min(u16::max_value() as usize);

        self.comment = comment[..clipped].to_vec();
    }

    pub fn set_central_directory_size(&mut self, size: u32) {
        self.central_directory_size = size;
    }

    pub fn set_central_directory_start(&mut self, start: u32) {
        self.central_directory_start = start;
    }

    pub fn disk_number(&self) -> u16 {
        self.disk_number
    }

    pub fn central_directory_disk(&self) -> u16 {
        self.central_directory_disk
    }

    pub fn entries_on_disk(&self) -> u16 {
        self.entries_on_disk
    }

    pub fn total_entries(&self) -> u16 {
        self.total_entries
    }

    pub fn central_directory_size(&self) -> u32 {
        self.central_directory_size
    }

    pub fn central_directory_start(&self) -> u32 {
        self.central_directory_start
    }

    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Length of the comment as stored on disk, always derived.
    pub fn comment_length(&self) -> u16 {
        self.comment.len() as u16
    }
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
