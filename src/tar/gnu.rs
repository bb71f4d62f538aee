//! Support for GNU extensions to the ustar record format.
//!
//! GNU tar carries file and link names longer than the ustar fields in
//! dedicated `L` (long name) and `K` (long link) records: the extension
//! header is a normal ustar block whose size field frames a payload in
//! the following blocks, and the real record comes after. Decoding is a
//! small loop over the block stream that collects pending overrides until
//! a non-extension record terminates it.

use log::debug;

use crate::block::{BlockFile, BLOCK_SIZE};
use crate::errors::HeaderError;
use crate::owner::NameService;
use crate::tar::header::{TarFileType, TarHeader};
use crate::tar::{format_tar_numeral, parse_tar_numeral, ustar, v7};

/// Name GNU tar stores in the header of an `L`/`K` extension record.
pub const LONG_LINK_NAME: &str = "././@LongLink";

/// Decode one logical GNU record from the stream.
///
/// Any `L`/`K` extension records are consumed along with their payload
/// blocks, and their names override the fields of the terminating record
/// (the prefix does not apply to a long name). The cursor is left on the
/// terminating record's block, so file data can be read right after. A
/// record of any non-extension type terminates the loop, which keeps
/// unknown vendor extensions readable as opaque members.
pub fn decode_gnu(
    file: &mut dyn BlockFile,
    names: Option<&dyn NameService>,
) -> Result<TarHeader, HeaderError> {
    let mut long_name: Option<String> = None;
    let mut long_link: Option<String> = None;
    let mut block = file.current()?;

    loop {
        let mut header = ustar::decode_ustar(&block, names)?;

        match header.file_type {
            TarFileType::LongName => {
                debug!(
                    "{}: long name extension, {} bytes",
                    file.file_name(),
                    header.size
                );
                long_name = Some(read_payload_string(file, header.size)?);
                block = file.next()?;
            }
            TarFileType::LongLink => {
                debug!(
                    "{}: long link extension, {} bytes",
                    file.file_name(),
                    header.size
                );
                long_link = Some(read_payload_string(file, header.size)?);
                block = file.next()?;
            }
            _ => {
                if let Some(name) = long_name {
                    header.path = name;
                }

                if let Some(link) = long_link {
                    header.link_path = link;
                }

                return Ok(header);
            }
        }
    }
}

/// Read the payload of an extension record.
///
/// The payload occupies ⌈size/512⌉ whole blocks after the extension
/// header; its content is the first `size` bytes of their concatenation.
/// The cursor is left on the last payload block, so the caller's next
/// advance lands on the following record.
fn read_payload(file: &mut dyn BlockFile, size: u64) -> Result<Vec<u8>, HeaderError> {
    let blocks = (size as usize + BLOCK_SIZE - 1) / BLOCK_SIZE;
    let mut payload = Vec::with_capacity(blocks * BLOCK_SIZE);

    for _ in 0..blocks {
        payload.extend_from_slice(&file.next()?);
    }

    payload.truncate(size as usize);

    Ok(payload)
}

fn read_payload_string(file: &mut dyn BlockFile, size: u64) -> Result<String, HeaderError> {
    let payload = read_payload(file, size)?;
    let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());

    Ok(String::from_utf8_lossy(&payload[..end]).into_owned())
}

/// Encode a record in GNU format, appending its blocks to the stream.
///
/// Paths and link targets that fit the ustar fields produce a single
/// plain ustar block. Anything longer is carried in `L`/`K` extension
/// records ahead of the real one, whose own name fields hold a clipped
/// form for the benefit of non-GNU readers.
pub fn encode_gnu(
    header: &TarHeader,
    file: &mut dyn BlockFile,
    names: Option<&dyn NameService>,
) -> Result<(), HeaderError> {
    let needs_long_name = ustar::split_tar_path(&header.path).is_err();
    let needs_long_link = header.link_path.len() > ustar::NAME_LIMIT;

    if needs_long_name {
        debug!(
            "{}: emitting long name record for {:?}",
            file.file_name(),
            header.path
        );
        append_extension(file, TarFileType::LongName, header.path.as_bytes(), names)?;
    }

    if needs_long_link {
        debug!(
            "{}: emitting long link record for {:?}",
            file.file_name(),
            header.link_path
        );
        append_extension(file, TarFileType::LongLink, header.link_path.as_bytes(), names)?;
    }

    let mut clipped = header.clone();

    if needs_long_name {
        clipped.path = clip_to(&header.path, ustar::NAME_LIMIT);
    }

    if needs_long_link {
        clipped.link_path = clip_to(&header.link_path, ustar::NAME_LIMIT);
    }

    let mut block = ustar::checksummable_ustar(&clipped, names, true)?;
    v7::checksum_header(&mut block);

    file.append(&block)
}

/// Append one `L`/`K` extension record and its payload blocks.
///
/// The advertised size includes a trailing NUL, the way GNU tar frames
/// its long names.
fn append_extension(
    file: &mut dyn BlockFile,
    file_type: TarFileType,
    payload: &[u8],
    names: Option<&dyn NameService>,
) -> Result<(), HeaderError> {
    let mut extension = TarHeader::new();
    extension.path = LONG_LINK_NAME.to_string();
    extension.mode = 0o644;
    extension.size = payload.len() as u64 + 1;
    extension.file_type = file_type;

    let mut block = ustar::checksummable_ustar(&extension, names, true)?;
    v7::checksum_header(&mut block);
    file.append(&block)?;

    let blocks = (payload.len() + 1 + BLOCK_SIZE - 1) / BLOCK_SIZE;
    let mut padded = vec![0; blocks * BLOCK_SIZE];
    padded[..payload.len()].copy_from_slice(payload);

    for chunk in padded.chunks(BLOCK_SIZE) {
        let mut block = [0; BLOCK_SIZE];
        block.copy_from_slice(chunk);
        file.append(&block)?;
    }

    Ok(())
}

/// Clip a string to at most `limit` bytes on a character boundary.
fn clip_to(s: &str, limit: usize) -> String {
    let mut end = limit.min(s.len());

    while !s.is_char_boundary(end) {
        end -= 1;
    }

    s[..end].to_string()
}

/// Format a number in GNU/STAR octal/integer hybrid format.
///
/// For numerals that fit the octal field this behaves identically to
/// `format_tar_numeral`. Larger numerals are encoded in base-256 form:
///
/// 1. The byte 0x80, which indicates a positive base-256 value
/// 2. The numeral, stored big-endian in the remaining bytes
///
/// In the event that the number cannot be represented in even this form,
/// the function yields None.
pub fn format_gnu_numeral(number: u64, field_size: usize) -> Option<Vec<u8>> {
    if let Some(value) = format_tar_numeral(number, field_size) {
        return Some(value);
    }

    if field_size <= 8 && number >= 1u64 << ((field_size - 1) * 8) {
        return None;
    }

    let mut result = vec![0; field_size];

    result[0] = 0x80;

    for i in 0..(field_size - 1) {
        let shifted = number.checked_shr((i * 8) as u32).unwrap_or(0);
        result[field_size - i - 1] = (shifted & 0xFF) as u8;
    }

    Some(result)
}

/// Parse a numeral field that may be in either octal or base-256 form.
pub fn parse_gnu_numeral(field: &[u8], name: &'static str) -> Result<u64, HeaderError> {
    if field.is_empty() || field[0] & 0x80 == 0 {
        return parse_tar_numeral(field, name);
    }

    if field[0] != 0x80 {
        return Err(HeaderError::BadNumeral {
            field: name,
            reason: "negative base-256 values are not supported".to_string(),
        });
    }

    let mut value: u64 = 0;

    for b in &field[1..] {
        value = value
            .checked_mul(256)
            .and_then(|v| v.checked_add(u64::from(*b)))
            .ok_or_else(|| HeaderError::BadNumeral {
                field: name,
                reason: "base-256 value overflows 64 bits".to_string(),
            })?;
    }

    Ok(value)
}
