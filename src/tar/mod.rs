//! Codecs for the tar family of record headers.
//!
//! The three layouts form a hierarchy: `v7` is the original nine-field
//! record, `ustar` adds owner names, device numbers, and the path prefix,
//! and `gnu` adds the long-name extension protocol on top of ustar. The
//! helpers here carry the octal numeral and string conventions every
//! layout shares.

/// The abstract tar record and the format/type tags.
pub mod header;

/// Support for the original V7 UNIX tar record layout.
pub mod v7;

/// Support for POSIX ustar records.
pub mod ustar;

/// Support for GNU extensions to the ustar record format.
pub mod gnu;

use pad::{Alignment, PadStr};

use crate::errors::HeaderError;
use crate::tar::header::TarFileType;

/// Compute the unsigned byte sum of a byte range.
pub fn byte_sum(bytes: &[u8]) -> u64 {
    bytes.iter().map(|b| u64::from(*b)).sum()
}

/// Format a number in tar octal format, with a trailing null.
///
/// If the number is too large to fit, this function yields None.
pub fn format_tar_numeral(number: u64, field_size: usize) -> Option<Vec<u8>> {
    let digits = format!("{:o}", number);

    if digits.len() > field_size - 1 {
        None
    } else {
        let mut value = digits
            .pad(field_size - 1, '0', Alignment::Right, true)
            .into_bytes();

        value.push(0);
        assert_eq!(value.len(), field_size);

        Some(value)
    }
}

/// Parse a tar octal numeral field.
///
/// Trailing NULs and spaces are trimmed before the remainder is read as
/// octal; leading spaces are accepted too, since space-padded numerals
/// occur in the wild. An all-padding field decodes as zero.
pub fn parse_tar_numeral<T: num_traits::Num>(
    field: &[u8],
    name: &'static str,
) -> Result<T, HeaderError> {
    let end = field
        .iter()
        .rposition(|b| *b != 0 && *b != b' ')
        .map(|p| p + 1)
        .unwrap_or(0);

    let text = std::str::from_utf8(&field[..end])
        .map_err(|_| HeaderError::BadNumeral {
            field: name,
            reason: format!("{:?} is not octal text", &field[..end]),
        })?
        .trim_start_matches(' ');

    if text.is_empty() {
        return Ok(T::zero());
    }

    T::from_str_radix(text, 8).map_err(|_| HeaderError::BadNumeral {
        field: name,
        reason: format!("{:?} is not octal text", text),
    })
}

/// Parse a NUL-terminated or NUL-padded string field.
pub fn parse_tar_string(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());

    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Apply the directory naming rule to a logical tar path.
///
/// Directories carry a trailing slash in the archive; everything else
/// must not.
pub fn canonical_tar_path(path: &str, file_type: TarFileType) -> String {
    let trimmed = path.trim_end_matches('/');

    match file_type {
        TarFileType::Directory => format!("{}/", trimmed),
        _ => trimmed.to_string(),
    }
}

/// Copy a string into a field, NUL-padding the remainder.
///
/// A value exactly as long as the field is stored without termination,
/// which is legal for the path fields. Yields None when it cannot fit.
pub(crate) fn fill_string(field: &mut [u8], value: &str) -> Option<()> {
    let bytes = value.as_bytes();

    if bytes.len() > field.len() {
        return None;
    }

    field[..bytes.len()].copy_from_slice(bytes);

    for b in &mut field[bytes.len()..] {
        *b = 0;
    }

    Some(())
}

/// Write an octal numeral into a field.
pub(crate) fn fill_numeral(
    field: &mut [u8],
    value: u64,
    name: &'static str,
) -> Result<(), HeaderError> {
    let bytes = format_tar_numeral(value, field.len()).ok_or_else(|| HeaderError::BadNumeral {
        field: name,
        reason: format!("{} does not fit in {} octal digits", value, field.len() - 1),
    })?;

    field.copy_from_slice(&bytes);

    Ok(())
}
