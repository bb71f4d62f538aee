//! Support for the original V7 UNIX tar record layout.
//!
//! A V7 record is 512 bytes: nine fields in the first 257 bytes, the rest
//! reserved padding.
//!
//! ```text
//! offset  width  field
//!      0    100  file name
//!    100      8  mode
//!    108      8  user id
//!    116      8  group id
//!    124     12  file size
//!    136     12  modification time
//!    148      8  checksum
//!    156      1  type flag
//!    157    100  link name
//! ```

use std::ops;

use crate::block::{Block, BLOCK_SIZE};
use crate::errors::HeaderError;
use crate::tar::header::{TarFileType, TarHeader};
use crate::tar::{
    byte_sum, fill_numeral, fill_string, format_tar_numeral, gnu, parse_tar_numeral,
    parse_tar_string,
};

const NAME: ops::Range<usize> = 0..100;
const MODE: ops::Range<usize> = 100..108;
const UID: ops::Range<usize> = 108..116;
const GID: ops::Range<usize> = 116..124;
pub(crate) const SIZE: ops::Range<usize> = 124..136;
const MTIME: ops::Range<usize> = 136..148;
pub(crate) const CHECKSUM: ops::Range<usize> = 148..156;
pub(crate) const TYPE_FLAG: usize = 156;
const LINK: ops::Range<usize> = 157..257;

/// Decode the V7 portion of a 512-byte record.
///
/// The checksum equation is verified before any field is interpreted.
pub fn decode_v7(block: &Block) -> Result<TarHeader, HeaderError> {
    verify_checksum(block)?;

    let mut header = TarHeader::new();
    read_v7_fields(block, &mut header)?;

    Ok(header)
}

/// Parse the nine V7 fields into an existing record.
pub(crate) fn read_v7_fields(block: &Block, header: &mut TarHeader) -> Result<(), HeaderError> {
    header.path = parse_tar_string(&block[NAME]);
    header.mode = parse_tar_numeral(&block[MODE], "mode")?;
    header.uid = parse_tar_numeral(&block[UID], "uid")?;
    header.gid = parse_tar_numeral(&block[GID], "gid")?;
    header.size = gnu::parse_gnu_numeral(&block[SIZE], "size")?;
    header.mtime = parse_tar_numeral(&block[MTIME], "mtime")?;
    header.checksum = parse_tar_numeral(&block[CHECKSUM], "checksum")?;
    header.file_type = TarFileType::from_type_flag(block[TYPE_FLAG], &header.path)?;
    header.link_path = parse_tar_string(&block[LINK]);

    Ok(())
}

/// Check the record checksum equation.
///
/// The sum is computed over the whole block with the checksum field read
/// as eight spaces. Both sides are compared in their 8-hex-digit forms.
pub fn verify_checksum(block: &Block) -> Result<(), HeaderError> {
    let stored: u64 = parse_tar_numeral(&block[CHECKSUM], "checksum")?;
    let computed = byte_sum(block) - byte_sum(&block[CHECKSUM]) + byte_sum(b"        ");

    let stored = format!("{:08x}", stored);
    let computed = format!("{:08x}", computed);

    if stored != computed {
        return Err(HeaderError::ChecksumMismatch { stored, computed });
    }

    Ok(())
}

/// Produce the 512-byte V7 layout for a record.
///
/// The returned block is already checksummed and satisfies the checksum
/// equation as written.
pub fn encode_v7(header: &TarHeader) -> Result<Block, HeaderError> {
    let size_field = format_tar_numeral(header.size, SIZE.len()).ok_or_else(|| {
        HeaderError::BadNumeral {
            field: "size",
            reason: format!("{} does not fit in 11 octal digits", header.size),
        }
    })?;

    let mut block = [0; BLOCK_SIZE];
    write_v7_fields(header, &header.path, &size_field, &mut block)?;
    checksum_header(&mut block);

    Ok(block)
}

/// Lay the V7 fields out in checksummable format.
///
/// The checksum field is filled with eight spaces so the block can be
/// summed; `checksum_header` stamps the real value afterwards. The name
/// and the size field are supplied by the caller because the ustar and
/// gnu layers store them differently.
pub(crate) fn write_v7_fields(
    header: &TarHeader,
    name: &str,
    size_field: &[u8],
    block: &mut Block,
) -> Result<(), HeaderError> {
    fill_string(&mut block[NAME], name).ok_or_else(|| HeaderError::PathTooLong {
        path: name.to_string(),
    })?;
    fill_numeral(&mut block[MODE], u64::from(header.mode), "mode")?;
    fill_numeral(&mut block[UID], u64::from(header.uid), "uid")?;
    fill_numeral(&mut block[GID], u64::from(header.gid), "gid")?;
    block[SIZE].copy_from_slice(size_field);
    fill_numeral(&mut block[MTIME], header.mtime, "mtime")?;
    block[CHECKSUM].copy_from_slice(b"        ");

    // V7 marks plain files with NUL, not '0'.
    block[TYPE_FLAG] = match header.file_type {
        TarFileType::FileStream => 0,
        other => other.type_flag() as u8,
    };

    fill_string(&mut block[LINK], &header.link_path).ok_or_else(|| HeaderError::PathTooLong {
        path: header.link_path.clone(),
    })?;

    Ok(())
}

/// Overwrite the checksum field of a block laid out in checksummable
/// format.
///
/// The stored form is six zero-padded octal digits, a NUL, and a space.
/// The largest possible sum is 512 × 255, which fits six octal digits.
pub fn checksum_header(block: &mut Block) {
    let sum = byte_sum(block);
    let digits = format!("{:06o}", sum);

    let field = &mut block[CHECKSUM];
    field[..6].copy_from_slice(digits.as_bytes());
    field[6] = 0;
    field[7] = b' ';
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use crate::entry::{ArchiveEntry, EntryType};
    use crate::errors::HeaderError;
    use crate::tar::header::{TarFileType, TarFormat, TarHeader};
    use crate::tar::v7::{checksum_header, decode_v7, encode_v7, verify_checksum, CHECKSUM};
    use crate::tar::{byte_sum, parse_tar_numeral};

    fn sample_entry() -> ArchiveEntry {
        let mut entry = ArchiveEntry::file("a.txt", 42);
        entry.user_id = 1000;
        entry.group_id = 1000;
        entry.modification_time = 1_600_000_000;
        entry
    }

    #[test]
    fn encode_layout() {
        let header = TarHeader::for_entry(&sample_entry(), TarFormat::V7);
        let block = encode_v7(&header).unwrap();

        assert_eq!(&block[0..6], b"a.txt\0");
        assert_eq!(&block[100..108], b"0000644\0");
        assert_eq!(&block[108..116], b"0001750\0");
        assert_eq!(&block[116..124], b"0001750\0");
        assert_eq!(&block[124..136], b"00000000052\0");
        assert_eq!(block[156], 0);
        assert_eq!(&block[257..512], vec![0; 255].as_slice());
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let header = TarHeader::for_entry(&sample_entry(), TarFormat::V7);
        let block = encode_v7(&header).unwrap();
        let decoded = decode_v7(&block).unwrap();

        assert_eq!(decoded.path, "a.txt");
        assert_eq!(decoded.mode, 0o644);
        assert_eq!(decoded.uid, 1000);
        assert_eq!(decoded.gid, 1000);
        assert_eq!(decoded.size, 42);
        assert_eq!(decoded.mtime, 1_600_000_000);
        assert_eq!(decoded.file_type, TarFileType::FileStream);
        assert_eq!(decoded.link_path, "");
    }

    #[test]
    fn encoded_checksum_field_holds_the_block_sum() {
        let header = TarHeader::for_entry(&sample_entry(), TarFormat::V7);
        let block = encode_v7(&header).unwrap();

        let stored: u64 = parse_tar_numeral(&block[CHECKSUM], "checksum").unwrap();
        let spaced = byte_sum(&block) - byte_sum(&block[CHECKSUM]) + byte_sum(b"        ");

        assert_eq!(stored, spaced);
        assert!(verify_checksum(&block).is_ok());
    }

    #[test]
    fn checksum_field_wire_form() {
        let mut block = [0; 512];
        block[CHECKSUM].copy_from_slice(b"        ");
        checksum_header(&mut block);

        // 8 spaces sum to 0o400.
        assert_eq!(&block[CHECKSUM], b"000400\0 ");
    }

    #[test]
    fn corrupted_block_fails_the_checksum() {
        let header = TarHeader::for_entry(&sample_entry(), TarFormat::V7);
        let block = encode_v7(&header).unwrap();
        let mut rng = rand::thread_rng();

        for _ in 0..16 {
            let mut corrupt = block;
            let picked: usize = rng.gen_range(0, 504);
            let index = if picked >= CHECKSUM.start {
                picked + CHECKSUM.len()
            } else {
                picked
            };

            corrupt[index] ^= 0xFF;

            match decode_v7(&corrupt) {
                Err(HeaderError::ChecksumMismatch { .. }) => {}
                other => panic!(
                    "expected checksum mismatch at byte {}, got {:?}",
                    index,
                    other.map(|h| h.path)
                ),
            }
        }
    }

    #[test]
    fn links_round_trip() {
        let mut entry = ArchiveEntry::symlink("current", "releases/v1.2");
        entry.entry_type = EntryType::SymbolicLink;

        let header = TarHeader::for_entry(&entry, TarFormat::V7);
        let block = encode_v7(&header).unwrap();
        let decoded = decode_v7(&block).unwrap();

        assert_eq!(block[156], b'2');
        assert_eq!(decoded.file_type, TarFileType::SymbolicLink);
        assert_eq!(decoded.link_path, "releases/v1.2");
    }

    #[test]
    fn hard_links_use_flag_one() {
        let mut entry = ArchiveEntry::new("other", EntryType::HardLink);
        entry.link = "original".to_string();

        let header = TarHeader::for_entry(&entry, TarFormat::V7);
        let block = encode_v7(&header).unwrap();

        assert_eq!(block[156], b'1');
    }

    #[test]
    fn directories_encode_with_a_slash() {
        let header = TarHeader::for_entry(&ArchiveEntry::directory("bin"), TarFormat::V7);
        let block = encode_v7(&header).unwrap();

        assert_eq!(&block[0..5], b"bin/\0");
        assert_eq!(block[156], b'5');
    }

    #[test]
    fn overlong_name_is_refused_before_output() {
        let long = "x".repeat(150);
        let header = TarHeader::for_entry(&ArchiveEntry::file(&long, 0), TarFormat::V7);

        match encode_v7(&header) {
            Err(HeaderError::PathTooLong { path }) => assert_eq!(path, long),
            other => panic!("expected path too long, got {:?}", other.map(|_| ())),
        }
    }
}
