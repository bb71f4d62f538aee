//! Support for POSIX ustar records.
//!
//! The ustar layout keeps the V7 fields and claims part of the reserved
//! tail for owner names, device numbers, and a path prefix:
//!
//! ```text
//! offset  width  field
//!    257      6  magic "ustar\0"
//!    263      2  version "00"
//!    265     32  user name
//!    297     32  group name
//!    329      8  device major
//!    337      8  device minor
//!    345    155  file prefix
//! ```
//!
//! The logical path of a record is `prefix + "/" + name` whenever the
//! prefix is non-empty, which stretches the V7 limit of 100 bytes to 255.

use std::ops;

use log::debug;

use crate::block::{Block, BLOCK_SIZE};
use crate::errors::HeaderError;
use crate::owner::NameService;
use crate::tar::header::TarHeader;
use crate::tar::{
    fill_numeral, fill_string, format_tar_numeral, gnu, parse_tar_numeral, parse_tar_string, v7,
};

const MAGIC: ops::Range<usize> = 257..263;
const VERSION: ops::Range<usize> = 263..265;
const USER_NAME: ops::Range<usize> = 265..297;
const GROUP_NAME: ops::Range<usize> = 297..329;
const DEV_MAJOR: ops::Range<usize> = 329..337;
const DEV_MINOR: ops::Range<usize> = 337..345;
const PREFIX: ops::Range<usize> = 345..500;

/// Longest path the name field can hold on its own.
pub const NAME_LIMIT: usize = 100;

/// Longest directory portion the prefix field can hold.
pub const PREFIX_LIMIT: usize = 155;

/// Owner names stamped on encode when no name service is available.
const NOBODY: &str = "nobody";
const NOGROUP: &str = "nogroup";

/// Decode a ustar record.
///
/// `names` is consulted to repair ownership on archives produced on
/// another host; pass None to leave the decoded numeric ids alone.
pub fn decode_ustar(
    block: &Block,
    names: Option<&dyn NameService>,
) -> Result<TarHeader, HeaderError> {
    v7::verify_checksum(block)?;

    let mut header = TarHeader::new();
    v7::read_v7_fields(block, &mut header)?;
    read_ustar_fields(block, &mut header)?;

    if let Some(names) = names {
        reconcile_owner(&mut header, names);
    }

    Ok(header)
}

/// Parse the ustar extension fields into an existing record, recomposing
/// the logical path from the prefix.
pub(crate) fn read_ustar_fields(block: &Block, header: &mut TarHeader) -> Result<(), HeaderError> {
    header.user_name = parse_tar_string(&block[USER_NAME]);
    header.group_name = parse_tar_string(&block[GROUP_NAME]);
    header.dev_major = parse_tar_numeral(&block[DEV_MAJOR], "devmajor")?;
    header.dev_minor = parse_tar_numeral(&block[DEV_MINOR], "devminor")?;

    let prefix = parse_tar_string(&block[PREFIX]);

    if !prefix.is_empty() {
        header.path = format!("{}/{}", prefix, header.path);
    }

    Ok(())
}

/// Replace decoded ownership ids with local ones when the archive's owner
/// names resolve on this host.
///
/// Only the superuser gets the rewrite; unprivileged extraction keeps the
/// numeric ids the archive carried.
pub fn reconcile_owner(header: &mut TarHeader, names: &dyn NameService) {
    if !names.is_superuser() {
        return;
    }

    if !header.user_name.is_empty() {
        if let Some(uid) = names.user_id(&header.user_name) {
            if uid != header.uid {
                debug!(
                    "{:?}: user {:?} is uid {} here, was {}",
                    header.path, header.user_name, uid, header.uid
                );
                header.uid = uid;
            }
        }
    }

    if !header.group_name.is_empty() {
        if let Some(gid) = names.group_id(&header.group_name) {
            if gid != header.gid {
                debug!(
                    "{:?}: group {:?} is gid {} here, was {}",
                    header.path, header.group_name, gid, header.gid
                );
                header.gid = gid;
            }
        }
    }
}

/// Split a logical path for the ustar name and prefix fields.
///
/// Paths of 100 bytes or less stay whole. Longer paths split at the last
/// separator, ignoring a directory's trailing slash; the directory
/// portion goes to the prefix, the basename keeps the name field.
///
/// # Returns
///
/// A (name, prefix) pair, or `PathTooLong` when no split point leaves
/// both halves within their field widths.
pub fn split_tar_path(path: &str) -> Result<(String, String), HeaderError> {
    if path.len() <= NAME_LIMIT {
        return Ok((path.to_string(), String::new()));
    }

    let stem = path.strip_suffix('/').unwrap_or(path);
    let split = stem.rfind('/').ok_or_else(|| HeaderError::PathTooLong {
        path: path.to_string(),
    })?;

    let prefix = &path[..split];
    let name = &path[split + 1..];

    if name.is_empty() || name.len() > NAME_LIMIT || prefix.len() > PREFIX_LIMIT {
        return Err(HeaderError::PathTooLong {
            path: path.to_string(),
        });
    }

    Ok((name.to_string(), prefix.to_string()))
}

/// Produce the 512-byte ustar layout for a record.
///
/// `PathTooLong` surfaces before anything is written; callers that need
/// longer paths should use the gnu codec instead.
pub fn encode_ustar(
    header: &TarHeader,
    names: Option<&dyn NameService>,
) -> Result<Block, HeaderError> {
    let mut block = checksummable_ustar(header, names, false)?;
    v7::checksum_header(&mut block);

    Ok(block)
}

/// Lay out a ustar record in checksummable format.
///
/// With `gnu_numerals` set, a file size too large for eleven octal digits
/// falls back to the GNU base-256 form instead of failing.
pub(crate) fn checksummable_ustar(
    header: &TarHeader,
    names: Option<&dyn NameService>,
    gnu_numerals: bool,
) -> Result<Block, HeaderError> {
    let (name, prefix) = split_tar_path(&header.path)?;

    let size_field = if gnu_numerals {
        gnu::format_gnu_numeral(header.size, v7::SIZE.len())
    } else {
        format_tar_numeral(header.size, v7::SIZE.len())
    }
    .ok_or_else(|| HeaderError::BadNumeral {
        field: "size",
        reason: format!("{} does not fit the size field", header.size),
    })?;

    let mut block = [0; BLOCK_SIZE];
    v7::write_v7_fields(header, &name, &size_field, &mut block)?;

    // Unlike V7, ustar marks plain files with an explicit '0'.
    block[v7::TYPE_FLAG] = header.file_type.type_flag() as u8;

    block[MAGIC].copy_from_slice(b"ustar\0");
    block[VERSION].copy_from_slice(b"00");

    let user_name = names
        .and_then(|n| n.user_name(header.uid))
        .unwrap_or_else(|| NOBODY.to_string());
    let group_name = names
        .and_then(|n| n.group_name(header.gid))
        .unwrap_or_else(|| NOGROUP.to_string());

    fill_owner_name(&mut block[USER_NAME], &user_name);
    fill_owner_name(&mut block[GROUP_NAME], &group_name);

    fill_numeral(&mut block[DEV_MAJOR], u64::from(header.dev_major), "devmajor")?;
    fill_numeral(&mut block[DEV_MINOR], u64::from(header.dev_minor), "devminor")?;

    fill_string(&mut block[PREFIX], &prefix).ok_or_else(|| HeaderError::PathTooLong {
        path: header.path.clone(),
    })?;

    Ok(block)
}

/// Store an owner name, clipping it so the NUL terminator always fits.
fn fill_owner_name(field: &mut [u8], name: &str) {
    let mut end = name.len().min(field.len() - 1);

    while !name.is_char_boundary(end) {
        end -= 1;
    }

    fill_string(field, &name[..end]).expect("owner name clipped to field");
}

#[cfg(test)]
mod tests {
    use crate::entry::{ArchiveEntry, EntryType};
    use crate::errors::HeaderError;
    use crate::owner::{NameService, StaticNameService};
    use crate::tar::header::{TarFileType, TarFormat, TarHeader};
    use crate::tar::ustar::{decode_ustar, encode_ustar, reconcile_owner, split_tar_path};

    fn encode_entry(entry: &ArchiveEntry, names: Option<&dyn NameService>) -> crate::block::Block {
        let header = TarHeader::for_entry(entry, TarFormat::Ustar);
        encode_ustar(&header, names).unwrap()
    }

    #[test]
    fn split_keeps_short_paths_whole() {
        let (name, prefix) = split_tar_path("etc/passwd").unwrap();

        assert_eq!(name, "etc/passwd");
        assert_eq!(prefix, "");
    }

    #[test]
    fn split_long_path_at_last_separator() {
        let path = format!("{}b.txt", "a/".repeat(60));
        assert_eq!(path.len(), 125);

        let (name, prefix) = split_tar_path(&path).unwrap();

        assert_eq!(name, "b.txt");
        assert_eq!(prefix.len(), 119);
        assert!(prefix.starts_with("a/a/"));
        assert!(prefix.ends_with("/a"));
    }

    #[test]
    fn split_refuses_unsplittable_basename() {
        let path = format!("dir/{}", "x".repeat(200));

        match split_tar_path(&path) {
            Err(HeaderError::PathTooLong { path: p }) => assert_eq!(p, path),
            other => panic!("expected path too long, got {:?}", other),
        }
    }

    #[test]
    fn long_path_round_trips_through_the_prefix() {
        let path = format!("{}b.txt", "a/".repeat(60));
        let block = encode_entry(&ArchiveEntry::file(&path, 7), None);

        assert_eq!(&block[0..6], b"b.txt\0");
        assert_eq!(&block[345..349], b"a/a/");

        let decoded = decode_ustar(&block, None).unwrap();

        assert_eq!(decoded.path, path);
    }

    #[test]
    fn long_directory_keeps_its_slash() {
        let path = format!("{}leaf", "parent/".repeat(20));
        let block = encode_entry(&ArchiveEntry::directory(&path), None);
        let decoded = decode_ustar(&block, None).unwrap();

        assert_eq!(decoded.path, format!("{}/", path));
        assert!(decoded.path.ends_with("leaf/"));
        assert_eq!(decoded.file_type, TarFileType::Directory);
    }

    #[test]
    fn magic_and_version_are_stamped() {
        let block = encode_entry(&ArchiveEntry::file("a", 0), None);

        assert_eq!(&block[257..263], b"ustar\0");
        assert_eq!(&block[263..265], b"00");
        assert_eq!(block[156], b'0');
    }

    #[test]
    fn owner_names_default_without_a_name_service() {
        let block = encode_entry(&ArchiveEntry::file("a", 0), None);

        assert_eq!(&block[265..272], b"nobody\0");
        assert_eq!(&block[297..305], b"nogroup\0");
    }

    #[test]
    fn owner_names_derive_from_ids_with_a_name_service() {
        let names = StaticNameService::new(false)
            .with_user(1000, "dcrw")
            .with_group(100, "users");

        let mut entry = ArchiveEntry::file("a", 0);
        entry.user_id = 1000;
        entry.group_id = 100;

        let block = encode_entry(&entry, Some(&names));
        let decoded = decode_ustar(&block, None).unwrap();

        assert_eq!(decoded.user_name, "dcrw");
        assert_eq!(decoded.group_name, "users");
    }

    #[test]
    fn device_numbers_are_seven_digit_octal() {
        let mut entry = ArchiveEntry::new("null", EntryType::CharacterDevice);
        entry.major = 1;
        entry.minor = 3;

        let block = encode_entry(&entry, None);

        assert_eq!(block[156], b'3');
        assert_eq!(&block[329..337], b"0000001\0");
        assert_eq!(&block[337..345], b"0000003\0");

        let decoded = decode_ustar(&block, None).unwrap();

        assert_eq!(decoded.dev_major, 1);
        assert_eq!(decoded.dev_minor, 3);
    }

    #[test]
    fn reserved_type_is_refused_on_decode() {
        let mut block = encode_entry(&ArchiveEntry::file("vault.bin", 0), None);
        block[156] = b'7';

        // Re-stamp after the flag edit so only the type is at fault.
        block[148..156].copy_from_slice(b"        ");
        crate::tar::v7::checksum_header(&mut block);

        match decode_ustar(&block, None) {
            Err(HeaderError::ReservedType { name }) => assert_eq!(name, "vault.bin"),
            other => panic!("expected reserved type, got {:?}", other.map(|h| h.path)),
        }
    }

    #[test]
    fn superuser_reconciliation_rewrites_ids() {
        let names = StaticNameService::new(true)
            .with_user(815, "dcrw")
            .with_group(815, "users");

        let mut header = TarHeader::new();
        header.uid = 4242;
        header.gid = 4242;
        header.user_name = "dcrw".to_string();
        header.group_name = "users".to_string();

        reconcile_owner(&mut header, &names);

        assert_eq!(header.uid, 815);
        assert_eq!(header.gid, 815);
    }

    #[test]
    fn unprivileged_reconciliation_keeps_archive_ids() {
        let names = StaticNameService::new(false).with_user(815, "dcrw");

        let mut header = TarHeader::new();
        header.uid = 4242;
        header.user_name = "dcrw".to_string();

        reconcile_owner(&mut header, &names);

        assert_eq!(header.uid, 4242);
    }

    #[test]
    fn unknown_owner_names_keep_archive_ids() {
        let names = StaticNameService::new(true);

        let mut header = TarHeader::new();
        header.uid = 4242;
        header.user_name = "stranger".to_string();

        reconcile_owner(&mut header, &names);

        assert_eq!(header.uid, 4242);
    }

    #[test]
    fn decode_applies_reconciliation_for_the_superuser() {
        let writer = StaticNameService::new(false)
            .with_user(4242, "dcrw")
            .with_group(4242, "users");

        let mut entry = ArchiveEntry::file("home/dcrw/notes", 12);
        entry.user_id = 4242;
        entry.group_id = 4242;

        let block = encode_entry(&entry, Some(&writer));

        let reader = StaticNameService::new(true)
            .with_user(815, "dcrw")
            .with_group(815, "users");

        let decoded = decode_ustar(&block, Some(&reader)).unwrap();

        assert_eq!(decoded.uid, 815);
        assert_eq!(decoded.gid, 815);
    }
}
