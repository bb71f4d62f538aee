//! The abstract tar record and its format and type tags.

use std::str::FromStr;

use crate::entry::{ArchiveEntry, EntryType};
use crate::errors::HeaderError;
use crate::tar::canonical_tar_path;

/// Selects how deeply a record is decoded and which layout encode emits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TarFormat {
    V7,
    Ustar,
    Gnu,
}

impl FromStr for TarFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v7" => Ok(TarFormat::V7),
            "ustar" => Ok(TarFormat::Ustar),
            "gnu" => Ok(TarFormat::Gnu),
            _ => Err(()),
        }
    }
}

/// An abstract representation of the TAR typeflag field.
///
/// The long name and long link types only appear on GNU extension records;
/// nonstandard flags are carried through as `Other`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TarFileType {
    FileStream,
    HardLink,
    SymbolicLink,
    CharacterDevice,
    BlockDevice,
    Directory,
    FIFOPipe,
    LongName,
    LongLink,
    Other(char),
}

impl TarFileType {
    /// Serialize a file type into a given type character flag.
    pub fn type_flag(&self) -> char {
        match self {
            TarFileType::FileStream => '0',
            TarFileType::HardLink => '1',
            TarFileType::SymbolicLink => '2',
            TarFileType::CharacterDevice => '3',
            TarFileType::BlockDevice => '4',
            TarFileType::Directory => '5',
            TarFileType::FIFOPipe => '6',
            TarFileType::LongName => 'L',
            TarFileType::LongLink => 'K',
            TarFileType::Other(f) => *f,
        }
    }

    /// Decode a typeflag byte.
    ///
    /// NUL and `0` both mean a plain file. The flag `7` is reserved and
    /// refused; `name` only feeds the error message.
    pub fn from_type_flag(flag: u8, name: &str) -> Result<TarFileType, HeaderError> {
        match flag {
            0 | b'0' => Ok(TarFileType::FileStream),
            b'1' => Ok(TarFileType::HardLink),
            b'2' => Ok(TarFileType::SymbolicLink),
            b'3' => Ok(TarFileType::CharacterDevice),
            b'4' => Ok(TarFileType::BlockDevice),
            b'5' => Ok(TarFileType::Directory),
            b'6' => Ok(TarFileType::FIFOPipe),
            b'7' => Err(HeaderError::ReservedType {
                name: name.to_string(),
            }),
            b'L' => Ok(TarFileType::LongName),
            b'K' => Ok(TarFileType::LongLink),
            other => Ok(TarFileType::Other(other as char)),
        }
    }
}

/// An abstract representation of the data contained within a tar record.
///
/// A record is created either by decoding a 512-byte block or by
/// populating it from an archive entry, and stays mutable until encoded.
/// V7 records leave the owner names and device numbers at their defaults;
/// the ustar and gnu codecs fill every field.
#[derive(Clone, Debug, PartialEq)]
pub struct TarHeader {
    pub path: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub mtime: u64,
    pub checksum: u64,
    pub file_type: TarFileType,
    pub link_path: String,
    pub user_name: String,
    pub group_name: String,
    pub dev_major: u32,
    pub dev_minor: u32,
}

impl TarHeader {
    /// A blank record with plain-file defaults.
    pub fn new() -> TarHeader {
        TarHeader {
            path: String::new(),
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            checksum: 0,
            file_type: TarFileType::FileStream,
            link_path: String::new(),
            user_name: String::new(),
            group_name: String::new(),
            dev_major: 0,
            dev_minor: 0,
        }
    }

    /// Populate a record from an archive entry.
    ///
    /// The directory slash rule is applied to the path here, before any
    /// encoding happens. V7 has no flags for device or fifo entries, so
    /// under that format they degrade to plain files; ustar and gnu keep
    /// the full type range.
    pub fn for_entry(entry: &ArchiveEntry, format: TarFormat) -> TarHeader {
        let file_type = match entry.entry_type {
            EntryType::File => TarFileType::FileStream,
            EntryType::HardLink => TarFileType::HardLink,
            EntryType::SymbolicLink => TarFileType::SymbolicLink,
            EntryType::Directory => TarFileType::Directory,
            EntryType::CharacterDevice => match format {
                TarFormat::V7 => TarFileType::FileStream,
                _ => TarFileType::CharacterDevice,
            },
            EntryType::BlockDevice => match format {
                TarFormat::V7 => TarFileType::FileStream,
                _ => TarFileType::BlockDevice,
            },
            EntryType::Fifo => match format {
                TarFormat::V7 => TarFileType::FileStream,
                _ => TarFileType::FIFOPipe,
            },
            EntryType::Reserved => match format {
                TarFormat::V7 => TarFileType::FileStream,
                _ => TarFileType::Other('7'),
            },
        };

        TarHeader {
            path: canonical_tar_path(&entry.path, file_type),
            mode: entry.permissions,
            uid: entry.user_id,
            gid: entry.group_id,
            size: entry.size,
            mtime: entry.modification_time,
            checksum: 0,
            file_type,
            link_path: entry.link.clone(),
            user_name: String::new(),
            group_name: String::new(),
            dev_major: entry.major,
            dev_minor: entry.minor,
        }
    }
}

impl Default for TarHeader {
    fn default() -> TarHeader {
        TarHeader::new()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::entry::ArchiveEntry;
    use crate::errors::HeaderError;
    use crate::tar::header::{TarFileType, TarFormat, TarHeader};

    #[test]
    fn type_flag_round_trip() {
        for flag in [b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'L', b'K'].iter() {
            let decoded = TarFileType::from_type_flag(*flag, "x").unwrap();

            assert_eq!(decoded.type_flag() as u8, *flag);
        }
    }

    #[test]
    fn null_flag_is_a_file() {
        assert_eq!(
            TarFileType::from_type_flag(0, "x").unwrap(),
            TarFileType::FileStream
        );
    }

    #[test]
    fn reserved_flag_is_refused() {
        match TarFileType::from_type_flag(b'7', "vault.bin") {
            Err(HeaderError::ReservedType { name }) => assert_eq!(name, "vault.bin"),
            other => panic!("expected reserved type, got {:?}", other),
        }
    }

    #[test]
    fn unknown_flag_is_carried_through() {
        assert_eq!(
            TarFileType::from_type_flag(b'9', "x").unwrap(),
            TarFileType::Other('9')
        );
    }

    #[test]
    fn format_from_str() {
        assert_eq!(TarFormat::from_str("gnu"), Ok(TarFormat::Gnu));
        assert_eq!(TarFormat::from_str("ustar"), Ok(TarFormat::Ustar));
        assert_eq!(TarFormat::from_str("v7"), Ok(TarFormat::V7));
        assert_eq!(TarFormat::from_str("posix"), Err(()));
    }

    #[test]
    fn entry_directories_gain_a_slash() {
        let header = TarHeader::for_entry(&ArchiveEntry::directory("usr/share"), TarFormat::Ustar);

        assert_eq!(header.path, "usr/share/");
        assert_eq!(header.file_type, TarFileType::Directory);
    }

    #[test]
    fn entry_fifo_degrades_to_file_under_v7() {
        let mut entry = ArchiveEntry::file("pipe", 0);
        entry.entry_type = crate::entry::EntryType::Fifo;

        let v7 = TarHeader::for_entry(&entry, TarFormat::V7);
        let ustar = TarHeader::for_entry(&entry, TarFormat::Ustar);

        assert_eq!(v7.file_type, TarFileType::FileStream);
        assert_eq!(ustar.file_type, TarFileType::FIFOPipe);
    }
}
