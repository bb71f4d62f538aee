//! Carrier for the metadata of a single archive member.

/// File type tag of an archive entry.
///
/// `Reserved` covers the tar type flag `7`, which the codecs refuse to
/// decode but which an entry may still carry through.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryType {
    File,
    HardLink,
    SymbolicLink,
    CharacterDevice,
    BlockDevice,
    Directory,
    Fifo,
    Reserved,
}

/// Metadata describing one archive member, independent of any on-disk
/// header layout.
///
/// Paths are logical archive paths: forward slashes on every platform,
/// no leading root. The directory slash rule is applied by the codecs,
/// not here.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveEntry {
    pub path: String,
    pub permissions: u32,
    pub user_id: u32,
    pub group_id: u32,
    pub size: u64,
    pub modification_time: u64,
    pub link: String,
    pub entry_type: EntryType,
    pub major: u32,
    pub minor: u32,
}

impl ArchiveEntry {
    /// A blank entry of the given type.
    pub fn new(path: &str, entry_type: EntryType) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            permissions: 0,
            user_id: 0,
            group_id: 0,
            size: 0,
            modification_time: 0,
            link: String::new(),
            entry_type,
            major: 0,
            minor: 0,
        }
    }

    /// A plain file entry of the given size.
    pub fn file(path: &str, size: u64) -> ArchiveEntry {
        let mut entry = ArchiveEntry::new(path, EntryType::File);
        entry.permissions = 0o644;
        entry.size = size;
        entry
    }

    /// A directory entry.
    pub fn directory(path: &str) -> ArchiveEntry {
        let mut entry = ArchiveEntry::new(path, EntryType::Directory);
        entry.permissions = 0o755;
        entry
    }

    /// A symbolic link entry pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> ArchiveEntry {
        let mut entry = ArchiveEntry::new(path, EntryType::SymbolicLink);
        entry.permissions = 0o777;
        entry.link = target.to_string();
        entry
    }
}
