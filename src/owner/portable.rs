//! Fallback name service with a caller-supplied account table.

use crate::owner::NameService;

/// Name service backed by a fixed table of accounts.
///
/// This is the portable stand-in for hosts without a native account
/// database, and the substitution point for tests: the table and the
/// superuser answer are entirely under the caller's control.
pub struct StaticNameService {
    superuser: bool,
    users: Vec<(u32, String)>,
    groups: Vec<(u32, String)>,
}

impl StaticNameService {
    pub fn new(superuser: bool) -> StaticNameService {
        StaticNameService {
            superuser,
            users: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_user(mut self, uid: u32, name: &str) -> StaticNameService {
        self.users.push((uid, name.to_string()));
        self
    }

    pub fn with_group(mut self, gid: u32, name: &str) -> StaticNameService {
        self.groups.push((gid, name.to_string()));
        self
    }
}

impl NameService for StaticNameService {
    fn is_superuser(&self) -> bool {
        self.superuser
    }

    fn user_name(&self, uid: u32) -> Option<String> {
        self.users
            .iter()
            .find(|(id, _)| *id == uid)
            .map(|(_, name)| name.clone())
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        self.groups
            .iter()
            .find(|(id, _)| *id == gid)
            .map(|(_, name)| name.clone())
    }

    fn user_id(&self, name: &str) -> Option<u32> {
        self.users
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        self.groups
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }
}
