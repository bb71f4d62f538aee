//! Name-service lookups used to reconcile archive ownership with the host.

pub mod portable;

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use crate::owner::unix::SystemNameService;

pub use crate::owner::portable::StaticNameService;

/// Capability for translating user and group ids to names and back.
///
/// Archives made on another host routinely carry numeric ids that mean
/// nothing locally; the ustar codec consults this capability to repair
/// them on decode and to stamp owner names on encode. The superuser test
/// lives here as well, so the rewrite policy can be tested by substituting
/// an implementation instead of probing process state.
pub trait NameService {
    /// Whether the calling process is entitled to rewrite ownership.
    fn is_superuser(&self) -> bool;

    /// Name of the local account with the given user id, if any.
    fn user_name(&self, uid: u32) -> Option<String>;

    /// Name of the local group with the given group id, if any.
    fn group_name(&self, gid: u32) -> Option<String>;

    /// User id of the local account with the given name, if any.
    fn user_id(&self, name: &str) -> Option<u32>;

    /// Group id of the local group with the given name, if any.
    fn group_id(&self, name: &str) -> Option<u32>;
}
