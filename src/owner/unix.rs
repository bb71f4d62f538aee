//! Unix-specific name service backed by the C library account database.

use std::{ffi, mem, ptr};

use crate::owner::NameService;

/// Name service querying the host's passwd and group databases.
///
/// Lookups retry with a doubled scratch buffer on `ERANGE`; any other
/// lookup failure is reported as an absent account, which leaves the
/// decoded numeric ids standing.
pub struct SystemNameService;

impl SystemNameService {
    pub fn new() -> SystemNameService {
        SystemNameService
    }
}

impl Default for SystemNameService {
    fn default() -> SystemNameService {
        SystemNameService::new()
    }
}

impl NameService for SystemNameService {
    fn is_superuser(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn user_name(&self, uid: u32) -> Option<String> {
        let mut pwd: libc::passwd = unsafe { mem::zeroed() };
        let mut buf = vec![0 as libc::c_char; 1024];
        let mut out = ptr::null_mut();

        loop {
            let res = unsafe {
                libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut out)
            };

            if res == libc::ERANGE {
                buf.resize(buf.len() * 2, 0);
                continue;
            }

            if res != 0 || out.is_null() {
                return None;
            }

            let name = unsafe { ffi::CStr::from_ptr(pwd.pw_name) };

            return Some(name.to_string_lossy().into_owned());
        }
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        let mut grp: libc::group = unsafe { mem::zeroed() };
        let mut buf = vec![0 as libc::c_char; 1024];
        let mut out = ptr::null_mut();

        loop {
            let res = unsafe {
                libc::getgrgid_r(gid, &mut grp, buf.as_mut_ptr(), buf.len(), &mut out)
            };

            if res == libc::ERANGE {
                buf.resize(buf.len() * 2, 0);
                continue;
            }

            if res != 0 || out.is_null() {
                return None;
            }

            let name = unsafe { ffi::CStr::from_ptr(grp.gr_name) };

            return Some(name.to_string_lossy().into_owned());
        }
    }

    fn user_id(&self, name: &str) -> Option<u32> {
        let c_name = ffi::CString::new(name).ok()?;
        let mut pwd: libc::passwd = unsafe { mem::zeroed() };
        let mut buf = vec![0 as libc::c_char; 1024];
        let mut out = ptr::null_mut();

        loop {
            let res = unsafe {
                libc::getpwnam_r(c_name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut out)
            };

            if res == libc::ERANGE {
                buf.resize(buf.len() * 2, 0);
                continue;
            }

            if res != 0 || out.is_null() {
                return None;
            }

            return Some(pwd.pw_uid);
        }
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        let c_name = ffi::CString::new(name).ok()?;
        let mut grp: libc::group = unsafe { mem::zeroed() };
        let mut buf = vec![0 as libc::c_char; 1024];
        let mut out = ptr::null_mut();

        loop {
            let res = unsafe {
                libc::getgrnam_r(c_name.as_ptr(), &mut grp, buf.as_mut_ptr(), buf.len(), &mut out)
            };

            if res == libc::ERANGE {
                buf.resize(buf.len() * 2, 0);
                continue;
            }

            if res != 0 || out.is_null() {
                return None;
            }

            return Some(grp.gr_gid);
        }
    }
}
