//! Lookup of system error codes by their canonical description, as printed
//! by tools which report failures as text only.

use nix::errno::Errno;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Lower-cased description of every errno from EPERM through EHWPOISON.
static ERRNO_TABLE: Lazy<HashMap<String, Errno>> = Lazy::new(|| {
    (Errno::EPERM as i32 ..= Errno::EHWPOISON as i32)
        .map(Errno::from_i32)
        .filter(|errno| *errno != Errno::UnknownErrno)
        .map(|errno| (errno.desc().to_lowercase(), errno))
        .collect()
});

/// Find the errno whose description equals `text`, ignoring case.
pub(crate) fn lookup(text: &str) -> Option<Errno> {
    ERRNO_TABLE.get(&text.to_lowercase()).copied()
}
