//! Platform allocation granularity.
//!
//! Memory maps must start on a multiple of the platform's allocation
//! granularity: the page size on POSIX systems, the (usually larger)
//! allocation granularity on Windows. The mapping layer aligns map bases
//! itself; this value is exposed for callers that want to pick view sizes
//! or offsets that line up with it.

use std::sync::OnceLock;

static GRANULARITY: OnceLock<u64> = OnceLock::new();

/// The OS memory-mapping allocation granularity, in bytes.
///
/// Queried once and cached for the life of the process.
pub fn granularity() -> u64 {
    *GRANULARITY.get_or_init(query)
}

#[cfg(unix)]
fn query() -> u64 {
    // SAFETY: sysconf with a valid name has no preconditions.
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page > 0 { page as u64 } else { 4096 }
}

#[cfg(windows)]
fn query() -> u64 {
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    // SAFETY: GetSystemInfo writes the whole struct before returning.
    let info = unsafe {
        let mut info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut info);
        info
    };
    info.dwAllocationGranularity as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_is_a_nonzero_power_of_two() {
        let g = granularity();
        assert!(g > 0);
        assert_eq!(g & (g - 1), 0, "granularity {g} is not a power of two");
    }

    #[test]
    fn granularity_is_stable() {
        assert_eq!(granularity(), granularity());
    }
}
