//! POSIX shared memory segment backing the shared control block

use crate::error::{MailboxError, Result};
use rustix::fd::OwnedFd;
use rustix::fs::ftruncate;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::ffi::CString;
use std::ptr::NonNull;

const SHM_PREFIX: &str = "/mailbench_";

/// A mapped shared memory segment
///
/// The creating side owns the segment and unlinks it on drop; an attached
/// side only unmaps its own view and leaves the segment alone.
#[derive(Debug)]
pub struct ShmSegment {
    #[allow(dead_code)]
    fd: OwnedFd,
    addr: NonNull<u8>,
    size: usize,
    name: String,
    is_owner: bool,
}

// SAFETY: the segment handle itself is plain state; access to the mapped
// bytes is serialized externally by the rendezvous permits
unsafe impl Send for ShmSegment {}

impl ShmSegment {
    /// Create a segment of `size` bytes, map it, and claim ownership
    ///
    /// A segment left over from an aborted run is reused and re-zeroed, so
    /// the caller always starts from all-zero bytes.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let c_name = full_name(name);
        let mode = Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP;

        let fd = match shm_open(
            c_name.as_c_str(),
            ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
            mode,
        ) {
            Ok(fd) => fd,
            // Stale segment from a previous run
            Err(_) => shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(
                |e| MailboxError::ShmCreate {
                    name: name.to_string(),
                    source: e.into(),
                },
            )?,
        };

        ftruncate(&fd, size as u64).map_err(|e| MailboxError::Truncate(e.into()))?;

        let addr = map(&fd, size)?;
        unsafe {
            std::ptr::write_bytes(addr.as_ptr(), 0, size);
        }

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: true,
        })
    }

    /// Attach to a segment somebody else created
    ///
    /// Never creates anything: if the producer has not run yet this fails
    /// with a distinguishable attach error. Also rejects a segment too small
    /// to hold `min_size` bytes, which would mean attaching to a block the
    /// producer never finished initializing.
    pub fn attach(name: &str, min_size: usize) -> Result<Self> {
        let c_name = full_name(name);

        let attach_err = |e: rustix::io::Errno| MailboxError::ShmAttach {
            name: name.to_string(),
            source: e.into(),
        };

        let fd = shm_open(c_name.as_c_str(), ShmOFlags::RDWR, Mode::empty()).map_err(attach_err)?;

        let stat = rustix::fs::fstat(&fd).map_err(attach_err)?;
        let size = stat.st_size as usize;
        if size < min_size {
            return Err(MailboxError::SegmentTooSmall {
                need: min_size,
                got: size,
            });
        }

        let addr = map(&fd, size)?;

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: false,
        })
    }

    /// Base address of the mapping
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr()
    }

    /// Size of the mapping in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this handle created (and will unlink) the segment
    #[inline]
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.size);
        }

        if self.is_owner {
            let _ = shm_unlink(full_name(&self.name).as_c_str());
        }
    }
}

fn full_name(name: &str) -> CString {
    // Names come from compile-time constants; no interior NULs
    CString::new(format!("{SHM_PREFIX}{name}")).unwrap()
}

fn map(fd: &OwnedFd, size: usize) -> Result<NonNull<u8>> {
    let addr = unsafe {
        mmap(
            std::ptr::null_mut(),
            size,
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::SHARED,
            fd,
            0,
        )
        .map_err(|e| MailboxError::Mmap(e.into()))?
    };

    Ok(NonNull::new(addr.cast::<u8>()).expect("mmap returned null"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_attach_sees_writes() {
        let name = "shm_test_create";
        let size = 4096;

        let owner = ShmSegment::create(name, size).unwrap();
        assert!(owner.is_owner());
        assert_eq!(owner.size(), size);

        unsafe {
            std::ptr::write(owner.as_ptr(), 42u8);
        }

        let borrower = ShmSegment::attach(name, size).unwrap();
        assert!(!borrower.is_owner());
        let val = unsafe { std::ptr::read(borrower.as_ptr()) };
        assert_eq!(val, 42u8);

        drop(borrower);
        drop(owner);
    }

    #[test]
    fn attach_without_producer_fails() {
        let err = ShmSegment::attach("shm_test_nobody_created_this", 64).unwrap_err();
        assert!(matches!(err, MailboxError::ShmAttach { .. }));
    }

    #[test]
    fn attach_rejects_undersized_segment() {
        let name = "shm_test_undersized";
        let owner = ShmSegment::create(name, 64).unwrap();

        let err = ShmSegment::attach(name, 4096).unwrap_err();
        assert!(matches!(err, MailboxError::SegmentTooSmall { .. }));

        drop(owner);
    }

    #[test]
    fn owner_drop_unlinks_segment() {
        let name = "shm_test_unlink";
        let owner = ShmSegment::create(name, 64).unwrap();
        drop(owner);

        assert!(ShmSegment::attach(name, 64).is_err());
    }
}
