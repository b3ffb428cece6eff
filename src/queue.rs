//! System V message queue transport

use crate::error::{MailboxError, Result};
use crate::message::{Message, MSG_CAPACITY};
use std::io;

/// Classification tag carried by every record
///
/// The queue supports multiplexing by tag; this tool uses a single logical
/// stream, so the tag is a constant. Receives match on it, which together
/// with the kernel's per-tag FIFO gives in-order delivery for free.
pub const MSG_TAG: libc::c_long = 1;

/// On-wire record: tag plus a fixed-size text payload
#[repr(C)]
struct QueueRecord {
    mtype: libc::c_long,
    mtext: [u8; MSG_CAPACITY],
}

/// Handle to a kernel message queue
///
/// The creating side removes the queue on drop; an opened handle leaves it
/// in place for its owner to clean up.
#[derive(Debug)]
pub struct MsgQueue {
    id: libc::c_int,
    is_owner: bool,
}

impl MsgQueue {
    /// Create the queue for `key` (reusing one left over from a previous
    /// run) and claim ownership
    pub fn create(key: libc::key_t) -> Result<Self> {
        let id = unsafe { libc::msgget(key, 0o666 | libc::IPC_CREAT) };
        if id == -1 {
            return Err(MailboxError::QueueCreate(io::Error::last_os_error()));
        }
        Ok(Self { id, is_owner: true })
    }

    /// Open an existing queue; fails if the producer has not created it
    pub fn open(key: libc::key_t) -> Result<Self> {
        let id = unsafe { libc::msgget(key, 0o666) };
        if id == -1 {
            return Err(MailboxError::QueueOpen(io::Error::last_os_error()));
        }
        Ok(Self {
            id,
            is_owner: false,
        })
    }

    /// Enqueue one message as a single kernel record
    pub fn send(&self, msg: &Message) -> Result<()> {
        let record = QueueRecord {
            mtype: MSG_TAG,
            mtext: *msg.raw(),
        };
        let rc = unsafe {
            libc::msgsnd(
                self.id,
                &record as *const QueueRecord as *const libc::c_void,
                MSG_CAPACITY,
                0,
            )
        };
        if rc == -1 {
            return Err(MailboxError::QueueSend(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Dequeue the oldest record with the benchmark tag, blocking until one
    /// is available
    pub fn receive(&self, msg: &mut Message) -> Result<()> {
        let mut record = QueueRecord {
            mtype: 0,
            mtext: [0u8; MSG_CAPACITY],
        };
        let rc = unsafe {
            libc::msgrcv(
                self.id,
                &mut record as *mut QueueRecord as *mut libc::c_void,
                MSG_CAPACITY,
                MSG_TAG,
                0,
            )
        };
        if rc == -1 {
            return Err(MailboxError::QueueReceive(io::Error::last_os_error()));
        }
        msg.raw_mut().copy_from_slice(&record.mtext);
        Ok(())
    }
}

impl Drop for MsgQueue {
    fn drop(&mut self) {
        if self.is_owner {
            unsafe {
                libc::msgctl(self.id, libc::IPC_RMID, std::ptr::null_mut());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys namespaced per test so parallel tests never share a queue
    const FIFO_KEY: libc::key_t = 0x6d62_7401;
    const CLEANUP_KEY: libc::key_t = 0x6d62_7402;

    #[test]
    fn records_come_back_in_fifo_order() {
        let queue = MsgQueue::create(FIFO_KEY).unwrap();

        for text in ["first", "second", "third"] {
            queue.send(&Message::from_text(text)).unwrap();
        }

        let mut msg = Message::empty();
        for expected in ["first", "second", "third"] {
            queue.receive(&mut msg).unwrap();
            assert_eq!(msg.as_text(), expected);
        }
    }

    #[test]
    fn open_without_producer_fails() {
        let err = MsgQueue::open(0x6d62_7fff).unwrap_err();
        assert!(matches!(err, MailboxError::QueueOpen(_)));
    }

    #[test]
    fn owner_drop_removes_queue() {
        let owner = MsgQueue::create(CLEANUP_KEY).unwrap();
        let borrower = MsgQueue::open(CLEANUP_KEY).unwrap();

        drop(borrower);
        assert!(MsgQueue::open(CLEANUP_KEY).is_ok());

        drop(owner);
        assert!(MsgQueue::open(CLEANUP_KEY).is_err());
    }
}
