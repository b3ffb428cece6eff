//! Two-permit rendezvous serializing access to the shared control block
//!
//! `recv_ready` starts at 1 (one free slot), `send_ready` at 0 (nothing
//! published). The producer waits on `recv_ready`, transfers, posts
//! `send_ready`; the consumer mirrors it. Under single-producer /
//! single-consumer use neither permit ever leaves {0, 1}, so at most one
//! message is in flight at any time. Both transport backends pay this
//! handshake so their timings stay comparable, even though the kernel queue
//! would be safe without it.

use crate::error::{MailboxError, Result};
use crate::message::MSG_CAPACITY;
use std::io;
use std::ptr::addr_of_mut;

/// Control block living at the base of the shared segment
///
/// `repr(C)` so both processes agree on the layout. The payload bytes are
/// completely unsynchronized; the two permits are the only thing keeping
/// the sides from touching them at the same time.
#[repr(C)]
pub struct ControlBlock {
    send_ready: libc::sem_t,
    recv_ready: libc::sem_t,
    payload: [u8; MSG_CAPACITY],
}

impl ControlBlock {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Pointer to the payload bytes
    ///
    /// # Safety
    /// `block` must point to a valid control block inside a live mapping.
    pub(crate) unsafe fn payload_ptr(block: *mut Self) -> *mut u8 {
        addr_of_mut!((*block).payload) as *mut u8
    }
}

/// One side's handle on the handshake permits
///
/// The initializing side owns the permits and destroys them on drop; an
/// attached side never does.
#[derive(Debug)]
pub struct Rendezvous {
    block: *mut ControlBlock,
    is_owner: bool,
}

// SAFETY: the permits are process-shared semaphores; every operation on
// them is an atomic kernel call
unsafe impl Send for Rendezvous {}

impl Rendezvous {
    /// Initialize both permits in a zeroed control block and take ownership
    ///
    /// # Safety
    /// `block` must point to a valid, zeroed control block in memory shared
    /// with the peer, and no other permit handle may exist for it yet.
    pub unsafe fn init_owned(block: *mut ControlBlock) -> Result<Self> {
        if libc::sem_init(addr_of_mut!((*block).send_ready), 1, 0) == -1
            || libc::sem_init(addr_of_mut!((*block).recv_ready), 1, 1) == -1
        {
            return Err(permit_error("sem_init"));
        }
        Ok(Self {
            block,
            is_owner: true,
        })
    }

    /// Use permits the producer already initialized; never destroys them
    ///
    /// # Safety
    /// `block` must point to a control block whose permits the producer has
    /// initialized, inside a mapping that outlives this handle.
    pub unsafe fn attach(block: *mut ControlBlock) -> Self {
        Self {
            block,
            is_owner: false,
        }
    }

    /// Producer side: block until the previous message has been consumed
    pub fn acquire_slot(&self) -> Result<()> {
        self.wait(unsafe { addr_of_mut!((*self.block).recv_ready) }, "sem_wait(recv_ready)")
    }

    /// Producer side: publish the message just written
    pub fn publish(&self) -> Result<()> {
        self.post(unsafe { addr_of_mut!((*self.block).send_ready) }, "sem_post(send_ready)")
    }

    /// Consumer side: block until a message is available
    pub fn acquire_message(&self) -> Result<()> {
        self.wait(unsafe { addr_of_mut!((*self.block).send_ready) }, "sem_wait(send_ready)")
    }

    /// Consumer side: hand the slot back to the producer
    pub fn release_slot(&self) -> Result<()> {
        self.post(unsafe { addr_of_mut!((*self.block).recv_ready) }, "sem_post(recv_ready)")
    }

    fn wait(&self, sem: *mut libc::sem_t, op: &'static str) -> Result<()> {
        loop {
            if unsafe { libc::sem_wait(sem) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(MailboxError::Permit { op, source: err });
            }
        }
    }

    fn post(&self, sem: *mut libc::sem_t, op: &'static str) -> Result<()> {
        if unsafe { libc::sem_post(sem) } == -1 {
            return Err(MailboxError::Permit {
                op,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Current (send_ready, recv_ready) counts, for invariant checks
    #[cfg(test)]
    pub(crate) fn permit_values(&self) -> (i32, i32) {
        let mut send = 0;
        let mut recv = 0;
        unsafe {
            libc::sem_getvalue(addr_of_mut!((*self.block).send_ready), &mut send);
            libc::sem_getvalue(addr_of_mut!((*self.block).recv_ready), &mut recv);
        }
        (send, recv)
    }
}

impl Drop for Rendezvous {
    fn drop(&mut self) {
        if self.is_owner {
            unsafe {
                libc::sem_destroy(addr_of_mut!((*self.block).send_ready));
                libc::sem_destroy(addr_of_mut!((*self.block).recv_ready));
            }
        }
    }
}

fn permit_error(op: &'static str) -> MailboxError {
    MailboxError::Permit {
        op,
        source: io::Error::last_os_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;
    use std::thread;

    fn heap_block() -> *mut ControlBlock {
        Box::into_raw(Box::new(MaybeUninit::<ControlBlock>::zeroed())) as *mut ControlBlock
    }

    unsafe fn free_block(block: *mut ControlBlock) {
        drop(Box::from_raw(block as *mut MaybeUninit<ControlBlock>));
    }

    #[test]
    fn initial_permit_values() {
        let block = heap_block();
        let owner = unsafe { Rendezvous::init_owned(block).unwrap() };
        assert_eq!(owner.permit_values(), (0, 1));
        drop(owner);
        unsafe { free_block(block) };
    }

    #[test]
    fn permits_stay_bounded_through_one_exchange() {
        // Walk the protocol sequentially; every acquire succeeds without
        // blocking because the counterpart permit is already up.
        let block = heap_block();
        let owner = unsafe { Rendezvous::init_owned(block).unwrap() };

        owner.acquire_slot().unwrap();
        assert_eq!(owner.permit_values(), (0, 0));

        owner.publish().unwrap();
        assert_eq!(owner.permit_values(), (1, 0));

        owner.acquire_message().unwrap();
        assert_eq!(owner.permit_values(), (0, 0));

        owner.release_slot().unwrap();
        assert_eq!(owner.permit_values(), (0, 1));

        drop(owner);
        unsafe { free_block(block) };
    }

    struct SendPtr(*mut ControlBlock);
    unsafe impl Send for SendPtr {}

    #[test]
    fn alternation_preserves_order_across_threads() {
        let block = heap_block();
        let producer = unsafe { Rendezvous::init_owned(block).unwrap() };
        let consumer = unsafe { Rendezvous::attach(block) };

        const ROUNDS: u8 = 50;

        let shared = SendPtr(block);
        let reader = thread::spawn(move || {
            let shared = shared;
            let block = shared.0;
            let mut seen = Vec::new();
            for _ in 0..ROUNDS {
                consumer.acquire_message().unwrap();
                let byte = unsafe { *ControlBlock::payload_ptr(block) };
                seen.push(byte);
                consumer.release_slot().unwrap();
            }
            seen
        });

        for i in 0..ROUNDS {
            producer.acquire_slot().unwrap();
            unsafe { *ControlBlock::payload_ptr(block) = i };
            producer.publish().unwrap();
        }

        let seen = reader.join().unwrap();
        assert_eq!(seen, (0..ROUNDS).collect::<Vec<_>>());
        assert_eq!(producer.permit_values(), (0, 1));

        drop(producer);
        unsafe { free_block(block) };
    }
}
