//! Transport backends sharing one write/read contract

use crate::error::Result;
use crate::message::{Message, MSG_CAPACITY};
use crate::queue::MsgQueue;

/// Which transport moves the payload
///
/// Fixed for the lifetime of a run; producer and consumer must select the
/// same one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Kernel message queue ("message passing")
    Queued,
    /// Raw byte buffer in the shared control block
    SharedBuffer,
}

impl Backend {
    /// Map the command-line selector to a backend
    pub fn from_selector(selector: u32) -> Option<Self> {
        match selector {
            1 => Some(Self::Queued),
            2 => Some(Self::SharedBuffer),
            _ => None,
        }
    }

    /// Banner name printed at startup
    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "Message Passing",
            Self::SharedBuffer => "Shared Memory",
        }
    }
}

/// The payload field of the shared control block
///
/// Plain unsynchronized bytes: the rendezvous permits are the only thing
/// keeping the two sides from touching them at the same time, so a slot is
/// only ever used between an acquire and the matching release.
#[derive(Debug)]
pub struct BufferSlot {
    payload: *mut u8,
}

// SAFETY: access is serialized by the rendezvous permits
unsafe impl Send for BufferSlot {}

impl BufferSlot {
    /// # Safety
    /// `payload` must point at `MSG_CAPACITY` bytes inside a mapped control
    /// block that outlives this slot.
    pub(crate) unsafe fn from_raw(payload: *mut u8) -> Self {
        Self { payload }
    }

    fn write(&mut self, msg: &Message) {
        unsafe {
            std::ptr::copy_nonoverlapping(msg.raw().as_ptr(), self.payload, MSG_CAPACITY);
        }
    }

    fn read(&mut self, msg: &mut Message) {
        unsafe {
            std::ptr::copy_nonoverlapping(self.payload, msg.raw_mut().as_mut_ptr(), MSG_CAPACITY);
        }
    }
}

/// Active transport for one side of the run
#[derive(Debug)]
pub enum Mailbox {
    Queued(MsgQueue),
    SharedBuffer(BufferSlot),
}

impl Mailbox {
    /// Move one message toward the consumer
    pub fn write(&mut self, msg: &Message) -> Result<()> {
        match self {
            Mailbox::Queued(queue) => queue.send(msg),
            Mailbox::SharedBuffer(slot) => {
                slot.write(msg);
                Ok(())
            }
        }
    }

    /// Take the pending message out of the transport
    pub fn read(&mut self, msg: &mut Message) -> Result<()> {
        match self {
            Mailbox::Queued(queue) => queue.receive(msg),
            Mailbox::SharedBuffer(slot) => {
                slot.read(msg);
                Ok(())
            }
        }
    }
}
