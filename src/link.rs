//! Lifecycle of the named IPC objects making up one benchmark channel

use crate::error::Result;
use crate::keys;
use crate::mailbox::{Backend, BufferSlot, Mailbox};
use crate::message::Message;
use crate::queue::MsgQueue;
use crate::rendezvous::{ControlBlock, Rendezvous};
use crate::shm::ShmSegment;
use std::time::{Duration, Instant};

/// One side's handle on the channel
///
/// `create_owned` builds every IPC object and the resulting guard destroys
/// them all on drop; `attach_borrowed` only opens what already exists and
/// its drop merely detaches. Field order matters: teardown runs in reverse
/// order of creation (queue removed, permits destroyed, segment unlinked).
#[derive(Debug)]
pub struct Link {
    mailbox: Mailbox,
    rendezvous: Rendezvous,
    #[allow(dead_code)]
    shm: ShmSegment,
}

impl Link {
    /// Producer entry point: create the segment, initialize the permits,
    /// and create the queue when the Queued backend is selected
    ///
    /// The objects are destroyed when the returned guard drops, on normal
    /// and error exits alike.
    pub fn create_owned(backend: Backend) -> Result<Self> {
        Self::create_at(backend, keys::CHANNEL_SHM_NAME, keys::MSG_QUEUE_KEY)
    }

    /// Consumer entry point: attach to objects the producer created
    ///
    /// Fails fast with a distinguishable error when they do not exist yet;
    /// never creates anything, and the returned guard only detaches on drop.
    pub fn attach_borrowed(backend: Backend) -> Result<Self> {
        Self::attach_at(backend, keys::CHANNEL_SHM_NAME, keys::MSG_QUEUE_KEY)
    }

    pub(crate) fn create_at(
        backend: Backend,
        shm_name: &str,
        queue_key: libc::key_t,
    ) -> Result<Self> {
        let shm = ShmSegment::create(shm_name, ControlBlock::SIZE)?;
        let block = shm.as_ptr() as *mut ControlBlock;

        let rendezvous = unsafe { Rendezvous::init_owned(block)? };

        let mailbox = match backend {
            Backend::Queued => Mailbox::Queued(MsgQueue::create(queue_key)?),
            Backend::SharedBuffer => {
                Mailbox::SharedBuffer(unsafe { BufferSlot::from_raw(ControlBlock::payload_ptr(block)) })
            }
        };

        Ok(Self {
            mailbox,
            rendezvous,
            shm,
        })
    }

    pub(crate) fn attach_at(
        backend: Backend,
        shm_name: &str,
        queue_key: libc::key_t,
    ) -> Result<Self> {
        let shm = ShmSegment::attach(shm_name, ControlBlock::SIZE)?;
        let block = shm.as_ptr() as *mut ControlBlock;

        let rendezvous = unsafe { Rendezvous::attach(block) };

        let mailbox = match backend {
            Backend::Queued => Mailbox::Queued(MsgQueue::open(queue_key)?),
            Backend::SharedBuffer => {
                Mailbox::SharedBuffer(unsafe { BufferSlot::from_raw(ControlBlock::payload_ptr(block)) })
            }
        };

        Ok(Self {
            mailbox,
            rendezvous,
            shm,
        })
    }

    /// Send one message: wait for a free slot, transfer, publish
    ///
    /// Returns the wall-clock time of the transfer alone; time spent blocked
    /// on the peer is excluded, since it measures peer speed rather than
    /// transport cost. A transfer failure propagates without publishing:
    /// the peer is deliberately left blocked instead of being handed a
    /// partial payload.
    pub fn send(&mut self, msg: &Message) -> Result<Duration> {
        self.rendezvous.acquire_slot()?;
        let start = Instant::now();
        self.mailbox.write(msg)?;
        let elapsed = start.elapsed();
        self.rendezvous.publish()?;
        Ok(elapsed)
    }

    /// Receive one message, mirroring `send`
    ///
    /// The same fail-fast rule applies: a transfer failure propagates
    /// without releasing the slot.
    pub fn receive(&mut self, msg: &mut Message) -> Result<Duration> {
        self.rendezvous.acquire_message()?;
        let start = Instant::now();
        self.mailbox.read(msg)?;
        let elapsed = start.elapsed();
        self.rendezvous.release_slot()?;
        Ok(elapsed)
    }

    /// Producer side, after the sentinel: block until the consumer has
    /// drained it, so teardown cannot pull the objects out from under the
    /// peer
    pub fn wait_drained(&self) -> Result<()> {
        self.rendezvous.acquire_slot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailboxError;
    use std::thread;

    const TEST_QUEUE_KEY: libc::key_t = 0x6d62_7501;

    #[test]
    fn early_consumer_is_rejected() {
        let err = Link::attach_at(
            Backend::SharedBuffer,
            "link_test_no_producer",
            TEST_QUEUE_KEY,
        )
        .unwrap_err();
        assert!(matches!(err, MailboxError::ShmAttach { .. }));
    }

    #[test]
    fn owner_drop_tears_everything_down() {
        let name = "link_test_teardown";
        let key = 0x6d62_7502;

        let owner = Link::create_at(Backend::Queued, name, key).unwrap();
        drop(owner);

        assert!(ShmSegment::attach(name, ControlBlock::SIZE).is_err());
        assert!(MsgQueue::open(key).is_err());
    }

    #[test]
    fn borrower_drop_leaves_objects_alive() {
        let name = "link_test_borrower";
        let key = 0x6d62_7503;

        let owner = Link::create_at(Backend::Queued, name, key).unwrap();
        let borrower = Link::attach_at(Backend::Queued, name, key).unwrap();
        drop(borrower);

        assert!(ShmSegment::attach(name, ControlBlock::SIZE).is_ok());
        assert!(MsgQueue::open(key).is_ok());

        drop(owner);
    }

    #[test]
    fn transfer_time_excludes_permit_wait() {
        let name = "link_test_timing";
        let key = 0x6d62_7504;

        let mut owner = Link::create_at(Backend::SharedBuffer, name, key).unwrap();
        let mut borrower = Link::attach_at(Backend::SharedBuffer, name, key).unwrap();

        let consumer = thread::spawn(move || {
            let mut msg = Message::empty();
            // Stall before draining; the producer's reported transfer time
            // must not include this wait.
            thread::sleep(Duration::from_millis(50));
            borrower.receive(&mut msg).unwrap();
            borrower.receive(&mut msg).unwrap();
        });

        owner.send(&Message::from_text("one")).unwrap();
        // Second send blocks on the slot until the sleepy consumer drains
        // the first message.
        let transfer = owner.send(&Message::from_text("two")).unwrap();
        assert!(transfer < Duration::from_millis(50));

        consumer.join().unwrap();
    }
}
