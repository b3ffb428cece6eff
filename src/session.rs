//! Producer and consumer driving loops

use crate::error::Result;
use crate::link::Link;
use crate::mailbox::Backend;
use crate::message::Message;
use crate::timing::Latency;

/// Sending side of the benchmark
///
/// Owns the channel objects and the sender's latency total; both live and
/// die with this struct instead of sitting in process-wide globals.
pub struct Producer {
    link: Link,
    latency: Latency,
}

impl Producer {
    /// Create the channel and take ownership of its IPC objects
    pub fn start(backend: Backend) -> Result<Self> {
        Ok(Self {
            link: Link::create_owned(backend)?,
            latency: Latency::default(),
        })
    }

    /// Send one line of input as a message, accumulating its transfer time
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let sample = self.link.send(&Message::from_text(line))?;
        self.latency.record(sample);
        Ok(())
    }

    /// Send the sentinel, wait until the consumer has drained it, and tear
    /// the channel down
    ///
    /// Returns the accumulated transfer latency (the sentinel included).
    pub fn finish(mut self) -> Result<Latency> {
        let sample = self.link.send(&Message::sentinel())?;
        self.latency.record(sample);
        self.link.wait_drained()?;
        Ok(self.latency)
    }
}

/// Receiving side of the benchmark
pub struct Consumer {
    link: Link,
    latency: Latency,
}

impl Consumer {
    /// Attach to a channel the producer already created
    pub fn attach(backend: Backend) -> Result<Self> {
        Ok(Self {
            link: Link::attach_borrowed(backend)?,
            latency: Latency::default(),
        })
    }

    /// Receive the next message
    ///
    /// Returns `None` once the sentinel arrives; the sentinel itself is
    /// never surfaced as content.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let mut msg = Message::empty();
        let sample = self.link.receive(&mut msg)?;
        self.latency.record(sample);
        if msg.is_sentinel() {
            return Ok(None);
        }
        Ok(Some(msg.as_text().into_owned()))
    }

    /// Accumulated transfer latency; the drop that follows only detaches
    pub fn into_latency(self) -> Latency {
        self.latency
    }
}
