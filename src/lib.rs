//! mailbench - point-to-point IPC latency benchmark
//!
//! A producer process streams lines from a file to a consumer process over
//! one of two interchangeable transports: a System V message queue or a raw
//! shared-memory buffer. A two-semaphore rendezvous serializes both
//! transports to a single in-flight message, so the measured per-transfer
//! cost is comparable across backends.
//!
//! # Roles
//!
//! - **Producer**: creates every IPC object, sends each input line followed
//!   by a sentinel, waits for the consumer to drain it, then destroys what
//!   it created
//! - **Consumer**: attaches to existing objects (failing fast if the
//!   producer has not run), prints messages until the sentinel, and
//!   detaches without destroying anything
//!
//! A crashed peer leaves the other side blocked on the handshake forever;
//! this tool is a benchmark harness, not a messaging service.

pub mod error;
pub mod keys;
pub mod link;
pub mod mailbox;
pub mod message;
pub mod queue;
pub mod rendezvous;
pub mod session;
pub mod shm;
pub mod timing;

pub use error::{MailboxError, Result};
pub use link::Link;
pub use mailbox::Backend;
pub use message::{Message, MSG_CAPACITY, SENTINEL};
pub use session::{Consumer, Producer};
pub use timing::Latency;
