//! Error types for mailbench

use std::io;
use thiserror::Error;

/// Result type for mailbench operations
pub type Result<T> = std::result::Result<T, MailboxError>;

/// Errors that can occur while setting up or driving a transport
///
/// There is no recovery anywhere in this tool: every variant is fatal and
/// surfaces as a diagnostic plus a non-zero exit.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// Failed to create the shared control segment
    #[error("failed to create shared memory '{name}': {source}")]
    ShmCreate {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to attach to a segment the producer should have created
    #[error("failed to attach shared memory '{name}' (is the producer running?): {source}")]
    ShmAttach {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to map the segment
    #[error("failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to size the segment
    #[error("failed to set shared memory size: {0}")]
    Truncate(#[source] io::Error),

    /// Segment exists but cannot hold the control block
    #[error("shared segment too small: need {need} bytes, got {got}")]
    SegmentTooSmall { need: usize, got: usize },

    /// Failed to create the message queue
    #[error("failed to create message queue: {0}")]
    QueueCreate(#[source] io::Error),

    /// Failed to open a queue the producer should have created
    #[error("failed to open message queue (is the producer running?): {0}")]
    QueueOpen(#[source] io::Error),

    /// The kernel refused to enqueue a record
    #[error("failed to enqueue record: {0}")]
    QueueSend(#[source] io::Error),

    /// The kernel refused to dequeue a record
    #[error("failed to dequeue record: {0}")]
    QueueReceive(#[source] io::Error),

    /// A cross-process permit operation failed outright (not merely blocked)
    #[error("semaphore {op} failed: {source}")]
    Permit {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}
