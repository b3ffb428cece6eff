//! Well-known identifiers shared by the producer and consumer
//!
//! Both processes agree on these out of band; the only thing passed on the
//! command line is the backend selector. Keeping every name and key in one
//! place rules out producer/consumer mismatches.

/// Name of the POSIX shared memory segment holding the control block
/// (prefixed by the shm module before use)
pub const CHANNEL_SHM_NAME: &str = "channel";

/// System V key identifying the benchmark message queue ("mbc1")
pub const MSG_QUEUE_KEY: libc::key_t = 0x6d62_6331;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_name_is_plain() {
        assert!(!CHANNEL_SHM_NAME.is_empty());
        assert!(!CHANNEL_SHM_NAME.contains('/'));
    }

    #[test]
    fn queue_key_is_positive() {
        assert!(MSG_QUEUE_KEY > 0);
    }
}
