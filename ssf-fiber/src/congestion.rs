//! The outbound congestion policy consulted before a datagram is enqueued
//! (spec §4.4.3 step 1), ported from `basic_Multiplexer::Send`'s
//! `congestion_policy_.IsAddable(pending_datagrams_, datagram)` call.

/// Decides whether another datagram may join the pending send queue.
/// `queue_len` is the number of datagrams already enqueued (not yet
/// written to the link); `payload_len` is the size of the candidate
/// datagram's payload.
pub trait CongestionPolicy: Send + Sync {
    fn is_addable(&self, queue_len: usize, payload_len: usize) -> bool;
}

/// Rejects once the queue holds `max_queued` datagrams, regardless of
/// size. The original ships no concrete policy in `basic_multiplexer.h`
/// (it's a template parameter); a flat queue-depth cap is the simplest
/// policy that makes spec §8 scenario 6 ("accepts up to the threshold,
/// then rejects") observable.
pub struct BoundedQueuePolicy {
    max_queued: usize,
}

impl BoundedQueuePolicy {
    pub fn new(max_queued: usize) -> Self {
        Self { max_queued }
    }
}

impl Default for BoundedQueuePolicy {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl CongestionPolicy for BoundedQueuePolicy {
    fn is_addable(&self, queue_len: usize, _payload_len: usize) -> bool {
        queue_len < self.max_queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_full() {
        let policy = BoundedQueuePolicy::new(2);
        assert!(policy.is_addable(0, 10));
        assert!(policy.is_addable(1, 10));
        assert!(!policy.is_addable(2, 10));
    }
}
