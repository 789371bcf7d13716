// Shared IO service queue for schedsim
use std::collections::VecDeque;

use crate::process::ProcessId;

/// Pending IO requests plus a user-controlled "being serviced" toggle.
///
/// The queue never unblocks anyone by itself: the process manager polls
/// `drain_serviced` each frame and wakes whatever it hands back.
#[derive(Debug, Clone, Default)]
pub struct IoQueue {
    pending: VecDeque<ProcessId>,
    servicing: bool,
}

impl IoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the servicing toggle. Returns the new value.
    pub fn on_click(&mut self) -> bool {
        self.servicing = !self.servicing;
        log::debug!(
            "[io] Queue {} ({} pending)",
            if self.servicing { "servicing" } else { "idle" },
            self.pending.len()
        );
        self.servicing
    }

    pub fn is_servicing(&self) -> bool {
        self.servicing
    }

    /// Record an IO request from `pid`
    pub(crate) fn request(&mut self, pid: ProcessId) {
        if !self.pending.contains(&pid) {
            self.pending.push_back(pid);
        }
    }

    /// Drop a request without servicing it (the requester ended)
    pub(crate) fn cancel(&mut self, pid: ProcessId) {
        self.pending.retain(|&p| p != pid);
    }

    /// Take every pending request, in request order, if servicing is on
    pub(crate) fn drain_serviced(&mut self) -> Vec<ProcessId> {
        if !self.servicing {
            return Vec::new();
        }
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ProcessId> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_flips_servicing() {
        let mut queue = IoQueue::new();
        assert!(!queue.is_servicing());
        assert!(queue.on_click());
        assert!(!queue.on_click());
    }

    #[test]
    fn drains_only_while_servicing() {
        let mut queue = IoQueue::new();
        queue.request(3);
        queue.request(1);
        queue.request(3);
        assert_eq!(queue.pending_count(), 2);
        assert!(queue.drain_serviced().is_empty());

        queue.on_click();
        assert_eq!(queue.drain_serviced(), vec![3, 1]);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn cancel_removes_request() {
        let mut queue = IoQueue::new();
        queue.request(2);
        queue.request(5);
        queue.cancel(2);
        assert_eq!(queue.pending().copied().collect::<Vec<_>>(), vec![5]);
    }
}
