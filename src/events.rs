// User events forwarded by the presentation layer
use crossbeam_queue::ArrayQueue;

use crate::process::ProcessId;
use crate::services::page_manager::PageId;

/// A semantic user action. Pixel hit-testing stays in the presentation
/// layer; only the target widget reaches the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    IoQueueClick,
    PageClick(PageId),
    ProcessClick(ProcessId),
    TerminateProcess(ProcessId),
}

/// Bounded queue of user events waiting for the next tick
pub struct EventQueue {
    events: ArrayQueue<UserEvent>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: ArrayQueue::new(capacity),
        }
    }

    /// Queue an event. A full queue drops it and hands it back.
    pub fn push(&self, event: UserEvent) -> Result<(), UserEvent> {
        self.events.push(event).map_err(|event| {
            log::warn!("[events] Event queue full; dropping {:?}", event);
            event
        })
    }

    pub fn pop(&self) -> Option<UserEvent> {
        self.events.pop()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order() {
        let queue = EventQueue::new(4);
        queue.push(UserEvent::IoQueueClick).unwrap();
        queue.push(UserEvent::PageClick(2)).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(UserEvent::IoQueueClick));
        assert_eq!(queue.pop(), Some(UserEvent::PageClick(2)));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn full_queue_rejects() {
        let queue = EventQueue::new(1);
        queue.push(UserEvent::ProcessClick(1)).unwrap();
        assert_eq!(
            queue.push(UserEvent::TerminateProcess(1)),
            Err(UserEvent::TerminateProcess(1))
        );
        assert_eq!(queue.capacity(), 1);
    }
}
