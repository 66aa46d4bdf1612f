//! Ordering of store writes.
//!
//! A writer takes a [`Ticket`] while it still holds the tree lock, releases
//! the lock, and then waits for its turn. Tickets are served in issue order,
//! so store writes land in mutation order while the tree stays available to
//! readers and later writers during I/O.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct PersistQueue {
    issued: AtomicU64,
    /// Ticket currently allowed to write.
    serving: Mutex<u64>,
    turn: Condvar,
}

impl PersistQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reserve the next slot. Call while holding the lock that orders the
    /// mutations.
    pub(crate) fn ticket(&self) -> Ticket<'_> {
        Ticket {
            queue: self,
            id: self.issued.fetch_add(1, Ordering::SeqCst),
        }
    }

    fn wait_for(&self, id: u64) {
        let mut serving = self.serving.lock();
        while *serving != id {
            self.turn.wait(&mut serving);
        }
    }
}

/// A reserved slot in a [`PersistQueue`].
///
/// Dropping the ticket waits for its turn if it has not been taken yet and
/// then passes the turn on, so an abandoned ticket never stalls the queue.
#[derive(Debug)]
pub(crate) struct Ticket<'a> {
    queue: &'a PersistQueue,
    id: u64,
}

impl Ticket<'_> {
    /// Block until every earlier ticket has been released.
    pub(crate) fn wait(&self) {
        self.queue.wait_for(self.id);
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        let mut serving = self.queue.serving.lock();
        while *serving != self.id {
            self.queue.turn.wait(&mut serving);
        }
        *serving += 1;
        drop(serving);
        self.queue.turn.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_tickets_are_served_in_issue_order() {
        let queue = PersistQueue::new();
        let order = Mutex::new(Vec::new());

        let first = queue.ticket();
        let second = queue.ticket();
        let third = queue.ticket();
        assert_eq!((first.id, second.id, third.id), (0, 1, 2));

        thread::scope(|s| {
            let order = &order;
            s.spawn(move || {
                third.wait();
                order.lock().push(3);
                drop(third);
            });
            s.spawn(move || {
                second.wait();
                order.lock().push(2);
                drop(second);
            });

            thread::sleep(Duration::from_millis(50));
            assert!(order.lock().is_empty());

            first.wait();
            order.lock().push(1);
            drop(first);
        });

        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dropped_ticket_passes_the_turn() {
        let queue = PersistQueue::new();

        drop(queue.ticket());
        let next = queue.ticket();
        next.wait();
        assert_eq!(next.id, 1);
    }
}
