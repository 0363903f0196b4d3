// ── Request serializer ──
//
// Strict FIFO mutual exclusion over the single upstream session. Each
// caller enqueues a waiter; the waiter at the front of the queue holds
// the session. Releasing pops the holder and wakes exactly the next
// waiter through its oneshot channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::trace;

/// FIFO ticket queue guarding the upstream session.
///
/// Cheaply cloneable; all clones share the same queue.
#[derive(Clone, Default)]
pub struct RequestSerializer {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<VecDeque<Waiter>>,
    next_ticket: AtomicU64,
    /// Id of the ticket at the front of the queue, 0 when idle.
    head: AtomicU64,
}

struct Waiter {
    id: u64,
    /// `None` once the waiter has been granted.
    tx: Option<oneshot::Sender<()>>,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Waiter>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) {
        let mut queue = self.queue();
        let Some(pos) = queue.iter().position(|w| w.id == id) else {
            return;
        };
        queue.remove(pos);
        if pos != 0 {
            // A waiter that gave up before being granted.
            trace!(ticket = id, "abandoned waiter removed");
            return;
        }

        match queue.front_mut() {
            Some(next) => {
                self.head.store(next.id, Ordering::Release);
                if let Some(tx) = next.tx.take() {
                    // A closed receiver means the waiter is being dropped;
                    // its ticket releases the slot in turn.
                    let _ = tx.send(());
                }
                trace!(released = id, granted = next.id, "ticket handed over");
            }
            None => {
                self.head.store(0, Ordering::Release);
                trace!(released = id, "serializer idle");
            }
        }
    }
}

impl RequestSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of the upstream session.
    ///
    /// Tickets are granted in the order `acquire` futures are first
    /// polled. Dropping the future before it resolves removes the
    /// waiter from the queue.
    pub async fn acquire(&self) -> Ticket {
        let id = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();

        let granted = {
            let mut queue = self.shared.queue();
            let granted = queue.is_empty();
            if granted {
                self.shared.head.store(id, Ordering::Release);
            }
            queue.push_back(Waiter {
                id,
                tx: (!granted).then_some(tx),
            });
            granted
        };

        // Built before waiting so a dropped future still releases its slot.
        let ticket = Ticket {
            id,
            shared: Arc::clone(&self.shared),
            released: AtomicBool::new(false),
        };

        if !granted {
            trace!(ticket = id, "waiting for serializer");
            let _ = rx.await;
        }
        trace!(ticket = id, "serializer acquired");
        ticket
    }

    /// Release a ticket. Equivalent to [`Ticket::release`].
    pub fn release(&self, ticket: &Ticket) {
        ticket.release();
    }

    /// Number of holders plus waiters.
    pub fn queue_len(&self) -> usize {
        self.shared.queue().len()
    }

    /// Id of the current holder, if any.
    pub fn holder(&self) -> Option<u64> {
        match self.shared.head.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }
}

/// Proof of exclusive access to the upstream session.
///
/// Released on drop; releasing twice is a no-op.
pub struct Ticket {
    id: u64,
    shared: Arc<Shared>,
    released: AtomicBool,
}

impl Ticket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Hand the session to the next waiter.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.remove(self.id);
    }

    /// Whether this ticket currently holds the session.
    pub fn is_held(&self) -> bool {
        !self.released.load(Ordering::Acquire) && self.shared.head.load(Ordering::Acquire) == self.id
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("id", &self.id)
            .field("held", &self.is_held())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[test]
    fn first_acquire_is_granted_immediately() {
        let serializer = RequestSerializer::new();
        let mut acquire = task::spawn(serializer.acquire());
        let ticket = assert_ready!(acquire.poll());
        assert!(ticket.is_held());
        assert_eq!(serializer.holder(), Some(ticket.id()));
    }

    #[test]
    fn grants_in_enqueue_order() {
        let serializer = RequestSerializer::new();
        let mut first = task::spawn(serializer.acquire());
        let t1 = assert_ready!(first.poll());

        let mut second = task::spawn(serializer.acquire());
        let mut third = task::spawn(serializer.acquire());
        assert_pending!(second.poll());
        assert_pending!(third.poll());
        assert_eq!(serializer.queue_len(), 3);

        drop(t1);
        assert!(second.is_woken());
        assert!(!third.is_woken());
        let t2 = assert_ready!(second.poll());
        assert!(t2.is_held());
        assert_pending!(third.poll());

        drop(t2);
        assert!(third.is_woken());
        let t3 = assert_ready!(third.poll());
        assert!(t3.is_held());

        drop(t3);
        assert_eq!(serializer.holder(), None);
        assert_eq!(serializer.queue_len(), 0);
    }

    #[test]
    fn double_release_wakes_only_one_waiter() {
        let serializer = RequestSerializer::new();
        let mut first = task::spawn(serializer.acquire());
        let t1 = assert_ready!(first.poll());

        let mut second = task::spawn(serializer.acquire());
        let mut third = task::spawn(serializer.acquire());
        assert_pending!(second.poll());
        assert_pending!(third.poll());

        serializer.release(&t1);
        t1.release();
        drop(t1);

        assert!(second.is_woken());
        assert!(!third.is_woken());
        let _t2 = assert_ready!(second.poll());
        assert_pending!(third.poll());
        assert_eq!(serializer.queue_len(), 2);
    }

    #[test]
    fn abandoned_waiter_does_not_wedge_the_queue() {
        let serializer = RequestSerializer::new();
        let mut first = task::spawn(serializer.acquire());
        let t1 = assert_ready!(first.poll());

        let mut second = task::spawn(serializer.acquire());
        let mut third = task::spawn(serializer.acquire());
        assert_pending!(second.poll());
        assert_pending!(third.poll());

        drop(second);
        assert_eq!(serializer.queue_len(), 2);

        drop(t1);
        assert!(third.is_woken());
        let t3 = assert_ready!(third.poll());
        assert!(t3.is_held());
    }

    #[tokio::test]
    async fn concurrent_tasks_are_serialized() {
        let serializer = RequestSerializer::new();
        let active = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let serializer = serializer.clone();
            let active = Arc::clone(&active);
            handles.push(tokio::spawn(async move {
                let _ticket = serializer.acquire().await;
                assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(serializer.holder(), None);
    }
}
