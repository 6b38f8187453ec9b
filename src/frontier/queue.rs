use crate::frontier::WorkItem;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

/// A work item with its insertion sequence number
#[derive(Debug)]
struct QueuedItem {
    item: WorkItem,
    seq: u64,
}

// Reverse comparison so BinaryHeap pops the lowest priority value first,
// and among equal priorities the earliest inserted item.
impl Ord for QueuedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .item
            .priority
            .cmp(&self.item.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedItem {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedItem {}

type DomainHeap = Arc<Mutex<BinaryHeap<QueuedItem>>>;

/// Round-robin cursor over domains in first-seen order
#[derive(Debug, Default)]
struct Rotation {
    order: Vec<Arc<str>>,
    next: usize,
}

/// One priority queue per domain, served in a stable rotation
///
/// Each domain's heap has its own lock; the rotation has another. No
/// operation holds two of these locks at once.
#[derive(Debug, Default)]
pub struct DomainQueues {
    queues: DashMap<Arc<str>, DomainHeap>,
    rotation: Mutex<Rotation>,
    sequence: AtomicU64,
    pending: AtomicUsize,
}

impl DomainQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an item onto its domain's queue, creating the queue on first use
    pub fn enqueue(&self, item: WorkItem) {
        let heap = self.heap_for(&item.domain);
        let seq = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);

        // Counted before the push so `len` never under-reports a queued item.
        self.pending.fetch_add(1, AtomicOrdering::SeqCst);
        heap.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(QueuedItem { item, seq });
    }

    /// Takes the best item of the next non-empty domain in the rotation
    ///
    /// Scanning starts just after the domain served last. The cursor then
    /// moves past the domain that produced the item, so a domain with a
    /// single queued URL waits at most one full rotation behind a busy one.
    ///
    /// Returns `None` only when every domain queue is empty.
    pub fn dequeue_next(&self) -> Option<WorkItem> {
        let (order, start) = {
            let rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
            (rotation.order.clone(), rotation.next)
        };

        let domains = order.len();
        for offset in 0..domains {
            let idx = (start + offset) % domains;
            let Some(heap) = self.queues.get(&order[idx]).map(|e| Arc::clone(e.value())) else {
                continue;
            };

            let popped = heap.lock().unwrap_or_else(PoisonError::into_inner).pop();
            if let Some(queued) = popped {
                self.pending.fetch_sub(1, AtomicOrdering::SeqCst);
                let mut rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
                rotation.next = idx + 1;
                return Some(queued.item);
            }
        }

        None
    }

    /// Number of queued items across all domains
    pub fn len(&self) -> usize {
        self.pending.load(AtomicOrdering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of domains ever seen
    pub fn domain_count(&self) -> usize {
        self.queues.len()
    }

    /// Number of queued items for one domain
    pub fn domain_len(&self, domain: &str) -> usize {
        self.queues
            .get(domain)
            .map(|e| e.value().lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    fn heap_for(&self, domain: &str) -> DomainHeap {
        if let Some(existing) = self.queues.get(domain) {
            return Arc::clone(existing.value());
        }

        let key: Arc<str> = Arc::from(domain);
        let mut created = false;
        let heap = Arc::clone(
            self.queues
                .entry(Arc::clone(&key))
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Mutex::new(BinaryHeap::new()))
                })
                .value(),
        );

        if created {
            self.rotation
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .order
                .push(key);
        }

        heap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::Priority;

    fn item(url: &str, priority: u32) -> WorkItem {
        WorkItem::new(url, 0, Priority(priority)).unwrap()
    }

    #[test]
    fn test_empty_queue() {
        let queues = DomainQueues::new();
        assert!(queues.is_empty());
        assert!(queues.dequeue_next().is_none());
    }

    #[test]
    fn test_priority_order_within_domain() {
        let queues = DomainQueues::new();
        queues.enqueue(item("https://a.test/low", 100));
        queues.enqueue(item("https://a.test/high", 10));
        queues.enqueue(item("https://a.test/mid", 50));

        assert_eq!(queues.dequeue_next().unwrap().url, "https://a.test/high");
        assert_eq!(queues.dequeue_next().unwrap().url, "https://a.test/mid");
        assert_eq!(queues.dequeue_next().unwrap().url, "https://a.test/low");
        assert!(queues.dequeue_next().is_none());
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let queues = DomainQueues::new();
        for i in 0..5 {
            queues.enqueue(item(&format!("https://a.test/{}", i), 100));
        }

        for i in 0..5 {
            assert_eq!(
                queues.dequeue_next().unwrap().url,
                format!("https://a.test/{}", i)
            );
        }
    }

    #[test]
    fn test_round_robin_across_domains() {
        let queues = DomainQueues::new();
        queues.enqueue(item("https://a.test/1", 100));
        queues.enqueue(item("https://a.test/2", 100));
        queues.enqueue(item("https://b.test/1", 100));
        queues.enqueue(item("https://c.test/1", 100));
        queues.enqueue(item("https://c.test/2", 100));

        let order: Vec<String> = std::iter::from_fn(|| queues.dequeue_next())
            .map(|i| i.url)
            .collect();

        assert_eq!(
            order,
            vec![
                "https://a.test/1",
                "https://b.test/1",
                "https://c.test/1",
                "https://a.test/2",
                "https://c.test/2",
            ]
        );
    }

    #[test]
    fn test_small_domain_not_starved() {
        let queues = DomainQueues::new();
        for i in 0..100 {
            queues.enqueue(item(&format!("https://a.test/{}", i), 100));
        }
        queues.enqueue(item("https://b.test/only", 100));

        let first_two: Vec<String> = (0..2)
            .filter_map(|_| queues.dequeue_next())
            .map(|i| i.domain)
            .collect();

        assert!(first_two.contains(&"https://b.test".to_string()));
    }

    #[test]
    fn test_domain_added_mid_rotation() {
        let queues = DomainQueues::new();
        queues.enqueue(item("https://a.test/1", 100));
        queues.enqueue(item("https://a.test/2", 100));
        assert_eq!(queues.dequeue_next().unwrap().url, "https://a.test/1");

        queues.enqueue(item("https://b.test/1", 100));
        assert_eq!(queues.dequeue_next().unwrap().url, "https://b.test/1");
        assert_eq!(queues.dequeue_next().unwrap().url, "https://a.test/2");
    }

    #[test]
    fn test_len_tracks_items() {
        let queues = DomainQueues::new();
        queues.enqueue(item("https://a.test/1", 1));
        queues.enqueue(item("https://b.test/1", 1));
        queues.enqueue(item("https://b.test/2", 1));

        assert_eq!(queues.len(), 3);
        assert_eq!(queues.domain_count(), 2);
        assert_eq!(queues.domain_len("https://b.test"), 2);

        queues.dequeue_next();
        assert_eq!(queues.len(), 2);
    }
}
