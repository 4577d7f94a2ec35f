//! Bounded free list for reusable instances

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::spin::SpinLock;

/// A bounded LIFO free list.
///
/// Renting pops the most recently returned instance; returning pushes it back
/// unless the pool is already at capacity, in which case the instance is
/// simply dropped. The capacity can be adjusted at runtime; shrinking does not
/// evict instances already stored, it only stops further returns.
pub struct InstancePool<T> {
    items: SpinLock<Vec<T>>,
    max: AtomicUsize,
}

impl<T> InstancePool<T> {
    pub fn new(max: usize) -> Self {
        Self {
            items: SpinLock::new(Vec::new()),
            max: AtomicUsize::new(max),
        }
    }

    /// Pop a pooled instance, or `None` if the pool is empty
    pub fn try_rent(&self) -> Option<T> {
        self.items.lock().pop()
    }

    /// Like `try_rent`, but gives up instead of spinning under contention
    pub fn try_rent_fast(&self) -> Option<T> {
        self.items.try_lock()?.pop()
    }

    /// Return an instance to the pool, dropping it if the pool is full
    pub fn return_instance(&self, item: T) {
        let mut items = self.items.lock();
        if items.len() < self.max.load(Ordering::Relaxed) {
            items.push(item);
        }
    }

    pub fn set_max(&self, max: usize) {
        self.max.store(max, Ordering::Relaxed);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rent_from_empty_pool() {
        let pool: InstancePool<i32> = InstancePool::new(4);
        assert!(pool.try_rent().is_none());
        assert!(pool.try_rent_fast().is_none());
    }

    #[test]
    fn test_lifo_order() {
        let pool = InstancePool::new(4);
        pool.return_instance(1);
        pool.return_instance(2);
        assert_eq!(pool.try_rent(), Some(2));
        assert_eq!(pool.try_rent(), Some(1));
        assert_eq!(pool.try_rent(), None);
    }

    #[test]
    fn test_capacity_drops_overflow() {
        let pool = InstancePool::new(2);
        pool.return_instance(1);
        pool.return_instance(2);
        pool.return_instance(3);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_set_max_stops_further_returns() {
        let pool = InstancePool::new(4);
        pool.return_instance(1);
        pool.return_instance(2);
        pool.set_max(1);
        // Stored instances survive the shrink.
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.try_rent(), Some(2));
        pool.return_instance(3);
        assert_eq!(pool.len(), 1);
    }
}
