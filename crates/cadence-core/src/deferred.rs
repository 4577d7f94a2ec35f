//! List with deferred structural mutation
//!
//! Frame loops iterate collections that the iterated items themselves mutate
//! (an update hook spawning or despawning objects). `DeferredList` buffers
//! additions and removals in side lists and applies them only at explicit
//! sync points, so iteration over the current items never observes a
//! structural change mid-pass.

use std::cell::RefCell;
use std::mem;

/// A list whose `add`/`remove` are buffered until `apply_add`/`apply_remove_by`
///
/// All methods take `&self`; interior mutability makes the list usable from
/// callbacks that already hold a shared reference to its owner. Methods that
/// run user callbacks (`apply_add`, `apply_remove_by`, `for_each`) must not
/// be re-entered from those callbacks; buffering `add`/`remove` from inside
/// them is fine.
pub struct DeferredList<T: Clone> {
    current: RefCell<Vec<T>>,
    pending_add: RefCell<Vec<T>>,
    pending_remove: RefCell<Vec<T>>,
}

impl<T: Clone> Default for DeferredList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> DeferredList<T> {
    pub fn new() -> Self {
        Self {
            current: RefCell::new(Vec::new()),
            pending_add: RefCell::new(Vec::new()),
            pending_remove: RefCell::new(Vec::new()),
        }
    }

    /// Buffer an addition until the next `apply_add`
    pub fn add(&self, item: T) {
        self.pending_add.borrow_mut().push(item);
    }

    /// Buffer a removal until the next `apply_remove_by`
    pub fn remove(&self, item: T) {
        self.pending_remove.borrow_mut().push(item);
    }

    /// Number of items currently visible to iteration
    pub fn len(&self) -> usize {
        self.current.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.borrow().is_empty()
    }

    /// Number of buffered additions not yet applied
    pub fn pending_add_len(&self) -> usize {
        self.pending_add.borrow().len()
    }

    /// Move buffered additions into the current list.
    ///
    /// `on_added` runs for each moved item after it is inserted and decides
    /// whether the item stays; returning `false` drops it again. Returns
    /// whether anything was applied.
    pub fn apply_add(&self, mut on_added: impl FnMut(&T) -> bool) -> bool {
        let added = mem::take(&mut *self.pending_add.borrow_mut());
        if added.is_empty() {
            return false;
        }
        for item in added {
            self.current.borrow_mut().push(item.clone());
            if !on_added(&item) {
                self.current.borrow_mut().pop();
            }
        }
        true
    }

    /// Apply buffered removals.
    ///
    /// `same` decides identity. `on_removed` runs for every buffered item,
    /// whether or not a match was found in the current list; a buffered
    /// removal of an item whose addition never got applied still needs its
    /// teardown callback.
    pub fn apply_remove_by(
        &self,
        same: impl Fn(&T, &T) -> bool,
        mut on_removed: impl FnMut(&T),
    ) -> bool {
        let removed = mem::take(&mut *self.pending_remove.borrow_mut());
        if removed.is_empty() {
            return false;
        }
        for item in &removed {
            let pos = self.current.borrow().iter().position(|c| same(c, item));
            if let Some(pos) = pos {
                self.current.borrow_mut().remove(pos);
            }
            on_removed(item);
        }
        true
    }

    /// Run `f` over the current items in order
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let len = self.current.borrow().len();
        for i in 0..len {
            let item = match self.current.borrow().get(i) {
                Some(item) => item.clone(),
                None => break,
            };
            f(&item);
        }
    }

    /// Clone of the current items
    pub fn snapshot(&self) -> Vec<T> {
        self.current.borrow().clone()
    }

    /// First current item satisfying the predicate
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.current.borrow().iter().find(|item| pred(item)).cloned()
    }

    /// Sort the current items in place
    pub fn sort_by(&self, cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.current.borrow_mut().sort_by(cmp);
    }

    /// Drop all current and pending items
    pub fn clear(&self) {
        self.current.borrow_mut().clear();
        self.pending_add.borrow_mut().clear();
        self.pending_remove.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_deferred_until_apply() {
        let list = DeferredList::new();
        list.add(1);
        list.add(2);
        assert_eq!(list.len(), 0);
        assert_eq!(list.pending_add_len(), 2);
        assert!(list.apply_add(|_| true));
        assert_eq!(list.len(), 2);
        assert_eq!(list.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_apply_add_empty_returns_false() {
        let list: DeferredList<i32> = DeferredList::new();
        assert!(!list.apply_add(|_| true));
    }

    #[test]
    fn test_on_added_can_reject() {
        let list = DeferredList::new();
        list.add(1);
        list.add(2);
        list.add(3);
        list.apply_add(|item| *item != 2);
        assert_eq!(list.snapshot(), vec![1, 3]);
    }

    #[test]
    fn test_remove_is_deferred() {
        let list = DeferredList::new();
        list.add(1);
        list.add(2);
        list.apply_add(|_| true);
        list.remove(1);
        assert_eq!(list.len(), 2);
        list.apply_remove_by(|a, b| a == b, |_| {});
        assert_eq!(list.snapshot(), vec![2]);
    }

    #[test]
    fn test_removed_callback_fires_for_missing_item() {
        let list = DeferredList::new();
        list.add(1);
        list.apply_add(|_| true);
        list.remove(99);
        let mut removed = Vec::new();
        list.apply_remove_by(|a, b| a == b, |item| removed.push(*item));
        assert_eq!(removed, vec![99]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_add_from_within_for_each_is_buffered() {
        let list = DeferredList::new();
        list.add(1);
        list.apply_add(|_| true);
        list.for_each(|item| {
            list.add(item + 10);
        });
        assert_eq!(list.len(), 1);
        list.apply_add(|_| true);
        assert_eq!(list.snapshot(), vec![1, 11]);
    }

    #[test]
    fn test_add_from_within_apply_waits_for_next_apply() {
        let list = DeferredList::new();
        list.add(1);
        list.apply_add(|item| {
            if *item == 1 {
                list.add(2);
            }
            true
        });
        assert_eq!(list.snapshot(), vec![1]);
        list.apply_add(|_| true);
        assert_eq!(list.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_sort_and_find() {
        let list = DeferredList::new();
        list.add(3);
        list.add(1);
        list.add(2);
        list.apply_add(|_| true);
        list.sort_by(|a, b| a.cmp(b));
        assert_eq!(list.snapshot(), vec![1, 2, 3]);
        assert_eq!(list.find(|item| *item > 1), Some(2));
        assert_eq!(list.find(|item| *item > 9), None);
    }

    #[test]
    fn test_clear_drops_pending_too() {
        let list = DeferredList::new();
        list.add(1);
        list.apply_add(|_| true);
        list.add(2);
        list.remove(1);
        list.clear();
        assert_eq!(list.len(), 0);
        assert!(!list.apply_add(|_| true));
        assert!(!list.apply_remove_by(|a, b| a == b, |_| {}));
    }
}
