use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use tracing::trace;

/// Handle returned by [`Store::subscribe`], used to unsubscribe again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriberId(usize);

type Callback<T> = Box<dyn FnMut(&T)>;

struct StoreInner<T> {
    value: T,
    next_id: usize,
    subscribers: Vec<(usize, Callback<T>)>,
    /// ids unsubscribed while a notification was running
    dead: Vec<usize>,
    /// a notification dispatch is in progress
    notifying: bool,
    /// a callback re-entered `set`, the value must be delivered again
    dirty: bool,
}

/// An observable mutable cell.
///
/// Holds a current value and an ordered list of callbacks. `set` replaces
/// the value and invokes every callback synchronously in registration
/// order, `subscribe` registers a callback and invokes it immediately with
/// the current value. Meant for cooperative single-threaded UI dispatch:
/// cloning the store yields another handle to the same cell, there is a
/// single-writer assumption and no locking.
pub struct Store<T> {
    inner: Rc<RefCell<StoreInner<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Store {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Default + 'static> Default for Store<T> {
    fn default() -> Self {
        Store::new(T::default())
    }
}

impl<T: Clone + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Store {
            inner: Rc::new(RefCell::new(StoreInner {
                value,
                next_id: 0,
                subscribers: Vec::new(),
                dead: Vec::new(),
                notifying: false,
                dirty: false,
            })),
        }
    }

    /// A clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Replaces the value and notifies all subscribers, even when the new
    /// value equals the old one.
    pub fn set(&self, value: T) {
        self.inner.borrow_mut().value = value;
        self.notify();
    }

    /// Derives the next value from the current one, then notifies.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let inner = self.inner.borrow();
            f(&inner.value)
        };
        self.set(next);
    }

    /// Registers a callback and invokes it immediately with the current
    /// value. Afterwards it runs on every `set`, in registration order.
    pub fn subscribe(&self, mut callback: impl FnMut(&T) + 'static) -> SubscriberId {
        let current = self.get();
        callback(&current);
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));
        trace!(subscriber = id, "store subscriber attached");
        SubscriberId(id)
    }

    /// Removes a registration. Unknown ids are ignored. May be called from
    /// within a notification callback, in which case the removed callback
    /// fires no further.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.borrow_mut();
        inner.dead.push(id.0);
        inner.subscribers.retain(|(sid, _)| *sid != id.0);
        trace!(subscriber = id.0, "store subscriber removed");
    }

    fn notify(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.notifying {
                // a callback re-entered set; the running dispatch loop picks
                // the new value up in its next round
                inner.dirty = true;
                return;
            }
            inner.notifying = true;
        }
        loop {
            // Callbacks run outside the borrow so they may read the store,
            // attach further subscribers, unsubscribe or set again.
            let (value, mut running) = {
                let mut inner = self.inner.borrow_mut();
                inner.dirty = false;
                (inner.value.clone(), mem::take(&mut inner.subscribers))
            };
            trace!(subscribers = running.len(), "store set, notifying");
            for (id, callback) in running.iter_mut() {
                let removed = self.inner.borrow().dead.contains(id);
                if !removed {
                    callback(&value);
                }
            }
            let mut inner = self.inner.borrow_mut();
            // subscribers attached during the notification keep their
            // position after the ones that were already registered
            let attached = mem::take(&mut inner.subscribers);
            running.retain(|(id, _)| !inner.dead.contains(id));
            inner.subscribers = running;
            inner.subscribers.extend(attached);
            inner.dead.clear();
            if !inner.dirty {
                inner.notifying = false;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen_values<T: Clone + 'static>(store: &Store<T>) -> Rc<RefCell<Vec<T>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |value: &T| sink.borrow_mut().push(value.clone()));
        seen
    }

    #[test]
    fn subscriber_is_invoked_immediately_with_current_value() {
        let _ = tracing_subscriber::fmt::try_init();
        let store: Store<Option<String>> = Store::new(None);
        let seen = seen_values(&store);
        assert_eq!(*seen.borrow(), vec![None]);
    }

    #[test]
    fn set_notifies_every_subscriber() {
        let store = Store::new(0);
        let first = seen_values(&store);
        let second = seen_values(&store);
        store.set(7);
        assert_eq!(*first.borrow(), vec![0, 7]);
        assert_eq!(*second.borrow(), vec![0, 7]);
    }

    #[test]
    fn late_subscriber_sees_the_latest_value() {
        let store: Store<Option<String>> = Store::new(None);
        store.set(Some("abc123".to_string()));
        let seen = seen_values(&store);
        assert_eq!(*seen.borrow(), vec![Some("abc123".to_string())]);
        store.set(None);
        assert_eq!(*seen.borrow(), vec![Some("abc123".to_string()), None]);
    }

    #[test]
    fn setting_the_current_value_again_still_notifies() {
        let store = Store::new(5);
        let seen = seen_values(&store);
        store.set(5);
        assert_eq!(*seen.borrow(), vec![5, 5]);
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let store = Store::new(());
        for label in ["a", "b", "c"] {
            let sink = Rc::clone(&order);
            store.subscribe(move |_| sink.borrow_mut().push(label));
        }
        order.borrow_mut().clear();
        store.set(());
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsubscribed_callback_no_longer_fires() {
        let store = Store::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |value: &i32| sink.borrow_mut().push(*value));
        store.set(1);
        store.unsubscribe(id);
        store.set(2);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn unsubscribe_during_notification_takes_effect() {
        let store = Store::new(0);
        let handle = store.clone();
        let id = Rc::new(RefCell::new(None));
        let id_slot = Rc::clone(&id);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let registered = store.subscribe(move |value: &i32| {
            sink.borrow_mut().push(*value);
            if let Some(own_id) = *id_slot.borrow() {
                handle.unsubscribe(own_id);
            }
        });
        *id.borrow_mut() = Some(registered);
        store.set(1);
        store.set(2);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn set_from_inside_a_callback_still_reaches_every_subscriber() {
        let store = Store::new(0);
        let handle = store.clone();
        store.subscribe(move |value: &i32| {
            if *value == 1 {
                handle.set(2);
            }
        });
        let seen = seen_values(&store);
        store.set(1);
        assert_eq!(store.get(), 2);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_survives_a_nested_set() {
        let store = Store::new(0);
        let handle = store.clone();
        let victim = Rc::new(RefCell::new(None));
        let victim_slot = Rc::clone(&victim);
        store.subscribe(move |value: &i32| {
            if *value == 1 {
                if let Some(id) = *victim_slot.borrow() {
                    handle.unsubscribe(id);
                }
                handle.set(3);
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |value: &i32| sink.borrow_mut().push(*value));
        *victim.borrow_mut() = Some(id);
        store.set(1);
        assert_eq!(store.get(), 3);
        assert_eq!(*seen.borrow(), vec![0]);
        store.set(4);
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn subscriber_attached_during_notification_waits_for_the_next_set() {
        let store = Store::new(0);
        let handle = store.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let attached = Rc::new(RefCell::new(false));
        let attached_flag = Rc::clone(&attached);
        store.subscribe(move |value: &i32| {
            if *value == 1 && !*attached_flag.borrow() {
                *attached_flag.borrow_mut() = true;
                let inner_sink = Rc::clone(&sink);
                handle.subscribe(move |value: &i32| inner_sink.borrow_mut().push(*value));
            }
        });
        store.set(1);
        // the immediate invocation on subscribe delivered the in-flight
        // value once, the dispatch loop for set(1) did not run it again
        assert_eq!(*seen.borrow(), vec![1]);
        store.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn update_derives_from_the_current_value() {
        let store = Store::new(10);
        let seen = seen_values(&store);
        store.update(|value| value + 5);
        assert_eq!(store.get(), 15);
        assert_eq!(*seen.borrow(), vec![10, 15]);
    }

    #[test]
    fn cloned_handles_share_the_cell() {
        let store = Store::new(0);
        let handle = store.clone();
        let seen = seen_values(&store);
        handle.set(3);
        assert_eq!(store.get(), 3);
        assert_eq!(*seen.borrow(), vec![0, 3]);
    }
}
