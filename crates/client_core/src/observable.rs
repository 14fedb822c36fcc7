//! Push-based UI state holder.
//!
//! An [`Observable`] is a shared cell with a list of observers. Every
//! mutation notifies all observers synchronously, on the thread that made
//! the mutation, in registration order. Observers stay registered for as
//! long as their [`Subscription`] is alive.
//!
//! Mutations from different threads are serialized together with their
//! notifications, so observers always see values in commit order and the
//! last notification carries the current value. An observer may read the
//! cell or subscribe to it, but must not mutate the cell it observes.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, Weak,
};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Cell<T> {
    /// Held from a mutation until its observers have run.
    publishing: Mutex<()>,
    value: Mutex<T>,
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    next_observer_id: AtomicU64,
}

pub struct Observable<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Default + Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Observable<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*lock(&self.cell.value))
            .field("observers", &lock(&self.cell.observers).len())
            .finish()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Cell {
                publishing: Mutex::new(()),
                value: Mutex::new(value),
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        lock(&self.cell.value).clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.cell.value))
    }

    pub fn set(&self, value: T) {
        let _publishing = lock(&self.cell.publishing);
        let snapshot = {
            let mut guard = lock(&self.cell.value);
            *guard = value;
            guard.clone()
        };
        self.notify(&snapshot);
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _publishing = lock(&self.cell.publishing);
        let (result, snapshot) = {
            let mut guard = lock(&self.cell.value);
            let result = f(&mut guard);
            (result, guard.clone())
        };
        self.notify(&snapshot);
        result
    }

    /// Replace the value only when `f` returns a new one. Observers are
    /// notified only on replacement.
    pub fn try_update(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let _publishing = lock(&self.cell.publishing);
        let snapshot = {
            let mut guard = lock(&self.cell.value);
            match f(&guard) {
                Some(next) => {
                    *guard = next;
                    guard.clone()
                }
                None => return false,
            }
        };
        self.notify(&snapshot);
        true
    }

    /// Register `observer`. It is called right away with the current value
    /// and then after every mutation until the returned handle is dropped.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.cell.next_observer_id.fetch_add(1, Ordering::Relaxed);
        let observer: Observer<T> = Arc::new(observer);
        lock(&self.cell.observers).push((id, Arc::clone(&observer)));

        let current = self.get();
        observer(&current);

        let cell: Weak<Cell<T>> = Arc::downgrade(&self.cell);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(cell) = cell.upgrade() {
                    lock(&cell.observers).retain(|(observer_id, _)| *observer_id != id);
                }
            })),
        }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.cell.observers).len()
    }

    fn notify(&self, value: &T) {
        // Snapshot so observers can subscribe or detach while being notified.
        let observers: Vec<Observer<T>> = lock(&self.cell.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(value);
        }
    }
}

/// Keeps an observer registered. Dropping it detaches the observer.
#[must_use = "dropping a Subscription immediately detaches the observer"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn detach(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/observable_tests.rs"]
mod tests;
