// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Minimal reactive values on top of `tokio::sync::watch`.
//!
//! A [`Cell`] holds a value that can be read, replaced, and observed.
//! Derived cells recompute in a background task whenever a source changes;
//! each derived cell has exactly one such task, so asynchronous derivations
//! never run concurrently for the same cell and always finish in order.
//!
//! Derivation tasks hold only a weak reference to the cell they write. Once
//! every handle to a derived cell is dropped, the task stops and releases
//! its sources.
//!
//! ```rust
//! use chaincache::reactive::Cell;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let price = Cell::new(2u64);
//! let doubled = price.map(|p| p * 2);
//! let mut observer = doubled.subscribe();
//!
//! price.set(5);
//! observer.changed().await.unwrap();
//! assert_eq!(doubled.get(), 10);
//! # }
//! ```

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::select_all;
use futures::FutureExt;
use tokio::sync::{oneshot, watch};

/// A shared, observable value.
#[derive(Debug)]
pub struct Cell<T> {
    inner: Arc<watch::Sender<T>>,
    /// Set on derived cells; dropped with the last handle, which stops the
    /// task writing the cell.
    alive: Option<Arc<oneshot::Sender<()>>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            alive: self.alive.clone(),
        }
    }
}

/// Write end of a derived cell, held by the task computing it.
pub(crate) struct Derivation<T> {
    pub target: Weak<watch::Sender<T>>,
    /// Resolves once every handle to the cell is dropped.
    pub dropped: oneshot::Receiver<()>,
}

impl<T> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a cell holding `value`.
    pub fn new(value: T) -> Self {
        let (tx, _) = watch::channel(value);
        Self {
            inner: Arc::new(tx),
            alive: None,
        }
    }

    /// A cell to be written by a background task.
    pub(crate) fn derived(value: T) -> (Self, Derivation<T>) {
        let (tx, _) = watch::channel(value);
        let (alive, dropped) = oneshot::channel();
        let inner = Arc::new(tx);
        let derivation = Derivation {
            target: Arc::downgrade(&inner),
            dropped,
        };
        let cell = Self {
            inner,
            alive: Some(Arc::new(alive)),
        };
        (cell, derivation)
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }

    /// Replaces the value and notifies observers.
    pub fn set(&self, value: T) {
        self.inner.send_replace(value);
    }

    /// Modifies the value in place and notifies observers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.send_modify(f);
    }

    /// A receiver notified on every change after this call.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.subscribe()
    }

    /// Number of live receivers.
    pub fn observers(&self) -> usize {
        self.inner.receiver_count()
    }

    /// Whether both handles point to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A cell holding `f` of this cell's value, recomputed on every change.
    pub fn map<U, F>(&self, f: F) -> Cell<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + 'static,
    {
        map_receiver(self.subscribe(), f)
    }

    /// Replaces the value only if it differs, notifying observers only then.
    /// Returns whether the value changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.inner.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// A cell holding the output of an async `f` over this cell's value.
    ///
    /// Starts at `initial` and is first computed from the current value.
    /// Changes that arrive while `f` runs are coalesced: only the latest
    /// value is processed next.
    pub fn map_async<U, F, Fut>(&self, initial: U, f: F) -> Cell<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        let (derived, mut derivation) = Cell::derived(initial);
        let mut source = self.subscribe();
        source.mark_changed();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut derivation.dropped => break,
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let input = source.borrow_and_update().clone();
                let value = tokio::select! {
                    _ = &mut derivation.dropped => break,
                    value = f(input) => value,
                };
                let Some(target) = derivation.target.upgrade() else { break };
                target.send_replace(value);
            }
        });
        derived
    }
}

/// A cell holding `f` of the value behind `source`, recomputed on every
/// change.
pub fn map_receiver<T, U, F>(mut source: watch::Receiver<T>, f: F) -> Cell<U>
where
    T: Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    let (derived, mut derivation) = Cell::derived(f(&source.borrow_and_update()));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut derivation.dropped => break,
                changed = source.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            let Some(target) = derivation.target.upgrade() else { break };
            let value = f(&source.borrow_and_update());
            target.send_replace(value);
        }
    });
    derived
}

/// A cell computed from several sources of the same type, recomputed when
/// any of them changes.
pub fn derive<T, U, F>(sources: &[Cell<T>], f: F) -> Cell<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(&[T]) -> U + Send + 'static,
{
    let snapshot = |receivers: &mut [watch::Receiver<T>]| -> Vec<T> {
        receivers
            .iter_mut()
            .map(|rx| rx.borrow_and_update().clone())
            .collect()
    };
    let mut receivers: Vec<_> = sources.iter().map(Cell::subscribe).collect();
    let (derived, mut derivation) = Cell::derived(f(&snapshot(&mut receivers)));
    if receivers.is_empty() {
        return derived;
    }
    tokio::spawn(async move {
        loop {
            let changed = {
                let next = select_all(receivers.iter_mut().map(|rx| rx.changed().boxed()));
                tokio::select! {
                    _ = &mut derivation.dropped => None,
                    (changed, _, _) = next => Some(changed),
                }
            };
            if !matches!(changed, Some(Ok(()))) {
                break;
            }
            let Some(target) = derivation.target.upgrade() else { break };
            target.send_replace(f(&snapshot(&mut receivers)));
        }
    });
    derived
}

/// A counter that increments every `delay` while `live` holds true.
///
/// Pausing stops new ticks; resuming waits a full `delay` before the next one
/// and does not replay ticks missed while paused. The clock stops when every
/// handle to `live` is dropped.
pub fn clock(live: &Cell<bool>, delay: Duration) -> Cell<u64> {
    let ticks = Cell::new(0u64);
    let writer = ticks.clone();
    let mut live = live.subscribe();
    tokio::spawn(async move {
        loop {
            if live.wait_for(|live| *live).await.is_err() {
                break;
            }
            tokio::time::sleep(delay).await;
            if live.has_changed().is_err() {
                break;
            }
            if *live.borrow() {
                writer.update(|n| *n = n.wrapping_add(1));
            }
        }
    });
    ticks
}
