//! Next-tick task queue for deferred store work.
//!
//! Dispatch triggers and background prefetches must never run inside the call
//! stack that scheduled them, and must never delay that call's return value.
//! [`Scheduler::defer`] only enqueues; the queued tasks start the next time the
//! owner of the event loop drives the queue.
//!
//! # Driving the queue
//!
//! - [`Scheduler::run_until_idle`] runs every queued task (and anything those
//!   tasks enqueue) concurrently until the queue is empty. Tests use this to
//!   advance "one turn" deterministically.
//! - [`Scheduler::drive`] loops forever, waking whenever work is deferred. The
//!   interactive client spawns it on its `LocalSet`.

use futures_util::future::LocalBoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::Notify;

/// A unit of deferred work.
pub type Task = LocalBoxFuture<'static, ()>;

/// Single-threaded queue of deferred tasks.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    queue: RefCell<VecDeque<Task>>,
    wake: Notify,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `task` to start on the next turn of the event loop.
    pub fn defer<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.inner.queue.borrow_mut().push_back(Box::pin(task));
        self.inner.wake.notify_one();
    }

    /// Number of tasks waiting to start.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    fn take_queued(&self) -> Vec<Task> {
        self.inner.queue.borrow_mut().drain(..).collect()
    }

    /// Runs queued tasks until none are queued or running.
    ///
    /// Tasks run concurrently with each other; work deferred by a running
    /// task is picked up as soon as it is enqueued.
    pub async fn run_until_idle(&self) {
        let mut running = FuturesUnordered::new();
        loop {
            for task in self.take_queued() {
                running.push(task);
            }
            if running.is_empty() {
                break;
            }

            tokio::select! {
                _ = running.next() => {}
                () = self.inner.wake.notified() => {}
            }
        }
    }

    /// Drives the queue for the lifetime of the process.
    pub async fn drive(self) {
        loop {
            self.run_until_idle().await;
            self.inner.wake.notified().await;
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_defer_does_not_run_synchronously() {
        let scheduler = Scheduler::new();
        let ran = Rc::new(Cell::new(false));

        let flag = Rc::clone(&ran);
        scheduler.defer(async move { flag.set(true) });

        assert!(!ran.get());
        assert_eq!(scheduler.pending(), 1);

        scheduler.run_until_idle().await;
        assert!(ran.get());
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_tasks_deferred_by_tasks_are_run() {
        let scheduler = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let inner_scheduler = scheduler.clone();
        let outer_order = Rc::clone(&order);
        scheduler.defer(async move {
            outer_order.borrow_mut().push("outer");
            let nested_order = Rc::clone(&outer_order);
            inner_scheduler.defer(async move { nested_order.borrow_mut().push("nested") });
        });

        scheduler.run_until_idle().await;
        assert_eq!(*order.borrow(), vec!["outer", "nested"]);
    }

    #[tokio::test]
    async fn test_run_until_idle_on_empty_queue_returns() {
        Scheduler::new().run_until_idle().await;
    }
}
