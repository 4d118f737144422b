#![forbid(unsafe_code)]

//! Deferred callbacks (`next_tick`).
//!
//! A [`TaskQueue`] is a FIFO of callbacks that the host drains with
//! [`TaskQueue::run_until_idle`] once the current synchronous phase is
//! over. Everything a mutation does synchronously (watchers, re-render)
//! therefore happens before any callback it deferred.
//!
//! # Invariants
//!
//! 1. Callbacks run in the order they were queued.
//! 2. Callbacks queued while draining run in the same drain, after the
//!    ones already queued.
//! 3. No borrow of the queue is held while a callback runs.
//!
//! [`NextTick`] carries the callback's result. It can be polled directly
//! with [`NextTick::try_take`] or awaited as a [`Future`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

type Task = Box<dyn FnOnce()>;

thread_local! {
    static GLOBAL_QUEUE: TaskQueue = TaskQueue::new();
}

/// Shared FIFO of deferred callbacks.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread's default queue, used by components built without an
    /// explicit one.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_QUEUE.with(Clone::clone)
    }

    /// Queue `task` to run on the next drain.
    pub fn push(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Queue `f` and return a handle to its eventual result.
    pub fn defer<R: 'static>(&self, f: impl FnOnce() -> R + 'static) -> NextTick<R> {
        let tick = NextTick::pending();
        let slot = Rc::clone(&tick.slot);
        self.push(move || complete(&slot, f()));
        tick
    }

    /// Run queued callbacks until the queue is empty. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "task queue drained");
        }
        ran
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}

struct TickSlot<R> {
    result: Option<R>,
    waker: Option<Waker>,
}

fn complete<R>(slot: &RefCell<TickSlot<R>>, value: R) {
    let waker = {
        let mut slot = slot.borrow_mut();
        slot.result = Some(value);
        slot.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// Result of a deferred callback.
pub struct NextTick<R> {
    slot: Rc<RefCell<TickSlot<R>>>,
}

impl<R> NextTick<R> {
    fn pending() -> Self {
        Self {
            slot: Rc::new(RefCell::new(TickSlot {
                result: None,
                waker: None,
            })),
        }
    }

    /// Whether the callback has run and its result is still here.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.borrow().result.is_some()
    }

    /// Take the result if the callback has run.
    pub fn try_take(&self) -> Option<R> {
        self.slot.borrow_mut().result.take()
    }
}

impl<R> Future for NextTick<R> {
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<R> {
        let mut slot = self.slot.borrow_mut();
        match slot.result.take() {
            Some(value) => Poll::Ready(value),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<R> fmt::Debug for NextTick<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextTick")
            .field("ready", &self.is_ready())
            .finish()
    }
}
