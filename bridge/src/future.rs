// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-assignment future.
//!
//! A [`BridgeFuture`] is written at most once, by any thread, and any number
//! of readers may attach continuations before or after the write. Every
//! continuation receives the value exactly once, in registration order.
//!
//! Three ways to consume a value are supported, all built on [`BridgeFuture::then`]
//! or on the same shared state:
//!
//! ```ignore
//! // continuation style
//! future.then(|value| println!("{value}"));
//!
//! // blocking, from a plain thread
//! let value = future.wait();
//!
//! // async/await
//! let value = future.await;
//! ```
//!
//! The future itself has no timeout or cancellation. Callers that need one
//! race it against a timer (e.g. `tokio::time::timeout(d, future)`); the
//! eventual fulfilment still happens and is simply unobserved.

use std::collections::VecDeque;
use std::fmt;
use std::future::IntoFuture;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{BridgeError, ProtocolViolation};

type Continuation<T> = Box<dyn FnOnce(T) + Send + 'static>;

struct State<T> {
    value: Option<T>,
    /// Set while the fulfilling thread drains `pending`. Continuations attached
    /// meanwhile are queued so registration order holds.
    delivering: bool,
    pending: VecDeque<Continuation<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    fulfilled: Condvar,
}

/// Shared handle to a single-assignment value.
///
/// Cloning the handle shares the same slot; the slot is freed when the last
/// handle (including handles held by pending continuations) is dropped.
pub struct BridgeFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BridgeFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> BridgeFuture<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Continuations never run under the lock, so poisoning cannot leave
        // the state half-updated.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + 'static> BridgeFuture<T> {
    /// Create an unset future with no continuations.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: None,
                    delivering: false,
                    pending: VecDeque::new(),
                }),
                fulfilled: Condvar::new(),
            }),
        }
    }

    /// Create a future that already holds `value`.
    pub fn fulfilled(value: T) -> Self {
        let future = Self::new();
        future.lock().value = Some(value);
        future
    }

    /// Attach a continuation.
    ///
    /// If the value is already available and no delivery is in progress the
    /// continuation runs immediately on the calling thread. Otherwise it is
    /// queued and will run on the thread that delivers the value.
    ///
    /// A panic in a queued continuation is re-raised on the delivering thread
    /// after the remaining continuations have run. When that thread is an
    /// engine's completion entry point the process aborts.
    pub fn then<F>(&self, continuation: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let mut state = self.lock();
        if state.delivering || state.value.is_none() {
            state.pending.push_back(Box::new(continuation));
            return;
        }
        let value = state.value.clone();
        drop(state);
        if let Some(value) = value {
            continuation(value);
        }
    }

    /// Store `value` and deliver it to every pending continuation.
    ///
    /// A second fulfilment is rejected with
    /// [`ProtocolViolation::DoubleFulfillment`] and leaves the stored value
    /// untouched.
    pub fn fulfill(&self, value: T) -> Result<(), ProtocolViolation> {
        {
            let mut state = self.lock();
            if state.value.is_some() {
                log::error!("Rejected second fulfilment of a single-assignment future");
                return Err(ProtocolViolation::DoubleFulfillment);
            }
            state.value = Some(value);
            state.delivering = true;
        }
        self.shared.fulfilled.notify_all();
        self.deliver();
        Ok(())
    }

    /// Drain pending continuations one at a time, outside the lock.
    fn deliver(&self) {
        let mut first_panic = None;
        loop {
            let next = {
                let mut state = self.lock();
                let continuation = state.pending.pop_front();
                match (continuation, state.value.clone()) {
                    (Some(continuation), Some(value)) => Some((continuation, value)),
                    _ => {
                        state.delivering = false;
                        None
                    }
                }
            };
            let Some((continuation, value)) = next else {
                break;
            };
            // A panicking continuation must not starve the ones behind it.
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| continuation(value))) {
                log::error!("Future continuation panicked during delivery");
                first_panic.get_or_insert(panic);
            }
        }
        if let Some(panic) = first_panic {
            panic::resume_unwind(panic);
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.lock().value.is_some()
    }

    /// The value, if it has been written.
    pub fn try_get(&self) -> Option<T> {
        self.lock().value.clone()
    }

    /// Block the calling thread until the value is written.
    pub fn wait(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(value) = state.value.as_ref() {
                return value.clone();
            }
            state = self
                .shared
                .fulfilled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`; `None` if the value did not arrive in time.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let state = self.lock();
        let (state, _) = self
            .shared
            .fulfilled
            .wait_timeout_while(state, timeout, |s| s.value.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.value.clone()
    }

    /// Number of continuations waiting for the value.
    pub fn pending_continuations(&self) -> usize {
        self.lock().pending.len()
    }
}

impl<T: Clone + Send + 'static> Default for BridgeFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BridgeFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BridgeFuture")
            .field("fulfilled", &state.value.is_some())
            .field("pending", &state.pending.len())
            .finish()
    }
}

// ============================================================================
// async/await front end
// ============================================================================

/// Future returned by `bridge_future.await`.
///
/// Registers a continuation on first construction; the continuation
/// completes a oneshot channel that this type polls.
pub struct Awaiting<T> {
    rx: oneshot::Receiver<T>,
    _future: BridgeFuture<T>,
}

impl<T: Clone + Send + 'static> IntoFuture for BridgeFuture<T> {
    type Output = T;
    type IntoFuture = Awaiting<T>;

    fn into_future(self) -> Self::IntoFuture {
        let (tx, rx) = oneshot::channel();
        self.then(move |value| {
            // The receiver may have been dropped by a caller that gave up.
            let _ = tx.send(value);
        });
        Awaiting {
            rx,
            _future: self,
        }
    }
}

impl<T> std::future::Future for Awaiting<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            // `_future` keeps the pending continuation (and its sender) alive.
            Poll::Ready(Err(_)) => panic!("future continuation dropped without delivery"),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ============================================================================
// Operations and waiters
// ============================================================================

/// Future carrying the outcome of a bridged engine operation.
pub type Operation<T> = BridgeFuture<Result<T, BridgeError>>;

impl<T: Clone + Send + 'static> BridgeFuture<Result<T, BridgeError>> {
    /// An operation that failed before anything was submitted.
    pub fn failed(error: BridgeError) -> Self {
        Self::fulfilled(Err(error))
    }
}

/// Fulfilment handle held by a callback context.
///
/// Consumed by [`Waiter::resume`], so one waiter can resume its future only
/// once.
pub struct Waiter<T> {
    future: BridgeFuture<T>,
}

impl<T: Clone + Send + 'static> Waiter<T> {
    pub fn new(future: &BridgeFuture<T>) -> Self {
        Self {
            future: future.clone(),
        }
    }

    /// Deliver `value` to the future.
    ///
    /// # Panics
    /// If the future was already fulfilled through another handle. That is a
    /// broken exactly-once contract and must not be tolerated silently.
    pub fn resume(self, value: T) {
        if let Err(violation) = self.future.fulfill(value) {
            panic!("waiter resumed an already-completed future: {violation}");
        }
    }
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter").field("future", &self.future).finish()
    }
}
