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

//! Callback contexts carried through a native engine as `user_data`.
//!
//! A coordinator creates one [`CallbackContext`] per submission through a
//! [`ContextAllocator`], converts the owned [`ContextHandle`] into an opaque
//! pointer and hands that pointer to the engine. From then on exactly one of
//! two things consumes it:
//!
//! - the completion entry point calls [`CallbackContext::recover`], or
//! - the engine rejected the submission and the coordinator calls
//!   [`ContextAllocator::abandon`].
//!
//! ```text
//!   create ──► ContextHandle ──into_raw──► *mut c_void ──► engine
//!                                              │
//!                    ┌─────────────────────────┴──────────────┐
//!            Rejected│                                        │Accepted
//!                    ▼                                        ▼
//!               abandon (coordinator)          recover (completion entry point)
//!                    └──────────► finish: resume waiter, then drop ◄──┘
//! ```
//!
//! The allocator is passed explicitly to every coordinator; it keeps the set
//! of outstanding handles and the counters exposed through [`ContextStats`].

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cbridge_ffi_primitives::UserData;
use log::{debug, error, warn};

use crate::error::ProtocolViolation;
use crate::future::Waiter;

/// Snapshot of an allocator's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextStats {
    pub created: usize,
    pub handed_off: usize,
    pub recovered: usize,
    pub abandoned: usize,
    pub destroyed: usize,
    /// Handles currently owned by an engine.
    pub outstanding: usize,
}

impl ContextStats {
    /// Every created context was consumed exactly once and has been freed.
    pub fn is_settled(&self) -> bool {
        self.created == self.recovered + self.abandoned
            && self.handed_off == self.created
            && self.destroyed == self.created
            && self.outstanding == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Recovered,
    Abandoned,
}

/// Owner of every callback context created for one engine client.
pub struct ContextAllocator {
    label: String,
    outstanding: Mutex<HashSet<usize>>,
    /// Signalled whenever a context is settled or destroyed.
    progress: Condvar,
    created: AtomicUsize,
    handed_off: AtomicUsize,
    recovered: AtomicUsize,
    abandoned: AtomicUsize,
    destroyed: AtomicUsize,
}

impl ContextAllocator {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            outstanding: Mutex::new(HashSet::new()),
            progress: Condvar::new(),
            created: AtomicUsize::new(0),
            handed_off: AtomicUsize::new(0),
            recovered: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Allocate a context pairing `waiter` with the domain `state` that must
    /// outlive the submit call.
    pub fn create<S, T>(self: &Arc<Self>, waiter: Waiter<T>, state: S) -> ContextHandle<S, T>
    where
        S: Send + 'static,
        T: Clone + Send + 'static,
    {
        self.created.fetch_add(1, Ordering::SeqCst);
        ContextHandle {
            record: Box::new(CallbackContext {
                waiter,
                state,
                tag: OwnershipTag {
                    allocator: self.clone(),
                },
            }),
        }
    }

    /// Reclaim a context whose submission the engine rejected.
    ///
    /// The handle is checked against the outstanding set before it is
    /// dereferenced, so an engine that rejected the work but still fired the
    /// completion is caught here.
    ///
    /// # Safety
    /// `user_data` must come from [`ContextHandle::into_raw`] with the same
    /// `S`/`T`, and the engine must have rejected the submission. The pointer
    /// is invalid after this call.
    ///
    /// # Panics
    /// On a null pointer or a handle that is not outstanding in this allocator.
    pub unsafe fn abandon<S, T>(&self, user_data: UserData) -> CallbackContext<S, T>
    where
        S: Send + 'static,
        T: Clone + Send + 'static,
    {
        ensure_not_null(user_data);
        self.settle(user_data as usize, Settlement::Abandoned);
        *Box::from_raw(user_data as *mut CallbackContext<S, T>)
    }

    fn lock_outstanding(&self) -> MutexGuard<'_, HashSet<usize>> {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the handle from the outstanding set.
    ///
    /// Must run while the record behind `address` is still allocated, so the
    /// address cannot have been reused by another context yet.
    fn settle(&self, address: usize, settlement: Settlement) {
        let mut outstanding = self.lock_outstanding();
        if !outstanding.remove(&address) {
            drop(outstanding);
            error!(
                "[{}] Callback context {address:#x} {:?} twice or never handed off",
                self.label, settlement
            );
            panic!("{}", ProtocolViolation::ContextNotOutstanding { address });
        }
        match settlement {
            Settlement::Recovered => self.recovered.fetch_add(1, Ordering::SeqCst),
            Settlement::Abandoned => self.abandoned.fetch_add(1, Ordering::SeqCst),
        };
        drop(outstanding);
        self.progress.notify_all();
        debug!("[{}] Callback context {address:#x} {:?}", self.label, settlement);
    }

    fn hand_off(&self, address: usize) {
        let mut outstanding = self.lock_outstanding();
        outstanding.insert(address);
        self.handed_off.fetch_add(1, Ordering::SeqCst);
    }

    fn record_destroyed(&self) {
        // Taken so a waiter between its check and its wait cannot miss this.
        let outstanding = self.lock_outstanding();
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(outstanding);
        self.progress.notify_all();
    }

    pub fn stats(&self) -> ContextStats {
        self.stats_with(&self.lock_outstanding())
    }

    fn stats_with(&self, outstanding: &HashSet<usize>) -> ContextStats {
        ContextStats {
            created: self.created.load(Ordering::SeqCst),
            handed_off: self.handed_off.load(Ordering::SeqCst),
            recovered: self.recovered.load(Ordering::SeqCst),
            abandoned: self.abandoned.load(Ordering::SeqCst),
            destroyed: self.destroyed.load(Ordering::SeqCst),
            outstanding: outstanding.len(),
        }
    }

    /// Block until every context is settled or `timeout` elapses.
    ///
    /// A completion resumes its waiter before the context is destroyed, so
    /// the destruction may still be in flight on the engine thread when the
    /// caller observes the outcome.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut outstanding = self.lock_outstanding();
        loop {
            let stats = self.stats_with(&outstanding);
            if stats.is_settled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("[{}] Contexts still unsettled: {:?}", self.label, stats);
                return false;
            }
            outstanding = self
                .progress
                .wait_timeout(outstanding, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl fmt::Debug for ContextAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAllocator")
            .field("label", &self.label)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Counts the record's destruction against its allocator.
struct OwnershipTag {
    allocator: Arc<ContextAllocator>,
}

impl Drop for OwnershipTag {
    fn drop(&mut self) {
        self.allocator.record_destroyed();
    }
}

/// Heap record bridging one engine completion to one waiter.
pub struct CallbackContext<S, T> {
    waiter: Waiter<T>,
    state: S,
    // Declared last: dropped after the domain state.
    tag: OwnershipTag,
}

fn ensure_not_null(user_data: UserData) {
    if user_data.is_null() {
        error!("Engine handed back a null callback context");
        panic!("{}", ProtocolViolation::NullContext);
    }
}

impl<S, T> CallbackContext<S, T>
where
    S: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Reclaim a context from inside the engine's completion entry point.
    ///
    /// The handle is settled against its allocator while the record is still
    /// allocated and only then freed, so a new context placed at the same
    /// address afterwards is tracked on its own.
    ///
    /// # Safety
    /// `user_data` must come from [`ContextHandle::into_raw`] with the same
    /// `S`/`T`, the engine must have accepted it, and the engine must hand it
    /// back exactly once. The pointer is invalid after this call. A second
    /// recovery of the same handle reads freed memory; it is a breach of this
    /// contract and is not detected.
    ///
    /// # Panics
    /// On a null pointer, or when the allocator named by a live record does
    /// not list the handle as outstanding
    /// ([`ProtocolViolation::ContextNotOutstanding`]).
    pub unsafe fn recover(user_data: UserData) -> Self {
        ensure_not_null(user_data);
        let record = user_data as *mut Self;
        (*record)
            .tag
            .allocator
            .settle(user_data as usize, Settlement::Recovered);
        *Box::from_raw(record)
    }
}

impl<S, T: Clone + Send + 'static> CallbackContext<S, T> {
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn allocator(&self) -> &Arc<ContextAllocator> {
        &self.tag.allocator
    }

    /// Compute the outcome from the domain state, resume the waiter, then
    /// destroy the context.
    ///
    /// The state is still alive while the waiter's continuations run.
    pub fn finish_with<F>(self, complete: F)
    where
        F: FnOnce(&mut S) -> T,
    {
        let CallbackContext {
            waiter,
            mut state,
            tag,
        } = self;
        let value = complete(&mut state);
        waiter.resume(value);
        drop(state);
        drop(tag);
    }

    /// Resume the waiter with `value`, then destroy the context.
    pub fn finish(self, value: T) {
        self.finish_with(|_| value);
    }
}

/// Owned, non-clonable handle to a freshly created context.
///
/// The only way to hand it to an engine is [`into_raw`](Self::into_raw),
/// which consumes it.
pub struct ContextHandle<S, T> {
    record: Box<CallbackContext<S, T>>,
}

impl<S, T: Clone + Send + 'static> ContextHandle<S, T> {
    pub fn state(&self) -> &S {
        &self.record.state
    }

    /// Transfer ownership to the engine as an opaque pointer.
    pub fn into_raw(self) -> UserData {
        let allocator = self.record.tag.allocator.clone();
        let ptr = Box::into_raw(self.record);
        allocator.hand_off(ptr as usize);
        ptr as UserData
    }
}
