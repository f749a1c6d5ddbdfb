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

//! Boundary types exchanged with native engines.

use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Error code an engine reports for a successful operation.
pub const OP_SUCCESS: i32 = 0;

/// Opaque context pointer handed to an engine and returned verbatim to the
/// completion entry point.
pub type UserData = *mut c_void;

// ============================================================================
// Submission status
// ============================================================================

/// Immediate outcome of submitting work to an engine.
///
/// `Accepted` means the engine now owns the `user_data` reference and will
/// invoke the completion function exactly once, later, possibly on another
/// thread. `Rejected` means the completion function will never fire and the
/// submitter must reclaim the context itself.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Accepted,
    Rejected { error_code: i32 },
}

impl SubmitStatus {
    /// Interpret a C-style return code (`OP_SUCCESS` on success).
    pub fn from_code(code: i32) -> Self {
        if code == OP_SUCCESS {
            SubmitStatus::Accepted
        } else {
            SubmitStatus::Rejected { error_code: code }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitStatus::Accepted)
    }
}

// ============================================================================
// Send-safe pointer wrappers
// ============================================================================

/// Wrapper to send a `*mut T` across threads.
///
/// Engines hop between their own worker threads; the pointee's lifetime is
/// governed by the callback-context protocol, not by this wrapper.
#[derive(Debug)]
pub struct SendMutPtr<T>(pub *mut T);

unsafe impl<T> Send for SendMutPtr<T> {}
unsafe impl<T> Sync for SendMutPtr<T> {}

impl<T> Clone for SendMutPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendMutPtr<T> {}

impl<T> SendMutPtr<T> {
    pub fn as_ptr(&self) -> *mut T {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

// ============================================================================
// Panic barrier
// ============================================================================

/// Run the body of a completion entry point.
///
/// A completion runs on an engine thread that has no Rust frames above it, so
/// unwinding out of it is undefined behavior. Any panic is logged and the
/// process is aborted. That covers a broken exactly-once protocol (a context
/// that is not outstanding, a waiter resumed twice) and also a panic raised
/// by a caller's continuation: the future delivers continuations on the
/// completing thread and re-raises the first panic once all of them have
/// run. Continuations attached to engine-backed futures must not panic.
pub fn guard_completion<F: FnOnce()>(entry_point: &'static str, f: F) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        log::error!("Completion entry point '{entry_point}' panicked: {msg}");
        std::process::abort();
    }
}
