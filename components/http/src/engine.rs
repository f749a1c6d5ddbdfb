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

//! Interface of the native connection manager.
//!
//! Pools and connections are opaque engine handles. The bridge never
//! dereferences them; it only passes them back to the engine.

use std::ffi::c_void;

use cbridge_ffi_primitives::{SubmitStatus, UserData};

use crate::options::ConnectionManagerOptions;

/// Opaque handle to an engine connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPool(pub *mut c_void);

/// Opaque handle to an engine connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawConnection(pub *mut c_void);

// Handles are only ever passed back to the engine, which is thread-safe.
unsafe impl Send for RawPool {}
unsafe impl Sync for RawPool {}
unsafe impl Send for RawConnection {}
unsafe impl Sync for RawConnection {}

/// Completion entry point for a connection acquisition.
///
/// `connection` is non-null when `error_code` is `OP_SUCCESS`.
pub type OnConnectionSetup =
    extern "C" fn(connection: *mut c_void, error_code: i32, user_data: UserData);

/// A native, thread-safe HTTP connection manager.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionEngine: Send + Sync {
    /// Create a pool. `Err` carries the engine's error code.
    fn new_manager(&self, options: &ConnectionManagerOptions) -> Result<RawPool, i32>;

    /// Release a pool. Called once, after every connection was released.
    fn release_manager(&self, pool: RawPool);

    /// Request a connection from the pool.
    ///
    /// On `SubmitStatus::Accepted` the engine calls `on_setup` exactly once
    /// with `user_data`, from any thread, possibly before this call returns.
    /// On `SubmitStatus::Rejected` it never calls it.
    fn acquire_connection(
        &self,
        pool: RawPool,
        on_setup: OnConnectionSetup,
        user_data: UserData,
    ) -> SubmitStatus;

    /// Return a connection to its pool. Returns an engine error code.
    fn release_connection(&self, pool: RawPool, connection: RawConnection) -> i32;

    /// Raw `HttpVersion` value negotiated on the connection.
    fn connection_version(&self, connection: RawConnection) -> i32;

    fn is_connection_open(&self, connection: RawConnection) -> bool;

    fn close_connection(&self, connection: RawConnection);

    /// Grow the HTTP/2 connection flow-control window.
    fn update_window(&self, connection: RawConnection, increment: u32);
}
