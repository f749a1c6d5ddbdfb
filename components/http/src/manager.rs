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


//! Connection-acquisition coordinator.
//!
//! A [`ConnectionManager`] owns one engine pool. Every acquisition registers
//! an [`Operation`] and hands the engine a [`CallbackContext`] holding a clone
//! of the manager, so the pool stays alive until the completion has run. The
//! pool is released when the last clone of the manager goes away, including
//! the clones held by acquired connections.

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use cbridge::{
    BridgeError, CallbackContext, ContextAllocator, EngineErrorCode, Operation, Result, Waiter,
};
use cbridge_ffi_primitives::{completion_fn, SubmitStatus, UserData, OP_SUCCESS};
use log::{debug, info, warn};

use crate::connection::ClientConnection;
use crate::engine::{ConnectionEngine, RawConnection, RawPool};
use crate::options::ConnectionManagerOptions;

type AcquireContext = CallbackContext<ConnectionManager, Result<ClientConnection>>;

struct ManagerInner {
    engine: Arc<dyn ConnectionEngine>,
    allocator: Arc<ContextAllocator>,
    pool: RawPool,
    options: ConnectionManagerOptions,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        debug!(
            "[{}] Releasing connection pool for {}:{}",
            self.allocator.label(),
            self.options.host,
            self.options.port
        );
        self.engine.release_manager(self.pool);
    }
}

/// Shared handle to a native connection pool.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    /// Create the engine pool described by `options`.
    ///
    /// Invalid options fail with `BridgeError::Config` before the engine is
    /// called. An engine that refuses to create the pool yields
    /// `BridgeError::Submission`.
    pub fn new(
        engine: Arc<dyn ConnectionEngine>,
        allocator: Arc<ContextAllocator>,
        options: ConnectionManagerOptions,
    ) -> Result<Self> {
        options.validate()?;

        let pool = engine.new_manager(&options).map_err(|code| {
            warn!(
                "[{}] Engine failed to create a pool for {}:{}: {}",
                allocator.label(),
                options.host,
                options.port,
                EngineErrorCode(code)
            );
            BridgeError::submission(code)
        })?;

        info!(
            "[{}] Created connection pool for {}:{} (max {} connections)",
            allocator.label(),
            options.host,
            options.port,
            options.max_connections
        );

        Ok(Self {
            inner: Arc::new(ManagerInner {
                engine,
                allocator,
                pool,
                options,
            }),
        })
    }

    pub fn options(&self) -> &ConnectionManagerOptions {
        &self.inner.options
    }

    pub fn allocator(&self) -> &Arc<ContextAllocator> {
        &self.inner.allocator
    }

    pub(crate) fn engine(&self) -> &dyn ConnectionEngine {
        self.inner.engine.as_ref()
    }

    /// Whether both handles refer to the same pool.
    pub fn same_pool(&self, other: &ConnectionManager) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Request a connection from the pool.
    ///
    /// Never fails immediately; a rejected submission is delivered as an
    /// already-failed operation.
    pub fn acquire_connection(&self) -> Operation<ClientConnection> {
        let operation = Operation::new();
        let user_data = self
            .inner
            .allocator
            .create(Waiter::new(&operation), self.clone())
            .into_raw();

        debug!(
            "[{}] Acquiring connection to {}:{}",
            self.inner.allocator.label(),
            self.inner.options.host,
            self.inner.options.port
        );

        match self
            .inner
            .engine
            .acquire_connection(self.inner.pool, on_connection_setup, user_data)
        {
            SubmitStatus::Accepted => {}
            SubmitStatus::Rejected { error_code } => {
                warn!(
                    "[{}] Connection engine rejected acquisition with code {}",
                    self.inner.allocator.label(),
                    EngineErrorCode(error_code)
                );
                let ctx: AcquireContext = unsafe { self.inner.allocator.abandon(user_data) };
                ctx.finish(Err(BridgeError::submission(error_code)));
            }
        }

        operation
    }

    /// Acquire a connection and wait for it.
    pub async fn acquire(&self) -> Result<ClientConnection> {
        self.acquire_connection().await
    }

    /// Return `connection` to this pool.
    ///
    /// Fails with `BridgeError::InvalidState` when the connection was already
    /// released or belongs to another pool.
    pub fn release(&self, connection: &ClientConnection) -> Result<()> {
        if !connection.manager().same_pool(self) {
            return Err(BridgeError::invalid_state(
                "connection belongs to a different connection manager",
            ));
        }
        connection.release()
    }

    pub(crate) fn release_raw(&self, connection: RawConnection) -> Result<()> {
        let code = self
            .inner
            .engine
            .release_connection(self.inner.pool, connection);
        if code != OP_SUCCESS {
            warn!(
                "[{}] Engine failed to release connection {:?}: {}",
                self.inner.allocator.label(),
                connection.0,
                EngineErrorCode(code)
            );
            return Err(BridgeError::engine(code));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("host", &self.inner.options.host)
            .field("port", &self.inner.options.port)
            .field("pool", &self.inner.pool.0)
            .finish()
    }
}

completion_fn! {
    /// Completion entry point handed to the connection engine.
    fn on_connection_setup(connection: *mut c_void, error_code: i32, user_data: UserData) {
        let ctx: AcquireContext = unsafe { CallbackContext::recover(user_data) };
        ctx.finish_with(|manager| {
            if error_code != OP_SUCCESS {
                debug!("Connection acquisition failed with code {}", EngineErrorCode(error_code));
                return Err(BridgeError::engine(error_code));
            }
            if connection.is_null() {
                return Err(BridgeError::unsupported_result(
                    EngineErrorCode::UNKNOWN,
                    "connection engine reported success without a connection",
                ));
            }
            ClientConnection::negotiated(manager, RawConnection(connection))
        });
    }
}
