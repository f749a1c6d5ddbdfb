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


//! Connections handed out by a [`ConnectionManager`].
//!
//! A connection keeps its manager alive. It goes back to the pool exactly
//! once: through an explicit `release()`, or when the last clone is dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cbridge::{BridgeError, EngineErrorCode, Result};
use log::{debug, warn};

use crate::engine::RawConnection;
use crate::manager::ConnectionManager;
use crate::version::HttpVersion;

struct ConnectionCore {
    manager: ConnectionManager,
    raw: RawConnection,
    version: HttpVersion,
    released: AtomicBool,
}

impl ConnectionCore {
    fn ensure_live(&self) -> Result<()> {
        if self.released.load(Ordering::SeqCst) {
            return Err(BridgeError::invalid_state("connection was already released"));
        }
        Ok(())
    }

    fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::invalid_state("connection was already released"));
        }
        self.manager.release_raw(self.raw)
    }

    fn is_open(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
            && self.manager.engine().is_connection_open(self.raw)
    }

    fn close(&self) -> Result<()> {
        self.ensure_live()?;
        self.manager.engine().close_connection(self.raw);
        Ok(())
    }
}

impl Drop for ConnectionCore {
    fn drop(&mut self) {
        if !*self.released.get_mut() {
            debug!("Releasing dropped {} connection {:?}", self.version, self.raw.0);
            if let Err(e) = self.manager.release_raw(self.raw) {
                warn!("Failed to release dropped connection: {e}");
            }
        }
    }
}

impl fmt::Debug for ConnectionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("raw", &self.raw.0)
            .field("version", &self.version)
            .field("released", &self.released.load(Ordering::SeqCst))
            .finish()
    }
}

macro_rules! connection_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            core: Arc<ConnectionCore>,
        }

        impl $name {
            fn new(manager: &ConnectionManager, raw: RawConnection, version: HttpVersion) -> Self {
                Self {
                    core: Arc::new(ConnectionCore {
                        manager: manager.clone(),
                        raw,
                        version,
                        released: AtomicBool::new(false),
                    }),
                }
            }

            pub fn version(&self) -> HttpVersion {
                self.core.version
            }

            pub fn manager(&self) -> &ConnectionManager {
                &self.core.manager
            }

            pub fn raw(&self) -> RawConnection {
                self.core.raw
            }

            /// `false` once released, otherwise as reported by the engine.
            pub fn is_open(&self) -> bool {
                self.core.is_open()
            }

            /// Ask the engine to close the connection. It still has to be released.
            pub fn close(&self) -> Result<()> {
                self.core.close()
            }

            /// Return the connection to its pool.
            pub fn release(&self) -> Result<()> {
                self.core.release()
            }
        }
    };
}

connection_handle! {
    /// HTTP/1.1 connection.
    Http1Connection
}

connection_handle! {
    /// HTTP/2 connection.
    Http2Connection
}

impl Http2Connection {
    /// Grow the connection-level flow-control window by `increment` bytes.
    pub fn update_window(&self, increment: u32) -> Result<()> {
        self.core.ensure_live()?;
        self.core.manager.engine().update_window(self.core.raw, increment);
        Ok(())
    }
}

/// A pooled connection, by negotiated protocol.
#[derive(Clone, Debug)]
pub enum ClientConnection {
    Http1(Http1Connection),
    Http2(Http2Connection),
}

impl ClientConnection {
    /// Wrap a freshly acquired raw connection according to the protocol the
    /// engine negotiated on it.
    ///
    /// Unsupported protocols are handed straight back to the pool.
    pub(crate) fn negotiated(manager: &ConnectionManager, raw: RawConnection) -> Result<Self> {
        let version = HttpVersion::from_raw(manager.engine().connection_version(raw));
        match version {
            HttpVersion::Http1_1 => Ok(ClientConnection::Http1(Http1Connection::new(
                manager, raw, version,
            ))),
            HttpVersion::Http2 => Ok(ClientConnection::Http2(Http2Connection::new(
                manager, raw, version,
            ))),
            HttpVersion::Http1_0 | HttpVersion::Unknown => {
                warn!("Releasing connection with unsupported protocol {version}");
                if let Err(e) = manager.release_raw(raw) {
                    warn!("Failed to release unsupported connection: {e}");
                }
                Err(BridgeError::unsupported_result(
                    EngineErrorCode::HTTP_UNSUPPORTED_PROTOCOL,
                    format!("unsupported HTTP version {version}"),
                ))
            }
        }
    }

    pub fn version(&self) -> HttpVersion {
        match self {
            ClientConnection::Http1(c) => c.version(),
            ClientConnection::Http2(c) => c.version(),
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        match self {
            ClientConnection::Http1(c) => c.manager(),
            ClientConnection::Http2(c) => c.manager(),
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            ClientConnection::Http1(c) => c.is_open(),
            ClientConnection::Http2(c) => c.is_open(),
        }
    }

    pub fn close(&self) -> Result<()> {
        match self {
            ClientConnection::Http1(c) => c.close(),
            ClientConnection::Http2(c) => c.close(),
        }
    }

    pub fn release(&self) -> Result<()> {
        match self {
            ClientConnection::Http1(c) => c.release(),
            ClientConnection::Http2(c) => c.release(),
        }
    }

    pub fn as_http2(&self) -> Option<&Http2Connection> {
        match self {
            ClientConnection::Http2(c) => Some(c),
            ClientConnection::Http1(_) => None,
        }
    }
}
