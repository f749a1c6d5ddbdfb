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


//! HTTP connection acquisition over a native, callback-style connection
//! manager.
//!
//! # Example
//!
//! ```rust,ignore
//! use cbridge::ContextAllocator;
//! use cbridge_http::{ClientConnection, ConnectionManager, ConnectionManagerOptions};
//!
//! let manager = ConnectionManager::new(
//!     engine,
//!     ContextAllocator::new("http"),
//!     ConnectionManagerOptions::new("example.com", 443),
//! )?;
//!
//! match manager.acquire().await? {
//!     ClientConnection::Http2(h2) => h2.update_window(65_535)?,
//!     ClientConnection::Http1(h1) => h1.release()?,
//! }
//! ```

pub mod connection;
pub mod engine;
pub mod manager;
pub mod options;
pub mod version;

pub use connection::{ClientConnection, Http1Connection, Http2Connection};
pub use engine::{ConnectionEngine, OnConnectionSetup, RawConnection, RawPool};
pub use manager::ConnectionManager;
pub use options::ConnectionManagerOptions;
pub use version::HttpVersion;
