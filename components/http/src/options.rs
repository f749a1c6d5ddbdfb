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

//! Connection pool configuration.

use cbridge::{BridgeError, Result};
use serde::{Deserialize, Serialize};

fn default_max_connections() -> usize {
    2
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

/// Options the engine uses to create a connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionManagerOptions {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Offer HTTP/2 during negotiation.
    #[serde(default = "default_true")]
    pub enable_http2: bool,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

impl ConnectionManagerOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_connections: default_max_connections(),
            enable_http2: true,
            connect_timeout_ms: default_connect_timeout_ms(),
            use_tls: true,
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_http2(mut self, enable_http2: bool) -> Self {
        self.enable_http2 = enable_http2;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(BridgeError::config("connection manager host is empty"));
        }
        if self.port == 0 {
            return Err(BridgeError::config("connection manager port must be non-zero"));
        }
        if self.max_connections == 0 {
            return Err(BridgeError::config(
                "connection manager max_connections must be at least 1",
            ));
        }
        Ok(())
    }
}
