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

//! Error types surfaced by the bridge.
//!
//! Two families live here:
//! - [`BridgeError`] is the recoverable taxonomy every coordinator reports
//!   through its [`Operation`](crate::Operation). Callers match on it at the
//!   await point, success and failure alike.
//! - [`ProtocolViolation`] marks a broken exactly-once contract inside the
//!   bridge (double fulfilment, recovering a context twice). It is never
//!   delivered through an operation.
//!
//! # Example
//!
//! ```ignore
//! use cbridge::error::BridgeError;
//!
//! match signer.sign(request, config).await {
//!     Ok(()) => {}
//!     Err(BridgeError::Config { message }) => println!("bad config: {message}"),
//!     Err(BridgeError::Engine { code }) => println!("engine failed with {code}"),
//!     Err(e) => return Err(e),
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// Native error code reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineErrorCode(pub i32);

impl EngineErrorCode {
    /// Generic failure code.
    pub const UNKNOWN: EngineErrorCode = EngineErrorCode(1);
    /// Out of memory inside the engine.
    pub const OOM: EngineErrorCode = EngineErrorCode(2);
    /// The engine was shutting down when the request arrived.
    pub const SHUTTING_DOWN: EngineErrorCode = EngineErrorCode(3);
    /// The negotiated HTTP protocol is not supported by this bridge.
    pub const HTTP_UNSUPPORTED_PROTOCOL: EngineErrorCode = EngineErrorCode(2054);
    /// The connection manager is shutting down.
    pub const HTTP_CONNECTION_MANAGER_SHUTTING_DOWN: EngineErrorCode = EngineErrorCode(2066);
    /// Signing was requested without any credentials.
    pub const AUTH_SIGNING_NO_CREDENTIALS: EngineErrorCode = EngineErrorCode(6145);

    pub fn code(&self) -> i32 {
        self.0
    }

    /// Symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::UNKNOWN => Some("UNKNOWN"),
            Self::OOM => Some("OOM"),
            Self::SHUTTING_DOWN => Some("SHUTTING_DOWN"),
            Self::HTTP_UNSUPPORTED_PROTOCOL => Some("HTTP_UNSUPPORTED_PROTOCOL"),
            Self::HTTP_CONNECTION_MANAGER_SHUTTING_DOWN => {
                Some("HTTP_CONNECTION_MANAGER_SHUTTING_DOWN")
            }
            Self::AUTH_SIGNING_NO_CREDENTIALS => Some("AUTH_SIGNING_NO_CREDENTIALS"),
            _ => None,
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for EngineErrorCode {
    fn from(code: i32) -> Self {
        EngineErrorCode(code)
    }
}

/// Recoverable failures delivered to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The caller's configuration was rejected before anything was submitted.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// The engine refused the work synchronously; the completion never fired.
    #[error("Engine rejected submission with code {code}")]
    Submission {
        /// Code returned by the submit call
        code: EngineErrorCode,
    },

    /// The engine accepted the work and later reported failure.
    #[error("Engine reported failure with code {code}")]
    Engine {
        /// Code delivered to the completion entry point
        code: EngineErrorCode,
    },

    /// The engine succeeded but returned a result the bridge cannot represent.
    #[error("Unsupported engine result ({code}): {message}")]
    UnsupportedResult {
        /// Code describing the unsupported shape
        code: EngineErrorCode,
        /// Human readable description
        message: String,
    },

    /// A collaborator handle was used in a state that does not allow it.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state error
        message: String,
    },
}

// ============================================================================
// Constructor helpers for common error patterns
// ============================================================================

impl BridgeError {
    /// Create a configuration error.
    ///
    /// # Example
    /// ```ignore
    /// BridgeError::config("signing config has no credentials source")
    /// ```
    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    pub fn submission(code: impl Into<EngineErrorCode>) -> Self {
        BridgeError::Submission { code: code.into() }
    }

    pub fn engine(code: impl Into<EngineErrorCode>) -> Self {
        BridgeError::Engine { code: code.into() }
    }

    pub fn unsupported_result(code: impl Into<EngineErrorCode>, message: impl Into<String>) -> Self {
        BridgeError::UnsupportedResult {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        BridgeError::InvalidState {
            message: message.into(),
        }
    }

    /// The native engine code carried by this error, if any.
    pub fn engine_code(&self) -> Option<EngineErrorCode> {
        match self {
            BridgeError::Submission { code }
            | BridgeError::Engine { code }
            | BridgeError::UnsupportedResult { code, .. } => Some(*code),
            BridgeError::Config { .. } | BridgeError::InvalidState { .. } => None,
        }
    }
}

/// Result alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// A broken exactly-once contract inside the bridge.
///
/// These indicate a memory-safety level bug, not a runtime condition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("future was fulfilled more than once")]
    DoubleFulfillment,

    /// Checked against the allocator's outstanding set while the record is
    /// still allocated, e.g. abandoning a handle that was already consumed.
    #[error("callback context {address:#x} settled but it is not outstanding")]
    ContextNotOutstanding {
        /// Address of the opaque handle
        address: usize,
    },

    #[error("null callback context handed back by the engine")]
    NullContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_code_display_uses_known_names() {
        assert_eq!(
            EngineErrorCode::HTTP_UNSUPPORTED_PROTOCOL.to_string(),
            "2054 (HTTP_UNSUPPORTED_PROTOCOL)"
        );
        assert_eq!(EngineErrorCode(99).to_string(), "99");
    }

    #[test]
    fn test_engine_code_is_preserved() {
        let err = BridgeError::engine(1049);
        assert_eq!(err.engine_code(), Some(EngineErrorCode(1049)));
        assert_eq!(err.to_string(), "Engine reported failure with code 1049");
    }

    #[test]
    fn test_config_error_has_no_engine_code() {
        let err = BridgeError::config("neither credentials nor provider");
        assert_eq!(err.engine_code(), None);
        assert_eq!(
            err.to_string(),
            "Invalid configuration: neither credentials nor provider"
        );
    }
}
