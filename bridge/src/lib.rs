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

//! Completion bridge core.
//!
//! Native engines report results by calling a completion function pointer
//! exactly once, from one of their own threads, with an opaque `user_data`
//! pointer. This crate turns that into values ordinary Rust code can consume:
//!
//! - [`future`]: [`BridgeFuture`], a single-assignment value usable through
//!   continuations, blocking waits or `.await`.
//! - [`context`]: [`CallbackContext`] and its [`ContextAllocator`], the heap
//!   record that travels through the engine and is consumed exactly once.
//! - [`error`]: the [`BridgeError`] taxonomy delivered to callers and the
//!   [`ProtocolViolation`] class for broken exactly-once contracts.
//!
//! Operation coordinators (request signing, connection acquisition) live in
//! their own component crates and follow the same sequence: validate, create
//! the future and its context, submit, and consume the context in the
//! completion entry point (or abandon it if the submit call was rejected).

pub mod context;
pub mod error;
pub mod future;

pub use context::{CallbackContext, ContextAllocator, ContextHandle, ContextStats};
pub use error::{BridgeError, EngineErrorCode, ProtocolViolation, Result};
pub use future::{Awaiting, BridgeFuture, Operation, Waiter};

pub use cbridge_ffi_primitives as ffi;
