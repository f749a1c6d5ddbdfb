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

//! `cbridge-ffi-primitives`: FFI-safe boundary types shared by every coordinator.
//!
//! This crate provides the small set of `#[repr(C)]` types, pointer wrappers
//! and declarative macros needed to talk to a callback-style native engine:
//! an engine accepts a unit of work together with a completion function
//! pointer and an opaque `user_data` pointer, and later calls the completion
//! function exactly once with that same pointer.
//!
//! **No domain-specific dependencies**: this crate depends only on `std` and `log`.
//!
//! # Types
//!
//! - [`SubmitStatus`]: immediate result of handing work to an engine
//! - [`UserData`]: the opaque context pointer carried through the engine
//! - [`SendMutPtr`]: Send-safe raw pointer wrapper
//! - [`guard_completion`]: panic barrier for `extern "C"` completion entry points
//!
//! # Macros
//!
//! - [`completion_fn!`]: Generate a guarded `extern "C"` completion entry point

pub mod macros;
pub mod types;

pub use types::*;
