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

//! Interface of the native signing engine.

use cbridge_ffi_primitives::{SubmitStatus, UserData};

use crate::config::SigningConfig;
use crate::request::SignableRequest;

/// Fields the engine asks the bridge to add to the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningResult {
    pub headers: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
}

/// Completion entry point for a signing submission.
///
/// `result` is only valid for the duration of the call and is non-null when
/// `error_code` is `OP_SUCCESS`.
pub type OnSigningComplete =
    extern "C" fn(result: *const SigningResult, error_code: i32, user_data: UserData);

/// A native engine that signs requests asynchronously.
#[cfg_attr(test, mockall::automock)]
pub trait SigningEngine: Send + Sync {
    /// Submit a signing job.
    ///
    /// On `SubmitStatus::Accepted` the engine calls `on_complete` exactly once
    /// with `user_data`, from any thread, possibly before this call returns.
    /// On `SubmitStatus::Rejected` it never calls it.
    fn sign_request(
        &self,
        signable: &SignableRequest,
        config: &SigningConfig,
        on_complete: OnSigningComplete,
        user_data: UserData,
    ) -> SubmitStatus;
}
