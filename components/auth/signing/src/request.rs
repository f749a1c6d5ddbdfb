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

//! HTTP request representation mutated by signing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::engine::SigningResult;

/// Headers the signing engine adds; callers must not set them beforehand.
pub const RESERVED_HEADERS: &[&str] = &["x-amz-content-sha256", "X-Amz-Date", "Authorization"];

/// Query parameters the signing engine adds; callers must not set them beforehand.
pub const RESERVED_QUERY_PARAMS: &[&str] = &[
    "X-Amz-Signature",
    "X-Amz-Date",
    "X-Amz-Credential",
    "X-Amz-Algorithm",
    "X-Amz-SignedHeaders",
];

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query_params: Vec<(String, String)>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

/// A request shared between the caller and an in-flight signing operation.
pub type SharedRequest = Arc<Mutex<HttpRequest>>;

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_query_param(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn add_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query_params.push((name.into(), value.into()));
    }

    /// First value of a header; names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path plus encoded-as-given query string.
    pub fn uri(&self) -> String {
        if self.query_params.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query_params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }

    /// The part of the request the signing engine reads.
    pub fn signable(&self) -> SignableRequest {
        SignableRequest {
            method: self.method.clone(),
            path: self.path.clone(),
            query_params: self.query_params.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Add every header and query parameter from `result`.
    ///
    /// Existing fields are never removed or overwritten.
    pub fn apply_signing_result(&mut self, result: &SigningResult) {
        self.headers.extend(result.headers.iter().cloned());
        self.query_params
            .extend(result.query_params.iter().cloned());
    }

    pub fn into_shared(self) -> SharedRequest {
        Arc::new(Mutex::new(self))
    }
}

/// Lock a shared request, ignoring poisoning from a panicked holder.
pub(crate) fn lock_request(request: &SharedRequest) -> MutexGuard<'_, HttpRequest> {
    request.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of a request handed to the signing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableRequest {
    pub method: String,
    pub path: String,
    pub query_params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}
