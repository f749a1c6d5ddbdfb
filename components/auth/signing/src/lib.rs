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

//! Request signing over a native, callback-style signing engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use cbridge::ContextAllocator;
//! use cbridge_auth_signing::{Credentials, HttpRequest, RequestSigner, SigningConfig};
//!
//! let signer = RequestSigner::new(engine, ContextAllocator::new("signer"));
//! let request = HttpRequest::new("GET", "/")
//!     .with_header("Host", "iam.amazonaws.com")
//!     .into_shared();
//! let config = SigningConfig::new("us-east-1", "iam")
//!     .with_credentials(Credentials::new("AKID", "SECRET"));
//!
//! signer.sign(&request, &config).await?;
//! println!("{:?}", request.lock().unwrap().header("Authorization"));
//! ```

pub mod config;
pub mod engine;
pub mod request;
pub mod signer;

pub use config::{
    Credentials, CredentialsProvider, SignatureType, SigningAlgorithm, SigningConfig,
    StaticCredentialsProvider,
};
pub use engine::{OnSigningComplete, SigningEngine, SigningResult};
pub use request::{
    HttpRequest, SharedRequest, SignableRequest, RESERVED_HEADERS, RESERVED_QUERY_PARAMS,
};
pub use signer::RequestSigner;
