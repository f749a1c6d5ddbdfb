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

//! Signing configuration and credential sources.
//!
//! A [`SigningConfig`] must name exactly one credential source: static
//! [`Credentials`] or a [`CredentialsProvider`]. The serializable part of the
//! config can be loaded from JSON/YAML; a provider is attached in code.
//!
//! ```rust,ignore
//! let config = SigningConfig::new("us-east-1", "iam")
//!     .with_credentials(Credentials::new("AKID", "SECRET"));
//! config.validate()?;
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cbridge::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// Signing algorithm requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningAlgorithm {
    #[default]
    SigV4,
    SigV4Asymmetric,
}

/// Where the signature is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    #[default]
    Headers,
    QueryParams,
}

/// Static credential set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Source of credentials resolved by the engine at signing time.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn get_credentials(&self) -> Result<Credentials>;
}

/// Provider that always returns the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

fn default_true() -> bool {
    true
}

/// Configuration handed to the signing engine.
#[derive(Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    #[serde(default)]
    pub signature_type: SignatureType,
    pub region: String,
    pub service: String,
    /// Lifetime of a pre-signed (query param) signature.
    #[serde(default)]
    pub expiration_in_seconds: Option<u64>,
    #[serde(default = "default_true")]
    pub use_double_uri_encode: bool,
    #[serde(default = "default_true")]
    pub should_normalize_uri_path: bool,
    #[serde(default)]
    pub omit_session_token: bool,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(skip)]
    pub credentials_provider: Option<Arc<dyn CredentialsProvider>>,
}

impl SigningConfig {
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            algorithm: SigningAlgorithm::default(),
            signature_type: SignatureType::default(),
            region: region.into(),
            service: service.into(),
            expiration_in_seconds: None,
            use_double_uri_encode: true,
            should_normalize_uri_path: true,
            omit_session_token: false,
            credentials: None,
            credentials_provider: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    pub fn with_signature_type(mut self, signature_type: SignatureType) -> Self {
        self.signature_type = signature_type;
        self
    }

    /// Check the config before anything is submitted to the engine.
    pub fn validate(&self) -> Result<()> {
        match (&self.credentials, &self.credentials_provider) {
            (Some(_), Some(_)) => {
                return Err(BridgeError::config(
                    "signing config specifies both credentials and a credentials provider",
                ))
            }
            (None, None) => {
                return Err(BridgeError::config(
                    "signing config specifies neither credentials nor a credentials provider",
                ))
            }
            _ => {}
        }
        if self.region.is_empty() {
            return Err(BridgeError::config("signing config has an empty region"));
        }
        if self.service.is_empty() {
            return Err(BridgeError::config("signing config has an empty service"));
        }
        Ok(())
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("signature_type", &self.signature_type)
            .field("region", &self.region)
            .field("service", &self.service)
            .field("credentials", &self.credentials)
            .field("has_credentials_provider", &self.credentials_provider.is_some())
            .finish_non_exhaustive()
    }
}
