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

//! Request-signing coordinator.
//!
//! [`RequestSigner::sign_request`] validates the config, registers an
//! [`Operation`], and submits the request to the [`SigningEngine`] with a
//! [`CallbackContext`] holding the target request. The completion entry point
//! applies the engine's result to the request and then resumes the operation.

use std::sync::Arc;

use cbridge::{
    BridgeError, CallbackContext, ContextAllocator, EngineErrorCode, Operation, Result, Waiter,
};
use cbridge_ffi_primitives::{completion_fn, SubmitStatus, UserData, OP_SUCCESS};
use log::{debug, warn};

use crate::config::SigningConfig;
use crate::engine::{SigningEngine, SigningResult};
use crate::request::{lock_request, SharedRequest};

type SigningContext = CallbackContext<SharedRequest, Result<()>>;

/// Signs HTTP requests through a native engine.
///
/// Do not add the following headers to a request before signing:
/// `x-amz-content-sha256`, `X-Amz-Date`, `Authorization`. Do not add the
/// following query parameters: `X-Amz-Signature`, `X-Amz-Date`,
/// `X-Amz-Credential`, `X-Amz-Algorithm`, `X-Amz-SignedHeaders`. This is not
/// checked; the signing result tells exactly what to add.
pub struct RequestSigner {
    engine: Arc<dyn SigningEngine>,
    allocator: Arc<ContextAllocator>,
}

impl RequestSigner {
    pub fn new(engine: Arc<dyn SigningEngine>, allocator: Arc<ContextAllocator>) -> Self {
        Self { engine, allocator }
    }

    pub fn allocator(&self) -> &Arc<ContextAllocator> {
        &self.allocator
    }

    /// Sign `request` in place.
    ///
    /// Returns `Err(BridgeError::Config)` immediately when `config` is
    /// invalid; the engine is not called. Every other outcome, including a
    /// rejected submission, is delivered through the returned operation.
    ///
    /// Validation, registration and submission happen in that order, so a
    /// rejected submission only ever fails the operation created here.
    pub fn sign_request(
        &self,
        request: &SharedRequest,
        config: &SigningConfig,
    ) -> Result<Operation<()>> {
        config.validate()?;

        let operation = Operation::new();
        let signable = lock_request(request).signable();
        let user_data = self
            .allocator
            .create(Waiter::new(&operation), request.clone())
            .into_raw();

        debug!(
            "[{}] Submitting {} {} for signing ({}/{})",
            self.allocator.label(),
            signable.method,
            signable.path,
            config.region,
            config.service
        );

        match self
            .engine
            .sign_request(&signable, config, on_signing_complete, user_data)
        {
            SubmitStatus::Accepted => {}
            SubmitStatus::Rejected { error_code } => {
                warn!(
                    "[{}] Signing engine rejected submission with code {}",
                    self.allocator.label(),
                    EngineErrorCode(error_code)
                );
                // The engine never took the context, so it is ours to reclaim.
                let ctx: SigningContext = unsafe { self.allocator.abandon(user_data) };
                ctx.finish(Err(BridgeError::submission(error_code)));
            }
        }

        Ok(operation)
    }

    /// Sign `request` and wait for the outcome.
    pub async fn sign(&self, request: &SharedRequest, config: &SigningConfig) -> Result<()> {
        self.sign_request(request, config)?.await
    }
}

completion_fn! {
    /// Completion entry point handed to the signing engine.
    fn on_signing_complete(result: *const SigningResult, error_code: i32, user_data: UserData) {
        let ctx: SigningContext = unsafe { CallbackContext::recover(user_data) };
        ctx.finish_with(|request| {
            if error_code != OP_SUCCESS {
                debug!("Signing failed with code {}", EngineErrorCode(error_code));
                return Err(BridgeError::engine(error_code));
            }
            match unsafe { result.as_ref() } {
                Some(result) => {
                    lock_request(request).apply_signing_result(result);
                    Ok(())
                }
                None => Err(BridgeError::unsupported_result(
                    EngineErrorCode::UNKNOWN,
                    "signing engine reported success without a signing result",
                )),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::engine::MockSigningEngine;
    use crate::request::HttpRequest;
    use cbridge_ffi_primitives::SendMutPtr;
    use std::ptr;

    fn config() -> SigningConfig {
        SigningConfig::new("us-east-1", "iam").with_credentials(Credentials::new("AKID", "SECRET"))
    }

    fn signing_result() -> SigningResult {
        SigningResult {
            headers: vec![
                ("X-Amz-Date".into(), "20150830T123600Z".into()),
                ("Authorization".into(), "AWS4-HMAC-SHA256 Signature=5d67".into()),
            ],
            query_params: vec![],
        }
    }

    #[test]
    fn test_invalid_config_never_reaches_engine() {
        let mut engine = MockSigningEngine::new();
        engine.expect_sign_request().never();
        let allocator = ContextAllocator::new("signer-test");
        let signer = RequestSigner::new(Arc::new(engine), allocator.clone());

        let request = HttpRequest::new("GET", "/").into_shared();
        let result = signer.sign_request(&request, &SigningConfig::new("us-east-1", "iam"));

        assert!(matches!(result, Err(BridgeError::Config { .. })));
        assert_eq!(allocator.stats().created, 0);
    }

    #[test]
    fn test_synchronous_completion_inside_submit() {
        let mut engine = MockSigningEngine::new();
        engine
            .expect_sign_request()
            .times(1)
            .returning(|signable, _, on_complete, user_data| {
                assert!(signable.headers.iter().all(|(n, _)| n != "Authorization"));
                let result = signing_result();
                on_complete(&result, OP_SUCCESS, user_data);
                SubmitStatus::Accepted
            });
        let allocator = ContextAllocator::new("signer-test");
        let signer = RequestSigner::new(Arc::new(engine), allocator.clone());

        let request = HttpRequest::new("GET", "/")
            .with_header("Host", "iam.amazonaws.com")
            .into_shared();
        let operation = signer.sign_request(&request, &config()).unwrap();

        assert_eq!(operation.try_get(), Some(Ok(())));
        let signed = request.lock().unwrap();
        assert_eq!(signed.header("Host"), Some("iam.amazonaws.com"));
        assert_eq!(
            signed.header("Authorization"),
            Some("AWS4-HMAC-SHA256 Signature=5d67")
        );
        assert!(allocator.stats().is_settled());
    }

    #[test]
    fn test_rejected_submission_abandons_context() {
        let mut engine = MockSigningEngine::new();
        engine
            .expect_sign_request()
            .times(1)
            .returning(|_, _, _, _| SubmitStatus::Rejected { error_code: 34 });
        let allocator = ContextAllocator::new("signer-test");
        let signer = RequestSigner::new(Arc::new(engine), allocator.clone());

        let request = HttpRequest::new("GET", "/").into_shared();
        let operation = signer.sign_request(&request, &config()).unwrap();

        assert_eq!(
            operation.try_get(),
            Some(Err(BridgeError::submission(34)))
        );
        let stats = allocator.stats();
        assert_eq!((stats.recovered, stats.abandoned), (0, 1));
        assert!(stats.is_settled());
        assert!(request.lock().unwrap().headers.is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_leaves_request_untouched() {
        let mut engine = MockSigningEngine::new();
        engine
            .expect_sign_request()
            .times(1)
            .returning(|_, _, on_complete, user_data| {
                let user_data = SendMutPtr(user_data);
                std::thread::spawn(move || on_complete(ptr::null(), 6145, user_data.as_ptr()));
                SubmitStatus::Accepted
            });
        let allocator = ContextAllocator::new("signer-test");
        let signer = RequestSigner::new(Arc::new(engine), allocator.clone());

        let request = HttpRequest::new("GET", "/")
            .with_header("Host", "iam.amazonaws.com")
            .into_shared();
        let outcome = signer.sign(&request, &config()).await;

        assert_eq!(outcome, Err(BridgeError::engine(6145)));
        assert_eq!(request.lock().unwrap().headers.len(), 1);
        assert!(allocator.wait_settled(std::time::Duration::from_secs(2)));
    }

    #[test]
    fn test_success_without_result_is_unsupported() {
        let mut engine = MockSigningEngine::new();
        engine
            .expect_sign_request()
            .returning(|_, _, on_complete, user_data| {
                on_complete(ptr::null(), OP_SUCCESS, user_data);
                SubmitStatus::Accepted
            });
        let signer = RequestSigner::new(Arc::new(engine), ContextAllocator::new("signer-test"));

        let request = HttpRequest::new("GET", "/").into_shared();
        let operation = signer.sign_request(&request, &config()).unwrap();

        assert!(matches!(
            operation.try_get(),
            Some(Err(BridgeError::UnsupportedResult { .. }))
        ));
    }
}
