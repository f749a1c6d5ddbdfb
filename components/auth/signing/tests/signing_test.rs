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

//! Integration tests for the request signer against a threaded engine that
//! completes every submission from its own worker thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cbridge::{BridgeError, ContextAllocator, EngineErrorCode};
use cbridge_auth_signing::{
    Credentials, HttpRequest, OnSigningComplete, RequestSigner, SignableRequest, SignatureType,
    SigningConfig, SigningEngine, SigningResult, StaticCredentialsProvider, RESERVED_HEADERS,
    RESERVED_QUERY_PARAMS,
};
use cbridge_ffi_primitives::{SendMutPtr, SubmitStatus, UserData, OP_SUCCESS};

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

/// Engine that signs on a fresh thread after a short delay.
#[derive(Default)]
struct ThreadedSigningEngine {
    submissions: AtomicUsize,
    fail_with: Option<i32>,
}

impl ThreadedSigningEngine {
    fn failing(code: i32) -> Self {
        Self {
            fail_with: Some(code),
            ..Default::default()
        }
    }

    fn sign(signable: &SignableRequest, config: &SigningConfig) -> Result<SigningResult, i32> {
        let credentials = match (&config.credentials, &config.credentials_provider) {
            (Some(credentials), _) => credentials.clone(),
            (None, Some(provider)) => {
                futures::executor::block_on(provider.get_credentials()).map_err(|_| 6145)?
            }
            (None, None) => return Err(EngineErrorCode::AUTH_SIGNING_NO_CREDENTIALS.code()),
        };
        let date = "20150830T123600Z".to_string();
        let credential = format!(
            "{}/20150830/{}/{}/aws4_request",
            credentials.access_key_id, config.region, config.service
        );
        let signature = format!("sig-{}-{}", signable.method, signable.path.len());
        Ok(match config.signature_type {
            SignatureType::Headers => SigningResult {
                headers: vec![
                    ("x-amz-content-sha256".into(), "UNSIGNED-PAYLOAD".into()),
                    ("X-Amz-Date".into(), date),
                    (
                        "Authorization".into(),
                        format!("AWS4-HMAC-SHA256 Credential={credential}, Signature={signature}"),
                    ),
                ],
                query_params: vec![],
            },
            SignatureType::QueryParams => SigningResult {
                headers: vec![],
                query_params: vec![
                    ("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()),
                    ("X-Amz-Credential".into(), credential),
                    ("X-Amz-Date".into(), date),
                    ("X-Amz-SignedHeaders".into(), "host".into()),
                    ("X-Amz-Signature".into(), signature),
                ],
            },
        })
    }
}

impl SigningEngine for ThreadedSigningEngine {
    fn sign_request(
        &self,
        signable: &SignableRequest,
        config: &SigningConfig,
        on_complete: OnSigningComplete,
        user_data: UserData,
    ) -> SubmitStatus {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        let outcome = match self.fail_with {
            Some(code) => Err(code),
            None => Self::sign(signable, config),
        };
        let user_data = SendMutPtr(user_data);
        thread::spawn(move || {
            thread::sleep(Duration::from_micros((n % 7) as u64 * 50));
            match outcome {
                Ok(result) => on_complete(&result, OP_SUCCESS, user_data.as_ptr()),
                Err(code) => on_complete(std::ptr::null(), code, user_data.as_ptr()),
            }
        });
        SubmitStatus::Accepted
    }
}

fn static_config() -> SigningConfig {
    SigningConfig::new("us-east-1", "iam").with_credentials(Credentials::new("AKIDEXAMPLE", "S"))
}

#[tokio::test]
async fn test_sign_adds_reserved_headers_and_keeps_existing_fields() {
    init_logging();
    let engine = Arc::new(ThreadedSigningEngine::default());
    let allocator = ContextAllocator::new("signing-it");
    let signer = RequestSigner::new(engine.clone(), allocator.clone());

    let request = HttpRequest::new("GET", "/")
        .with_header("Host", "iam.amazonaws.com")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_query_param("Action", "ListUsers")
        .into_shared();
    let before = request.lock().unwrap().clone();

    signer.sign(&request, &static_config()).await.unwrap();

    let signed = request.lock().unwrap().clone();
    for (name, value) in &before.headers {
        assert_eq!(signed.header(name), Some(value.as_str()));
    }
    assert_eq!(signed.query_params, before.query_params);
    for reserved in RESERVED_HEADERS {
        assert!(signed.header(reserved).is_some(), "missing {reserved}");
    }
    assert!(signed
        .header("Authorization")
        .unwrap()
        .contains("AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request"));
    assert_eq!(engine.submissions.load(Ordering::SeqCst), 1);
    assert!(allocator.wait_settled(Duration::from_secs(2)));
}

#[tokio::test]
async fn test_presigned_query_params_with_provider() {
    init_logging();
    let signer = RequestSigner::new(
        Arc::new(ThreadedSigningEngine::default()),
        ContextAllocator::new("signing-it"),
    );
    let config = SigningConfig::new("us-west-2", "s3")
        .with_signature_type(SignatureType::QueryParams)
        .with_credentials_provider(Arc::new(StaticCredentialsProvider::new(
            Credentials::new("AKIDPROVIDED", "S"),
        )));

    let request = HttpRequest::new("GET", "/bucket/key")
        .with_header("Host", "bucket.s3.amazonaws.com")
        .into_shared();
    signer.sign(&request, &config).await.unwrap();

    let signed = request.lock().unwrap();
    for reserved in RESERVED_QUERY_PARAMS {
        assert!(signed.query_param(reserved).is_some(), "missing {reserved}");
    }
    assert!(signed
        .query_param("X-Amz-Credential")
        .unwrap()
        .starts_with("AKIDPROVIDED/"));
    assert_eq!(signed.headers.len(), 1);
}

#[tokio::test]
async fn test_engine_failure_is_translated_and_applies_nothing() {
    init_logging();
    let allocator = ContextAllocator::new("signing-it");
    let signer = RequestSigner::new(
        Arc::new(ThreadedSigningEngine::failing(
            EngineErrorCode::AUTH_SIGNING_NO_CREDENTIALS.code(),
        )),
        allocator.clone(),
    );
    let request = HttpRequest::new("GET", "/").with_header("Host", "h").into_shared();

    let outcome = signer.sign(&request, &static_config()).await;

    assert_eq!(
        outcome,
        Err(BridgeError::engine(EngineErrorCode::AUTH_SIGNING_NO_CREDENTIALS))
    );
    assert_eq!(request.lock().unwrap().headers.len(), 1);
    assert!(allocator.wait_settled(Duration::from_secs(2)));
}

#[test]
fn test_config_error_is_immediate_and_engine_untouched() {
    init_logging();
    let engine = Arc::new(ThreadedSigningEngine::default());
    let allocator = ContextAllocator::new("signing-it");
    let signer = RequestSigner::new(engine.clone(), allocator.clone());
    let request = HttpRequest::new("GET", "/").into_shared();

    let neither = SigningConfig::new("us-east-1", "iam");
    let both = static_config().with_credentials_provider(Arc::new(
        StaticCredentialsProvider::new(Credentials::new("A", "S")),
    ));

    assert!(matches!(
        signer.sign_request(&request, &neither),
        Err(BridgeError::Config { .. })
    ));
    assert!(matches!(
        signer.sign_request(&request, &both),
        Err(BridgeError::Config { .. })
    ));
    assert_eq!(engine.submissions.load(Ordering::SeqCst), 0);
    assert_eq!(allocator.stats().created, 0);
}

#[test]
fn test_continuation_style_completion() {
    init_logging();
    let signer = RequestSigner::new(
        Arc::new(ThreadedSigningEngine::default()),
        ContextAllocator::new("signing-it"),
    );
    let request = HttpRequest::new("POST", "/upload").into_shared();
    let (tx, rx) = std::sync::mpsc::channel();

    let observed_request = request.clone();
    signer
        .sign_request(&request, &static_config())
        .unwrap()
        .then(move |outcome| {
            // The request is already signed when the continuation runs.
            let has_auth = observed_request
                .lock()
                .unwrap()
                .header("Authorization")
                .is_some();
            tx.send((outcome, has_auth)).unwrap();
        });

    let (outcome, has_auth) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(outcome, Ok(()));
    assert!(has_auth);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_signings_settle_every_context() {
    init_logging();
    let allocator = ContextAllocator::new("signing-it");
    let signer = Arc::new(RequestSigner::new(
        Arc::new(ThreadedSigningEngine::default()),
        allocator.clone(),
    ));

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let signer = signer.clone();
            tokio::spawn(async move {
                let request = HttpRequest::new("GET", format!("/item/{i}")).into_shared();
                signer.sign(&request, &static_config()).await?;
                let signed = request.lock().unwrap().clone();
                Ok::<_, BridgeError>(signed)
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let signed = result.unwrap().unwrap();
        assert!(signed.header("Authorization").is_some());
    }

    assert!(allocator.wait_settled(Duration::from_secs(5)));
    let stats = allocator.stats();
    assert_eq!(stats.created, 200);
    assert_eq!(stats.recovered, 200);
    assert!(stats.is_settled(), "{stats:?}");
}
