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

//! Cross-thread tests for `BridgeFuture`: racing fulfilments, concurrent
//! continuation registration and the async front end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use cbridge::{BridgeFuture, ProtocolViolation};

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

#[test]
fn test_thousand_racing_fulfilments_have_one_winner() {
    init_logging();
    const RACERS: usize = 1000;

    let future: BridgeFuture<usize> = BridgeFuture::new();
    let observations = Arc::new(Mutex::new(Vec::new()));

    // Continuations registered before the race, from several threads.
    let early: Vec<_> = (0..4)
        .map(|t| {
            let future = future.clone();
            let observations = observations.clone();
            thread::spawn(move || {
                future.then(move |v| observations.lock().unwrap().push((format!("early-{t}"), v)));
            })
        })
        .collect();
    for handle in early {
        handle.join().unwrap();
    }

    let barrier = Arc::new(Barrier::new(RACERS));
    let successes = Arc::new(AtomicUsize::new(0));
    let rejections = Arc::new(AtomicUsize::new(0));
    let racers: Vec<_> = (0..RACERS)
        .map(|i| {
            let future = future.clone();
            let barrier = barrier.clone();
            let successes = successes.clone();
            let rejections = rejections.clone();
            let observations = observations.clone();
            thread::spawn(move || {
                barrier.wait();
                match future.fulfill(i) {
                    Ok(()) => {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(ProtocolViolation::DoubleFulfillment) => {
                        rejections.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected violation: {other}"),
                }
                if i % 100 == 0 {
                    future.then(move |v| observations.lock().unwrap().push((format!("mid-{i}"), v)));
                }
            })
        })
        .collect();
    for handle in racers {
        handle.join().unwrap();
    }

    let late_observations = observations.clone();
    future.then(move |v| late_observations.lock().unwrap().push(("late".to_string(), v)));

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(rejections.load(Ordering::SeqCst), RACERS - 1);

    let winner = future.try_get().expect("future fulfilled");
    let observations = observations.lock().unwrap();
    // 4 early + 10 mid + 1 late, each exactly once.
    assert_eq!(observations.len(), 15);
    assert!(observations.iter().all(|(_, v)| *v == winner));
    let mut labels: Vec<_> = observations.iter().map(|(l, _)| l.clone()).collect();
    labels.sort();
    labels.dedup();
    assert_eq!(labels.len(), 15);
}

#[test]
fn test_concurrent_attach_and_fulfil_preserve_order() {
    init_logging();
    const ATTACHES: usize = 2000;

    let future: BridgeFuture<&'static str> = BridgeFuture::new();
    let delivered = Arc::new(Mutex::new(Vec::with_capacity(ATTACHES)));

    let attacher = {
        let future = future.clone();
        let delivered = delivered.clone();
        thread::spawn(move || {
            for seq in 0..ATTACHES {
                let delivered = delivered.clone();
                future.then(move |v| delivered.lock().unwrap().push((seq, v)));
                if seq == ATTACHES / 2 {
                    thread::yield_now();
                }
            }
        })
    };

    let producer = {
        let future = future.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_micros(200));
            future.fulfill("value is finally fulfilled")
        })
    };

    attacher.join().unwrap();
    assert!(producer.join().unwrap().is_ok());

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), ATTACHES);
    for (expected_seq, (seq, value)) in delivered.iter().enumerate() {
        assert_eq!(*seq, expected_seq);
        assert_eq!(*value, "value is finally fulfilled");
    }
}

#[test]
fn test_fulfilled_before_attach_from_other_threads() {
    init_logging();
    let future = BridgeFuture::new();
    future.fulfill(String::from("ready")).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let future = future.clone();
            let calls = calls.clone();
            thread::spawn(move || {
                future.then(move |v| {
                    assert_eq!(v, "ready");
                    calls.fetch_add(1, Ordering::SeqCst);
                });
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_awaiters_observe_one_value() {
    init_logging();
    let future: BridgeFuture<u64> = BridgeFuture::new();

    let awaiters: Vec<_> = (0..16)
        .map(|_| {
            let future = future.clone();
            tokio::spawn(async move { future.await })
        })
        .collect();

    let producer = future.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        producer.fulfill(7).unwrap();
    });

    let results = futures::future::join_all(awaiters).await;
    for result in results {
        assert_eq!(result.unwrap(), 7);
    }
}
