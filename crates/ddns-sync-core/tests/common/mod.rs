//! Test doubles and common utilities for contract tests
//!
//! Every double is driven from the test through channels, so tests decide
//! exactly when a resolve returns, when a tick fires and what a provider
//! call answers.

#![allow(dead_code)]

use ddns_sync_core::error::{Error, Result};
use ddns_sync_core::traits::{DnsProvider, Listener, Logger, ObservableSet, Poll};
use ddns_sync_core::{CancellationToken, Ticks};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Generous upper bound for anything that is expected to happen
pub const EXPECTED: Duration = Duration::from_secs(3);

/// How long to wait before concluding that nothing happens
pub const QUIET: Duration = Duration::from_millis(100);

/// Build an observable set from string literals
pub fn set(values: &[&str]) -> ObservableSet {
    values.iter().map(|v| v.to_string()).collect()
}

/// Receive the next item or fail after [`EXPECTED`]
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>, what: &str) -> T {
    tokio::time::timeout(EXPECTED, rx.recv())
        .await
        .unwrap_or_else(|_| panic!("timeout waiting for {}", what))
        .unwrap_or_else(|| panic!("channel closed while waiting for {}", what))
}

/// Receive the next notification or fail after [`EXPECTED`]
pub async fn next_notification(rx: &mut mpsc::Receiver<ObservableSet>) -> ObservableSet {
    tokio::time::timeout(EXPECTED, rx.recv())
        .await
        .expect("timeout reading the output channel")
        .expect("output channel closed")
}

/// Assert that nothing arrives for [`QUIET`]
pub async fn assert_quiet<T: fmt::Debug>(rx: &mut mpsc::Receiver<T>, context: &str) {
    if let Ok(Some(value)) = tokio::time::timeout(QUIET, rx.recv()).await {
        panic!("{}: unexpected value {:?}", context, value);
    }
}

/// A resolve operation answering with whatever the test scripts next
///
/// `poll()` waits until the test pushes a result, like a data source that
/// blocks on I/O.
pub struct ScriptedPoll {
    results: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<ObservableSet>>>,
    calls: Arc<Mutex<usize>>,
}

/// Test-side handle of a [`ScriptedPoll`]
#[derive(Clone)]
pub struct PollScript {
    tx: mpsc::UnboundedSender<Result<ObservableSet>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedPoll {
    pub fn new() -> (Self, PollScript) {
        let (tx, rx) = mpsc::unbounded_channel();
        let calls = Arc::new(Mutex::new(0));
        (
            Self {
                results: tokio::sync::Mutex::new(rx),
                calls: calls.clone(),
            },
            PollScript { tx, calls },
        )
    }
}

impl PollScript {
    /// Script the next resolve to succeed with `values`
    pub fn ok(&self, values: &[&str]) {
        self.tx.send(Ok(set(values))).expect("poller alive");
    }

    /// Script the next resolve to fail with `message`
    pub fn fail(&self, message: &str) {
        self.tx
            .send(Err(Error::resolve(message)))
            .expect("poller alive");
    }

    /// Number of resolve calls that have started
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Poll for ScriptedPoll {
    async fn poll(&self) -> Result<ObservableSet> {
        *self.calls.lock().unwrap() += 1;
        match self.results.lock().await.recv().await {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

/// Trigger source fired by hand
pub fn manual_ticks() -> (Ticks, mpsc::UnboundedSender<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Box::pin(UnboundedReceiverStream::new(rx)), tx)
}

/// Logger forwarding every message to the test
pub struct RecordingLogger {
    tx: mpsc::UnboundedSender<String>,
}

impl RecordingLogger {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        let _ = self.tx.send(message.to_string());
    }
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub domain: String,
    pub addresses: ObservableSet,
}

impl UpdateCall {
    pub fn new(domain: &str, addresses: &[&str]) -> Self {
        Self {
            domain: domain.to_string(),
            addresses: set(addresses),
        }
    }
}

/// A DnsProvider that records calls and fails for chosen domains
pub struct RecordingProvider {
    calls: mpsc::UnboundedSender<UpdateCall>,
    failing: Arc<Mutex<HashSet<String>>>,
}

/// Test-side handle of a [`RecordingProvider`]
pub struct ProviderProbe {
    pub calls: mpsc::UnboundedReceiver<UpdateCall>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingProvider {
    pub fn new() -> (Self, ProviderProbe) {
        let (tx, rx) = mpsc::unbounded_channel();
        let failing = Arc::new(Mutex::new(HashSet::new()));
        (
            Self {
                calls: tx,
                failing: failing.clone(),
            },
            ProviderProbe { calls: rx, failing },
        )
    }
}

impl ProviderProbe {
    /// Make every update of `domain` fail
    pub fn fail_for(&self, domain: &str) {
        self.failing.lock().unwrap().insert(domain.to_string());
    }

    /// Let updates of `domain` succeed again
    pub fn recover(&self, domain: &str) {
        self.failing.lock().unwrap().remove(domain);
    }

    /// Wait for the next call
    pub async fn next_call(&mut self) -> UpdateCall {
        next(&mut self.calls, "a provider call").await
    }

    /// Wait for `n` calls
    pub async fn next_calls(&mut self, n: usize) -> Vec<UpdateCall> {
        let mut calls = Vec::with_capacity(n);
        for _ in 0..n {
            calls.push(self.next_call().await);
        }
        calls
    }

    /// Assert that no call happens for [`QUIET`]
    pub async fn assert_no_call(&mut self, context: &str) {
        if let Ok(Some(call)) = tokio::time::timeout(QUIET, self.calls.recv()).await {
            panic!("{}: unexpected provider call {:?}", context, call);
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn update(&self, domain: &str, addresses: &[String]) -> Result<()> {
        let _ = self.calls.send(UpdateCall {
            domain: domain.to_string(),
            addresses: addresses.to_vec(),
        });

        if self.failing.lock().unwrap().contains(domain) {
            return Err(Error::dns_provider("test error"));
        }
        Ok(())
    }
}

/// A DnsProvider whose calls never complete
pub struct HangingProvider {
    pub started: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl DnsProvider for HangingProvider {
    async fn update(&self, domain: &str, _addresses: &[String]) -> Result<()> {
        let _ = self.started.send(domain.to_string());
        std::future::pending().await
    }
}

/// A Listener handing its notification channel over to the test
///
/// The test then plays the role of a change detector by sending sets
/// directly into the coordinator.
pub struct ManualListener {
    handover: mpsc::UnboundedSender<mpsc::Sender<ObservableSet>>,
}

impl ManualListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<mpsc::Sender<ObservableSet>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { handover: tx }, rx)
    }
}

#[async_trait::async_trait]
impl Listener for ManualListener {
    async fn listen(&mut self, out: mpsc::Sender<ObservableSet>, _cancel: CancellationToken) {
        let _ = self.handover.send(out);
    }
}

/// Send a notification as a listener would, failing after [`EXPECTED`]
pub async fn notify(out: &mpsc::Sender<ObservableSet>, values: &[&str]) {
    tokio::time::timeout(EXPECTED, out.send(set(values)))
        .await
        .expect("coordinator did not take the notification")
        .expect("coordinator stopped");
}
