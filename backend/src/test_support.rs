//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for `cfg(test)` and behind the `test-support` feature.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{BackgroundJob, BackgroundTasks, ChainIndexer, ChainIndexerError};
use crate::domain::signature::{hmac_sha256, sign};
use crate::domain::{ChainTransaction, TxHash};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}"),
        };
        *lock(&self.0) += delta;
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Background dispatcher that holds jobs until [`drain`](Self::drain).
///
/// Lets tests assert that work was deferred, then run it deterministically.
#[derive(Default)]
pub struct RecordingBackgroundTasks {
    jobs: Mutex<Vec<(&'static str, BackgroundJob)>>,
}

impl RecordingBackgroundTasks {
    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Labels of waiting jobs, in dispatch order.
    pub fn labels(&self) -> Vec<&'static str> {
        lock(&self.jobs).iter().map(|(label, _)| *label).collect()
    }

    /// Run every waiting job to completion.
    pub async fn drain(&self) {
        let jobs = std::mem::take(&mut *lock(&self.jobs));
        for (_, job) in jobs {
            job.await;
        }
    }
}

impl BackgroundTasks for RecordingBackgroundTasks {
    fn dispatch(&self, label: &'static str, job: BackgroundJob) {
        lock(&self.jobs).push((label, job));
    }
}

/// Chain indexer answering from a fixed table.
#[derive(Default)]
pub struct ScriptedChainIndexer {
    responses: Mutex<HashMap<String, Result<Option<ChainTransaction>, ChainIndexerError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedChainIndexer {
    /// Serve `transaction` for its own hash.
    pub fn with_transaction(self, transaction: ChainTransaction) -> Self {
        lock(&self.responses).insert(transaction.hash.clone(), Ok(Some(transaction)));
        self
    }

    /// Fail lookups of `hash` with `error`.
    pub fn with_error(self, hash: &str, error: ChainIndexerError) -> Self {
        lock(&self.responses).insert(hash.to_owned(), Err(error));
        self
    }

    /// Serve `transaction` from now on.
    pub fn insert(&self, transaction: ChainTransaction) {
        lock(&self.responses).insert(transaction.hash.clone(), Ok(Some(transaction)));
    }

    /// Hashes looked up so far.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ChainIndexer for ScriptedChainIndexer {
    async fn fetch_transaction(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<ChainTransaction>, ChainIndexerError> {
        lock(&self.calls).push(tx_hash.to_string());
        lock(&self.responses)
            .get(tx_hash.as_ref())
            .cloned()
            .unwrap_or(Ok(None))
    }
}

/// Build a URL-encoded identity assertion signed for `bot_token`.
///
/// Fields keep their given order; `hash` is appended last.
pub fn signed_identity_assertion(bot_token: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by(|left, right| left.0.cmp(right.0));
    let check_string = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let secret = hmac_sha256(b"WebAppData", bot_token.as_bytes());
    let hash = sign(&secret, &check_string);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

/// A successful incoming transfer with `comment`.
pub fn chain_transfer(hash: &str, amount: u128, comment: &str) -> ChainTransaction {
    ChainTransaction {
        hash: hash.to_owned(),
        success: true,
        amount,
        comment: Some(comment.to_owned()),
        destination: None,
    }
}
