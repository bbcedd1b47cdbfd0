#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use suiterun::lock::{LeaseRecord, LockClient, LockClientError, LockFuture, LockOutcome};
use suiterun::task::ResourceName;

/// A fake lock client that:
/// - answers `acquire` from a queue of scripted outcomes, granting once the
///   queue is empty
/// - records every acquire and release it sees.
pub struct ScriptedLockClient {
    id: String,
    acquire_script: Mutex<VecDeque<Result<LockOutcome, String>>>,
    acquired: Mutex<Vec<Vec<String>>>,
    released: Mutex<Vec<Vec<String>>>,
    acquire_calls: AtomicUsize,
}

impl ScriptedLockClient {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            acquire_script: Mutex::new(VecDeque::new()),
            acquired: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            acquire_calls: AtomicUsize::new(0),
        }
    }

    /// Queue the answer for the next unanswered acquire.
    pub fn then(self, outcome: LockOutcome) -> Self {
        self.acquire_script.lock().unwrap().push_back(Ok(outcome));
        self
    }

    /// Queue a transport-style failure for the next unanswered acquire.
    pub fn then_unreachable(self, message: &str) -> Self {
        self.acquire_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// Resources of every acquire that was answered `Granted`.
    pub fn granted(&self) -> Vec<Vec<String>> {
        self.acquired.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<Vec<String>> {
        self.released.lock().unwrap().clone()
    }
}

fn names(resources: &[ResourceName]) -> Vec<String> {
    resources.iter().map(|r| r.as_str().to_string()).collect()
}

impl LockClient for ScriptedLockClient {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn acquire<'a>(
        &'a self,
        resources: &'a [ResourceName],
        _lease: Duration,
    ) -> LockFuture<'a, LockOutcome> {
        Box::pin(async move {
            self.acquire_calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .acquire_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(LockOutcome::Granted));
            match next {
                Ok(LockOutcome::Granted) => {
                    self.acquired.lock().unwrap().push(names(resources));
                    Ok(LockOutcome::Granted)
                }
                Ok(conflict) => Ok(conflict),
                Err(message) => Err(LockClientError::Decode(message)),
            }
        })
    }

    fn release<'a>(&'a self, resources: &'a [ResourceName]) -> LockFuture<'a, LockOutcome> {
        Box::pin(async move {
            self.released.lock().unwrap().push(names(resources));
            Ok(LockOutcome::Granted)
        })
    }

    fn list(&self) -> LockFuture<'_, Vec<LeaseRecord>> {
        Box::pin(async move { Ok(Vec::new()) })
    }
}
