#![allow(dead_code)]

use async_trait::async_trait;
use quickcal::attempt_log::{AttemptLog, InMemoryAttemptStore};
use quickcal::error::ExtractionError;
use quickcal::extraction::CompletionBackend;
use quickcal::orchestrator::Orchestrator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reply = Box<dyn Fn() -> Result<String, ExtractionError> + Send + Sync>;

/// Backend stand-in that answers every prompt the same way
pub struct MockBackend {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Always answer with `text`
    pub fn text(text: &str) -> Self {
        let text = text.to_string();
        Self::with_reply(Box::new(move || Ok(text.clone())))
    }

    /// Always fail with the error `make` builds
    pub fn failing<F>(make: F) -> Self
    where
        F: Fn() -> ExtractionError + Send + Sync + 'static,
    {
        Self::with_reply(Box::new(move || Err(make())))
    }

    /// Panic instead of answering
    pub fn panicking(message: &'static str) -> Self {
        Self::with_reply(Box::new(move || -> Result<String, ExtractionError> {
            panic!("{}", message)
        }))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Wait this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.reply)()
    }
}

/// The backend answer for "Lunch with Sam tomorrow at noon" in Chicago
pub const LUNCH_JSON: &str = r#"{"title":"Lunch with Sam","timestamp_start":"20250611T170000","timestamp_end":"20250611T180000","location":"","description":"Lunch meeting.","missing":[]}"#;

/// Orchestrator over the given backend with an in-memory attempt store
pub fn orchestrator(
    backend: Arc<MockBackend>,
) -> (Orchestrator, Arc<InMemoryAttemptStore>) {
    let store = Arc::new(InMemoryAttemptStore::new());
    let log = AttemptLog::new(store.clone());
    (Orchestrator::new(backend, log, "UTC"), store)
}
