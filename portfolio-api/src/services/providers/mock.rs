//! Mock provider for tests and local development.

use super::{ProviderError, RecognitionProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns scripted results in order, then repeats the fallback.
pub struct MockRecognitionProvider {
    script: Mutex<VecDeque<Result<Option<String>, ProviderError>>>,
    fallback: Result<Option<String>, ProviderError>,
    calls: AtomicUsize,
}

impl MockRecognitionProvider {
    /// Always answers with `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::scripted(Vec::new(), Ok(Some(text.into())))
    }

    /// Always reports that no text was found.
    pub fn empty() -> Self {
        Self::scripted(Vec::new(), Ok(None))
    }

    pub fn scripted(
        script: Vec<Result<Option<String>, ProviderError>>,
        fallback: Result<Option<String>, ProviderError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `recognize` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognitionProvider {
    fn default() -> Self {
        Self::with_text("HELLO")
    }
}

#[async_trait]
impl RecognitionProvider for MockRecognitionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn recognize(&self, _image: &[u8]) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
