//! Mock completion service for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use promptgrade_core::traits::{CompletionRequest, CompletionService};

/// A mock completion service for testing the evaluation pipeline without
/// real API calls.
///
/// Returns configurable responses based on user-prompt substring matching.
pub struct MockCompletion {
    /// Map of prompt substring → structured response.
    responses: HashMap<String, Value>,
    /// Default response if no prompt matches.
    default_response: Value,
    /// Error message to fail every call with, if set.
    fail_with: Option<String>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletion {
    /// Create a mock with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, Value>) -> Self {
        Self {
            responses,
            default_response: json!({}),
            fail_with: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: Value) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: response,
            fail_with: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that fails every call with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: json!({}),
            fail_with: Some(message.to_string()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this service.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this service.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<Value> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }

        let response = self
            .responses
            .iter()
            .find(|(key, _)| request.user_prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(response)
    }
}
