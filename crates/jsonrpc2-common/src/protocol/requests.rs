use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub type RequestId = String;

/// Per-call configuration.
///
/// # Fields
///
/// - `timeout`: overrides the client's default deadline for this call only
/// - `is_async`: when set, the request carries a `null` id
/// - `force_array`: wrap non-array params into a one-element array (default `true`)
/// - `headers`: extra HTTP headers for the outgoing request (ignored over TCP)
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub is_async: bool,
    pub force_array: bool,
    pub headers: BTreeMap<String, String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            is_async: false,
            force_array: true,
            headers: BTreeMap::new(),
        }
    }
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Marks the call as fire-and-forget: no correlation id is generated.
    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn with_force_array(mut self, force_array: bool) -> Self {
        self.force_array = force_array;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Source of correlation ids.
///
/// Injected into the client so that id generation stays an explicit
/// dependency; tests swap in [`SequentialIds`] for predictable envelopes.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RequestId;
}

/// 16 bytes of randomness rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> RequestId {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic ids of the form `<prefix>-<n>`, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
