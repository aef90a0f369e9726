//! Request/response counting port used by the reference stages.

use crate::core::pipeline::traits::CachePort;

/// Named port that counts traffic.
#[derive(Clone, Debug, Default)]
pub struct SimplePort {
    name: String,
    requests: u64,
    responses: u64,
}

impl SimplePort {
    /// Creates a port with zeroed counters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: 0,
            responses: 0,
        }
    }

    /// Counts one request.
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    /// Counts one response.
    pub fn record_response(&mut self) {
        self.responses += 1;
    }
}

impl CachePort for SimplePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn requests(&self) -> u64 {
        self.requests
    }

    fn responses(&self) -> u64 {
        self.responses
    }
}
