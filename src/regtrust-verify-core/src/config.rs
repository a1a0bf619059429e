//! Configuration for the verification engine.

use std::time::Duration;

/// Configuration for the verification engine and registry client.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Base URL of the registry API.
    pub endpoint: String,
    /// Request timeout for object fetches.
    pub timeout: Duration,
    /// Maximum delegation depth before a trust chain fails closed.
    pub max_chain_depth: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://registrar.example.net".into(),
            timeout: Duration::from_secs(30),
            max_chain_depth: 32,
        }
    }
}
