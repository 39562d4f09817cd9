//! Client verification across the service boundary.
//!
//! The credit service asks the client directory whether a customer exists
//! before it accepts a credit application. The answer is one of three
//! outcomes, and they must stay distinct:
//!
//! - `Found`: the customer exists; a display snapshot comes back.
//! - `NotFound`: the directory answered and the customer is absent. This is
//!   the caller's fault.
//! - `Unavailable`: the directory could not give an answer (refused
//!   connection, timeout, DNS failure, 5xx, garbage body). This is an
//!   infrastructure fault and the caller may retry later.
//!
//! No retries and no caching happen here; every call is a fresh round trip.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::entities::CustomerSnapshot;

/// Reference bound for one verification round trip.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of asking the directory about one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Found(CustomerSnapshot),
    NotFound,
    Unavailable { reason: String },
}

/// Anything that can answer "does this customer exist?".
#[async_trait]
pub trait ClientVerifier: Send + Sync {
    async fn verify(&self, customer_id: i64) -> VerificationOutcome;
}

/// Envelope the directory wraps around a customer lookup.
#[derive(Debug, Deserialize)]
struct DirectoryEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<CustomerSnapshot>,
}

/// `ClientVerifier` backed by the directory's HTTP API.
#[derive(Clone)]
pub struct HttpClientVerifier {
    http_client: HttpClient,
    base_url: String,
}

impl std::fmt::Debug for HttpClientVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientVerifier")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpClientVerifier {
    /// `base_url` is the directory's API root, e.g. `http://localhost:3001/api`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn customer_url(&self, customer_id: i64) -> String {
        format!("{}/customers/{}", self.base_url, customer_id)
    }
}

#[async_trait]
impl ClientVerifier for HttpClientVerifier {
    async fn verify(&self, customer_id: i64) -> VerificationOutcome {
        let url = self.customer_url(customer_id);
        debug!(%url, customer_id, "querying client directory");

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    "could not connect".to_string()
                } else {
                    e.to_string()
                };
                warn!(customer_id, %reason, "client directory unreachable");
                return VerificationOutcome::Unavailable { reason };
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(customer_id, "customer not found in client directory");
            return VerificationOutcome::NotFound;
        }
        if !status.is_success() {
            warn!(customer_id, %status, "client directory answered with an error");
            return VerificationOutcome::Unavailable {
                reason: format!("client directory answered HTTP {}", status.as_u16()),
            };
        }

        match response.json::<DirectoryEnvelope>().await {
            Ok(DirectoryEnvelope {
                success: true,
                data: Some(snapshot),
            }) => {
                debug!(customer_id, name = %snapshot.full_name(), "customer verified");
                VerificationOutcome::Found(snapshot)
            }
            Ok(_) => {
                info!(customer_id, "client directory returned an empty result");
                VerificationOutcome::NotFound
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("undecodable client directory response: {}", e)
                };
                warn!(customer_id, %reason, "client directory response unusable");
                VerificationOutcome::Unavailable { reason }
            }
        }
    }
}
