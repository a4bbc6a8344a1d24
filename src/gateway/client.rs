use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::ports::{
    CheckoutSession, GatewayError, GatewayResult, LineItem, PaymentAttempt, PaymentGateway,
    SessionOutcome, SessionRequest,
};

const API_VERSION_PATH: &str = "/v71";
const TEST_BASE_URL: &str = "https://checkout-test.adyen.com";
const LIVE_BASE_URL: &str = "https://checkout-live.adyen.com";

/// Gateway environment, selecting the default API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEnvironment {
    Test,
    Live,
}

impl GatewayEnvironment {
    /// Anything other than `LIVE` falls back to the test environment.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("LIVE") {
            GatewayEnvironment::Live
        } else {
            GatewayEnvironment::Test
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            GatewayEnvironment::Test => TEST_BASE_URL,
            GatewayEnvironment::Live => LIVE_BASE_URL,
        }
    }
}

/// Credentials and routing for the hosted checkout API.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub api_key: String,
    pub merchant_account: String,
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionBody<'a> {
    merchant_account: &'a str,
    amount: Amount<'a>,
    reference: &'a str,
    return_url: &'a str,
    country_code: &'static str,
    shopper_locale: &'static str,
    channel: &'static str,
    allowed_payment_methods: [&'static str; 1],
    line_items: &'a [LineItem],
}

#[derive(Debug, Clone, Serialize)]
struct Amount<'a> {
    currency: &'a str,
    value: i64,
}

/// Response from `POST /sessions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub session_data: String,
}

/// Response from `GET /sessions/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub payments: Vec<SessionPayment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayment {
    #[serde(default)]
    pub result_code: String,
    #[serde(default)]
    pub psp_reference: String,
}

impl From<SessionStatusResponse> for SessionOutcome {
    fn from(resp: SessionStatusResponse) -> Self {
        SessionOutcome {
            session_id: resp.id,
            reference: resp.reference,
            status: resp.status,
            payments: resp
                .payments
                .into_iter()
                .map(|p| PaymentAttempt {
                    result_code: p.result_code,
                    psp_reference: p.psp_reference,
                })
                .collect(),
        }
    }
}

/// HTTP client for the hosted payment-session API
#[derive(Clone)]
pub struct HostedCheckoutClient {
    client: Client,
    settings: GatewaySettings,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl HostedCheckoutClient {
    /// Creates a client with the default circuit breaker (3 failures, 60-120s reset)
    pub fn new(settings: GatewaySettings) -> Self {
        Self::with_circuit_breaker(settings, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        settings: GatewaySettings,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        HostedCheckoutClient {
            client,
            settings,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.settings.base_url.trim_end_matches('/'),
            API_VERSION_PATH,
            path
        )
    }

    /// `{base}/v71/sessions/{id}`, with the id pushed as a single path segment.
    fn session_url(&self, session_id: &str) -> GatewayResult<Url> {
        if !is_valid_session_id(session_id) {
            return Err(GatewayError::InvalidSessionId(session_id.to_string()));
        }

        let mut url = Url::parse(&self.endpoint("/sessions"))
            .map_err(|e| GatewayError::Request(format!("invalid gateway URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Request("gateway URL cannot carry a path".to_string()))?
            .push(session_id);
        Ok(url)
    }

    async fn guarded<T, F>(&self, call: F) -> GatewayResult<T>
    where
        F: std::future::Future<Output = GatewayResult<T>>,
    {
        match self.circuit_breaker.call(call).await {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

/// Session ids are opaque tokens of ASCII letters, digits, `-` and `_`.
fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl PaymentGateway for HostedCheckoutClient {
    async fn create_session(&self, request: &SessionRequest) -> GatewayResult<CheckoutSession> {
        let url = self.endpoint("/sessions");
        let body = CreateSessionBody {
            merchant_account: &self.settings.merchant_account,
            amount: Amount {
                currency: &request.currency,
                value: request.amount,
            },
            reference: &request.reference,
            return_url: &request.return_url,
            country_code: "US",
            shopper_locale: "en-US",
            channel: "Web",
            allowed_payment_methods: ["scheme"],
            line_items: &request.line_items,
        };

        let session = self
            .guarded(async {
                let response = self
                    .client
                    .post(&url)
                    .header("X-API-Key", &self.settings.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| GatewayError::Request(e.to_string()))?;

                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| GatewayError::Request(e.to_string()))?;

                if status != StatusCode::OK && status != StatusCode::CREATED {
                    tracing::error!(status = status.as_u16(), body = %text, "Session creation rejected");
                    return Err(GatewayError::Status {
                        status: status.as_u16(),
                        body: text,
                    });
                }

                serde_json::from_str::<SessionResponse>(&text)
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
            })
            .await?;

        tracing::info!(session_id = %session.id, reference = %request.reference, "Payment session created");

        Ok(CheckoutSession {
            id: session.id,
            session_data: session.session_data,
        })
    }

    async fn get_session_outcome(
        &self,
        session_id: &str,
        session_result: &str,
    ) -> GatewayResult<SessionOutcome> {
        let url = self.session_url(session_id)?;
        tracing::debug!(session_id, "Fetching session outcome");

        let outcome = self
            .guarded(async {
                let response = self
                    .client
                    .get(url.clone())
                    .query(&[("sessionResult", session_result)])
                    .header("X-API-Key", &self.settings.api_key)
                    .send()
                    .await
                    .map_err(|e| GatewayError::Request(e.to_string()))?;

                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| GatewayError::Request(e.to_string()))?;

                if status != StatusCode::OK {
                    return Err(GatewayError::Status {
                        status: status.as_u16(),
                        body: text,
                    });
                }

                serde_json::from_str::<SessionStatusResponse>(&text)
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
            })
            .await?;

        Ok(outcome.into())
    }
}
