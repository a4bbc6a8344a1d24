//! Collaborator boundaries consumed by the order services.
//! Adapters in `crate::adapters` and `crate::gateway` implement these.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Order, OrderStatus};

// --- Order store ---

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("order not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence for orders, keyed by their business reference.
///
/// Implementations must make `update_status` atomic per row; callers hold no
/// lock between reading an order and writing its new status.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> RepositoryResult<()>;

    async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Order>;

    async fn update_status(
        &self,
        reference: &str,
        status: OrderStatus,
        psp_reference: Option<&str>,
    ) -> RepositoryResult<()>;
}

// --- Payment gateway ---

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response from gateway: {0}")]
    InvalidResponse(String),

    #[error("gateway circuit breaker is open")]
    CircuitOpen,

    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub quantity: i64,
    pub amount_excluding_tax: i64,
    pub tax_percentage: i64,
    pub description: String,
    pub id: String,
    pub tax_amount: i64,
    pub amount_including_tax: i64,
}

/// What the storefront asks the gateway to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub return_url: String,
    pub line_items: Vec<LineItem>,
}

/// A hosted payment session handed to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub session_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentAttempt {
    pub result_code: String,
    pub psp_reference: String,
}

/// The gateway's report on a session, correlated by merchant reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: String,
    pub reference: String,
    pub status: String,
    pub payments: Vec<PaymentAttempt>,
}

impl SessionOutcome {
    /// The first (and in this model only) payment attempt, or an empty one.
    pub fn first_attempt(&self) -> PaymentAttempt {
        self.payments.first().cloned().unwrap_or_default()
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> GatewayResult<CheckoutSession>;

    async fn get_session_outcome(
        &self,
        session_id: &str,
        session_result: &str,
    ) -> GatewayResult<SessionOutcome>;
}
