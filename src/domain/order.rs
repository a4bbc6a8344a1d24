//! Order domain entity.
//! Framework-agnostic purchase record and the state machine that governs it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of an order. `Pending` is the only non-terminal state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Authorized,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("currency code must be 3 characters, got {0:?}")]
    InvalidCurrency(String),

    #[error("product name cannot be empty")]
    EmptyProductName,

    #[error("invalid order status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("PSP reference cannot be empty")]
    MissingPspReference,
}

impl OrderError {
    /// True for errors raised while constructing an order from bad input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OrderError::InvalidAmount(_)
                | OrderError::InvalidCurrency(_)
                | OrderError::EmptyProductName
        )
    }
}

/// A single purchase attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub product_name: String,
    pub status: OrderStatus,
    pub psp_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validates the input and builds a `Pending` order with a fresh id and reference.
    pub fn new(
        product_name: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
    ) -> Result<Self, OrderError> {
        let product_name = product_name.into();
        let currency = currency.into();

        if amount <= 0 {
            return Err(OrderError::InvalidAmount(amount));
        }
        if currency.chars().count() != 3 {
            return Err(OrderError::InvalidCurrency(currency));
        }
        if product_name.is_empty() {
            return Err(OrderError::EmptyProductName);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            reference: generate_reference(now),
            amount,
            currency,
            product_name,
            status: OrderStatus::Pending,
            psp_reference: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Marks the order as authorized. Only legal from `Pending`.
    pub fn authorize(&mut self, psp_reference: &str) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(self.rejected(OrderStatus::Authorized));
        }
        if psp_reference.is_empty() {
            return Err(OrderError::MissingPspReference);
        }

        self.status = OrderStatus::Authorized;
        self.psp_reference = Some(psp_reference.to_string());
        self.touch();
        Ok(())
    }

    /// Marks the order as failed. Re-failing a failed order is a no-op success.
    pub fn fail(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Failed => {
                self.status = OrderStatus::Failed;
                self.touch();
                Ok(())
            }
            OrderStatus::Authorized | OrderStatus::Cancelled => {
                Err(self.rejected(OrderStatus::Failed))
            }
        }
    }

    /// Marks the order as cancelled. Allowed from anything but `Authorized`.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.status == OrderStatus::Authorized {
            return Err(self.rejected(OrderStatus::Cancelled));
        }

        self.status = OrderStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// Dispatches to the transition method for `target`.
    ///
    /// There is no transition into `Pending`, so that target is always rejected.
    pub fn transition_to(
        &mut self,
        target: OrderStatus,
        psp_reference: &str,
    ) -> Result<(), OrderError> {
        match target {
            OrderStatus::Authorized => self.authorize(psp_reference),
            OrderStatus::Failed => self.fail(),
            OrderStatus::Cancelled => self.cancel(),
            OrderStatus::Pending => Err(self.rejected(OrderStatus::Pending)),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_authorized(&self) -> bool {
        self.status == OrderStatus::Authorized
    }

    pub fn is_failed(&self) -> bool {
        self.status == OrderStatus::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    /// Orders can only be modified until an outcome has been recorded.
    pub fn can_be_modified(&self) -> bool {
        self.is_pending()
    }

    /// Amount in major units with the currency code, e.g. `"1.00 USD"`.
    pub fn formatted_amount(&self) -> String {
        format!(
            "{}.{:02} {}",
            self.amount / 100,
            self.amount % 100,
            self.currency
        )
    }

    fn rejected(&self, to: OrderStatus) -> OrderError {
        OrderError::InvalidStatusTransition {
            from: self.status,
            to,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn generate_reference(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORDER-{}-{}", now.timestamp(), &suffix[..8])
}
