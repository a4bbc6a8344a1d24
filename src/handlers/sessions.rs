use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::services::{CheckoutRequest, PaymentSession};
use crate::AppState;

/// What the browser needs to mount the hosted checkout.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub session_data: String,
    pub client_key: String,
    pub order_reference: String,
}

impl From<PaymentSession> for SessionResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            session_id: session.session_id,
            session_data: session.session_data,
            client_key: session.client_key,
            order_reference: session.order_reference,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    responses(
        (status = 200, description = "Order created and payment session opened", body = SessionResponse),
        (status = 400, description = "Invalid order data"),
        (status = 502, description = "Payment gateway unavailable")
    ),
    tag = "Storefront"
)]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let request = CheckoutRequest {
        product_name: state.product.name.clone(),
        amount: state.product.amount,
        currency: state.product.currency.clone(),
        return_url: state.return_url.clone(),
    };

    let session = state.checkout.create_checkout(request).await?;

    Ok(Json(session.into()))
}
