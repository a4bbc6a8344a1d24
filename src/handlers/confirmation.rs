use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::OrderStatus;
use crate::error::AppError;
use crate::handlers::orders::OrderView;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationQuery {
    pub session_id: Option<String>,
    pub session_result: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationResponse {
    pub order: OrderView,
    pub status: String,
}

/// Where shoppers whose payment did not go through are sent.
pub fn failure_location(reference: &str, reason: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("reference", reference)
        .append_pair("reason", reason)
        .finish();
    format!("/order/failed?{}", query)
}

#[utoipa::path(
    get,
    path = "/order/confirmation",
    params(ConfirmationQuery),
    responses(
        (status = 200, description = "Payment authorized", body = ConfirmationResponse),
        (status = 303, description = "Payment not authorized, redirect to the failure page"),
        (status = 400, description = "Missing session id"),
        (status = 404, description = "No order for the session reference"),
        (status = 502, description = "Payment gateway unavailable")
    ),
    tag = "Storefront"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    Query(query): Query<ConfirmationQuery>,
) -> Result<Response, AppError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing session ID".to_string()))?;
    let session_result = query.session_result.unwrap_or_default();

    let verification = state
        .checkout
        .reconcile_payment(&session_id, &session_result)
        .await?;

    if verification.status != OrderStatus::Authorized {
        tracing::info!(
            reference = %verification.order.reference,
            result_code = %verification.result_code,
            "Payment not authorized, redirecting to failure page"
        );
        let location = failure_location(&verification.order.reference, &verification.result_code);
        return Ok(Redirect::to(&location).into_response());
    }

    Ok(Json(ConfirmationResponse {
        order: verification.order.into(),
        status: "Authorized".to_string(),
    })
    .into_response())
}
