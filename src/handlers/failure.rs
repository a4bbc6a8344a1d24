use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FailureQuery {
    pub reference: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub order_reference: String,
    pub reason: String,
    pub message: String,
}

/// Customer-facing explanation for a gateway result code.
pub fn failure_message(reason: &str) -> &'static str {
    match reason {
        "Refused" => "Your payment was declined. Please check your payment details and try again.",
        "Cancelled" => "The payment was cancelled. You can try again when you're ready.",
        "Error" => "An error occurred while processing your payment. Please try again.",
        _ => "We couldn't process your payment. Please try again or contact support.",
    }
}

#[utoipa::path(
    get,
    path = "/order/failed",
    params(FailureQuery),
    responses((status = 200, description = "Payment failure details", body = FailureResponse)),
    tag = "Storefront"
)]
pub async fn order_failed(Query(query): Query<FailureQuery>) -> Json<FailureResponse> {
    let reason = query.reason.unwrap_or_default();

    Json(FailureResponse {
        order_reference: query.reference.unwrap_or_default(),
        message: failure_message(&reason).to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        assert!(failure_message("Refused").contains("declined"));
        assert!(failure_message("Cancelled").contains("cancelled"));
        assert!(failure_message("Error").contains("error occurred"));
        assert!(failure_message("").contains("contact support"));
        assert!(failure_message("RedirectShopper").contains("contact support"));
    }
}
