use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    models::{ApiResponse, OrderCreateRequest},
    services::order_service::{self, CreateOrderError},
    AppState,
};

fn bad_request(body: ApiResponse) -> Response {
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// GET /orders
pub async fn list_orders(State(state): State<AppState>) -> Response {
    match order_service::list_orders(&state).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => {
            tracing::error!("fetching orders failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching orders").into_response()
        }
    }
}

// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderCreateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return bad_request(
                ApiResponse::failure()
                    .message("Invalid request body ")
                    .detail(rejection.body_text()),
            );
        }
    };

    match order_service::create_order(&state, &req).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(CreateOrderError::Validation(errs)) => {
            bad_request(ApiResponse::failure().errors(&errs).detail(&errs))
        }
        Err(CreateOrderError::Store(e)) => {
            tracing::error!("creating order failed: {}", e);
            let text = e.to_string();
            bad_request(ApiResponse::failure().errors(&text).detail(&text))
        }
    }
}
