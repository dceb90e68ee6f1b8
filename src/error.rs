use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::{ApiResponse, ErrorData};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Not enough inventory for {product}")]
    InsufficientInventory { product: String },

    #[error("{0}")]
    PaymentDeclined(String),

    #[error("{0}")]
    PaymentGatewayError(String),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Order number already exists")]
    DuplicateOrderNumber,

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ProductNotFound(_) | AppError::OrderNotFound | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::InsufficientInventory { .. }
            | AppError::PaymentDeclined(_)
            | AppError::PaymentGatewayError(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateOrderNumber
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        // internals stay in the log
        let message = if status.is_server_error() {
            "Failed to process request".to_string()
        } else {
            self.to_string()
        };
        let body = ApiResponse::failure(
            message.clone(),
            ErrorData { error: message },
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
