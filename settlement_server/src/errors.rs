use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use settlement_engine::LifecycleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The payment gateway could not complete the request. {0}")]
    GatewayError(String),
    #[error("No caller profile was supplied. {0}")]
    MissingCaller(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request query: {0}")]
    InvalidQuery(String),
    #[error("Gateway event rejected. {0}")]
    UnverifiedWebhook(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::MissingCaller(_) => StatusCode::UNAUTHORIZED,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::UnverifiedWebhook(_) => StatusCode::BAD_REQUEST,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<LifecycleError> for ServerError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::ValidationError(s) => Self::ValidationError(s),
            LifecycleError::AuthorizationError(s) => Self::InsufficientPermissions(s),
            LifecycleError::InvalidStateError { .. } => Self::InvalidState(e.to_string()),
            LifecycleError::ConflictError(_) => Self::Conflict(e.to_string()),
            LifecycleError::GatewayVerificationError(s) => Self::UnverifiedWebhook(s),
            LifecycleError::NotFoundError(s) => Self::NoRecordFound(s),
            LifecycleError::DatabaseError(s) => {
                error!("💻️ Database error while handling a request. {s}");
                Self::BackendError(s)
            },
            LifecycleError::GatewayError(s) => Self::GatewayError(s),
        }
    }
}

#[cfg(test)]
mod test {
    use settlement_engine::{
        db_types::{OrderId, OrderStatusType},
        order_flow::OrderAction,
    };

    use super::*;

    #[test]
    fn lifecycle_errors_map_to_status_codes() {
        let cases = [
            (LifecycleError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (LifecycleError::GatewayVerificationError("x".into()), StatusCode::BAD_REQUEST),
            (LifecycleError::AuthorizationError("x".into()), StatusCode::FORBIDDEN),
            (LifecycleError::NotFoundError("x".into()), StatusCode::NOT_FOUND),
            (LifecycleError::invalid_state(OrderStatusType::Paid, OrderAction::Cancel), StatusCode::CONFLICT),
            (LifecycleError::ConflictError(OrderId(1)), StatusCode::CONFLICT),
            (LifecycleError::DatabaseError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (LifecycleError::GatewayError("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (e, status) in cases {
            assert_eq!(ServerError::from(e).status_code(), status);
        }
    }

    #[test]
    fn invalid_state_message_is_kept() {
        let e = ServerError::from(LifecycleError::invalid_state(OrderStatusType::Paid, OrderAction::Cancel));
        assert_eq!(e.to_string(), "Cannot cancel an order that is PAID");
    }
}
