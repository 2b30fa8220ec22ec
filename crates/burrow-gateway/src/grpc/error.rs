use tonic::{Code, Status};
use tracing::error;

use crate::error::GatewayError;

impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        let code = match &err {
            GatewayError::BadRequest(_) => Code::InvalidArgument,
            GatewayError::Unauthorized | GatewayError::Token(_) => Code::Unauthenticated,
            GatewayError::Forbidden => Code::PermissionDenied,
            GatewayError::NotFound(_) | GatewayError::Gone(_) => Code::NotFound,
            GatewayError::Conflict(_) => Code::AlreadyExists,
            GatewayError::Storage(_) | GatewayError::Internal(_) => Code::Internal,
        };

        if code == Code::Internal {
            error!(error = %err, "grpc call failed");
            return Status::new(code, "internal error");
        }
        Status::new(code, err.to_string())
    }
}
