//! gRPC surface served next to the HTTP router.
//!
//! Callers identify themselves through the `user_id` metadata entry; the
//! value is taken as an opaque owner id, the same way the HTTP side treats
//! the id inside its session token.

mod error;
mod identity;
mod server;

pub use identity::{resolve_owner, USER_ID_METADATA};
pub use server::ShortenerGrpcServer;

use burrow_proto_schema::v1::shortener_service_server::ShortenerServiceServer;
use tonic::service::interceptor::InterceptedService;
use tonic::{Request, Status};

use crate::state::AppState;

pub type OwnerInterceptor = fn(Request<()>) -> Result<Request<()>, Status>;

/// Builds the shortener service with owner resolution applied to every call.
pub fn service(
    state: AppState,
) -> InterceptedService<ShortenerServiceServer<ShortenerGrpcServer>, OwnerInterceptor> {
    ShortenerServiceServer::with_interceptor(
        ShortenerGrpcServer::new(state),
        resolve_owner as OwnerInterceptor,
    )
}
