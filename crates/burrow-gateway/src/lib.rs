//! HTTP and gRPC surfaces of the Burrow URL shortener.
//!
//! [`App::router`] builds the axum router over an [`AppState`] holding the
//! storage backend, the code generator, the deletion queue and the token
//! service. [`grpc::service`] exposes a subset of the same operations over
//! gRPC. The `gateway` binary wires both listeners together from
//! configuration.

pub mod app;
pub mod auth;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod model;
pub mod net;
pub mod state;

pub use app::App;
pub use auth::TokenService;
pub use error::{GatewayError, Result};
pub use state::AppState;
