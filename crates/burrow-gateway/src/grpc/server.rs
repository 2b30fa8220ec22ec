use axum::http::StatusCode;
use burrow_proto_schema::v1 as proto;
use burrow_proto_schema::v1::shortener_service_server::ShortenerService;
use tonic::{Request, Response, Status};
use tracing::warn;

use super::identity::owner_of;
use crate::error::GatewayError;
use crate::handlers::{shorten, validate_url};
use crate::state::AppState;

/// Shortener RPCs over the same state the HTTP handlers use.
pub struct ShortenerGrpcServer {
    state: AppState,
}

impl ShortenerGrpcServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl ShortenerService for ShortenerGrpcServer {
    async fn create_short_url(
        &self,
        request: Request<proto::CreateShortUrlRequest>,
    ) -> Result<Response<proto::CreateShortUrlResponse>, Status> {
        let owner = owner_of(&request)?;
        let original_url = validate_url(&request.get_ref().url)?;

        let (status, result) = shorten(&self.state, &owner, &original_url).await?;
        if status == StatusCode::CONFLICT {
            return Err(Status::already_exists(result));
        }
        Ok(Response::new(proto::CreateShortUrlResponse { result }))
    }

    async fn get_user_urls(
        &self,
        request: Request<proto::GetUserUrlsRequest>,
    ) -> Result<Response<proto::GetUserUrlsResponse>, Status> {
        let owner = owner_of(&request)?;
        let urls = self
            .state
            .storage()
            .list_urls_for_owner(&owner)
            .await
            .map_err(GatewayError::from)?;

        let urls = urls
            .into_iter()
            .map(|url| proto::UserUrl {
                short_url: self.state.short_url(&url.short_code),
                original_url: url.original_url,
            })
            .collect();
        Ok(Response::new(proto::GetUserUrlsResponse { urls }))
    }

    async fn ping(
        &self,
        _request: Request<proto::PingRequest>,
    ) -> Result<Response<proto::PingResponse>, Status> {
        if let Err(err) = self.state.storage().health_check().await {
            warn!(error = %err, "storage health check failed");
            return Err(Status::unavailable("storage is unavailable"));
        }
        Ok(Response::new(proto::PingResponse {
            message: "OK".to_string(),
        }))
    }
}
