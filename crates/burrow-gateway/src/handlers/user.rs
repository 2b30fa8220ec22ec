use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::{DeletionRequest, ShortCode};
use burrow_deleter::Enqueue;
use tracing::info;

use crate::auth::Owner;
use crate::error::{GatewayError, Result};
use crate::model::UserUrl;
use crate::state::AppState;

pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Response> {
    let urls = state.storage().list_urls_for_owner(&owner).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<UserUrl> = urls
        .into_iter()
        .map(|url| UserUrl {
            short_url: state.short_url(&url.short_code),
            original_url: url.original_url,
        })
        .collect();

    Ok(Json(body).into_response())
}

/// Queues the caller's codes for soft deletion and answers 202 whatever the
/// queue does with them.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(codes): Json<Vec<String>>,
) -> Result<StatusCode> {
    if codes.is_empty() {
        return Err(GatewayError::BadRequest(
            "no short codes to delete".to_string(),
        ));
    }

    let short_codes = codes
        .into_iter()
        .map(|code| {
            ShortCode::new(code.as_str())
                .map_err(|err| GatewayError::BadRequest(err.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let count = short_codes.len();
    let outcome = state
        .deletions()
        .enqueue(
            DeletionRequest::new(owner.clone(), short_codes),
            state.enqueue_timeout(),
        )
        .await;
    if outcome == Enqueue::Accepted {
        info!(owner = %owner, count, "queued short codes for deletion");
    }

    Ok(StatusCode::ACCEPTED)
}
