use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use burrow_core::{NewUrl, OwnerId, ShortCode, StorageError};
use tracing::{debug, info};
use url::Url;

use crate::auth::Owner;
use crate::error::{GatewayError, Result};
use crate::model::{BatchShortenItem, BatchShortenResult, ShortenRequest, ShortenResponse};
use crate::state::AppState;

/// Accepts absolute `http`/`https` URLs with a host and returns them trimmed.
pub(crate) fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::BadRequest("URL cannot be empty".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|err| GatewayError::BadRequest(format!("invalid URL '{trimmed}': {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(GatewayError::BadRequest(format!(
            "URL must be absolute http(s) with a host: '{trimmed}'"
        )));
    }

    Ok(trimmed.to_string())
}

/// Saves `original_url` under a fresh code. A URL that is already stored
/// yields 409 together with the short URL it already has.
pub(crate) async fn shorten(
    state: &AppState,
    owner: &OwnerId,
    original_url: &str,
) -> Result<(StatusCode, String)> {
    let code = state.generator().generate();

    match state.storage().save_url(original_url, &code, owner).await {
        Ok(()) => {
            info!(short_code = %code, owner = %owner, "created short url");
            Ok((StatusCode::CREATED, state.short_url(&code)))
        }
        Err(StorageError::Conflict(_)) => {
            let existing = state.storage().short_code_for(original_url).await?;
            debug!(short_code = %existing, "url already shortened");
            Ok((StatusCode::CONFLICT, state.short_url(&existing)))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Owner(owner): Owner,
    body: String,
) -> Result<Response> {
    let original_url = validate_url(&body)?;
    let (status, short_url) = shorten(&state, &owner, &original_url).await?;
    Ok((status, short_url).into_response())
}

pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    let original_url = validate_url(&request.url)?;
    let (status, result) = shorten(&state, &owner, &original_url).await?;
    Ok((status, Json(ShortenResponse { result })).into_response())
}

pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(items): Json<Vec<BatchShortenItem>>,
) -> Result<(StatusCode, Json<Vec<BatchShortenResult>>)> {
    if items.is_empty() {
        return Err(GatewayError::BadRequest("batch cannot be empty".to_string()));
    }

    let mut records = Vec::with_capacity(items.len());
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let original_url = validate_url(&item.original_url)?;
        let short_code = state.generator().generate();
        results.push(BatchShortenResult {
            correlation_id: item.correlation_id,
            short_url: state.short_url(&short_code),
        });
        records.push(NewUrl {
            short_code,
            original_url,
        });
    }

    state.storage().bulk_save_urls(&records, &owner).await?;
    info!(count = records.len(), owner = %owner, "created short urls in batch");

    Ok((StatusCode::CREATED, Json(results)))
}

pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Redirect> {
    let code = ShortCode::new(short_code.as_str())
        .map_err(|_| GatewayError::NotFound(short_code.clone()))?;
    let original_url = state.storage().get_url(&code).await?;
    Ok(Redirect::temporary(&original_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            validate_url("  https://example.com/a?b=c \n").unwrap(),
            "https://example.com/a?b=c"
        );
        assert!(validate_url("http://localhost:8080").is_ok());
    }

    #[test]
    fn rejects_empty_relative_and_foreign_schemes() {
        for raw in ["", "   ", "example.com", "/relative", "ftp://example.com", "mailto:a@b.c"] {
            assert!(
                matches!(validate_url(raw), Err(GatewayError::BadRequest(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
