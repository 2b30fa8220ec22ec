use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::Json;
use burrow_core::ServiceStats;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::net::ip_in_cidr;
use crate::state::AppState;

pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Client address as reported by a fronting proxy, else the socket peer.
fn client_ip(request: &Request) -> Option<IpAddr> {
    if let Some(value) = request.headers().get(REAL_IP_HEADER) {
        return value.to_str().ok()?.trim().parse().ok();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

pub async fn stats_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ServiceStats>> {
    let subnet = state.trusted_subnet().ok_or(GatewayError::Forbidden)?;
    let ip = client_ip(&request).ok_or(GatewayError::Forbidden)?;

    if !ip_in_cidr(&ip, subnet) {
        debug!(client_ip = %ip, "stats request from untrusted address");
        return Err(GatewayError::Forbidden);
    }

    Ok(Json(state.storage().stats().await?))
}
