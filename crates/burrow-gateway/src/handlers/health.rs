use axum::extract::State;

use crate::error::Result;
use crate::state::AppState;

pub async fn ping_handler(State(state): State<AppState>) -> Result<&'static str> {
    state.storage().health_check().await?;
    Ok("OK")
}
