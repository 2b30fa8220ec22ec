use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use crate::auth::identify;
use crate::handlers::{
    delete_user_urls_handler, list_user_urls_handler, ping_handler, redirect_handler,
    shorten_batch_handler, shorten_json_handler, shorten_text_handler, stats_handler,
};
use crate::state::AppState;

pub struct App;

impl App {
    pub fn router(state: AppState) -> Router {
        // Routes that act on behalf of an owner.
        let identified = Router::new()
            .route("/", post(shorten_text_handler))
            .route("/api/shorten", post(shorten_json_handler))
            .route("/api/shorten/batch", post(shorten_batch_handler))
            .route(
                "/api/user/urls",
                get(list_user_urls_handler).delete(delete_user_urls_handler),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), identify));

        Router::new()
            .route("/ping", get(ping_handler))
            .route("/api/internal/stats", get(stats_handler))
            .route("/{short_code}", get(redirect_handler))
            .merge(identified)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(RequestDecompressionLayer::new())
                    .layer(CompressionLayer::new()),
            )
            .with_state(state)
    }
}
