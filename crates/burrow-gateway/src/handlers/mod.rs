mod health;
mod stats;
mod urls;
mod user;

pub use health::ping_handler;
pub use stats::stats_handler;
pub use urls::{
    redirect_handler, shorten_batch_handler, shorten_json_handler, shorten_text_handler,
};
pub(crate) use urls::{shorten, validate_url};
pub use user::{delete_user_urls_handler, list_user_urls_handler};
