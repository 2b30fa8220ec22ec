use std::sync::Arc;
use std::time::Duration;

use burrow_core::{ShortCode, Storage};
use burrow_deleter::{DeletionQueue, DEFAULT_ENQUEUE_TIMEOUT};
use burrow_generator::Generator;
use typed_builder::TypedBuilder;

use crate::auth::TokenService;

/// Shared handles every request handler needs.
#[derive(Clone, TypedBuilder)]
pub struct AppState {
    storage: Arc<dyn Storage>,
    generator: Arc<dyn Generator<Output = ShortCode>>,
    deletions: DeletionQueue,
    tokens: Arc<TokenService>,
    #[builder(setter(into))]
    base_url: String,
    /// CIDR range allowed to read service statistics. `None` denies everyone.
    #[builder(default)]
    trusted_subnet: Option<String>,
    #[builder(default = DEFAULT_ENQUEUE_TIMEOUT)]
    enqueue_timeout: Duration,
}

impl AppState {
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn generator(&self) -> &dyn Generator<Output = ShortCode> {
        self.generator.as_ref()
    }

    pub fn deletions(&self) -> &DeletionQueue {
        &self.deletions
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn trusted_subnet(&self) -> Option<&str> {
        self.trusted_subnet.as_deref()
    }

    pub fn enqueue_timeout(&self) -> Duration {
        self.enqueue_timeout
    }

    pub fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }
}
