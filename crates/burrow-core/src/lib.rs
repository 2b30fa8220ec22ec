//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the shared vocabulary used by the storage backends,
//! the deletion pipeline and the HTTP gateway: short codes, owner identities,
//! URL records and the [`Storage`] contract every backend implements.

pub mod error;
pub mod owner;
pub mod record;
pub mod shortcode;
pub mod storage;

pub use error::{CoreError, StorageError};
pub use owner::OwnerId;
pub use record::{DeletionRequest, NewUrl, OwnedUrl, ServiceStats, UrlRecord};
pub use shortcode::ShortCode;
pub use storage::{ReadStorage, Storage};
