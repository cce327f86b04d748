//! ielts-client: backends for the IELTS test-taking client.
//!
//! Implements the `TestApi`, `AuthApi` and `MediaLoader` traits over the
//! REST API, over local files for offline practice, and in memory for tests.

pub mod config;
pub mod credentials;
mod error;
pub mod http;
mod inspect;
pub mod mock;
pub mod offline;

pub use config::{create_api, create_media_loader, load_config, load_config_from, IeltsConfig};
pub use credentials::CredentialStore;
pub use http::{HttpApi, HttpMediaLoader};
pub use offline::OfflineApi;
