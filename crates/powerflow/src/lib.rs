#[cfg(feature = "display_api")]
pub mod api;
pub mod config;
pub mod hub;
pub mod render;
mod supervisor;
mod sync;
pub mod translate;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use hub::HomeAssistant;
pub use hub::Hub;
pub use hub::HubError;
pub use render::Document;
pub use render::PublishedDocument;
pub use render::Surface;
pub use supervisor::Phase;
pub use supervisor::Supervisor;
pub use supervisor::RETRY_BACKOFF;
pub use sync::SyncError;
pub use sync::Synchronizer;
pub use translate::Translator;
