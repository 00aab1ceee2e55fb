pub mod archive;
pub mod config;
pub mod download;
pub mod http_client;
pub mod platform;

pub use config::Config;
pub use http_client::HttpClient;
pub use platform::Platform;
