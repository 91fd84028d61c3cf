pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod server;
pub mod translate;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use models::AliasTable;
pub use proxy::Relay;
pub use server::{build_router, AppState};
pub use upstream::{HttpUpstream, Upstream};
