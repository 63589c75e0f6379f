pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod journal;
pub mod proxy;
pub mod server;
pub mod translate;
pub mod transport;

pub use backend::{BackendSelector, BackendTarget, BrandClassifier, ModelClassifier};
pub use config::ProxyConfig;
pub use credentials::CredentialStore;
pub use error::{BridgeError, Result};
pub use gateway::GatewayClient;
pub use journal::RequestJournal;
pub use server::{build_router, AppState};
pub use transport::VendorClient;
