//! MunLink Client - Rust SDK for the MunLink Zambales municipal platform
//!
//! The crate's core is the session manager: it keeps a continuously valid
//! access token for the HTTP client (pre-expiry renewal, single-flight
//! refresh-on-401, cookie-based session restore) so callers never juggle
//! tokens themselves. Around it sit typed wrappers for the platform's REST
//! endpoints: documents, marketplace, announcements, benefits, and issue
//! reporting.
//!
//! ```no_run
//! use munlink_client::{ClientConfig, MunlinkClient};
//! use munlink_client::types::LoginRequest;
//!
//! # async fn run() -> munlink_core::MunlinkResult<()> {
//! let client = MunlinkClient::new(ClientConfig::from_env())?;
//! if !client.bootstrap().await {
//!     client
//!         .auth()
//!         .login(&LoginRequest {
//!             username: "ana".into(),
//!             password: "secret".into(),
//!         })
//!         .await?;
//! }
//! let announcements = client.announcements().list(&Default::default()).await?;
//! # let _ = announcements;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod session;
pub mod transport;
pub mod types;

pub use api::MunlinkClient;
pub use config::ClientConfig;
pub use session::{SessionEvent, SessionManager};

// Re-export the shared result/error types
pub use munlink_core::{MunlinkError, MunlinkResult};
